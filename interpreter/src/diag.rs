use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;

use codespan_reporting::term::termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Diagnostic levels, least to most severe. Total exists so a threshold
/// of Total lets everything through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Total,
    Debug,
    Info,
    WarnAll,
    Warn,
    Error,
    Fatal,
}

impl Level {
    fn tag(self) -> &'static str {
        match self {
            Level::Total => "TOTAL",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::WarnAll => "WARNALL",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Fatal => "FATAL",
        }
    }

    fn color(self) -> Option<Color> {
        match self {
            Level::Error | Level::Fatal => Some(Color::Red),
            Level::Warn | Level::WarnAll => Some(Color::Yellow),
            _ => None,
        }
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Level, String> {
        match s.to_lowercase().as_str() {
            "total" => Ok(Level::Total),
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warnall" => Ok(Level::WarnAll),
            "warn" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            "fatal" => Ok(Level::Fatal),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Leveled diagnostic sink: timestamped messages to the console (stderr,
/// colored per severity) and optionally appended to a log file. Remembers
/// whether any fatal message was emitted so the front end can report a
/// non-zero completion status.
#[derive(Debug)]
pub struct DiagSink {
    threshold: Level,
    console: bool,
    file: Option<PathBuf>,
    color_choice: ColorChoice,
    fatal_count: u32,
}

impl DiagSink {
    pub fn new(threshold: Level) -> DiagSink {
        DiagSink {
            threshold,
            console: true,
            file: None,
            color_choice: ColorChoice::Auto,
            fatal_count: 0,
        }
    }

    /// A sink that swallows everything. Used by tests.
    pub fn quiet() -> DiagSink {
        let mut sink = DiagSink::new(Level::Fatal);
        sink.console = false;
        sink
    }

    pub fn set_console(&mut self, console: bool) {
        self.console = console;
    }

    pub fn set_color_choice(&mut self, choice: ColorChoice) {
        self.color_choice = choice;
    }

    /// Truncates the log file, then appends from there on.
    pub fn set_file(&mut self, path: PathBuf) {
        let _ = std::fs::write(&path, "");
        self.file = Some(path);
    }

    pub fn level(&self) -> Level {
        self.threshold
    }

    pub fn had_fatal(&self) -> bool {
        self.fatal_count > 0
    }

    pub fn msg(&mut self, level: Level, text: &str) {
        if level == Level::Fatal {
            self.fatal_count += 1;
        }
        if level < self.threshold {
            return;
        }
        let stamp = chrono::Local::now().format("%d.%m.%y %H:%M:%S");
        if self.console {
            let stream = StandardStream::stderr(self.color_choice);
            let mut lock = stream.lock();
            let mut spec = ColorSpec::new();
            spec.set_fg(level.color());
            let _ = lock.set_color(&spec);
            let _ = writeln!(lock, "{} {} - {}", stamp, level.tag(), text);
            let _ = lock.reset();
        }
        if let Some(path) = &self.file {
            if let Ok(mut f) = OpenOptions::new().append(true).create(true).open(path) {
                let _ = writeln!(f, "{} {} - {}", stamp, level.tag(), text);
            }
        }
    }

    /// Write a raw line to the log file only (output echoing).
    pub fn plain(&mut self, text: &str) {
        if let Some(path) = &self.file {
            if let Ok(mut f) = OpenOptions::new().append(true).create(true).open(path) {
                let _ = writeln!(f, "{}", text);
            }
        }
    }

    pub fn debug(&mut self, text: &str) {
        self.msg(Level::Debug, text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_order_by_severity() {
        assert!(Level::Debug < Level::Warn);
        assert!(Level::WarnAll < Level::Warn);
        assert!(Level::Error < Level::Fatal);
        assert!(Level::Total < Level::Debug);
    }

    #[test]
    fn fatal_is_counted_even_below_threshold() {
        let mut sink = DiagSink::quiet();
        assert!(!sink.had_fatal());
        sink.msg(Level::Error, "not fatal");
        assert!(!sink.had_fatal());
        sink.msg(Level::Fatal, "boom");
        assert!(sink.had_fatal());
    }

    #[test]
    fn level_parses_from_str() {
        assert_eq!("warnall".parse::<Level>(), Ok(Level::WarnAll));
        assert_eq!("FATAL".parse::<Level>(), Ok(Level::Fatal));
        assert!("bogus".parse::<Level>().is_err());
    }
}
