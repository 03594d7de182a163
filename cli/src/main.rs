use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser as ClapParser, ValueEnum};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use serde::Deserialize;

use interpreter::{DiagSink, Interpreter, Level};

/// How far to take the pipeline before stopping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum Stage {
    /// Expand includes and print the flat source.
    Preprocess,
    /// Print the token stream.
    Lex,
    /// Parse and print the paragraph structure.
    Parse,
    /// Parse and execute (the default).
    Run,
}

#[derive(ClapParser)]
#[command(name = "prosa", version, about = "Interpreter for the prosa scripting language")]
struct Cli {
    /// Program file to execute
    file: String,

    /// Stop after the given pipeline stage
    #[arg(long, value_enum, default_value = "run")]
    stage: Stage,

    /// Diagnostic threshold (total, debug, info, warnall, warn, error, fatal)
    #[arg(long)]
    log_level: Option<String>,

    /// Append diagnostics to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Suppress diagnostics on the console
    #[arg(long)]
    no_console: bool,

    /// Disable colored error output
    #[arg(long)]
    no_color: bool,

    /// Enable the extended language surface
    #[arg(long)]
    extended: bool,

    /// Mirror program output into the log file
    #[arg(long)]
    echo_log: bool,

    /// Configuration file (defaults to prosa.toml next to the program)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Arguments passed to the program (after --)
    #[arg(last = true)]
    args: Vec<String>,
}

/// Optional prosa.toml settings; command-line flags take precedence.
#[derive(Debug, Default, Deserialize)]
struct Config {
    #[serde(default)]
    extended: bool,
    #[serde(default)]
    echo_log: bool,
    #[serde(default)]
    log: LogConfig,
}

#[derive(Debug, Default, Deserialize)]
struct LogConfig {
    level: Option<String>,
    file: Option<PathBuf>,
    console: Option<bool>,
}

fn main() {
    let cli = Cli::parse();
    let config = load_config(&cli);

    let level = cli
        .log_level
        .as_deref()
        .or(config.log.level.as_deref())
        .map(|s| match s.parse::<Level>() {
            Ok(level) => level,
            Err(e) => {
                eprintln!("error: {}", e);
                process::exit(1);
            }
        })
        .unwrap_or(Level::Warn);

    let mut diag = DiagSink::new(level);
    if cli.no_console || config.log.console == Some(false) {
        diag.set_console(false);
    }
    if cli.no_color {
        diag.set_color_choice(ColorChoice::Never);
    }
    if let Some(path) = cli.log_file.clone().or(config.log.file.clone()) {
        diag.set_file(path);
    }

    let extended = cli.extended || config.extended;
    let echo_log = cli.echo_log || config.echo_log;

    // Preprocess: expand include. directives into one flat source.
    let file = Path::new(&cli.file);
    let preprocessed = match prosa::preprocess::process(file) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };
    let source = preprocessed.source();

    if cli.stage == Stage::Preprocess {
        println!("{}", source);
        return;
    }

    if cli.stage == Stage::Lex {
        for token in prosa::lexer::tokenize(&source) {
            println!("{}", token.text);
        }
        return;
    }

    // Set up codespan file database over the preprocessed source.
    let mut files = SimpleFiles::new();
    let file_id = files.add(cli.file.clone(), source.clone());

    let color_choice = if cli.no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };
    let writer = StandardStream::stderr(color_choice);
    let term_config = term::Config::default();

    let parser = prosa::parser::Parser::new(&source, extended, file_id);
    let (program, soft_errors) = match parser.parse() {
        Ok(parsed) => parsed,
        Err(errors) => {
            for error in &errors {
                let _ = term::emit_to_write_style(
                    &mut writer.lock(),
                    &term_config,
                    &files,
                    &error.to_diagnostic(),
                );
            }
            process::exit(1);
        }
    };
    for error in &soft_errors {
        let _ = term::emit_to_write_style(
            &mut writer.lock(),
            &term_config,
            &files,
            &error.to_diagnostic(),
        );
    }

    if cli.stage == Stage::Parse {
        print!("{}", program.describe());
        return;
    }

    // Execute. Relative file references resolve against the program's
    // directory.
    let curr_dir = file
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));
    let mut stdout = std::io::stdout();
    let mut interp = Interpreter::new(&program, curr_dir, diag, &mut stdout);
    interp.set_extended(extended);
    interp.set_echo_log(echo_log);
    interp.execute(cli.args.clone());

    if interp.had_fatal() {
        process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Config {
    let path = match &cli.config {
        Some(path) => path.clone(),
        None => {
            let beside = Path::new(&cli.file)
                .parent()
                .unwrap_or(Path::new("."))
                .join("prosa.toml");
            if !beside.is_file() {
                return Config::default();
            }
            beside
        }
    };
    match std::fs::read_to_string(&path) {
        Ok(text) => match toml::from_str(&text) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("error: invalid config '{}': {}", path.display(), e);
                process::exit(1);
            }
        },
        Err(e) => {
            eprintln!("error: cannot read config '{}': {}", path.display(), e);
            process::exit(1);
        }
    }
}
