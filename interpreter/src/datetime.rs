use chrono::{Duration, Local, NaiveDate, NaiveTime, Timelike};

use crate::error::RuntimeError;
use crate::num;

/// Date/time rendering and arithmetic for the `time` verb. Formats use
/// the script language's own placeholders (`DD`, `MM`, `YYYY`, `YY`,
/// `W`, `w`, `C` for dates; `hh`, `mm`, `ss` for times) and are sticky
/// across sentences within one run.
#[derive(Debug, Clone)]
pub(crate) struct DateTimeFormats {
    time_format: String,
    date_format: String,
}

impl Default for DateTimeFormats {
    fn default() -> Self {
        DateTimeFormats {
            time_format: "hh:mm:ss".to_string(),
            date_format: "DD.MM.YYYY".to_string(),
        }
    }
}

impl DateTimeFormats {
    pub(crate) fn set_time_format(&mut self, format: &str) {
        self.time_format = format.to_string();
    }

    pub(crate) fn set_date_format(&mut self, format: &str) {
        self.date_format = format.to_string();
    }

    pub(crate) fn now(&self) -> String {
        Local::now().time().format(&to_strftime(&self.time_format)).to_string()
    }

    pub(crate) fn today(&self) -> String {
        Local::now()
            .date_naive()
            .format(&to_strftime(&self.date_format))
            .to_string()
    }

    /// Add two values: time + time adds durations, date + integer adds
    /// days, integer + integer adds numbers.
    pub(crate) fn add(&self, a: &str, b: &str) -> Result<String, RuntimeError> {
        self.combine(a, b, 1)
    }

    pub(crate) fn subtract(&self, a: &str, b: &str) -> Result<String, RuntimeError> {
        self.combine(a, b, -1)
    }

    fn combine(&self, a: &str, b: &str, sign: i64) -> Result<String, RuntimeError> {
        let tfmt = to_strftime(&self.time_format);
        if let (Ok(ta), Ok(tb)) = (
            NaiveTime::parse_from_str(a, &tfmt),
            NaiveTime::parse_from_str(b, &tfmt),
        ) {
            let total = seconds_of(ta) + sign * seconds_of(tb);
            let wrapped = total.rem_euclid(86_400);
            let time = NaiveTime::from_num_seconds_from_midnight_opt(wrapped as u32, 0)
                .unwrap_or(NaiveTime::MIN);
            return Ok(time.format(&tfmt).to_string());
        }

        let dfmt = to_strftime(&self.date_format);
        if let Ok(date) = NaiveDate::parse_from_str(a, &dfmt) {
            let days = num::parse_int(b)?;
            let shifted = date + Duration::days(sign * days);
            return Ok(shifted.format(&dfmt).to_string());
        }

        let left = num::parse_int(a)?;
        let right = num::parse_int(b)?;
        Ok((left + sign * right).to_string())
    }
}

fn seconds_of(t: NaiveTime) -> i64 {
    t.num_seconds_from_midnight() as i64
}

/// Translate the script placeholders into a strftime format string.
/// Unknown characters pass through literally.
fn to_strftime(format: &str) -> String {
    let mut out = String::new();
    let b = format.as_bytes();
    let mut i = 0;
    while i < b.len() {
        let rest = &format[i..];
        let (token, advance) = if rest.starts_with("YYYY") {
            ("%Y", 4)
        } else if rest.starts_with("YY") {
            ("%y", 2)
        } else if rest.starts_with("MM") {
            ("%m", 2)
        } else if rest.starts_with("DD") {
            ("%d", 2)
        } else if rest.starts_with("hh") {
            ("%H", 2)
        } else if rest.starts_with("mm") {
            ("%M", 2)
        } else if rest.starts_with("ss") {
            ("%S", 2)
        } else if rest.starts_with('W') {
            ("%A", 1)
        } else if rest.starts_with('w') {
            ("%W", 1)
        } else if rest.starts_with('C') {
            ("%C", 1)
        } else {
            out.push(format.as_bytes()[i] as char);
            i += 1;
            continue;
        };
        out.push_str(token);
        i += advance;
    }
    out
}
