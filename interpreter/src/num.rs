use crate::error::RuntimeError;

/// Parse a leading integer the way the script language expects numbers:
/// optional surrounding noise is ignored, only the numeric prefix counts.
pub(crate) fn parse_int(text: &str) -> Result<i64, RuntimeError> {
    let s = text.trim_start();
    let b = s.as_bytes();
    let mut end = 0;
    if end < b.len() && (b[end] == b'+' || b[end] == b'-') {
        end += 1;
    }
    let digits_start = end;
    while end < b.len() && b[end].is_ascii_digit() {
        end += 1;
    }
    if end == digits_start {
        return Err(RuntimeError::NumberExpected(text.to_string()));
    }
    s[..end]
        .parse::<i64>()
        .map_err(|_| RuntimeError::NumberExpected(text.to_string()))
}

/// Parse a leading float prefix; at least one digit must be present.
pub(crate) fn parse_float(text: &str) -> Result<f64, RuntimeError> {
    let s = text.trim_start();
    let b = s.as_bytes();
    let mut end = 0;
    if end < b.len() && (b[end] == b'+' || b[end] == b'-') {
        end += 1;
    }
    let mut saw_digit = false;
    while end < b.len() && b[end].is_ascii_digit() {
        end += 1;
        saw_digit = true;
    }
    if end < b.len() && b[end] == b'.' {
        end += 1;
        while end < b.len() && b[end].is_ascii_digit() {
            end += 1;
            saw_digit = true;
        }
    }
    if saw_digit && end < b.len() && (b[end] == b'e' || b[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < b.len() && (b[exp_end] == b'+' || b[exp_end] == b'-') {
            exp_end += 1;
        }
        let digits_start = exp_end;
        while exp_end < b.len() && b[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > digits_start {
            end = exp_end;
        }
    }
    if !saw_digit {
        return Err(RuntimeError::NumberExpected(text.to_string()));
    }
    s[..end]
        .parse::<f64>()
        .map_err(|_| RuntimeError::NumberExpected(text.to_string()))
}

/// True for a whole token that is a well-formed integer fitting in i64.
pub(crate) fn is_int(text: &str) -> bool {
    let b = text.as_bytes();
    if b.is_empty() {
        return false;
    }
    let start = if b[0] == b'+' || b[0] == b'-' { 1 } else { 0 };
    if b.len() == start {
        return false;
    }
    if !b[start..].iter().all(|c| c.is_ascii_digit()) {
        return false;
    }
    text.parse::<i64>().is_ok()
}

/// True for a whole token that is an integer or a decimal number.
pub(crate) fn is_number(text: &str) -> bool {
    if is_int(text) {
        return true;
    }
    let b = text.as_bytes();
    if b.is_empty() {
        return false;
    }
    let start = if b[0] == b'+' || b[0] == b'-' { 1 } else { 0 };
    let rest = &text[start..];
    if rest.is_empty() || rest.ends_with('.') {
        return false;
    }
    let mut dots = 0;
    for c in rest.bytes() {
        if c == b'.' {
            dots += 1;
            if dots > 1 {
                return false;
            }
        } else if !c.is_ascii_digit() {
            return false;
        }
    }
    text.parse::<f64>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_prefix_parsing() {
        assert_eq!(parse_int("42").unwrap(), 42);
        assert_eq!(parse_int("-7").unwrap(), -7);
        assert_eq!(parse_int("3.99").unwrap(), 3);
        assert_eq!(parse_int("1.000000").unwrap(), 1);
        assert!(parse_int("abc").is_err());
        assert!(parse_int("").is_err());
    }

    #[test]
    fn float_prefix_parsing() {
        assert_eq!(parse_float("1.5").unwrap(), 1.5);
        assert_eq!(parse_float("-2").unwrap(), -2.0);
        assert_eq!(parse_float("3.0x").unwrap(), 3.0);
        assert!(parse_float("x").is_err());
    }

    #[test]
    fn whole_token_predicates() {
        assert!(is_int("123"));
        assert!(is_int("-4"));
        assert!(!is_int("1.5"));
        assert!(!is_int("12a"));
        assert!(is_number("1.5"));
        assert!(is_number("-0.25"));
        assert!(!is_number("1."));
        assert!(!is_number("1.2.3"));
        assert!(!is_number("abc"));
    }
}
