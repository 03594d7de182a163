use crate::num;

/// One slot of a perRow template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RowSlot {
    /// A literal token copied into every iteration.
    Literal(String),
    /// `#`: the next sequential slot of the current row.
    Next,
    /// `#<n>`: the n-th slot of the current row.
    UseAt(i64),
    /// `#w<n>`: the n-th slot of the with-list, row-offset applied.
    WithAt(i64),
    /// `#r<n>`: the n-th slot of the accumulated result, row-offset applied.
    ResultAt(i64),
    /// `#index`: the 1-based position of the current row start.
    Index,
    /// `#all`: the whole row verbatim.
    All,
    /// `#rend`: the last emitted result value.
    LastResult,
}

impl RowSlot {
    pub(crate) fn parse(text: &str) -> RowSlot {
        match text {
            "#" => return RowSlot::Next,
            "#index" => return RowSlot::Index,
            "#all" => return RowSlot::All,
            "#rend" => return RowSlot::LastResult,
            _ => {}
        }
        if let Some(suffix) = text.strip_prefix("#w") {
            if num::is_int(suffix) {
                return RowSlot::WithAt(suffix.parse().unwrap_or(0));
            }
        } else if let Some(suffix) = text.strip_prefix("#r") {
            if num::is_int(suffix) {
                return RowSlot::ResultAt(suffix.parse().unwrap_or(0));
            }
        } else if let Some(suffix) = text.strip_prefix("#") {
            if num::is_int(suffix) {
                return RowSlot::UseAt(suffix.parse().unwrap_or(0));
            }
        }
        RowSlot::Literal(text.to_string())
    }
}

/// The declarations preceding the `|` separator of a perRow do-list:
/// row width, per-channel defaults, and literal initial output values.
#[derive(Debug, Clone, Default)]
pub(crate) struct RowDefs {
    pub row_length: i64,
    pub def_use: Option<String>,
    pub def_with: Option<String>,
    pub def_result: Option<String>,
    pub inits: Vec<String>,
    /// Index of the first template token (just past the `|`).
    pub offset: usize,
    pub found_bar: bool,
}

impl RowDefs {
    /// Scan the do-list up to the `|` separator. Returns the parsed
    /// declarations plus any warnings to report; tokens matching no
    /// declaration are dropped.
    pub(crate) fn parse(do_list: &[String], extended: bool) -> (RowDefs, Vec<String>) {
        let mut defs = RowDefs {
            row_length: 1,
            ..RowDefs::default()
        };
        let mut warnings = Vec::new();
        for (i, text) in do_list.iter().enumerate() {
            if let Some(suffix) = text.strip_prefix("row") {
                if num::is_int(suffix) {
                    defs.row_length = suffix.parse().unwrap_or(1);
                } else {
                    warnings.push(format!(
                        "row length is not an integer: {} - assume 1.",
                        text
                    ));
                }
            } else if text == "|" {
                defs.offset = i + 1;
                defs.found_bar = true;
                break;
            } else if let Some(suffix) = text.strip_prefix("rdef") {
                if extended {
                    defs.def_result = Some(suffix.to_string());
                }
            } else if let Some(suffix) = text.strip_prefix("wdef") {
                if extended {
                    defs.def_with = Some(suffix.to_string());
                }
            } else if let Some(suffix) = text.strip_prefix("def") {
                defs.def_use = Some(suffix.to_string());
            } else if let Some(suffix) = text.strip_prefix("init") {
                if extended {
                    defs.inits.push(suffix.to_string());
                }
            }
        }
        (defs, warnings)
    }

    /// The template slots following the `|`. Outside extended mode,
    /// `#rend` tokens are dropped entirely.
    pub(crate) fn template(&self, do_list: &[String], extended: bool) -> Vec<RowSlot> {
        do_list[self.offset..]
            .iter()
            .filter(|t| extended || t.as_str() != "#rend")
            .map(|t| RowSlot::parse(t))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn slots_parse() {
        assert_eq!(RowSlot::parse("#"), RowSlot::Next);
        assert_eq!(RowSlot::parse("#3"), RowSlot::UseAt(3));
        assert_eq!(RowSlot::parse("#w2"), RowSlot::WithAt(2));
        assert_eq!(RowSlot::parse("#r1"), RowSlot::ResultAt(1));
        assert_eq!(RowSlot::parse("#index"), RowSlot::Index);
        assert_eq!(RowSlot::parse("#all"), RowSlot::All);
        assert_eq!(RowSlot::parse("#rend"), RowSlot::LastResult);
        assert_eq!(RowSlot::parse("lit"), RowSlot::Literal("lit".into()));
        // A hash with a non-integer suffix is a literal.
        assert_eq!(RowSlot::parse("#wx"), RowSlot::Literal("#wx".into()));
    }

    #[test]
    fn declarations_before_bar() {
        let list = strings(&["row2", "defX", "ignored", "|", "#", "#"]);
        let (defs, warnings) = RowDefs::parse(&list, false);
        assert!(warnings.is_empty());
        assert!(defs.found_bar);
        assert_eq!(defs.row_length, 2);
        assert_eq!(defs.def_use.as_deref(), Some("X"));
        assert_eq!(defs.offset, 4);
        assert_eq!(defs.template(&list, false).len(), 2);
    }

    #[test]
    fn extended_declarations_gated() {
        let list = strings(&["rdef0", "wdefY", "initA", "|", "#"]);
        let (plain, _) = RowDefs::parse(&list, false);
        assert!(plain.def_result.is_none());
        assert!(plain.def_with.is_none());
        assert!(plain.inits.is_empty());
        let (ext, _) = RowDefs::parse(&list, true);
        assert_eq!(ext.def_result.as_deref(), Some("0"));
        assert_eq!(ext.def_with.as_deref(), Some("Y"));
        assert_eq!(ext.inits, ["A"]);
    }

    #[test]
    fn missing_bar_is_flagged() {
        let (defs, _) = RowDefs::parse(&strings(&["row2", "#"]), false);
        assert!(!defs.found_bar);
    }

    #[test]
    fn bad_row_length_warns_and_defaults() {
        let (defs, warnings) = RowDefs::parse(&strings(&["rowx", "|"]), false);
        assert_eq!(defs.row_length, 1);
        assert_eq!(warnings.len(), 1);
    }
}
