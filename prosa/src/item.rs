use std::fmt;
use std::ops::Range;

/// Reserved reference keywords. `ref` only counts in extended mode.
const REF_KEYWORDS: &[&str] = &[
    "this",
    "params",
    "forparams",
    "useparams",
    "withparams",
    "ref",
    "args",
];

/// Group keywords that open the for/use/with parameter channels.
const GROUP_KEYWORDS: &[&str] = &["for", "use", "with"];

/// Standard verbs. Must not contain the control verbs (plist, between, nop, stop).
const STANDARD_VERBS: &[&str] = &[
    "cond",
    "del",
    "expand",
    "file",
    "find",
    "freq",
    "get",
    "id",
    "include",
    "input",
    "ins",
    "join",
    "mask",
    "minus",
    "output",
    "pexpr",
    "print",
    "range",
    "readLines",
    "reverse",
    "returnValue",
    "set",
    "sort",
    "split",
    "time",
    "unique",
    "writeLines",
];

const CONTROL_VERBS: &[&str] = &["plist", "between", "nop", "stop"];

const VERB_MODIFIERS: &[&str] = &[
    "combine", "desc", "echo", "echoIn", "echoOut", "perRow", "int", "float", "forget",
];

/// The semantic role assigned to one raw token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Plain,
    Reference,
    Verb,
    ParagraphLabel,
    ConditionLabel,
    Newline,
    Group,
}

/// How a verb is dispatched at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbKind {
    /// One of the fixed built-in list transforms.
    Standard,
    /// plist / between / nop / stop.
    Control,
    /// Any other name: resolved as a paragraph call.
    ParagraphCall,
}

#[derive(Debug, Clone)]
pub enum ItemError {
    UnknownRefModifier(String),
    UnknownVerbModifier(String),
    MalformedVerb(String),
}

impl fmt::Display for ItemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemError::UnknownRefModifier(m) => {
                write!(f, "ref modifier {} not recognized", m)
            }
            ItemError::UnknownVerbModifier(m) => {
                write!(f, "verb modifier {} not recognized", m)
            }
            ItemError::MalformedVerb(v) => write!(f, "malformed verb {}", v),
        }
    }
}

impl std::error::Error for ItemError {}

/// One classified unit of the token stream. Immutable after assembly:
/// only the named-sentence distance is patched in by the sentence pass.
#[derive(Debug, Clone)]
pub struct Item {
    entry: String,
    name: String,
    kind: ItemKind,
    verb_kind: Option<VerbKind>,
    /// Modifier tokens remaining after the head was split off.
    parts: Vec<String>,
    /// Target of an extended `ref~name` sentence reference.
    sentence_ref: Option<String>,
    /// Backward distance for that-style references (count of `a`s);
    /// negative sentinel when the token is not a that-pattern.
    ref_distance: i32,
    /// Nesting level for condition labels: dots in the body plus one.
    cond_level: i32,
    /// Inclusive window into the referenced list. [0, -1] = whole list.
    ref_from: i32,
    ref_to: i32,
    get_size: bool,
    forget: bool,
    /// Byte span in the preprocessed source; empty for synthesized items.
    span: Range<usize>,
}

impl Item {
    /// Classify one raw token. Fails on malformed reference or verb modifiers.
    pub fn classify(token: &str, extended: bool) -> Result<Item, ItemError> {
        let entry = token.to_string();
        let mut name = entry.clone();
        let mut refname = entry.clone();
        let mut get_size = false;
        if entry.starts_with('|') && entry.ends_with('|') {
            // A lone bar strips to the empty name and stays plain below.
            refname = if entry.len() >= 2 {
                entry[1..entry.len() - 1].to_string()
            } else {
                String::new()
            };
            get_size = true;
        }

        let mut kind;
        let mut cond_level = 0;
        if entry.len() > 1 && entry.ends_with('.') {
            kind = ItemKind::Verb;
            name = entry[..entry.len() - 1].to_string();
        } else if entry.len() > 1 && entry.ends_with(':') {
            kind = ItemKind::ParagraphLabel;
            name = entry[..entry.len() - 1].to_string();
        } else if entry.len() > 1 && entry.ends_with(')') {
            kind = ItemKind::ConditionLabel;
            name = entry[..entry.len() - 1].to_string();
            cond_level = name.matches('.').count() as i32 + 1;
        } else if entry == "<EOL>" {
            kind = ItemKind::Newline;
        } else if GROUP_KEYWORDS.contains(&entry.as_str()) {
            kind = ItemKind::Group;
        } else if is_ref_token(&refname, extended) {
            kind = ItemKind::Reference;
            name = refname.clone();
        } else {
            kind = ItemKind::Plain;
        }

        let mut parts: Vec<String> = Vec::new();
        let mut sentence_ref = None;
        let mut ref_distance = 0;
        let mut verb_kind = None;
        match kind {
            ItemKind::Reference => {
                parts = split_nonempty(&refname, '~');
                if parts.is_empty() || !is_ref_token(&parts[0], extended) {
                    // `~` made this look like a reference; the head says otherwise.
                    kind = ItemKind::Plain;
                } else if parts[0] == "ref" && extended {
                    if parts.len() <= 1 {
                        kind = ItemKind::Plain;
                    } else {
                        name = parts.remove(0);
                        sentence_ref = Some(parts.remove(0));
                    }
                } else {
                    ref_distance = that_distance(&parts[0]);
                    name = parts.remove(0);
                }
            }
            ItemKind::Verb => {
                parts = split_nonempty(&name, '-');
                if parts.is_empty() {
                    return Err(ItemError::MalformedVerb(entry));
                }
                name = parts.remove(0);
                verb_kind = Some(if STANDARD_VERBS.contains(&name.as_str())
                    && (name != "freq" || extended)
                {
                    VerbKind::Standard
                } else if CONTROL_VERBS.contains(&name.as_str()) {
                    VerbKind::Control
                } else {
                    VerbKind::ParagraphCall
                });
            }
            _ => {}
        }

        let mut ref_from = 0;
        let mut ref_to = -1;
        if kind == ItemKind::Reference {
            for part in &parts {
                match part.as_str() {
                    "first" => ref_to = ref_from,
                    "second" => {
                        ref_from += 1;
                        ref_to = ref_from;
                    }
                    "last" => ref_from = ref_to,
                    "head" => ref_to -= 1,
                    "tail" => ref_from += 1,
                    _ => return Err(ItemError::UnknownRefModifier(part.clone())),
                }
            }
        }

        let mut forget = false;
        if kind == ItemKind::Verb {
            for part in &parts {
                if part == "forget" {
                    forget = true;
                }
                if !VERB_MODIFIERS.contains(&part.as_str())
                    && (!part.starts_with('>') || !extended)
                {
                    return Err(ItemError::UnknownVerbModifier(part.clone()));
                }
            }
        }

        Ok(Item {
            entry,
            name,
            kind,
            verb_kind,
            parts,
            sentence_ref,
            ref_distance,
            cond_level,
            ref_from,
            ref_to,
            get_size,
            forget,
            span: 0..0,
        })
    }

    pub fn span(&self) -> &Range<usize> {
        &self.span
    }

    pub(crate) fn with_span(mut self, span: Range<usize>) -> Item {
        self.span = span;
        self
    }

    /// Build a synthesized verb item ("cond." / "nop." placeholders).
    /// Such names are always classifiable, so this cannot fail.
    pub(crate) fn placeholder(verb: &str) -> Item {
        match Item::classify(verb, false) {
            Ok(item) => item,
            Err(_) => unreachable!("placeholder verbs are well-formed"),
        }
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    pub fn verb_kind(&self) -> Option<VerbKind> {
        self.verb_kind
    }

    pub fn is_standard_verb(&self) -> bool {
        self.verb_kind == Some(VerbKind::Standard)
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// Modifier parts without extended `>name` sentence-name markers.
    pub fn modifier_parts(&self) -> impl Iterator<Item = &str> {
        self.parts
            .iter()
            .map(|p| p.as_str())
            .filter(|p| !p.starts_with('>'))
    }

    /// The explicit sentence name declared by a `>name` verb marker, if any.
    pub fn declared_name(&self) -> Option<&str> {
        self.parts
            .iter()
            .find(|p| p.starts_with('>'))
            .map(|p| &p[1..])
    }

    pub fn sentence_ref(&self) -> Option<&str> {
        self.sentence_ref.as_deref()
    }

    pub fn ref_distance(&self) -> i32 {
        self.ref_distance
    }

    pub(crate) fn set_ref_distance(&mut self, dist: i32) {
        self.ref_distance = dist;
    }

    pub fn cond_level(&self) -> i32 {
        self.cond_level
    }

    pub fn ref_from(&self) -> i32 {
        self.ref_from
    }

    pub fn ref_to(&self) -> i32 {
        self.ref_to
    }

    pub fn has_get_size(&self) -> bool {
        self.get_size
    }

    pub fn has_forget(&self) -> bool {
        self.forget
    }

    /// Render for stage dumps: kind tag, distance, name, modifiers, window.
    pub fn describe(&self, with_kind: bool, with_distance: bool) -> String {
        let mut s = String::new();
        if with_kind {
            s.push(match self.kind {
                ItemKind::Plain => 'p',
                ItemKind::Reference => 'r',
                ItemKind::Verb => 'v',
                ItemKind::ParagraphLabel => 'l',
                ItemKind::ConditionLabel => 'c',
                ItemKind::Newline => 'n',
                ItemKind::Group => 'g',
            });
            s.push('|');
        }
        if with_distance && self.ref_distance > 0 {
            s.push_str(&format!("({})", self.ref_distance));
        }
        s.push_str(&self.name);
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                s.push('&');
            }
            s.push('+');
            s.push_str(part);
        }
        if self.get_size {
            s.push_str("+||");
        }
        if self.kind == ItemKind::Reference {
            s.push_str(&format!("[{}..{}]", self.ref_from, self.ref_to));
        }
        s
    }
}

/// Backward-reference distance of a that-pattern token (`th` a+ `t`):
/// the count of `a` characters, or a negative sentinel when the token
/// does not match the pattern.
pub fn that_distance(s: &str) -> i32 {
    let b = s.as_bytes();
    if b.len() < 2 || b[0] != b't' || b[1] != b'h' {
        return -5;
    }
    if b[b.len() - 1] != b't' {
        return -4;
    }
    let mut count = 0;
    for &c in &b[2..b.len() - 1] {
        if c == b'a' {
            count += 1;
        } else {
            return -3;
        }
    }
    count
}

fn is_ref_token(s: &str, extended: bool) -> bool {
    if s.starts_with('|') {
        return true;
    }
    if s.contains('~') {
        // Tentative; the head keyword still has to pass.
        return true;
    }
    if REF_KEYWORDS.contains(&s) {
        return s != "ref" || extended;
    }
    that_distance(s) > 0
}

/// Split on a separator, dropping empty words.
pub(crate) fn split_nonempty(s: &str, sep: char) -> Vec<String> {
    s.split(sep)
        .filter(|w| !w.is_empty())
        .map(|w| w.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(token: &str) -> Item {
        Item::classify(token, false).expect("classification failed")
    }

    #[test]
    fn that_pattern_distances() {
        assert_eq!(that_distance("that"), 1);
        assert_eq!(that_distance("thaat"), 2);
        assert_eq!(that_distance("thaaaat"), 4);
        assert_eq!(that_distance("tht"), 0);
        assert_eq!(that_distance("this"), -4);
        assert_eq!(that_distance("what"), -5);
        assert_eq!(that_distance("thabt"), -3);
        assert_eq!(that_distance("th"), -4);
    }

    #[test]
    fn that_pattern_classifies_as_reference() {
        let i = item("thaat");
        assert_eq!(i.kind(), ItemKind::Reference);
        assert_eq!(i.ref_distance(), 2);
        // Near misses are plain, never references.
        assert_eq!(item("thabt").kind(), ItemKind::Plain);
        assert_eq!(item("tht").kind(), ItemKind::Plain);
    }

    #[test]
    fn condition_label_levels() {
        assert_eq!(item("a)").cond_level(), 1);
        assert_eq!(item("a.1)").cond_level(), 2);
        assert_eq!(item("end.1)").cond_level(), 2);
        assert_eq!(item("a.b.c)").cond_level(), 3);
        assert_eq!(item("a)").kind(), ItemKind::ConditionLabel);
    }

    #[test]
    fn condition_label_round_trip() {
        for label in ["x)", "x.1)", "deep.a.b.c.d)"] {
            let first = item(label);
            let again = item(first.entry());
            assert_eq!(first.cond_level(), again.cond_level());
        }
    }

    #[test]
    fn verbs_and_kinds() {
        let i = item("sort.");
        assert_eq!(i.kind(), ItemKind::Verb);
        assert_eq!(i.verb_kind(), Some(VerbKind::Standard));
        assert_eq!(item("stop.").verb_kind(), Some(VerbKind::Control));
        assert_eq!(item("plist.").verb_kind(), Some(VerbKind::Control));
        assert_eq!(item("myparagraph.").verb_kind(), Some(VerbKind::ParagraphCall));
    }

    #[test]
    fn freq_is_standard_only_in_extended_mode() {
        let plain = Item::classify("freq.", false).unwrap();
        assert_eq!(plain.verb_kind(), Some(VerbKind::ParagraphCall));
        let ext = Item::classify("freq.", true).unwrap();
        assert_eq!(ext.verb_kind(), Some(VerbKind::Standard));
    }

    #[test]
    fn verb_modifiers() {
        let i = item("sort-desc.");
        assert_eq!(i.name(), "sort");
        assert_eq!(i.parts(), &["desc".to_string()]);
        let i = item("plist-int-forget.");
        assert!(i.has_forget());
        assert!(Item::classify("sort-bogus.", false).is_err());
    }

    #[test]
    fn sentence_name_marker_requires_extended() {
        assert!(Item::classify("output->mark.", false).is_err());
        let i = Item::classify("output->mark.", true).unwrap();
        assert_eq!(i.declared_name(), Some("mark"));
        assert_eq!(i.modifier_parts().count(), 0);
    }

    #[test]
    fn reference_windows() {
        let i = item("this");
        assert_eq!(i.kind(), ItemKind::Reference);
        assert_eq!((i.ref_from(), i.ref_to()), (0, -1));
        assert_eq!(
            (item("this~first").ref_from(), item("this~first").ref_to()),
            (0, 0)
        );
        assert_eq!(
            (item("this~second").ref_from(), item("this~second").ref_to()),
            (1, 1)
        );
        assert_eq!(
            (item("this~last").ref_from(), item("this~last").ref_to()),
            (-1, -1)
        );
        assert_eq!(
            (item("this~head").ref_from(), item("this~head").ref_to()),
            (0, -2)
        );
        assert_eq!(
            (item("this~tail").ref_from(), item("this~tail").ref_to()),
            (1, -1)
        );
        assert!(Item::classify("this~middle", false).is_err());
    }

    #[test]
    fn size_query() {
        let i = item("|this|");
        assert_eq!(i.kind(), ItemKind::Reference);
        assert!(i.has_get_size());
        assert_eq!(i.name(), "this");
        let i = item("|args|");
        assert!(i.has_get_size());
        assert_eq!(i.name(), "args");
    }

    #[test]
    fn non_keyword_tilde_token_is_plain() {
        let i = item("foo~bar");
        assert_eq!(i.kind(), ItemKind::Plain);
    }

    #[test]
    fn lone_bar_is_plain() {
        let i = item("|");
        assert_eq!(i.kind(), ItemKind::Plain);
        assert_eq!(i.name(), "|");
    }

    #[test]
    fn named_sentence_reference_requires_extended() {
        let plain = Item::classify("ref~mark", false).unwrap();
        assert_eq!(plain.kind(), ItemKind::Plain);
        let ext = Item::classify("ref~mark", true).unwrap();
        assert_eq!(ext.kind(), ItemKind::Reference);
        assert_eq!(ext.sentence_ref(), Some("mark"));
    }

    #[test]
    fn groups_and_newline() {
        assert_eq!(item("for").kind(), ItemKind::Group);
        assert_eq!(item("use").kind(), ItemKind::Group);
        assert_eq!(item("with").kind(), ItemKind::Group);
        assert_eq!(item("<EOL>").kind(), ItemKind::Newline);
        assert_eq!(item("word").kind(), ItemKind::Plain);
    }
}
