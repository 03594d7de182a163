use crate::item::{Item, ItemKind};

/// Role a sentence plays in label-driven control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelRole {
    /// Not part of a conditional construct.
    None,
    /// Carries an opening condition label.
    Opens,
    /// Inside an open construct, between labels.
    Continues,
    /// Carries a closing (`end`/`end.*`) label.
    Closes,
}

/// One verb invocation with its parameter items. Built by the sentence
/// pass; jump and saved-result are finalized by the paragraph pass;
/// read-only during execution.
#[derive(Debug, Clone)]
pub struct Sentence {
    items: Vec<Item>,
    pub do_params: Vec<Item>,
    pub for_params: Vec<Item>,
    pub use_params: Vec<Item>,
    pub with_params: Vec<Item>,
    /// Paragraph name, if this sentence saw the paragraph label.
    name: String,
    /// Explicit sentence name declared via a `>name` verb marker.
    ref_name: String,
    header: bool,
    saved: bool,
    seq: i32,
    cond_level: i32,
    jump: i32,
    role: LabelRole,
}

impl Sentence {
    pub fn new() -> Sentence {
        Sentence {
            items: Vec::new(),
            do_params: Vec::new(),
            for_params: Vec::new(),
            use_params: Vec::new(),
            with_params: Vec::new(),
            name: String::new(),
            ref_name: String::new(),
            header: false,
            saved: false,
            seq: -1,
            cond_level: 0,
            jump: 1,
            role: LabelRole::None,
        }
    }

    pub(crate) fn add_item(&mut self, item: Item) {
        self.items.push(item);
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The verb that finalizes this sentence (always the last item).
    pub fn verb(&self) -> &Item {
        self.items.last().expect("sentence finalized without a verb")
    }

    /// Split the item list into the four parameter channels. Items before
    /// the verb (or a group keyword) accumulate into the pending channel;
    /// each group keyword claims the accumulated items for its channel and
    /// the verb claims whatever is left as the do-channel.
    pub(crate) fn set_params(&mut self) {
        let mut pending: Vec<Item> = Vec::new();
        for item in &self.items {
            match item.kind() {
                ItemKind::Group => {
                    let claimed = std::mem::take(&mut pending);
                    match item.name() {
                        "for" => self.for_params = claimed,
                        "use" => self.use_params = claimed,
                        "with" => self.with_params = claimed,
                        _ => {}
                    }
                }
                ItemKind::Verb => {
                    self.do_params = std::mem::take(&mut pending);
                }
                ItemKind::Plain | ItemKind::Reference => pending.push(item.clone()),
                ItemKind::ParagraphLabel | ItemKind::ConditionLabel | ItemKind::Newline => {}
            }
        }
    }

    /// All distinct positive that-reference distances used by this sentence.
    pub fn that_refs(&self) -> Vec<i32> {
        let mut result = Vec::new();
        for item in &self.items {
            let rd = item.ref_distance();
            if rd > 0 && !result.contains(&rd) {
                result.push(rd);
            }
        }
        result
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn ref_name(&self) -> &str {
        &self.ref_name
    }

    pub(crate) fn set_ref_name(&mut self, name: &str) {
        self.ref_name = name.to_string();
    }

    pub fn is_header(&self) -> bool {
        self.header
    }

    pub(crate) fn set_header(&mut self) {
        self.header = true;
    }

    pub fn is_saved(&self) -> bool {
        self.saved
    }

    pub(crate) fn set_saved(&mut self) {
        self.saved = true;
    }

    pub fn seq(&self) -> i32 {
        self.seq
    }

    pub(crate) fn set_seq(&mut self, seq: i32) {
        self.seq = seq;
    }

    pub fn cond_level(&self) -> i32 {
        self.cond_level
    }

    pub(crate) fn set_cond_level(&mut self, level: i32) {
        self.cond_level = level;
    }

    pub fn jump(&self) -> i32 {
        self.jump
    }

    pub(crate) fn set_jump(&mut self, jump: i32) {
        self.jump = jump;
    }

    pub fn role(&self) -> LabelRole {
        self.role
    }

    pub(crate) fn set_role(&mut self, role: LabelRole) {
        self.role = role;
    }

    /// Render for stage dumps.
    pub fn describe(&self) -> String {
        let mut s = format!(
            "{} - {} {:?} ({}) [{}]: ",
            self.seq,
            if self.saved { "S" } else { "N" },
            self.role,
            self.cond_level,
            self.jump
        );
        for item in &self.items {
            s.push_str(&item.describe(false, false));
            s.push(' ');
        }
        s
    }
}

impl Default for Sentence {
    fn default() -> Self {
        Sentence::new()
    }
}
