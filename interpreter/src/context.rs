use std::collections::HashMap;

/// Cursor offset signalling termination of the current construct.
pub const TERMINATE: i32 = -1000;

/// Stop levels. The numeric values encode the decay state machine and
/// are reproduced as-is: 1 stops the innermost loop, 3 stops the current
/// paragraph (decaying to 2, suppressing the enclosing paragraph, then
/// clearing), 9 stops the program and never decays.
pub const STOP_LOOP: i32 = 1;
pub const STOP_PARAGRAPH: i32 = 3;
pub const STOP_PROGRAM: i32 = 9;

/// What kind of construct is being left when a stop level decays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopScope {
    Loop,
    Paragraph,
}

/// Translate the stop level on leaving a construct.
pub fn decay(stop: i32, scope: StopScope) -> i32 {
    match scope {
        StopScope::Paragraph => {
            if stop == STOP_PARAGRAPH {
                2
            } else if stop < STOP_PARAGRAPH {
                0
            } else {
                stop
            }
        }
        StopScope::Loop => {
            if stop <= STOP_PARAGRAPH {
                0
            } else {
                stop
            }
        }
    }
}

/// One paragraph activation: the carried `this` list, the four inbound
/// parameter channels, and the sentence-output cache. Owned exclusively
/// by the activation and released when the paragraph returns.
#[derive(Debug, Default)]
pub struct Activation {
    /// Output carried from sentence to sentence; the callee's initial
    /// value is the caller's running list.
    pub this_list: Vec<String>,
    pub do_list: Vec<String>,
    pub for_list: Vec<String>,
    pub use_list: Vec<String>,
    pub with_list: Vec<String>,
    /// Cached outputs of saved sentences, keyed by sequence number.
    pub cache: HashMap<i32, Vec<String>>,
    pub stack_level: usize,
}

impl Activation {
    pub fn new(
        this_list: Vec<String>,
        do_list: Vec<String>,
        for_list: Vec<String>,
        use_list: Vec<String>,
        with_list: Vec<String>,
        stack_level: usize,
    ) -> Activation {
        Activation {
            this_list,
            do_list,
            for_list,
            use_list,
            with_list,
            cache: HashMap::new(),
            stack_level,
        }
    }

    /// The program entry activation: `this` seeded from the program
    /// arguments, all channels empty.
    pub fn entry(args: Vec<String>) -> Activation {
        Activation {
            this_list: args,
            ..Activation::default()
        }
    }

    /// Bounded-memory escape valve: drop the sentence cache and the four
    /// inbound accumulator lists for the rest of this activation.
    pub fn forget(&mut self) {
        self.cache.clear();
        self.do_list.clear();
        self.do_list.shrink_to_fit();
        self.for_list.clear();
        self.for_list.shrink_to_fit();
        self.use_list.clear();
        self.use_list.shrink_to_fit();
        self.with_list.clear();
        self.with_list.shrink_to_fit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paragraph_decay_table() {
        assert_eq!(decay(0, StopScope::Paragraph), 0);
        assert_eq!(decay(STOP_LOOP, StopScope::Paragraph), 0);
        assert_eq!(decay(2, StopScope::Paragraph), 0);
        assert_eq!(decay(STOP_PARAGRAPH, StopScope::Paragraph), 2);
        assert_eq!(decay(STOP_PROGRAM, StopScope::Paragraph), STOP_PROGRAM);
    }

    #[test]
    fn loop_decay_table() {
        assert_eq!(decay(0, StopScope::Loop), 0);
        assert_eq!(decay(STOP_LOOP, StopScope::Loop), 0);
        assert_eq!(decay(2, StopScope::Loop), 0);
        assert_eq!(decay(STOP_PARAGRAPH, StopScope::Loop), 0);
        assert_eq!(decay(STOP_PROGRAM, StopScope::Loop), STOP_PROGRAM);
    }

    #[test]
    fn forget_clears_cache_and_channels() {
        let mut act = Activation::new(
            vec!["t".into()],
            vec!["d".into()],
            vec!["f".into()],
            vec!["u".into()],
            vec!["w".into()],
            0,
        );
        act.cache.insert(0, vec!["x".into()]);
        act.forget();
        assert!(act.cache.is_empty());
        assert!(act.do_list.is_empty());
        assert!(act.for_list.is_empty());
        assert!(act.use_list.is_empty());
        assert!(act.with_list.is_empty());
        // The carried list survives.
        assert_eq!(act.this_list, ["t"]);
    }
}
