use std::collections::HashSet;
use std::ops::Range;

use crate::item::VerbKind;
use crate::paragraph::Paragraph;
use crate::parser::error::ParseError;
use crate::parser::jumps;
use crate::sentence::Sentence;

/// Third pass: attach jump offsets, group sentences into paragraphs
/// (sequence 0 starts a new one), mark saved results, and validate the
/// paragraph graph.
pub(crate) fn group_paragraphs(
    mut sentences: Vec<Sentence>,
    file_id: usize,
    errors: &mut Vec<ParseError>,
) -> Vec<Paragraph> {
    // Jump offsets are a pure function of (role, level, sequence).
    let mut computed = Vec::with_capacity(sentences.len());
    for i in 0..sentences.len() {
        let mut messages = Vec::new();
        let jump = jumps::resolve_jump(i, &sentences, &mut messages);
        let span = sentences[i].verb().span().clone();
        for msg in messages {
            errors.push(ParseError::warning(msg, span.clone(), file_id));
        }
        computed.push(jump);
    }
    for (s, jump) in sentences.iter_mut().zip(computed) {
        s.set_jump(jump);
    }

    let mut paragraphs = Vec::new();
    let mut current = Paragraph::new();
    // Absolute sequence numbers referenced backwards within the paragraph.
    let mut abs_dists: Vec<(i32, Range<usize>)> = Vec::new();

    for mut s in sentences {
        if s.seq() == 0 && !current.is_empty() {
            flush(&mut current, &mut abs_dists, file_id, errors, &mut paragraphs);
        }
        if !s.ref_name().is_empty() {
            s.set_saved();
        }
        let span = s.verb().span().clone();
        for rd in s.that_refs() {
            abs_dists.push((s.seq() - 1 - rd, span.clone()));
        }
        current.add_sentence(s);
    }
    if !current.is_empty() {
        flush(&mut current, &mut abs_dists, file_id, errors, &mut paragraphs);
    }

    check_paragraphs(&paragraphs, file_id, errors);
    paragraphs
}

fn flush(
    current: &mut Paragraph,
    abs_dists: &mut Vec<(i32, Range<usize>)>,
    file_id: usize,
    errors: &mut Vec<ParseError>,
    paragraphs: &mut Vec<Paragraph>,
) {
    for (seq, span) in abs_dists.drain(..) {
        if seq >= 0 {
            current.set_saved(seq);
        } else {
            errors.push(ParseError::error(
                "wrong ref distance found - check program",
                span,
                file_id,
            ));
        }
    }
    paragraphs.push(std::mem::take(current));
}

/// All referenced paragraphs must exist, every paragraph except the
/// leading one must be named, and no name may be defined twice.
fn check_paragraphs(paragraphs: &[Paragraph], file_id: usize, errors: &mut Vec<ParseError>) {
    let mut names: HashSet<&str> = HashSet::new();
    for (i, p) in paragraphs.iter().enumerate() {
        let name = p.name();
        let span = p
            .sentences()
            .first()
            .map(|s| s.verb().span().clone())
            .unwrap_or(0..0);
        if name.is_empty() {
            if i > 0 {
                errors.push(ParseError::error("paragraph is unnamed", span, file_id));
            }
        } else if !names.insert(name) {
            errors.push(ParseError::error(
                format!("paragraph name {} is defined more than once", name),
                span,
                file_id,
            ));
        }
    }

    let mut reported: HashSet<String> = HashSet::new();
    for p in paragraphs {
        for s in p.sentences() {
            let verb = s.verb();
            if verb.verb_kind() == Some(VerbKind::ParagraphCall)
                && !names.contains(verb.name())
                && reported.insert(verb.name().to_string())
            {
                errors.push(ParseError::error(
                    format!("referenced paragraph {} does not exist", verb.name()),
                    verb.span().clone(),
                    file_id,
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer;
    use crate::parser::{items, sentences};

    fn parse(source: &str) -> (Vec<Paragraph>, Vec<ParseError>) {
        let tokens = lexer::tokenize(source);
        let mut errors = Vec::new();
        let classified = items::classify_tokens(&tokens, true, 0, &mut errors);
        let assembled = sentences::assemble(&classified, 0, &mut errors);
        let paragraphs = group_paragraphs(assembled, 0, &mut errors);
        (paragraphs, errors)
    }

    #[test]
    fn paragraphs_split_at_sequence_zero() {
        let (paragraphs, errors) = parse("p.\n\np: 1 output.\n2 output.");
        assert!(!errors.iter().any(|e| e.is_fatal()), "{:?}", errors);
        assert_eq!(paragraphs.len(), 2);
        assert!(paragraphs[0].is_header());
        assert_eq!(paragraphs[1].name(), "p");
        assert_eq!(paragraphs[1].len(), 2);
    }

    #[test]
    fn missing_call_target_is_fatal() {
        let (_, errors) = parse("ghost.\n");
        assert!(errors.iter().any(|e| e.is_fatal()));
    }

    #[test]
    fn duplicate_paragraph_name_is_fatal() {
        let (_, errors) = parse("p.\n\np: 1 output.\n\np: 2 output.");
        assert!(errors.iter().any(|e| e.is_fatal()));
    }

    #[test]
    fn unnamed_trailing_paragraph_is_fatal() {
        let (_, errors) = parse("1 output.\n\n2 output.\n");
        assert!(errors.iter().any(|e| e.is_fatal()));
    }

    #[test]
    fn that_reference_marks_earlier_sentence_saved() {
        let (paragraphs, errors) = parse("1 2 id.\n3 id.\nthat output.");
        assert!(!errors.iter().any(|e| e.is_fatal()), "{:?}", errors);
        let p = &paragraphs[0];
        assert!(p.sentence(0).unwrap().is_saved());
        assert!(!p.sentence(1).unwrap().is_saved());
    }

    #[test]
    fn that_reference_past_paragraph_start_is_fatal() {
        let (_, errors) = parse("thaaaat output.\n");
        assert!(errors.iter().any(|e| e.is_fatal()));
    }

    #[test]
    fn opening_label_jump_reaches_closing_label() {
        // cond placeholder / body verb / nop placeholder: jump of 2.
        let (paragraphs, errors) = parse("x) 1 0 >\n1 id.\nend)\n");
        assert!(!errors.iter().any(|e| e.is_fatal()), "{:?}", errors);
        let p = &paragraphs[0];
        assert_eq!(p.sentence(0).unwrap().jump(), 2);
    }

    #[test]
    fn jump_scan_failure_is_soft() {
        let (paragraphs, errors) = parse("x) 1 0 >\n1 id.\n");
        // Missing end label: reported, but not fatal, and jump stays 1.
        assert!(errors.iter().any(|e| !e.is_fatal()));
        assert!(!errors.iter().any(|e| e.is_fatal()));
        assert_eq!(paragraphs[0].sentence(0).unwrap().jump(), 1);
    }
}
