use std::collections::HashMap;

use crate::item::{Item, ItemKind};
use crate::parser::error::ParseError;
use crate::sentence::{LabelRole, Sentence};

/// Second pass: group the classified items into sentences. A verb item
/// finalizes the sentence under construction; two consecutive newlines
/// start a new paragraph; a single newline with an open label context
/// synthesizes a placeholder sentence so every label produces a concrete
/// sentence boundary.
pub(crate) fn assemble(
    items: &[Item],
    file_id: usize,
    errors: &mut Vec<ParseError>,
) -> Vec<Sentence> {
    let mut sentences = Vec::new();
    let mut s = Sentence::new();
    let mut count: i32 = -1;
    let mut scount: i32 = 1;
    let mut is_header = true;
    let mut role = LabelRole::None;
    let mut old_level = 0;
    let mut old_role = LabelRole::None;
    // Explicit sentence names, program-wide, mapped to their 1-based slot.
    let mut snames: HashMap<String, i32> = HashMap::new();

    for (i, item) in items.iter().enumerate() {
        match item.kind() {
            ItemKind::ConditionLabel => {
                role = if is_end_label(item.name()) {
                    LabelRole::Closes
                } else {
                    LabelRole::Opens
                };
                old_level = item.cond_level();
                old_role = role;
                s.add_item(item.clone());
            }
            ItemKind::ParagraphLabel => {
                if !s.name().is_empty() {
                    errors.push(ParseError::warning(
                        "more than one paragraph name found - new names will be ignored",
                        item.span().clone(),
                        file_id,
                    ));
                } else {
                    s.set_name(item.name());
                }
                old_level = 0;
                old_role = LabelRole::None;
            }
            ItemKind::Verb => {
                count += 1;
                s.add_item(item.clone());
                s.set_seq(count);
                s.set_role(role);
                // A closing label hands the sentence the level it closes into.
                s.set_cond_level(if old_role == LabelRole::Closes {
                    old_level - 1
                } else {
                    old_level
                });
                if let Some(name) = item.declared_name() {
                    if snames.contains_key(name) {
                        errors.push(ParseError::error(
                            format!(
                                "you must not use the same sentence name ({}) more than once in a program",
                                name
                            ),
                            item.span().clone(),
                            file_id,
                        ));
                    } else {
                        snames.insert(name.to_string(), scount);
                        s.set_ref_name(name);
                    }
                }
                if is_header {
                    s.set_header();
                }
                s.set_params();
                sentences.push(std::mem::take(&mut s));
                scount += 1;
                role = change_role(role, old_level);
            }
            ItemKind::Newline => {
                if i > 0 {
                    if role == LabelRole::Opens || role == LabelRole::Closes {
                        count += 1;
                        let verb = if role == LabelRole::Opens { "cond." } else { "nop." };
                        s.add_item(Item::placeholder(verb));
                        s.set_seq(count);
                        s.set_role(role);
                        s.set_cond_level(old_level);
                        s.set_params();
                        sentences.push(std::mem::take(&mut s));
                        scount += 1;
                        role = change_role(role, old_level);
                    }
                    if items[i - 1].kind() == ItemKind::Newline {
                        s = Sentence::new();
                        scount += 1;
                        count = -1;
                        is_header = false;
                    }
                }
            }
            ItemKind::Reference => {
                let mut item = item.clone();
                if item.name() == "ref" {
                    if let Some(sref) = item.sentence_ref().map(|r| r.to_string()) {
                        match snames.get(&sref) {
                            Some(&slot) => {
                                let dist = scount - slot;
                                if dist <= 0 {
                                    errors.push(ParseError::error(
                                        format!(
                                            "invalid ref distance found for sentence reference {}",
                                            sref
                                        ),
                                        item.span().clone(),
                                        file_id,
                                    ));
                                } else {
                                    // The stored distance counts like a that-pattern's
                                    // a-count, one less than the sentence distance.
                                    item.set_ref_distance(dist - 1);
                                    if dist == 1 {
                                        errors.push(ParseError::error(
                                            format!(
                                                "you must not replace 'this' by a named sentence reference - {}",
                                                sref
                                            ),
                                            item.span().clone(),
                                            file_id,
                                        ));
                                    }
                                }
                            }
                            None => {
                                errors.push(ParseError::error(
                                    format!("sentence reference {} not found", sref),
                                    item.span().clone(),
                                    file_id,
                                ));
                            }
                        }
                    }
                }
                s.add_item(item);
            }
            ItemKind::Plain | ItemKind::Group => s.add_item(item.clone()),
        }
    }
    sentences
}

fn is_end_label(name: &str) -> bool {
    name == "end" || name.starts_with("end.")
}

/// Advance the pending label role once a sentence consumed it.
fn change_role(role: LabelRole, cond_level: i32) -> LabelRole {
    match role {
        LabelRole::Opens => LabelRole::Continues,
        LabelRole::Closes => {
            if cond_level <= 1 {
                LabelRole::None
            } else {
                LabelRole::Continues
            }
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer;
    use crate::parser::items::classify_tokens;

    fn assemble_source(source: &str) -> (Vec<Sentence>, Vec<ParseError>) {
        let tokens = lexer::tokenize(source);
        let mut errors = Vec::new();
        let items = classify_tokens(&tokens, true, 0, &mut errors);
        let sentences = assemble(&items, 0, &mut errors);
        (sentences, errors)
    }

    #[test]
    fn sequence_restarts_per_paragraph() {
        let (sentences, errors) = assemble_source("1 output.\n2 output.\n\np: 3 output.");
        assert!(errors.is_empty());
        let seqs: Vec<i32> = sentences.iter().map(|s| s.seq()).collect();
        assert_eq!(seqs, [0, 1, 0]);
        assert_eq!(sentences[2].name(), "p");
    }

    #[test]
    fn label_followed_by_newline_synthesizes_placeholder() {
        let (sentences, errors) = assemble_source("x) |this| 0 >\nid.\nend)\n");
        assert!(errors.is_empty());
        assert_eq!(sentences.len(), 3);
        assert_eq!(sentences[0].verb().name(), "cond");
        assert_eq!(sentences[0].role(), LabelRole::Opens);
        assert_eq!(sentences[0].cond_level(), 1);
        assert_eq!(sentences[1].role(), LabelRole::Continues);
        assert_eq!(sentences[2].verb().name(), "nop");
        assert_eq!(sentences[2].role(), LabelRole::Closes);
    }

    #[test]
    fn header_flag_set_until_first_paragraph_break() {
        let (sentences, _) = assemble_source("1 output.\n\np: 2 output.");
        assert!(sentences[0].is_header());
        assert!(!sentences[1].is_header());
    }

    #[test]
    fn named_sentence_reference_resolves_distance() {
        let (sentences, errors) =
            assemble_source("1 id->mark.\n2 id.\nref~mark output.");
        assert!(errors.is_empty(), "{:?}", errors);
        assert_eq!(sentences[0].ref_name(), "mark");
        let r = &sentences[2].do_params[0];
        // Two slots back, stored one less, like a that-pattern a-count.
        assert_eq!(r.ref_distance(), 1);
    }

    #[test]
    fn adjacent_named_reference_is_fatal() {
        let (_, errors) = assemble_source("1 id->mark.\nref~mark output.");
        assert!(errors.iter().any(|e| e.is_fatal()));
    }

    #[test]
    fn unknown_named_reference_is_fatal() {
        let (_, errors) = assemble_source("1 id.\nref~ghost output.");
        assert!(errors.iter().any(|e| e.is_fatal()));
    }

    #[test]
    fn duplicate_sentence_name_is_fatal() {
        let (_, errors) = assemble_source("1 id->mark.\n2 id->mark.\n");
        assert!(errors.iter().any(|e| e.is_fatal()));
    }

    #[test]
    fn second_paragraph_label_is_warned_and_ignored() {
        let (sentences, errors) = assemble_source("\n\na: b: 1 output.");
        assert!(errors.iter().any(|e| !e.is_fatal()));
        assert!(!errors.iter().any(|e| e.is_fatal()));
        assert_eq!(sentences.last().map(|s| s.name()), Some("a"));
    }
}
