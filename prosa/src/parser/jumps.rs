use crate::sentence::{LabelRole, Sentence};

/// Number of sentences to advance when the construct encoded by sentence
/// `index` takes its alternate branch. Always at least 1. A scan that
/// cannot find its boundary reports a message and falls back to 1;
/// execution then proceeds degraded.
pub(crate) fn resolve_jump(index: usize, v: &[Sentence], errs: &mut Vec<String>) -> i32 {
    match v[index].role() {
        LabelRole::None => 1,
        LabelRole::Opens => jump_from_opening(index, v, errs),
        LabelRole::Continues => jump_from_inside(index, v, errs),
        LabelRole::Closes => jump_from_closing(index, v, errs),
    }
}

/// An opening label jumps to the sentence that closes its branch: the
/// final end label (level 1) or the next opening/closing label at the
/// current level. Scanning across a strictly shallower level lowers the
/// level being matched.
fn jump_from_opening(index: usize, v: &[Sentence], errs: &mut Vec<String>) -> i32 {
    let mut jump = 1;
    let mut found = false;
    let mut curr_level = v[index].cond_level();
    let curr_seq = v[index].seq();

    for (i, succ) in v.iter().enumerate().skip(index + 1) {
        if succ.seq() < curr_seq {
            break;
        }
        let level = succ.cond_level();
        match succ.role() {
            LabelRole::None => {
                errs.push(format!(
                    "malformed conditional sequence found for sentence {}. Maybe end) label missing",
                    index
                ));
                break;
            }
            LabelRole::Closes if level == 1 => {
                jump = (i - index) as i32;
                found = true;
                break;
            }
            LabelRole::Opens | LabelRole::Closes if curr_level == level => {
                jump = (i - index) as i32;
                found = true;
                break;
            }
            _ => {
                if level < curr_level {
                    curr_level = level;
                }
            }
        }
    }

    if !found {
        errs.push(format!(
            "condition jump end not found for sentence {}. Maybe end) label missing",
            index
        ));
    }
    jump
}

/// A non-label sentence inside an open construct jumps past the rest of
/// its branch: to a deeper not-yet-missed opening label, a sibling
/// continuation, or the closing label of its level.
fn jump_from_inside(index: usize, v: &[Sentence], errs: &mut Vec<String>) -> i32 {
    let mut jump = 1;
    let mut found = false;
    let mut missed = false;
    let mut curr_level = v[index].cond_level();
    let curr_seq = v[index].seq();

    for (i, succ) in v.iter().enumerate().skip(index + 1) {
        if succ.seq() < curr_seq {
            break;
        }
        let level = succ.cond_level();
        match succ.role() {
            LabelRole::None => {
                errs.push(format!(
                    "malformed conditional sequence found for sentence {}. Maybe end) label missing",
                    index
                ));
                break;
            }
            LabelRole::Closes if level == 1 => {
                jump = (i - index) as i32;
                found = true;
                break;
            }
            LabelRole::Opens if curr_level == level => {
                missed = true;
            }
            LabelRole::Opens if curr_level < level && !missed => {
                jump = (i - index) as i32;
                found = true;
                break;
            }
            LabelRole::Continues if curr_level == level && !missed => {
                jump = (i - index) as i32;
                found = true;
                break;
            }
            LabelRole::Closes if curr_level == level => {
                jump = (i - index) as i32;
                found = true;
                break;
            }
            _ => {
                if level < curr_level {
                    curr_level = level;
                    missed = true;
                }
            }
        }
    }

    if !found {
        errs.push(format!(
            "condition jump end not found for sentence {}. Maybe end) label missing",
            index
        ));
    }
    jump
}

/// A closing label at an effective level above zero jumps to the next
/// boundary of the level it closes into; intervening same-level closings
/// use up the branch.
fn jump_from_closing(index: usize, v: &[Sentence], errs: &mut Vec<String>) -> i32 {
    let mut jump = 1;
    let mut found = false;
    let mut missed = false;
    let mut curr_level = v[index].cond_level() - 1;
    let curr_seq = v[index].seq();
    if curr_level == 0 {
        return jump;
    }
    let mut is_next = true;

    for (i, succ) in v.iter().enumerate().skip(index + 1) {
        if succ.seq() < curr_seq {
            break;
        }
        let level = succ.cond_level();
        match succ.role() {
            LabelRole::None => {
                if curr_level == 0 {
                    jump = (i - index) as i32;
                    found = true;
                } else {
                    errs.push(format!(
                        "malformed conditional sequence found for sentence {}. Maybe end) label missing",
                        index
                    ));
                }
                break;
            }
            LabelRole::Continues if curr_level == level && !missed && is_next => {
                jump = (i - index) as i32;
                found = true;
                break;
            }
            LabelRole::Closes if curr_level == level => {
                jump = (i - index) as i32;
                found = true;
                break;
            }
            _ => {
                if level < curr_level {
                    curr_level = level;
                    missed = true;
                }
            }
        }
        is_next = false;
    }

    if !found {
        errs.push(format!(
            "condition jump end not found for sentence {}. Maybe end) label missing",
            index
        ));
    }
    jump
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a sentence list straight from (role, level, seq) tuples, the
    /// way the resolver sees them.
    fn sentences(rows: &[(LabelRole, i32, i32)]) -> Vec<Sentence> {
        rows.iter()
            .map(|&(role, level, seq)| {
                let mut s = Sentence::new();
                s.add_item(crate::item::Item::placeholder("nop."));
                s.set_role(role);
                s.set_cond_level(level);
                s.set_seq(seq);
                s
            })
            .collect()
    }

    fn jumps(rows: &[(LabelRole, i32, i32)]) -> Vec<i32> {
        let v = sentences(rows);
        (0..v.len())
            .map(|i| resolve_jump(i, &v, &mut Vec::new()))
            .collect()
    }

    #[test]
    fn plain_sentences_advance_by_one() {
        let j = jumps(&[(LabelRole::None, 0, 0), (LabelRole::None, 0, 1)]);
        assert_eq!(j, [1, 1]);
    }

    #[test]
    fn opening_label_jumps_to_final_end() {
        // x) cond / body / end) nop
        let j = jumps(&[
            (LabelRole::Opens, 1, 0),
            (LabelRole::Continues, 1, 1),
            (LabelRole::Closes, 1, 2),
        ]);
        assert_eq!(j[0], 2);
    }

    #[test]
    fn opening_label_jumps_to_sibling_at_same_level() {
        // if / body / elseif / body / end
        let j = jumps(&[
            (LabelRole::Opens, 1, 0),
            (LabelRole::Continues, 1, 1),
            (LabelRole::Opens, 1, 2),
            (LabelRole::Continues, 1, 3),
            (LabelRole::Closes, 1, 4),
        ]);
        assert_eq!(j[0], 2);
        assert_eq!(j[2], 2);
    }

    #[test]
    fn inside_sentence_jumps_past_rest_of_branch() {
        let j = jumps(&[
            (LabelRole::Opens, 1, 0),
            (LabelRole::Continues, 1, 1),
            (LabelRole::Continues, 1, 2),
            (LabelRole::Closes, 1, 3),
        ]);
        // First body sentence skips to its sibling continuation.
        assert_eq!(j[1], 1);
        assert_eq!(j[2], 1);
    }

    #[test]
    fn nested_opening_tracks_shallower_levels() {
        // a) / body / b.1) / body / end.1) / end)
        let j = jumps(&[
            (LabelRole::Opens, 1, 0),
            (LabelRole::Continues, 1, 1),
            (LabelRole::Opens, 2, 2),
            (LabelRole::Continues, 2, 3),
            (LabelRole::Closes, 2, 4),
            (LabelRole::Closes, 1, 5),
        ]);
        // The outer opening finds the final level-1 end.
        assert_eq!(j[0], 5);
        // The inner opening jumps to the close of its own level.
        assert_eq!(j[2], 2);
    }

    #[test]
    fn inside_sentence_skips_remaining_sibling_branches() {
        // a) / x. / b) / y. / end): after x. runs, control lands on end).
        let j = jumps(&[
            (LabelRole::Opens, 1, 0),
            (LabelRole::Continues, 1, 1),
            (LabelRole::Opens, 1, 2),
            (LabelRole::Continues, 1, 3),
            (LabelRole::Closes, 1, 4),
        ]);
        assert_eq!(j[1], 3);
    }

    #[test]
    fn scan_leaving_the_paragraph_reports_and_defaults() {
        let v = sentences(&[(LabelRole::Opens, 1, 0)]);
        let mut errs = Vec::new();
        // No boundary exists: fall back to 1 and report.
        let j = resolve_jump(0, &v, &mut errs);
        assert_eq!(j, 1);
        assert_eq!(errs.len(), 1);
    }

    #[test]
    fn jump_is_always_at_least_one() {
        let j = jumps(&[
            (LabelRole::Opens, 1, 0),
            (LabelRole::Continues, 1, 1),
            (LabelRole::Opens, 1, 2),
            (LabelRole::Continues, 1, 3),
            (LabelRole::Closes, 1, 4),
            (LabelRole::None, 0, 5),
        ]);
        assert!(j.iter().all(|&x| x >= 1));
    }
}
