use std::io::Cursor;
use std::path::PathBuf;

use interpreter::{DiagSink, Interpreter, STOP_PROGRAM};

struct Run {
    output: String,
    stop: i32,
    fatal: bool,
}

fn run_in(source: &str, args: &[&str], curr_dir: PathBuf, input: Option<&str>) -> Run {
    let parser = prosa::parser::Parser::new(source, true, 0);
    let (program, _) = parser.parse().expect("parse failed");
    let mut output = Vec::new();
    let stop;
    let fatal;
    {
        let mut interp = Interpreter::new(&program, curr_dir, DiagSink::quiet(), &mut output);
        interp.set_extended(true);
        if let Some(text) = input {
            interp.set_input(Box::new(Cursor::new(text.as_bytes().to_vec())));
        }
        stop = interp.execute(args.iter().map(|s| s.to_string()).collect());
        fatal = interp.had_fatal();
    }
    Run {
        output: String::from_utf8(output).expect("non-utf8 output"),
        stop,
        fatal,
    }
}

fn run_with_args(source: &str, args: &[&str]) -> Run {
    run_in(source, args, std::env::temp_dir(), None)
}

fn run(source: &str) -> Run {
    run_with_args(source, &[])
}

#[test]
fn size_query_on_this_counts_the_argument_list() {
    let r = run_with_args("x: |this| output.", &["hi"]);
    assert_eq!(r.output, "1\n");
    assert!(!r.fatal);
}

#[test]
fn size_query_on_args_counts_program_arguments() {
    let r = run_with_args("x: |args| output.", &["hi"]);
    assert_eq!(r.output, "1\n");
}

#[test]
fn output_joins_values_with_spaces() {
    let r = run("a b c output.");
    assert_eq!(r.output, "a b c\n");
}

#[test]
fn condition_true_enters_the_block() {
    let r = run("x) 1 0 >\nyes output.\nend)\ndone output.");
    assert_eq!(r.output, "yes\ndone\n");
    assert!(!r.fatal);
}

#[test]
fn condition_false_jumps_to_the_closing_label() {
    let r = run("x) 0 1 >\nyes output.\nend)\ndone output.");
    assert_eq!(r.output, "done\n");
    assert!(!r.fatal);
}

#[test]
fn sibling_branch_is_skipped_after_a_taken_branch() {
    let r = run("a) 1 1 ==\none output.\nb) 1 1 ==\ntwo output.\nend)");
    assert_eq!(r.output, "one\n");
}

#[test]
fn typed_condition_evaluates_numerically() {
    // Lexicographically "9" > "10" holds, numerically it does not.
    let r = run("x) 9 10 >\nlex output.\nend)\ndone output.");
    assert_eq!(r.output, "lex\ndone\n");
    let r = run("x) int 9 10 >\nnum output.\nend)\ndone output.");
    assert_eq!(r.output, "done\n");
}

#[test]
fn paragraph_call_returns_accumulated_return_value() {
    let r = run("1 2 sum.\nthis output.\n\nsum: params reverse.\nthis returnValue.");
    assert_eq!(r.output, "2 1\n");
    assert!(!r.fatal);
}

#[test]
fn recursive_countdown() {
    let r = run(
        "3 down.\n\ndown: params output.\np) int params~first 1 >\nparams~first 1 - pexpr-int.\nthis down.\nend)",
    );
    assert_eq!(r.output, "3\n2\n1\n");
    assert!(!r.fatal);
}

#[test]
fn program_stop_halts_everything() {
    let r = run("a output.\nprogram stop.\nb output.");
    assert_eq!(r.output, "a\n");
    assert_eq!(r.stop, STOP_PROGRAM);
    assert!(!r.fatal);
}

#[test]
fn paragraph_stop_suppresses_the_enclosing_paragraph_too() {
    let r = run("go.\nafter output.\n\ngo: one output.\nparagraph stop.\ntwo output.");
    assert_eq!(r.output, "one\n");
    assert_eq!(r.stop, 0);
}

#[test]
fn loop_stop_clears_on_paragraph_exit() {
    let r = run("a output.\nstop.\nb output.");
    assert_eq!(r.output, "a\n");
    assert_eq!(r.stop, 0);
}

#[test]
fn forget_clears_the_sentence_cache() {
    // Without forget, the that-reference reaches two sentences back.
    let r = run("1 2 id.\n3 id.\nthat output.");
    assert_eq!(r.output, "1 2\n");
    assert!(!r.fatal);
    // With forget, the cached result is gone and resolution is fatal.
    let r = run("1 2 id.\n3 id-forget.\nthat output.");
    assert!(r.fatal);
    assert_eq!(r.stop, STOP_PROGRAM);
}

#[test]
fn bulk_evaluation_doubles_the_data_list() {
    let r = run("var1 var1 + out for 1 2 3 plist.\nthis output.");
    assert_eq!(r.output, "2 4 6\n");
}

#[test]
fn sort_descending_is_lexicographic_without_type_modifier() {
    let r = run("3 1 2 sort-desc.\nthis output.");
    assert_eq!(r.output, "3 2 1\n");
}

#[test]
fn sort_int_orders_numerically_ascending() {
    let r = run("3 1 2 sort-int.\nthis output.");
    assert_eq!(r.output, "1 2 3\n");
    let r = run("9 10 sort.\nthis output.");
    assert_eq!(r.output, "10 9\n");
}

#[test]
fn window_modifiers_slice_the_reference() {
    let r = run("a b c id.\nthis~tail output.");
    assert_eq!(r.output, "b c\n");
    let r = run("a b c id.\nthis~last output.");
    assert_eq!(r.output, "c\n");
    let r = run("a b c id.\nthis~head output.");
    assert_eq!(r.output, "a b\n");
}

#[test]
fn named_sentence_reference_reaches_back() {
    let r = run("1 2 id->mark.\n9 id.\nref~mark output.");
    assert_eq!(r.output, "1 2\n");
    assert!(!r.fatal);
}

#[test]
fn between_interleaves_its_for_list() {
    let r = run("a b c for - between.\nthis output.");
    assert_eq!(r.output, "a - b - c\n");
}

#[test]
fn combine_zips_channels_through_markers() {
    let r = run("#u x #w use u1 u2 with w1 w2 join-combine.\nthis output.");
    assert_eq!(r.output, "u1xw1 u2xw2\n");
}

#[test]
fn per_row_synthesizes_do_lists_from_rows() {
    let r = run("row2 | # # + use 1 2 3 4 pexpr-perRow.\nthis output.");
    assert_eq!(r.output, "3 7\n");
    assert!(!r.fatal);
}

#[test]
fn per_row_default_fills_missing_slots() {
    let r = run("row2 def0 | # # + use 1 2 3 pexpr-perRow.\nthis output.");
    assert_eq!(r.output, "3 3\n");
}

#[test]
fn freq_unify_is_standard_in_extended_mode() {
    let r = run("a 1 a 2 b 5 for unify freq.\nthis output.");
    assert_eq!(r.output, "a 3 b 5\n");
}

#[test]
fn print_processes_escapes_without_trailing_newline() {
    let r = run("\"one two\" print.");
    assert_eq!(r.output, "one two");
    let r = run("a\\nb print.");
    assert_eq!(r.output, "a\nb");
}

#[test]
fn echo_mirrors_input_and_output() {
    let r = run("a b id-echo.");
    assert_eq!(r.output, "a b\na b\n");
}

#[test]
fn input_reads_one_token() {
    let r = run_in("say input.\nthis output.", &[], std::env::temp_dir(), Some("hello world\n"));
    assert_eq!(r.output, "say hello\n");
}

#[test]
fn write_then_read_lines_round_trips() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let source = "alpha beta for data.txt writeLines.\ndata.txt readLines.\nthis output.";
    let r = run_in(source, &[], dir.path().to_path_buf(), None);
    assert_eq!(r.output, "alpha beta\n");
    assert!(!r.fatal);
}

#[test]
fn read_lines_sentinels() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    std::fs::write(dir.path().join("in.txt"), "a\n\nb\n").expect("write failed");
    let source = "in.txt for keepEmpty keepEof readLines.\nthis output.";
    let r = run_in(source, &[], dir.path().to_path_buf(), None);
    assert_eq!(r.output, "a <empty> b <eof>\n");
}

#[test]
fn missing_read_file_is_fatal_not_a_crash() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let r = run_in("ghost.txt readLines.\nthis output.", &[], dir.path().to_path_buf(), None);
    assert!(r.fatal);
    assert_eq!(r.stop, STOP_PROGRAM);
}

#[test]
fn file_verb_creates_and_checks_files() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let source = "f.txt for create file.\nf.txt for exists file.\nthis output.";
    let r = run_in(source, &[], dir.path().to_path_buf(), None);
    assert_eq!(r.output, "1\n");
}

#[test]
fn unresolvable_sentence_distance_is_fatal() {
    // forget wipes the cached result the that-reference later needs.
    let r = run("1 id.\n2 id-forget.\n3 id.\nthaat output.");
    assert!(r.fatal);
    assert_eq!(r.stop, STOP_PROGRAM);
}

#[test]
fn get_and_del_select_by_index() {
    let r = run("a b c for 2 get.\nthis output.");
    assert_eq!(r.output, "b\n");
    let r = run("a b c for 2 del.\nthis output.");
    assert_eq!(r.output, "a c\n");
}

#[test]
fn range_generates_sequences() {
    let r = run("1 4 range.\nthis output.");
    assert_eq!(r.output, "1 2 3 4\n");
}
