//! Tests for comment stripping and parsing.

use super::*;
use rstest::rstest;
use serde_json::json;

#[rstest]
fn strips_inline_block_and_line_comments() {
    let parsed = parse("{\"a\": 1 /* x */, \"b\": 2 // y\n}").expect("valid json");

    assert_eq!(parsed, json!({"a": 1, "b": 2}));
}

#[rstest]
fn strips_multi_line_block_comments() {
    let input = "{\n  /*\n   * node attributes\n   */\n  \"run_list\": []\n}";

    let parsed = parse(input).expect("valid json");

    assert_eq!(parsed, json!({"run_list": []}));
    assert_eq!(
        strip_comments(input).lines().count(),
        input.lines().count(),
        "line structure should be preserved"
    );
}

#[rstest]
#[case("{\"url\": \"http://example.org\"}", "http://example.org")]
#[case("{\"url\": \"a /* b */ c\"}", "a /* b */ c")]
#[case("{\"url\": \"quote \\\" // still string\"}", "quote \" // still string")]
fn comment_markers_inside_strings_are_kept(#[case] input: &str, #[case] expected: &str) {
    let parsed = parse(input).expect("valid json");

    assert_eq!(parsed["url"], json!(expected));
}

#[rstest]
fn line_comment_at_end_of_input_is_removed() {
    assert_eq!(strip_comments("[1, 2] // trailing"), "[1, 2] ");
}

#[rstest]
fn malformed_json_reports_error() {
    assert!(parse("{\"a\": /* missing */ }").is_err());
}
