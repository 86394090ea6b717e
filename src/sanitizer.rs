//! Recursive content sanitizer for submitted form values.
//!
//! This is defense in depth, not an HTML parser. Anything that renders
//! submitted text must still escape it independently.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use unicode_normalization::UnicodeNormalization;

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("invalid tag pattern"));

static EVENT_HANDLER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)on\w+\s*=").expect("invalid handler pattern"));

/// Full cleaning passes before [`defuse`] takes over.
const MAX_PASSES: usize = 8;

static SCRIPT_URI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)javascript\s*:").expect("invalid script uri pattern"));

/// Sanitizes an untrusted JSON value.
///
/// - Strings are cleaned with [`sanitize_str`]
/// - Arrays keep their order and length
/// - Objects keep every key; only values are sanitized
/// - Numbers, booleans and `null` pass through unchanged
///
/// # Examples
///
/// ```
/// use form_intake::sanitize;
/// use serde_json::json;
///
/// let raw = json!({
///     "Comments": "<script>alert(1)</script>",
///     "Services": [" <b>IT</b> ", "Cloud"],
///     "count": 3,
/// });
///
/// assert_eq!(
///     sanitize(&raw),
///     json!({"Comments": "alert(1)", "Services": ["IT", "Cloud"], "count": 3})
/// );
/// ```
pub fn sanitize(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(sanitize_str(s)),
        Value::Array(items) => Value::Array(items.iter().map(sanitize).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), sanitize(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Sanitizes a single string.
///
/// Applies, in order: NFKC normalization, control characters to a space,
/// removal of bidirectional overrides, removal of `<...>` tags, removal of
/// `on<word>=` attributes, removal of `javascript:` URIs, and trimming.
///
/// A strip can reassemble a pattern (`javas<b>cript:`), so the pass repeats
/// until the output stops changing. Input still changing after eight passes
/// loses every `<`, `=` and `:`, which none of the patterns can match
/// without. Work stays linear in the input length and the result is a fixed
/// point: `sanitize_str(&sanitize_str(s)) == sanitize_str(s)`.
///
/// ```
/// use form_intake::sanitizer::sanitize_str;
///
/// assert_eq!(sanitize_str("  <img src=x onerror=alert(1)>hi  "), "hi");
/// assert_eq!(sanitize_str("a\u{0000}b"), "a b");
/// assert_eq!(sanitize_str("JavaScript:void(0)"), "void(0)");
/// assert_eq!(sanitize_str("ﬁle"), "file");
/// ```
pub fn sanitize_str(input: &str) -> String {
    settle(input).0
}

/// Cleans to a fixed point; also returns the number of passes taken.
fn settle(input: &str) -> (String, usize) {
    let mut current = clean_once(input);
    let mut passes = 1;
    loop {
        // Past the cap, only NFKC recomposition and trimming can still
        // change the defused string, and both settle within two passes.
        if passes >= MAX_PASSES {
            current = defuse(&current);
        }
        let next = clean_once(&current);
        passes += 1;
        if next == current {
            return (current, passes);
        }
        current = next;
    }
}

/// Drops the characters every stripped pattern is anchored on.
fn defuse(input: &str) -> String {
    input.chars().filter(|c| !matches!(c, '<' | '=' | ':')).collect()
}

fn clean_once(input: &str) -> String {
    let normalized: String = input
        .nfkc()
        .map(|c| if is_control_char(c) { ' ' } else { c })
        .filter(|c| !is_bidi_control(*c))
        .collect();

    let without_tags = HTML_TAG.replace_all(&normalized, "");
    let without_handlers = EVENT_HANDLER.replace_all(&without_tags, "");
    let without_scripts = SCRIPT_URI.replace_all(&without_handlers, "");

    without_scripts.trim().to_string()
}

/// U+0000..=U+001F and U+007F.
fn is_control_char(c: char) -> bool {
    c <= '\u{001F}' || c == '\u{007F}'
}

/// Directional marks, embeddings, overrides and isolates.
fn is_bidi_control(c: char) -> bool {
    matches!(
        c,
        '\u{200E}' | '\u{200F}' | '\u{202A}'..='\u{202E}' | '\u{2066}'..='\u{2069}'
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_script_tags() {
        let out = sanitize_str("<script>alert(1)</script>");

        assert_eq!(out, "alert(1)");
        assert!(!out.contains('<'));
        assert!(!out.contains('>'));
    }

    #[test]
    fn trims_whitespace() {
        assert_eq!(sanitize_str("  hello world  "), "hello world");
    }

    #[test]
    fn replaces_control_chars_with_space() {
        assert_eq!(sanitize_str("line1\nline2"), "line1 line2");
        assert_eq!(sanitize_str("tab\there"), "tab here");
        assert_eq!(sanitize_str("nul\0byte"), "nul byte");
        assert_eq!(sanitize_str("del\u{7F}x"), "del x");
    }

    #[test]
    fn each_control_char_becomes_one_space() {
        assert_eq!(sanitize_str("a\r\nb"), "a  b");
    }

    #[test]
    fn strips_bidi_overrides() {
        assert_eq!(sanitize_str("abc\u{202E}fed"), "abcfed");
        assert_eq!(sanitize_str("\u{200E}x\u{200F}"), "x");
        assert_eq!(sanitize_str("\u{2066}iso\u{2069}"), "iso");
    }

    #[test]
    fn normalizes_compatibility_forms() {
        assert_eq!(sanitize_str("ＡＢＣ"), "ABC");
        assert_eq!(sanitize_str("e\u{0301}"), "\u{00E9}");
    }

    #[test]
    fn fullwidth_brackets_are_normalized_then_stripped() {
        assert_eq!(sanitize_str("\u{FF1C}b\u{FF1E}bold"), "bold");
    }

    #[test]
    fn strips_event_handlers_case_insensitively() {
        assert_eq!(sanitize_str("x ONCLICK=steal()"), "x steal()");
        assert_eq!(sanitize_str("onload = go"), "go");
    }

    #[test]
    fn strips_handlers_without_word_boundary() {
        assert_eq!(sanitize_str("_onclick=alert(1)"), "_alert(1)");
        assert_eq!(sanitize_str("x on_load=y"), "x y");
        assert_eq!(sanitize_str("on1x =z"), "z");
    }

    #[test]
    fn nested_script_uris_settle_in_bounded_passes() {
        let mut nested = String::new();
        for _ in 0..2000 {
            nested = format!("javas{nested}cript:");
        }

        let (out, passes) = settle(&nested);

        assert!(passes <= MAX_PASSES + 2, "took {passes} passes");
        assert!(!out.to_ascii_lowercase().contains("javascript:"));
        assert!(!out.contains(':'));
        assert_eq!(sanitize_str(&out), out);
    }

    #[test]
    fn shallow_reassembly_is_stripped_before_the_cap() {
        let (out, passes) = settle("javasjavascript:cript:alert(1)");

        assert_eq!(out, "alert(1)");
        assert!(passes < MAX_PASSES);
    }

    #[test]
    fn keeps_words_starting_with_on_without_equals() {
        assert_eq!(sanitize_str("online ordering"), "online ordering");
    }

    #[test]
    fn strips_javascript_uri_case_insensitively() {
        assert_eq!(sanitize_str("JaVaScRiPt:alert(1)"), "alert(1)");
        assert_eq!(sanitize_str("javascript :x"), "x");
    }

    #[test]
    fn reassembled_patterns_are_removed_on_later_passes() {
        // Removing the script URI reassembles an event handler.
        assert_eq!(sanitize_str("ojavascript:nclick=x"), "x");
    }

    #[test]
    fn plain_text_is_unchanged() {
        let input = "Hello 世界, call me at +1 (555) 010-0000";
        assert_eq!(sanitize_str(input), input);
    }

    #[test]
    fn scalars_pass_through() {
        assert_eq!(sanitize(&json!(42)), json!(42));
        assert_eq!(sanitize(&json!(true)), json!(true));
        assert_eq!(sanitize(&Value::Null), Value::Null);
    }

    #[test]
    fn arrays_preserve_order_and_length() {
        let out = sanitize(&json!(["<i>a</i>", "", " b "]));

        assert_eq!(out, json!(["a", "", "b"]));
    }

    #[test]
    fn objects_preserve_keys() {
        let out = sanitize(&json!({"<k>": "<v>x", "nested": {"deep": ["\u{202E}y"]}}));

        assert_eq!(out, json!({"<k>": "x", "nested": {"deep": ["y"]}}));
    }

    mod proptests {
        use super::*;
        use crate::test_utils::arb_hostile_text;
        use proptest::prelude::*;

        proptest! {
            /// Property: sanitizing twice equals sanitizing once
            #[test]
            fn proptest_sanitize_is_idempotent(input in arb_hostile_text()) {
                let once = sanitize_str(&input);
                let twice = sanitize_str(&once);
                prop_assert_eq!(once, twice);
            }

            /// Property: output never contains a complete tag or a control character
            #[test]
            fn proptest_output_has_no_tags_or_controls(input in arb_hostile_text()) {
                let out = sanitize_str(&input);

                prop_assert!(!HTML_TAG.is_match(&out));
                prop_assert!(!out.chars().any(is_control_char));
                prop_assert!(!out.chars().any(is_bidi_control));
            }

            /// Property: arrays keep their length
            #[test]
            fn proptest_array_length_preserved(items in prop::collection::vec(arb_hostile_text(), 0..20)) {
                let out = sanitize(&json!(items));
                prop_assert_eq!(out.as_array().map(Vec::len), Some(items.len()));
            }
        }
    }
}
