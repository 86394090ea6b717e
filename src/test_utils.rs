//! Shared proptest strategies for unit tests.

use proptest::prelude::*;
use serde_json::{json, Value};

use crate::schema::JOIN_INTERESTS;
use crate::validator::FieldMap;

/// Printable text without markup, up to `max_len` characters.
pub fn arb_plain_text(max_len: usize) -> impl Strategy<Value = String> {
    prop::string::string_regex(&format!("[a-zA-Z0-9 .,'@-]{{0,{max_len}}}"))
        .expect("valid strategy regex")
}

const HOSTILE_FRAGMENTS: [&str; 19] = [
    "<", ">", "<b>", "</script>", "on", "click=", "javascript", "JAVA", "script:", ":", "=",
    " ", "\u{0000}", "\n", "\u{202E}", "\u{2067}", "\u{0301}", "\u{FF1C}", "ﬁ",
];

/// Text mixing markup fragments, handlers, script URIs, controls and bidi marks.
pub fn arb_hostile_text() -> impl Strategy<Value = String> {
    let fragment = prop_oneof![
        prop::sample::select(HOSTILE_FRAGMENTS.to_vec()).prop_map(str::to_string),
        "[a-z]{1,3}",
    ];
    prop::collection::vec(fragment, 0..24).prop_map(|parts| parts.concat())
}

fn arb_field_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        Just(json!("")),
        arb_plain_text(20).prop_map(Value::String),
        Just(json!("a@b.co")),
        Just(json!("2024-01-31")),
        Just(json!("09:30")),
        prop::sample::select(JOIN_INTERESTS.to_vec()).prop_map(|s| json!(s)),
        prop::collection::vec(arb_plain_text(8), 0..4).prop_map(|v| json!(v)),
        any::<i64>().prop_map(|n| json!(n)),
    ]
}

/// Field maps over the join form's names plus a few undeclared ones.
pub fn arb_field_map() -> impl Strategy<Value = FieldMap> {
    let name = prop::sample::select(vec![
        "Name",
        "Email",
        "Phone",
        "What are you interested in?",
        "Preferred Date",
        "Preferred Time",
        "Services",
        "Comments",
        "Password",
        "website",
    ]);
    prop::collection::btree_map(name, arb_field_value(), 0..9).prop_map(|m| {
        m.into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect::<FieldMap>()
    })
}
