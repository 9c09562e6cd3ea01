use proptest::prelude::*;
use serde_json::{Value, json};

use boardlens::application::ports::GeneratorError;
use boardlens::infrastructure::llm::{PartialObjectAccumulator, parse_partial};

#[test]
fn given_blank_input_when_parsing_then_none() {
    assert_eq!(parse_partial(""), None);
    assert_eq!(parse_partial("  \n"), None);
}

#[test]
fn given_complete_json_when_parsing_then_value_is_returned_unchanged() {
    assert_eq!(parse_partial(r#"{"a": [1, 2]}"#), Some(json!({"a": [1, 2]})));
}

#[test]
fn given_open_string_when_parsing_then_string_is_closed() {
    assert_eq!(
        parse_partial(r#"{"executiveSummary": "Revenue fell"#),
        Some(json!({"executiveSummary": "Revenue fell"}))
    );
}

#[test]
fn given_open_array_when_parsing_then_containers_are_closed() {
    assert_eq!(parse_partial(r#"{"a": [1, 2"#), Some(json!({"a": [1, 2]})));
}

#[test]
fn given_truncated_literal_when_parsing_then_cut_back_to_previous_member() {
    assert_eq!(parse_partial(r#"{"a": 1, "b": tr"#), Some(json!({"a": 1})));
}

#[test]
fn given_trailing_comma_when_parsing_then_comma_is_dropped() {
    assert_eq!(parse_partial(r#"{"a": 1,"#), Some(json!({"a": 1})));
}

#[test]
fn given_open_key_when_parsing_then_empty_object_is_recovered() {
    assert_eq!(parse_partial(r#"{"key"#), Some(json!({})));
}

#[test]
fn given_key_without_value_in_nested_object_when_parsing_then_object_is_emptied() {
    assert_eq!(
        parse_partial(r#"[{"a": 1}, {"b""#),
        Some(json!([{"a": 1}, {}]))
    );
}

#[test]
fn given_dangling_escape_when_parsing_then_escape_is_dropped() {
    assert_eq!(parse_partial(r#"{"a": "x\"#), Some(json!({"a": "x"})));
    assert_eq!(parse_partial(r#"{"a": "x\u00"#), Some(json!({"a": "x"})));
}

#[test]
fn given_structural_characters_inside_string_when_parsing_then_they_are_ignored() {
    assert_eq!(parse_partial(r#"{"a": "{[,"#), Some(json!({"a": "{[,"})));
}

#[test]
fn given_truncated_top_level_literal_when_parsing_then_none() {
    assert_eq!(parse_partial("tru"), None);
}

#[test]
fn given_streamed_deltas_when_accumulating_then_only_changed_snapshots_are_emitted() {
    let mut accumulator = PartialObjectAccumulator::new();

    assert_eq!(accumulator.push(r#"{"a": "he"#), Some(json!({"a": "he"})));
    assert_eq!(accumulator.push("llo\""), Some(json!({"a": "hello"})));
    assert_eq!(accumulator.push(","), None);
    assert_eq!(accumulator.push(r#" "b": 2}"#), Some(json!({"a": "hello", "b": 2})));
    assert_eq!(accumulator.finish().unwrap(), None);
    assert_eq!(accumulator.text(), r#"{"a": "hello", "b": 2}"#);
}

#[test]
fn given_incomplete_text_when_finishing_then_invalid_response() {
    let mut accumulator = PartialObjectAccumulator::new();
    accumulator.push(r#"{"a": [1"#);

    let err = accumulator.finish().unwrap_err();

    assert!(matches!(err, GeneratorError::InvalidResponse(message) if message.starts_with("incomplete structured output")));
}

fn arb_report() -> impl Strategy<Value = Value> {
    (
        "[ -~]{0,40}",
        prop::collection::vec("[a-zA-Z \\\\\"]{0,20}", 0..5),
        any::<bool>(),
        prop::collection::vec((0u32..1000, "[a-z]{1,10}"), 0..4),
    )
        .prop_map(|(summary, recommendations, review, findings)| {
            json!({
                "executiveSummary": summary,
                "keyFindings": findings
                    .into_iter()
                    .map(|(n, title)| json!({"title": title, "count": n}))
                    .collect::<Vec<_>>(),
                "recommendations": recommendations,
                "requiresHumanReview": review,
            })
        })
}

proptest! {
    #[test]
    fn given_any_prefix_of_an_object_when_parsing_then_result_is_an_object(
        report in arb_report(),
        cut_ratio in 1usize..100,
    ) {
        let text = report.to_string();
        let chars: Vec<char> = text.chars().collect();
        let cut = (chars.len() * cut_ratio / 100).max(1);
        let prefix: String = chars[..cut].iter().collect();

        let parsed = parse_partial(&prefix);

        prop_assert!(parsed.is_some_and(|v| v.is_object()));
    }

    #[test]
    fn given_object_streamed_in_pieces_when_finishing_then_last_snapshot_is_the_object(
        report in arb_report(),
        piece in 1usize..16,
    ) {
        let text = report.to_string();
        let chars: Vec<char> = text.chars().collect();
        let mut accumulator = PartialObjectAccumulator::new();
        let mut last = None;

        for delta in chars.chunks(piece) {
            if let Some(snapshot) = accumulator.push(&delta.iter().collect::<String>()) {
                last = Some(snapshot);
            }
        }
        if let Some(value) = accumulator.finish().unwrap() {
            last = Some(value);
        }

        prop_assert_eq!(last, Some(report));
    }
}
