//! Best-effort extraction of display text from a shape-varying response.
//!
//! The model layer's result shape is not stable across versions, so
//! extraction is a chain of typed optional probes composed
//! first-match-wins. Extraction never fails: when nothing matches it
//! degrades to a sentinel, which the session treats as "no assistant
//! content this turn".

use parley_llm::{OutputItem, RawResponse};
use serde_json::Value;

/// Printed by callers when a turn produced no extractable text.
pub const NO_RESULT_NOTICE: &str = "response could not be extracted";

/// Result of normalization: real text, or the no-result sentinel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Normalized {
    Text(String),
    NoResult,
}

impl Normalized {
    pub fn is_no_result(&self) -> bool {
        matches!(self, Normalized::NoResult)
    }

    pub fn as_display(&self) -> &str {
        match self {
            Normalized::Text(text) => text,
            Normalized::NoResult => NO_RESULT_NOTICE,
        }
    }
}

/// Extract display text in strict priority order. Pure function of the
/// response; idempotent.
pub fn extract_text(response: &RawResponse) -> Normalized {
    direct_text(response)
        .or_else(|| coerced_final_output(response))
        .or_else(|| joined_output_items(response))
        .or_else(|| first_sub_response_text(response))
        .map(Normalized::Text)
        .unwrap_or(Normalized::NoResult)
}

/// Strategy 1: the direct final-answer field. A structured final output
/// is probed one level deep for a `content` or `text` sub-field.
fn direct_text(response: &RawResponse) -> Option<String> {
    if let Some(text) = &response.output_text {
        if !text.is_empty() {
            return Some(text.clone());
        }
    }

    match response.final_output.as_ref()? {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Object(map) => ["content", "text"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .filter(|text| !text.is_empty())
            .map(str::to_string),
        _ => None,
    }
}

/// Strategy 2: coerce a scalar final output to text. Values that do not
/// convert (objects, arrays, null) are treated as "no result here".
fn coerced_final_output(response: &RawResponse) -> Option<String> {
    match response.final_output.as_ref()? {
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// Strategy 3: per-item fragments from the output list, joined with a
/// newline only when more than one fragment was found.
fn joined_output_items(response: &RawResponse) -> Option<String> {
    let items = response.output.as_ref()?;
    let mut fragments: Vec<String> = items
        .iter()
        .filter_map(OutputItem::text_fragment)
        .filter(|fragment| !fragment.is_empty())
        .collect();
    match fragments.len() {
        0 => None,
        1 => fragments.pop(),
        _ => Some(fragments.join("\n")),
    }
}

/// Strategy 4: first sub-response with non-empty top-level output text,
/// scanning in order.
fn first_sub_response_text(response: &RawResponse) -> Option<String> {
    response.raw_responses.as_ref()?.iter().find_map(|sub| {
        sub.output_text
            .as_ref()
            .filter(|text| !text.is_empty())
            .cloned()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response_with(value: Value) -> RawResponse {
        serde_json::from_value(value).expect("response decodes")
    }

    #[test]
    fn direct_output_text_wins() {
        let response = response_with(json!({
            "id": "r1",
            "output_text": "direct",
            "final_output": "structured",
            "output": [{"type": "output_text", "text": "item"}],
            "raw_responses": [{"id": "s", "output_text": "sub"}]
        }));
        assert_eq!(extract_text(&response), Normalized::Text("direct".to_string()));
    }

    #[test]
    fn structured_final_output_probes_content_then_text() {
        let content = response_with(json!({
            "id": "r",
            "final_output": {"content": "from content", "text": "from text"}
        }));
        assert_eq!(
            extract_text(&content),
            Normalized::Text("from content".to_string())
        );

        let text_only = response_with(json!({
            "id": "r",
            "final_output": {"text": "from text"}
        }));
        assert_eq!(
            extract_text(&text_only),
            Normalized::Text("from text".to_string())
        );
    }

    #[test]
    fn scalar_final_output_is_coerced_but_objects_are_not() {
        let number = response_with(json!({"id": "r", "final_output": 42}));
        assert_eq!(extract_text(&number), Normalized::Text("42".to_string()));

        let opaque = response_with(json!({"id": "r", "final_output": {"meta": 1}}));
        assert_eq!(extract_text(&opaque), Normalized::NoResult);
    }

    #[test]
    fn single_item_fragment_is_returned_unjoined() {
        let response = response_with(json!({
            "id": "r",
            "output": [
                {"type": "mcp_call", "id": "c", "name": "q"},
                {"type": "output_text", "text": "only"}
            ]
        }));
        assert_eq!(extract_text(&response), Normalized::Text("only".to_string()));
    }

    #[test]
    fn multiple_item_fragments_join_with_newline() {
        let response = response_with(json!({
            "id": "r",
            "output": [
                {"type": "output_text", "text": "first"},
                "bare string",
                {"type": "message", "content": "second"}
            ]
        }));
        assert_eq!(
            extract_text(&response),
            Normalized::Text("first\nbare string\nsecond".to_string())
        );
    }

    #[test]
    fn sub_response_scan_skips_empty_leading_entries() {
        let response = response_with(json!({
            "id": "r",
            "raw_responses": [
                {"id": "s1"},
                {"id": "s2", "output_text": "from second"},
                {"id": "s3", "output_text": "from third"}
            ]
        }));
        assert_eq!(
            extract_text(&response),
            Normalized::Text("from second".to_string())
        );
    }

    #[test]
    fn empty_response_degrades_to_sentinel_not_error() {
        let response = RawResponse::default();
        assert_eq!(extract_text(&response), Normalized::NoResult);
        assert_eq!(extract_text(&response).as_display(), NO_RESULT_NOTICE);
    }

    #[test]
    fn extraction_is_idempotent() {
        let response = response_with(json!({
            "id": "r",
            "output": [{"type": "output_text", "text": "same"}]
        }));
        assert_eq!(extract_text(&response), extract_text(&response));
    }

    #[test]
    fn priority_order_is_total() {
        // A response matching every strategy resolves exactly as
        // strategy 1 alone would.
        let all = response_with(json!({
            "id": "r",
            "output_text": "one",
            "final_output": 2,
            "output": [{"type": "output_text", "text": "three"}],
            "raw_responses": [{"id": "s", "output_text": "four"}]
        }));
        let only_first = response_with(json!({"id": "r", "output_text": "one"}));
        assert_eq!(extract_text(&all), extract_text(&only_first));
    }
}
