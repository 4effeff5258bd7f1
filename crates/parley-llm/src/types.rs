use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Declaration of a locally executable function tool, as sent to the model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// One entry of the `tools` array on an outbound call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolPayload {
    Function {
        name: String,
        description: String,
        parameters: Value,
    },
    Mcp {
        server_label: String,
        server_url: String,
        require_approval: String,
    },
}

/// Decision for one pending tool-approval request, correlated by id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApprovalDecision {
    #[serde(rename = "type")]
    pub item_type: String,
    pub approval_request_id: String,
    pub approve: bool,
}

impl ApprovalDecision {
    pub fn new(approval_request_id: impl Into<String>, approve: bool) -> Self {
        Self {
            item_type: "mcp_approval_response".to_string(),
            approval_request_id: approval_request_id.into(),
            approve,
        }
    }
}

/// Result of one client-side function tool execution, resubmitted to the model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunctionCallOutput {
    #[serde(rename = "type")]
    pub item_type: String,
    pub call_id: String,
    pub output: String,
}

impl FunctionCallOutput {
    pub fn new(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            item_type: "function_call_output".to_string(),
            call_id: call_id.into(),
            output: output.into(),
        }
    }
}

/// Input of an outbound call: new user text, approval decisions, or
/// function outputs for a chained follow-up.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CallInput {
    Text(String),
    ApprovalDecisions(Vec<ApprovalDecision>),
    FunctionOutputs(Vec<FunctionCallOutput>),
}

/// Whether a call carries complete input or chains from server-side state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallMode {
    Fresh,
    Chained,
}

/// One outbound model call.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Request {
    pub model: String,
    pub input: CallInput,
    pub tools: Vec<ToolPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_response_id: Option<String>,
    pub stream: bool,
}

impl Request {
    pub fn fresh(model: impl Into<String>, input: CallInput, tools: Vec<ToolPayload>) -> Self {
        Self {
            model: model.into(),
            input,
            tools,
            previous_response_id: None,
            stream: false,
        }
    }

    pub fn chained(
        model: impl Into<String>,
        input: CallInput,
        tools: Vec<ToolPayload>,
        previous_response_id: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            input,
            tools,
            previous_response_id: Some(previous_response_id.into()),
            stream: false,
        }
    }

    pub fn mode(&self) -> CallMode {
        if self.previous_response_id.is_some() {
            CallMode::Chained
        } else {
            CallMode::Fresh
        }
    }
}

/// Output item shapes this client understands.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KnownOutputItem {
    Message {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
    OutputText {
        text: String,
    },
    McpApprovalRequest {
        id: String,
        #[serde(default)]
        server_label: String,
        name: String,
        #[serde(default)]
        arguments: Value,
    },
    McpCall {
        #[serde(default)]
        id: String,
        #[serde(default)]
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<String>,
    },
    FunctionCall {
        call_id: String,
        name: String,
        #[serde(default)]
        arguments: String,
    },
}

/// One element of a response's output list. Shapes this client does not
/// recognize are preserved as raw values rather than rejected.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutputItem {
    Known(KnownOutputItem),
    Unknown(Value),
}

impl OutputItem {
    /// Best-effort display text of this item: its `content`, then its
    /// `text`, then the item itself when it is already a bare string.
    pub fn text_fragment(&self) -> Option<String> {
        match self {
            OutputItem::Known(KnownOutputItem::Message { content, text }) => {
                if let Some(fragment) = content.as_ref().and_then(content_text) {
                    return Some(fragment);
                }
                text.clone()
            }
            OutputItem::Known(KnownOutputItem::OutputText { text }) => Some(text.clone()),
            OutputItem::Known(_) => None,
            OutputItem::Unknown(Value::String(text)) => Some(text.clone()),
            OutputItem::Unknown(_) => None,
        }
    }
}

fn content_text(content: &Value) -> Option<String> {
    match content {
        Value::String(text) => Some(text.clone()),
        Value::Array(parts) => {
            let mut text = String::new();
            for part in parts {
                if let Some(fragment) = part.get("text").and_then(Value::as_str) {
                    text.push_str(fragment);
                }
            }
            if text.is_empty() { None } else { Some(text) }
        }
        _ => None,
    }
}

/// A model response with a version-dependent shape. Every probe the
/// normalizer relies on is optional; absence is a normal state.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Vec<OutputItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_responses: Option<Vec<RawResponse>>,
}

/// Stream event kinds this client acts on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamEventKind {
    #[serde(rename = "response.created")]
    Created,
    #[serde(rename = "response.output_text.delta")]
    OutputTextDelta,
    #[serde(rename = "response.completed")]
    Completed,
    #[serde(rename = "response.failed")]
    Failed,
}

/// Stream event kind, preserving unrecognized kinds as strings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StreamEventKindOrString {
    Known(StreamEventKind),
    Other(String),
}

/// One event of a streamed response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StreamEvent {
    #[serde(rename = "type")]
    pub kind: StreamEventKindOrString,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<RawResponse>,
}

impl StreamEvent {
    pub fn delta(delta: impl Into<String>) -> Self {
        Self {
            kind: StreamEventKindOrString::Known(StreamEventKind::OutputTextDelta),
            delta: Some(delta.into()),
            response: None,
        }
    }

    pub fn completed(response: RawResponse) -> Self {
        Self {
            kind: StreamEventKindOrString::Known(StreamEventKind::Completed),
            delta: None,
            response: Some(response),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_mode_follows_previous_response_id() {
        let fresh = Request::fresh("m", CallInput::Text("hi".to_string()), Vec::new());
        assert_eq!(fresh.mode(), CallMode::Fresh);

        let chained = Request::chained("m", CallInput::Text("hi".to_string()), Vec::new(), "r-1");
        assert_eq!(chained.mode(), CallMode::Chained);
    }

    #[test]
    fn approval_decision_carries_wire_type_and_request_id() {
        let decision = ApprovalDecision::new("req-9", true);
        let value = serde_json::to_value(&decision).expect("serialize");
        assert_eq!(value["type"], "mcp_approval_response");
        assert_eq!(value["approval_request_id"], "req-9");
        assert_eq!(value["approve"], true);
    }

    #[test]
    fn output_item_decodes_approval_request() {
        let item: OutputItem = serde_json::from_value(json!({
            "type": "mcp_approval_request",
            "id": "apr-1",
            "server_label": "chinook_db_server",
            "name": "execute_sql_query",
            "arguments": {"query": "SELECT 1"}
        }))
        .expect("decode");
        assert!(matches!(
            item,
            OutputItem::Known(KnownOutputItem::McpApprovalRequest { .. })
        ));
    }

    #[test]
    fn unrecognized_item_shape_is_preserved_not_rejected() {
        let item: OutputItem = serde_json::from_value(json!({
            "type": "reasoning",
            "summary": []
        }))
        .expect("decode");
        assert!(matches!(item, OutputItem::Unknown(_)));
        assert_eq!(item.text_fragment(), None);
    }

    #[test]
    fn bare_string_item_is_its_own_fragment() {
        let item: OutputItem = serde_json::from_value(json!("already text")).expect("decode");
        assert_eq!(item.text_fragment().as_deref(), Some("already text"));
    }

    #[test]
    fn message_content_parts_are_concatenated() {
        let item: OutputItem = serde_json::from_value(json!({
            "type": "message",
            "content": [{"type": "output_text", "text": "a"}, {"type": "output_text", "text": "b"}]
        }))
        .expect("decode");
        assert_eq!(item.text_fragment().as_deref(), Some("ab"));
    }
}
