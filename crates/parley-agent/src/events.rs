use crate::{AgentError, turn::current_timestamp};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub type EventData = HashMap<String, Value>;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    SessionStart,
    SessionEnd,
    UserInput,
    AssistantTextStart,
    AssistantTextDelta,
    AssistantTextEnd,
    ApprovalRequested,
    ApprovalResolved,
    ToolCallStart,
    ToolCallEnd,
    Error,
    Warning,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionEvent {
    pub kind: EventKind,
    pub timestamp: String,
    pub session_id: String,
    pub data: EventData,
}

impl SessionEvent {
    pub fn new(kind: EventKind, session_id: String, data: EventData) -> Self {
        Self {
            kind,
            timestamp: current_timestamp(),
            session_id,
            data,
        }
    }

    pub fn user_input(session_id: String, content: impl Into<String>) -> Self {
        Self::new(
            EventKind::UserInput,
            session_id,
            EventData::from([("content".to_string(), Value::String(content.into()))]),
        )
    }

    pub fn assistant_text_delta(session_id: String, delta: impl Into<String>) -> Self {
        Self::new(
            EventKind::AssistantTextDelta,
            session_id,
            EventData::from([("delta".to_string(), Value::String(delta.into()))]),
        )
    }

    pub fn assistant_text_end(session_id: String, content: impl Into<String>) -> Self {
        Self::new(
            EventKind::AssistantTextEnd,
            session_id,
            EventData::from([("content".to_string(), Value::String(content.into()))]),
        )
    }

    pub fn approval_requested(
        session_id: String,
        request_id: impl Into<String>,
        tool_name: impl Into<String>,
    ) -> Self {
        Self::new(
            EventKind::ApprovalRequested,
            session_id,
            EventData::from([
                ("request_id".to_string(), Value::String(request_id.into())),
                ("tool_name".to_string(), Value::String(tool_name.into())),
            ]),
        )
    }

    pub fn approval_resolved(
        session_id: String,
        request_id: impl Into<String>,
        approved: bool,
    ) -> Self {
        Self::new(
            EventKind::ApprovalResolved,
            session_id,
            EventData::from([
                ("request_id".to_string(), Value::String(request_id.into())),
                ("approved".to_string(), Value::Bool(approved)),
            ]),
        )
    }

    pub fn tool_call_start(
        session_id: String,
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        arguments: Value,
    ) -> Self {
        Self::new(
            EventKind::ToolCallStart,
            session_id,
            EventData::from([
                ("call_id".to_string(), Value::String(call_id.into())),
                ("tool_name".to_string(), Value::String(tool_name.into())),
                ("arguments".to_string(), arguments),
            ]),
        )
    }

    pub fn tool_call_end(
        session_id: String,
        call_id: impl Into<String>,
        output: impl Into<String>,
        is_error: bool,
    ) -> Self {
        Self::new(
            EventKind::ToolCallEnd,
            session_id,
            EventData::from([
                ("call_id".to_string(), Value::String(call_id.into())),
                ("output".to_string(), Value::String(output.into())),
                ("is_error".to_string(), Value::Bool(is_error)),
            ]),
        )
    }

    pub fn error(session_id: String, message: impl Into<String>) -> Self {
        Self::new(
            EventKind::Error,
            session_id,
            EventData::from([("message".to_string(), Value::String(message.into()))]),
        )
    }

    pub fn warning(session_id: String, message: impl Into<String>) -> Self {
        Self::new(
            EventKind::Warning,
            session_id,
            EventData::from([("message".to_string(), Value::String(message.into()))]),
        )
    }
}

pub trait EventEmitter: Send + Sync {
    fn emit(&self, event: SessionEvent) -> Result<(), AgentError>;
}

#[derive(Default)]
pub struct NoopEventEmitter;

impl EventEmitter for NoopEventEmitter {
    fn emit(&self, _event: SessionEvent) -> Result<(), AgentError> {
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct BufferedEventEmitter {
    inner: Arc<Mutex<Vec<SessionEvent>>>,
}

impl BufferedEventEmitter {
    pub fn snapshot(&self) -> Vec<SessionEvent> {
        let guard = self.inner.lock().expect("buffered emitter mutex poisoned");
        guard.clone()
    }
}

impl EventEmitter for BufferedEventEmitter {
    fn emit(&self, event: SessionEvent) -> Result<(), AgentError> {
        let mut guard = self.inner.lock().expect("buffered emitter mutex poisoned");
        guard.push(event);
        Ok(())
    }
}
