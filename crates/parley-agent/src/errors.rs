use thiserror::Error;

/// Top-level error type for the parley-agent crate.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("duplicate tool registration: {0}")]
    DuplicateTool(String),
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("session is closed")]
    SessionClosed,
    #[error("tool execution failed: {0}")]
    ToolExecution(String),
    #[error("model call failed: {0}")]
    Call(#[from] parley_llm::CallError),
}
