//! Model/runner layer for Parley.
//!
//! Wire types for the Responses-style API, the `ModelRunner` adapter
//! contract, an HTTP runner implementation, and streaming utilities
//! (SSE parsing and delta accumulation).

pub mod collector;
pub mod errors;
pub mod openai;
pub mod runner;
pub mod sse;
pub mod types;

pub use collector::StreamCollector;
pub use errors::CallError;
pub use openai::OpenAiResponsesRunner;
pub use runner::{EventStream, ModelRunner};
pub use types::{
    ApprovalDecision, CallInput, CallMode, FunctionCallOutput, KnownOutputItem, OutputItem,
    RawResponse, Request, StreamEvent, StreamEventKind, StreamEventKindOrString, ToolDefinition,
    ToolPayload,
};
