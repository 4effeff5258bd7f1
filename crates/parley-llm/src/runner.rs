use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::errors::CallError;
use crate::types::{RawResponse, Request, StreamEvent};

pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, CallError>> + Send>>;

/// Model/runner adapter contract.
///
/// A runner is an opaque function from (input, tools, optional chain id)
/// to either a single response or an event stream.
#[async_trait]
pub trait ModelRunner: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, request: Request) -> Result<RawResponse, CallError>;

    async fn stream(&self, request: Request) -> Result<EventStream, CallError>;
}
