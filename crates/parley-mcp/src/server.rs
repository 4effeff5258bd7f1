//! Tool-server contract and the bridge into a session's tool registry.

use crate::ServerError;
use async_trait::async_trait;
use parley_agent::{AgentError, ToolDescriptor, ToolExecutor, ToolKind, ToolRegistry};
use parley_llm::ToolDefinition;
use serde_json::Value;
use std::sync::Arc;

/// One operation a server exposes, with its JSON-schema parameters.
#[derive(Clone, Debug)]
pub struct OperationSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl OperationSpec {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// An in-process tool server: a label, a fixed operation set, and a
/// dispatcher. Operation output is plain text for the model.
#[async_trait]
pub trait ToolServer: Send + Sync {
    fn label(&self) -> &str;

    fn operations(&self) -> Vec<OperationSpec>;

    async fn call(&self, operation: &str, arguments: Value) -> Result<String, ServerError>;

    fn shutdown(&self) -> Result<(), ServerError> {
        Ok(())
    }
}

pub(crate) fn required_str<'a>(arguments: &'a Value, key: &str) -> Result<&'a str, ServerError> {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ServerError::InvalidArguments(format!("missing string field '{key}'")))
}

pub(crate) fn required_f64(arguments: &Value, key: &str) -> Result<f64, ServerError> {
    arguments
        .get(key)
        .and_then(Value::as_f64)
        .ok_or_else(|| ServerError::InvalidArguments(format!("missing number field '{key}'")))
}

/// Register every operation of `server` as a local function tool.
/// Operation names share the registry's namespace, so two servers with
/// a same-named operation collide at registration time.
pub fn register_server_tools(
    registry: &mut ToolRegistry,
    server: Arc<dyn ToolServer>,
) -> Result<(), AgentError> {
    for operation in server.operations() {
        let dispatch_server = server.clone();
        let dispatch_name = operation.name.clone();
        let executor: ToolExecutor = Arc::new(move |arguments| {
            let server = dispatch_server.clone();
            let name = dispatch_name.clone();
            Box::pin(async move {
                server
                    .call(&name, arguments)
                    .await
                    .map_err(|error| AgentError::ToolExecution(error.to_string()))
            })
        });
        registry.register(ToolDescriptor {
            definition: ToolDefinition {
                name: operation.name,
                description: operation.description,
                parameters: operation.parameters,
            },
            kind: ToolKind::Local { executor },
        })?;
    }
    Ok(())
}
