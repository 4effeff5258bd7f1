use crate::AgentError;
use parley_llm::{ToolDefinition, ToolPayload};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub type ToolFuture = Pin<Box<dyn Future<Output = Result<String, AgentError>> + Send>>;
pub type ToolExecutor = Arc<dyn Fn(Value) -> ToolFuture + Send + Sync>;

/// Transport used to reach a remote tool server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServerTransport {
    Http,
    Stdio,
}

/// A tool server the model reaches on its own; the client only
/// advertises it on outbound calls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteServerDescriptor {
    pub label: String,
    pub endpoint_url: String,
    pub transport: ServerTransport,
}

#[derive(Clone)]
pub enum ToolKind {
    Local { executor: ToolExecutor },
    Remote(RemoteServerDescriptor),
}

#[derive(Clone)]
pub struct ToolDescriptor {
    pub definition: ToolDefinition,
    pub kind: ToolKind,
}

impl std::fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("definition", &self.definition)
            .field(
                "kind",
                match &self.kind {
                    ToolKind::Local { .. } => &"Local",
                    ToolKind::Remote(_) => &"Remote",
                },
            )
            .finish()
    }
}

/// Outcome of one local tool execution, returned to the model layer.
/// Failures are folded into the outcome rather than raised.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolOutcome {
    pub call_id: String,
    pub content: String,
    pub is_error: bool,
}

impl ToolOutcome {
    fn error(call_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            content: message.into(),
            is_error: true,
        }
    }
}

/// Tools available to a session, fixed at session start.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolDescriptor>,
}

impl ToolRegistry {
    pub fn register(&mut self, descriptor: ToolDescriptor) -> Result<(), AgentError> {
        let name = descriptor.definition.name.clone();
        if self.tools.contains_key(&name) {
            return Err(AgentError::DuplicateTool(name));
        }
        self.tools.insert(name, descriptor);
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<&ToolDescriptor, AgentError> {
        self.tools
            .get(name)
            .ok_or_else(|| AgentError::UnknownTool(name.to_string()))
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Wire tool list for an outbound call, sorted by name for stable
    /// request shapes.
    pub fn payloads(&self) -> Vec<ToolPayload> {
        let mut descriptors: Vec<&ToolDescriptor> = self.tools.values().collect();
        descriptors.sort_by(|a, b| a.definition.name.cmp(&b.definition.name));
        descriptors
            .into_iter()
            .map(|descriptor| match &descriptor.kind {
                ToolKind::Local { .. } => ToolPayload::Function {
                    name: descriptor.definition.name.clone(),
                    description: descriptor.definition.description.clone(),
                    parameters: descriptor.definition.parameters.clone(),
                },
                ToolKind::Remote(remote) => ToolPayload::Mcp {
                    server_label: remote.label.clone(),
                    server_url: remote.endpoint_url.clone(),
                    require_approval: "always".to_string(),
                },
            })
            .collect()
    }

    /// Execute a local tool call. Never fails the session: unknown
    /// tools, remote-only tools, and executor errors all come back as
    /// error outcomes for the model to react to.
    pub async fn dispatch(&self, call_id: &str, name: &str, arguments: Value) -> ToolOutcome {
        let descriptor = match self.tools.get(name) {
            Some(descriptor) => descriptor,
            None => return ToolOutcome::error(call_id, format!("Unknown tool: {name}")),
        };

        match &descriptor.kind {
            ToolKind::Local { executor } => match executor(arguments).await {
                Ok(content) => ToolOutcome {
                    call_id: call_id.to_string(),
                    content,
                    is_error: false,
                },
                Err(error) => ToolOutcome::error(call_id, error.to_string()),
            },
            ToolKind::Remote(remote) => ToolOutcome::error(
                call_id,
                format!("tool '{name}' is executed by remote server '{}'", remote.label),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn echo_tool(name: &str) -> ToolDescriptor {
        ToolDescriptor {
            definition: ToolDefinition {
                name: name.to_string(),
                description: "echo".to_string(),
                parameters: json!({"type": "object", "properties": {}}),
            },
            kind: ToolKind::Local {
                executor: Arc::new(|args| {
                    Box::pin(async move { Ok(args.to_string()) })
                }),
            },
        }
    }

    #[test]
    fn register_rejects_duplicate_names() {
        let mut registry = ToolRegistry::default();
        registry.register(echo_tool("echo")).expect("first");
        let error = registry.register(echo_tool("echo")).expect_err("second");
        assert!(matches!(error, AgentError::DuplicateTool(name) if name == "echo"));
    }

    #[test]
    fn resolve_fails_for_unknown_tool() {
        let registry = ToolRegistry::default();
        let error = registry.resolve("missing").expect_err("unknown");
        assert!(matches!(error, AgentError::UnknownTool(name) if name == "missing"));
    }

    #[test]
    fn payloads_are_sorted_and_carry_remote_servers() {
        let mut registry = ToolRegistry::default();
        registry.register(echo_tool("zeta")).expect("register");
        registry
            .register(ToolDescriptor {
                definition: ToolDefinition {
                    name: "chinook_db_server".to_string(),
                    description: "Chinook database access".to_string(),
                    parameters: json!({}),
                },
                kind: ToolKind::Remote(RemoteServerDescriptor {
                    label: "chinook_db_server".to_string(),
                    endpoint_url: "http://localhost:3001/mcp".to_string(),
                    transport: ServerTransport::Http,
                }),
            })
            .expect("register");

        let payloads = registry.payloads();
        assert_eq!(payloads.len(), 2);
        assert!(matches!(
            &payloads[0],
            ToolPayload::Mcp { server_label, .. } if server_label == "chinook_db_server"
        ));
        assert!(matches!(
            &payloads[1],
            ToolPayload::Function { name, .. } if name == "zeta"
        ));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn dispatch_folds_unknown_tool_into_error_outcome() {
        let registry = ToolRegistry::default();
        let outcome = registry.dispatch("call-1", "missing", json!({})).await;
        assert!(outcome.is_error);
        assert_eq!(outcome.call_id, "call-1");
        assert!(outcome.content.contains("missing"));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn dispatch_runs_local_executor() {
        let mut registry = ToolRegistry::default();
        registry.register(echo_tool("echo")).expect("register");
        let outcome = registry.dispatch("call-2", "echo", json!({"a": 1})).await;
        assert!(!outcome.is_error);
        assert_eq!(outcome.content, "{\"a\":1}");
    }
}
