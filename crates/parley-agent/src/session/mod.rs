use crate::{
    AgentError, ApprovalPolicy, AssistantTurn, AutoApprovePolicy, EventData, EventEmitter,
    EventKind, NO_RESULT_NOTICE, NoopEventEmitter, Normalized, SessionConfig, SessionEvent,
    ToolRegistry, Turn, UserTurn, extract_text, find_pending,
    turn::current_timestamp,
};
use futures::StreamExt;
use parley_llm::{
    CallInput, FunctionCallOutput, KnownOutputItem, ModelRunner, OutputItem, RawResponse, Request,
    StreamCollector,
};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// One multi-turn conversation.
///
/// Continuity across turns is the server-issued response id: once one
/// is held, every outbound call chains from it instead of resending
/// history. The transcript is kept locally for display only.
pub struct Session {
    id: String,
    runner: Arc<dyn ModelRunner>,
    registry: ToolRegistry,
    policy: Arc<dyn ApprovalPolicy>,
    event_emitter: Arc<dyn EventEmitter>,
    config: SessionConfig,
    transcript: Vec<Turn>,
    last_response_id: Option<String>,
    closed: bool,
}

impl Session {
    pub fn new(
        runner: Arc<dyn ModelRunner>,
        registry: ToolRegistry,
        config: SessionConfig,
    ) -> Result<Self, AgentError> {
        Self::new_with_emitter(
            runner,
            registry,
            config,
            Arc::new(AutoApprovePolicy),
            Arc::new(NoopEventEmitter),
        )
    }

    pub fn new_with_emitter(
        runner: Arc<dyn ModelRunner>,
        registry: ToolRegistry,
        config: SessionConfig,
        policy: Arc<dyn ApprovalPolicy>,
        event_emitter: Arc<dyn EventEmitter>,
    ) -> Result<Self, AgentError> {
        let session = Self {
            id: Uuid::new_v4().to_string(),
            runner,
            registry,
            policy,
            event_emitter,
            config,
            transcript: Vec::new(),
            last_response_id: None,
            closed: false,
        };
        session.emit(SessionEvent::new(
            EventKind::SessionStart,
            session.id.clone(),
            EventData::new(),
        ))?;
        Ok(session)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn transcript(&self) -> &[Turn] {
        &self.transcript
    }

    pub fn last_response_id(&self) -> Option<&str> {
        self.last_response_id.as_deref()
    }

    /// One turn: send user text, resolve approvals and tool calls, and
    /// return the normalized display text.
    pub async fn send(&mut self, user_text: impl Into<String>) -> Result<Normalized, AgentError> {
        let user_text = user_text.into();
        self.begin_turn(&user_text)?;

        let request = self.build_request(CallInput::Text(user_text));
        let response = self.call(request).await?;
        let response = self.resolve_approvals(response).await?;
        let response = self.run_tool_rounds(response).await?;
        self.complete_turn(response)
    }

    /// Streaming variant of [`Session::send`]: deltas are emitted as
    /// they arrive, then the accumulated response goes through the same
    /// approval, tool, and transcript steps.
    pub async fn send_streamed(
        &mut self,
        user_text: impl Into<String>,
    ) -> Result<Normalized, AgentError> {
        let user_text = user_text.into();
        self.begin_turn(&user_text)?;
        self.emit(SessionEvent::new(
            EventKind::AssistantTextStart,
            self.id.clone(),
            EventData::new(),
        ))?;

        let request = self.build_request(CallInput::Text(user_text));
        let mut events = match self.runner.stream(request).await {
            Ok(events) => events,
            Err(error) => {
                self.emit(SessionEvent::error(self.id.clone(), error.to_string()))?;
                return Err(error.into());
            }
        };

        let mut collector = StreamCollector::new();
        while let Some(event) = events.next().await {
            match event {
                Ok(event) => {
                    if let Some(delta) = collector.process(&event) {
                        if !delta.is_empty() {
                            let delta = delta.to_string();
                            self.emit(SessionEvent::assistant_text_delta(self.id.clone(), delta))?;
                        }
                    }
                }
                Err(error) => {
                    self.emit(SessionEvent::error(self.id.clone(), error.to_string()))?;
                    return Err(error.into());
                }
            }
        }

        let response = collector.response();
        let response = self.resolve_approvals(response).await?;
        let response = self.run_tool_rounds(response).await?;
        self.complete_turn(response)
    }

    pub fn close(&mut self) -> Result<(), AgentError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.emit(SessionEvent::new(
            EventKind::SessionEnd,
            self.id.clone(),
            EventData::new(),
        ))
    }

    fn begin_turn(&mut self, user_text: &str) -> Result<(), AgentError> {
        if self.closed {
            return Err(AgentError::SessionClosed);
        }
        self.transcript
            .push(Turn::User(UserTurn::new(user_text, current_timestamp())));
        self.emit(SessionEvent::user_input(self.id.clone(), user_text))
    }

    /// Chained when a prior response id is held, fresh otherwise.
    fn build_request(&self, input: CallInput) -> Request {
        match &self.last_response_id {
            Some(previous) => Request::chained(
                self.config.model.clone(),
                input,
                self.registry.payloads(),
                previous.clone(),
            ),
            None => Request::fresh(self.config.model.clone(), input, self.registry.payloads()),
        }
    }

    async fn call(&self, request: Request) -> Result<RawResponse, AgentError> {
        match self.runner.complete(request).await {
            Ok(response) => Ok(response),
            Err(error) => {
                self.emit(SessionEvent::error(self.id.clone(), error.to_string()))?;
                Err(error.into())
            }
        }
    }

    /// Resubmit approval decisions, chained from the response that
    /// carried the requests. Bounded by `max_approval_rounds`; the
    /// final response's own pending approvals are not consulted once
    /// the bound is reached.
    async fn resolve_approvals(
        &mut self,
        mut response: RawResponse,
    ) -> Result<RawResponse, AgentError> {
        let mut rounds = 0usize;
        while rounds < self.config.max_approval_rounds {
            let pending = find_pending(&response);
            if pending.is_empty() {
                break;
            }

            for request in &pending {
                self.emit(SessionEvent::approval_requested(
                    self.id.clone(),
                    request.id.clone(),
                    request.tool_name.clone(),
                ))?;
            }
            let decisions = self.policy.decide(&pending);
            for decision in &decisions {
                self.emit(SessionEvent::approval_resolved(
                    self.id.clone(),
                    decision.approval_request_id.clone(),
                    decision.approve,
                ))?;
            }

            let request = Request::chained(
                self.config.model.clone(),
                CallInput::ApprovalDecisions(decisions),
                self.registry.payloads(),
                response.id.clone(),
            );
            response = self.call(request).await?;
            rounds += 1;
        }
        Ok(response)
    }

    /// Execute client-side function calls and resubmit their outputs,
    /// bounded by `max_tool_rounds`. Execution failures travel back to
    /// the model as error outcomes, never up to the caller.
    async fn run_tool_rounds(&mut self, mut response: RawResponse) -> Result<RawResponse, AgentError> {
        let mut rounds = 0usize;
        while rounds < self.config.max_tool_rounds {
            let calls = pending_function_calls(&response);
            if calls.is_empty() {
                break;
            }

            let mut outputs = Vec::with_capacity(calls.len());
            for call in calls {
                let arguments = match parse_call_arguments(&call.arguments) {
                    Ok(arguments) => arguments,
                    Err(message) => {
                        self.emit(SessionEvent::tool_call_end(
                            self.id.clone(),
                            call.call_id.clone(),
                            message.clone(),
                            true,
                        ))?;
                        outputs.push(FunctionCallOutput::new(call.call_id, message));
                        continue;
                    }
                };

                self.emit(SessionEvent::tool_call_start(
                    self.id.clone(),
                    call.call_id.clone(),
                    call.name.clone(),
                    arguments.clone(),
                ))?;
                let outcome = self
                    .registry
                    .dispatch(&call.call_id, &call.name, arguments)
                    .await;
                self.emit(SessionEvent::tool_call_end(
                    self.id.clone(),
                    outcome.call_id.clone(),
                    outcome.content.clone(),
                    outcome.is_error,
                ))?;
                outputs.push(FunctionCallOutput::new(outcome.call_id, outcome.content));
            }

            let request = Request::chained(
                self.config.model.clone(),
                CallInput::FunctionOutputs(outputs),
                self.registry.payloads(),
                response.id.clone(),
            );
            response = self.call(request).await?;
            rounds += 1;
        }
        Ok(response)
    }

    /// Normalize, advance the chain id, and append the assistant turn.
    /// The no-result sentinel is surfaced but never appended: a
    /// sentinel in the transcript would corrupt later chained turns.
    fn complete_turn(&mut self, response: RawResponse) -> Result<Normalized, AgentError> {
        let normalized = extract_text(&response);
        if !response.id.is_empty() {
            self.last_response_id = Some(response.id.clone());
        }

        match &normalized {
            Normalized::Text(text) => {
                self.emit(SessionEvent::assistant_text_end(
                    self.id.clone(),
                    text.clone(),
                ))?;
                self.transcript.push(Turn::Assistant(AssistantTurn::new(
                    text.clone(),
                    (!response.id.is_empty()).then(|| response.id.clone()),
                    current_timestamp(),
                )));
            }
            Normalized::NoResult => {
                self.emit(SessionEvent::warning(self.id.clone(), NO_RESULT_NOTICE))?;
            }
        }
        Ok(normalized)
    }

    fn emit(&self, event: SessionEvent) -> Result<(), AgentError> {
        self.event_emitter.emit(event)
    }
}

struct PendingFunctionCall {
    call_id: String,
    name: String,
    arguments: String,
}

fn pending_function_calls(response: &RawResponse) -> Vec<PendingFunctionCall> {
    let Some(items) = &response.output else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            OutputItem::Known(KnownOutputItem::FunctionCall {
                call_id,
                name,
                arguments,
            }) => Some(PendingFunctionCall {
                call_id: call_id.clone(),
                name: name.clone(),
                arguments: arguments.clone(),
            }),
            _ => None,
        })
        .collect()
}

fn parse_call_arguments(raw: &str) -> Result<Value, String> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }
    serde_json::from_str::<Value>(raw)
        .map_err(|error| format!("invalid JSON arguments: {error}"))
}
