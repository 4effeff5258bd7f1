//! Tool-approval correlation.
//!
//! Pending approval requests are extracted from a response's output
//! items, answered through a pluggable policy, and resubmitted to the
//! model correlated by request id.

use parley_llm::{ApprovalDecision, KnownOutputItem, OutputItem, RawResponse};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

/// One pending approval, extracted from a response. Ephemeral; lives
/// for a single round-trip.
#[derive(Clone, Debug, PartialEq)]
pub struct ApprovalRequest {
    pub id: String,
    pub server_label: String,
    pub tool_name: String,
    pub arguments: Value,
}

/// Approval requests carried by a response, in source order.
pub fn find_pending(response: &RawResponse) -> Vec<ApprovalRequest> {
    let Some(items) = &response.output else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            OutputItem::Known(KnownOutputItem::McpApprovalRequest {
                id,
                server_label,
                name,
                arguments,
            }) => Some(ApprovalRequest {
                id: id.clone(),
                server_label: server_label.clone(),
                tool_name: name.clone(),
                arguments: arguments.clone(),
            }),
            _ => None,
        })
        .collect()
}

pub fn has_pending(response: &RawResponse) -> bool {
    !find_pending(response).is_empty()
}

/// One decision per request, correlated by id.
pub fn build_decisions(requests: &[ApprovalRequest], approve: bool) -> Vec<ApprovalDecision> {
    requests
        .iter()
        .map(|request| ApprovalDecision::new(request.id.clone(), approve))
        .collect()
}

/// Decides pending approvals for a session.
pub trait ApprovalPolicy: Send + Sync {
    fn decide(&self, requests: &[ApprovalRequest]) -> Vec<ApprovalDecision>;
}

/// Approves everything. Default, for unattended operation.
#[derive(Default)]
pub struct AutoApprovePolicy;

impl ApprovalPolicy for AutoApprovePolicy {
    fn decide(&self, requests: &[ApprovalRequest]) -> Vec<ApprovalDecision> {
        build_decisions(requests, true)
    }
}

/// Denies everything.
#[derive(Default)]
pub struct DenyAllPolicy;

impl ApprovalPolicy for DenyAllPolicy {
    fn decide(&self, requests: &[ApprovalRequest]) -> Vec<ApprovalDecision> {
        build_decisions(requests, false)
    }
}

/// Answers from a scripted queue; denies once the queue is drained.
#[derive(Default)]
pub struct QueuePolicy {
    answers: Mutex<VecDeque<bool>>,
}

impl QueuePolicy {
    pub fn with_answers(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
        }
    }
}

impl ApprovalPolicy for QueuePolicy {
    fn decide(&self, requests: &[ApprovalRequest]) -> Vec<ApprovalDecision> {
        let mut answers = self.answers.lock().expect("queue policy mutex poisoned");
        requests
            .iter()
            .map(|request| {
                let approve = answers.pop_front().unwrap_or(false);
                ApprovalDecision::new(request.id.clone(), approve)
            })
            .collect()
    }
}
