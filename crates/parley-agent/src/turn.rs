use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

pub type Timestamp = String;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserTurn {
    pub content: String,
    pub timestamp: Timestamp,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssistantTurn {
    pub content: String,
    pub response_id: Option<String>,
    pub timestamp: Timestamp,
}

/// One transcript entry. Append-only; never mutated after creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Turn {
    User(UserTurn),
    Assistant(AssistantTurn),
}

impl UserTurn {
    pub fn new(content: impl Into<String>, timestamp: Timestamp) -> Self {
        Self {
            content: content.into(),
            timestamp,
        }
    }
}

impl AssistantTurn {
    pub fn new(
        content: impl Into<String>,
        response_id: Option<String>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            content: content.into(),
            response_id,
            timestamp,
        }
    }
}

pub(crate) fn current_timestamp() -> Timestamp {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}.{:03}", elapsed.as_secs(), elapsed.subsec_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assistant_turn_keeps_response_id() {
        let turn = AssistantTurn::new("hi", Some("resp-1".to_string()), current_timestamp());
        assert_eq!(turn.content, "hi");
        assert_eq!(turn.response_id.as_deref(), Some("resp-1"));
    }
}
