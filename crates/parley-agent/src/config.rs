/// Runtime configuration for a chat session.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionConfig {
    pub model: String,
    /// Approval resubmissions allowed per user turn. The reference
    /// behavior performs at most one round.
    pub max_approval_rounds: usize,
    /// Function-tool round-trips allowed per user turn.
    pub max_tool_rounds: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            model: "gpt-5-mini".to_string(),
            max_approval_rounds: 1,
            max_tool_rounds: 8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_preserve_single_approval_round() {
        let config = SessionConfig::default();
        assert_eq!(config.max_approval_rounds, 1);
        assert_eq!(config.max_tool_rounds, 8);
    }
}
