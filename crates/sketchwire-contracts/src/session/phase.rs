use serde::{Deserialize, Serialize};

/// Where the session currently is. Exactly one phase is active; `Analyzing`
/// and `Refining` each permit at most one in-flight external call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    Analyzing,
    Success,
    Error,
    Refining,
}

impl SessionPhase {
    pub fn is_busy(self) -> bool {
        matches!(self, SessionPhase::Analyzing | SessionPhase::Refining)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Analyzing => "analyzing",
            SessionPhase::Success => "success",
            SessionPhase::Error => "error",
            SessionPhase::Refining => "refining",
        }
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
