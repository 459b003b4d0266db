//! Error types for the agent control loop.
//!
//! None of these are fatal: the tick loop stringifies them into the agent's
//! `last_error` and moves on.

/// Failures talking to the planning service.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlanningError {
    #[error("planning service unavailable: {0}")]
    Unavailable(String),
    #[error("planning service returned malformed output: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for PlanningError {
    fn from(value: serde_json::Error) -> Self {
        PlanningError::Malformed(value.to_string())
    }
}

/// Missing preconditions when applying a single action.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExecuteError {
    #[error("{action} is missing {field}")]
    MissingField {
        action: &'static str,
        field: &'static str,
    },
    #[error("agent body is not present in the world")]
    NoBody,
    #[error("no safe {purpose} target found after {attempts} attempts")]
    NoSafeTarget {
        purpose: &'static str,
        attempts: u32,
    },
    #[error("body cannot move (no navigation or velocity control)")]
    CannotMove,
}
