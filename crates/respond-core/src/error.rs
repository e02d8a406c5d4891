use thiserror::Error;

use crate::types::IncidentStatus;

/// Top-level error type for the RESPOND engine.
///
/// Caller mistakes (`Validation`, `InvalidTransition`) are kept apart from
/// lookups that miss (`NotFound`) and from collaborator failures
/// (`Dependency`). None of them are retried inside the engine; retry policy
/// belongs to whoever called it.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RespondError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(
        "Invalid status transition from '{from}' to '{to}'. Allowed: [{}]",
        join_statuses(.allowed)
    )]
    InvalidTransition {
        from: IncidentStatus,
        to: IncidentStatus,
        allowed: Vec<IncidentStatus>,
    },

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Dependency error: {0}")]
    Dependency(String),

    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl RespondError {
    pub fn incident_not_found(id: impl ToString) -> Self {
        RespondError::NotFound {
            kind: "Incident",
            id: id.to_string(),
        }
    }

    pub fn event_not_found(id: impl ToString) -> Self {
        RespondError::NotFound {
            kind: "Event",
            id: id.to_string(),
        }
    }

    pub fn deployment_not_found(id: impl ToString) -> Self {
        RespondError::NotFound {
            kind: "Deployment",
            id: id.to_string(),
        }
    }

    /// True for errors caused by the caller's input, including rejected
    /// status transitions.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            RespondError::Validation(_) | RespondError::InvalidTransition { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RespondError::NotFound { .. })
    }
}

fn join_statuses(statuses: &[IncidentStatus]) -> String {
    statuses
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<toml::de::Error> for RespondError {
    fn from(err: toml::de::Error) -> Self {
        RespondError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for RespondError {
    fn from(err: toml::ser::Error) -> Self {
        RespondError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for RespondError {
    fn from(err: serde_json::Error) -> Self {
        RespondError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for RESPOND operations.
pub type Result<T> = std::result::Result<T, RespondError>;
