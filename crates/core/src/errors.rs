use thiserror::Error;

use crate::flows::FlowTransitionError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error(transparent)]
    FlowTransition(#[from] FlowTransitionError),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("authentication failure: {0}")]
    Authentication(String),
    #[error("integration failure: {0}")]
    Integration(String),
}

impl ApplicationError {
    /// Stable classification used as the `error_class` log field.
    pub fn class(&self) -> &'static str {
        match self {
            Self::Domain(DomainError::FlowTransition(_)) => "flow_transition",
            Self::Authentication(_) => "authentication",
            Self::Integration(_) => "integration",
        }
    }

    /// Authentication failures have no degraded mode; operators must fix credentials.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }
}
