//! Event hub error types

use contracts::ContractError;
use thiserror::Error;

/// Error a listener may return from its callback
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// Event hub error
#[derive(Debug, Error)]
pub enum HubError {
    /// Native registration failed; the listener was not added
    #[error("native registration failed for hub '{hub}': {source}")]
    Registration {
        hub: String,
        #[source]
        source: ContractError,
    },

    /// Native deregistration failed; the listener is still subscribed
    #[error("native deregistration failed for hub '{hub}': {source}")]
    Deregistration {
        hub: String,
        #[source]
        source: ContractError,
    },
}

impl HubError {
    /// Underlying native error
    pub fn native(&self) -> &ContractError {
        match self {
            Self::Registration { source, .. } | Self::Deregistration { source, .. } => source,
        }
    }
}

/// Event hub Result type alias
pub type Result<T> = std::result::Result<T, HubError>;
