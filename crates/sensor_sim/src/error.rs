//! Simulator error types

use contracts::ContractError;
use thiserror::Error;

/// Status code reported for injected failures
pub const STATUS_INJECTED_FAILURE: u32 = 0x0001_0001;

/// Status code reported when the context has been shut down
pub const STATUS_CONTEXT_STOPPED: u32 = 0x0001_0002;

/// Status code reported for an unsupported gesture
pub const STATUS_UNKNOWN_GESTURE: u32 = 0x0001_0003;

/// Status code reported for an invalid output mode
pub const STATUS_INVALID_MODE: u32 = 0x0001_0004;

/// Simulated native SDK error
#[derive(Debug, Error)]
pub enum SimError {
    /// Gesture name not supported by the gesture generator
    #[error("unknown gesture '{name}'")]
    UnknownGesture { name: String },

    /// Callback handle was never registered (or already unregistered)
    #[error("unknown callback handle {handle} on '{source_name}'")]
    UnknownCallback {
        source_name: &'static str,
        handle: u64,
    },

    /// Output mode the depth generator cannot produce
    #[error("invalid output mode {x_res}x{y_res}@{fps}")]
    InvalidMode { x_res: u32, y_res: u32, fps: u32 },

    /// Failure armed through `fail_next_register` / `fail_next_unregister`
    #[error("injected failure in '{operation}'")]
    Injected { operation: &'static str },

    /// `wait_and_update_all` after `shutdown`
    #[error("context stopped")]
    Stopped,
}

impl SimError {
    /// Native status code equivalent
    pub fn status(&self) -> u32 {
        match self {
            Self::UnknownGesture { .. } => STATUS_UNKNOWN_GESTURE,
            Self::InvalidMode { .. } => STATUS_INVALID_MODE,
            Self::Injected { .. } | Self::UnknownCallback { .. } => STATUS_INJECTED_FAILURE,
            Self::Stopped => STATUS_CONTEXT_STOPPED,
        }
    }
}

impl From<SimError> for ContractError {
    fn from(err: SimError) -> Self {
        match err {
            SimError::UnknownCallback { handle, .. } => ContractError::UnknownCallback { handle },
            SimError::Injected { operation } => {
                ContractError::native(operation, STATUS_INJECTED_FAILURE, "injected failure")
            }
            other => {
                let status = other.status();
                ContractError::native("sim", status, other.to_string())
            }
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_contract_error_keeps_status() {
        let err: ContractError = SimError::Injected {
            operation: "register_native",
        }
        .into();
        assert_eq!(err.status(), Some(STATUS_INJECTED_FAILURE));

        let err: ContractError = SimError::UnknownCallback {
            source_name: "hands",
            handle: 9,
        }
        .into();
        assert!(matches!(err, ContractError::UnknownCallback { handle: 9 }));

        let err: ContractError = SimError::Stopped.into();
        assert_eq!(err.status(), Some(STATUS_CONTEXT_STOPPED));
    }
}
