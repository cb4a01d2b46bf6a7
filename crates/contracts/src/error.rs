//! Layered error definitions
//!
//! Categorized by source: config / native / frame / io

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Native Errors =====
    /// A native call returned a non-success status
    #[error("native call '{operation}' failed with status {status}: {message}")]
    NativeStatus {
        operation: String,
        status: u32,
        message: String,
    },

    /// Callback handle unknown to the native source
    #[error("unknown native callback handle {handle}")]
    UnknownCallback { handle: u64 },

    /// Frame buffer does not match the generator output mode
    #[error("frame buffer mismatch: expected {expected} samples, got {actual}")]
    FrameMismatch { expected: usize, actual: usize },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create native status error
    pub fn native(operation: impl Into<String>, status: u32, message: impl Into<String>) -> Self {
        Self::NativeStatus {
            operation: operation.into(),
            status,
            message: message.into(),
        }
    }

    /// Native status code, if this error came from the native layer
    pub fn status(&self) -> Option<u32> {
        match self {
            Self::NativeStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}
