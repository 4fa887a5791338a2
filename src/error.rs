//! Unified engine error model.
//! Every failure the engine can surface is one of these variants, each carrying a stable
//! machine-readable code and a human message, so the interception layer and the CLI can map
//! them without string matching.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize, Error, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineError {
    /// Malformed rule records or engine configuration. Loads fail as a whole.
    #[error("{code}: {message}")]
    Config { code: String, message: String },
    /// An operation kind the rule selector does not know. Caller-side contract violation.
    #[error("{code}: {message}")]
    UnsupportedOperation { code: String, message: String },
    #[error("{code}: {message}")]
    Io { code: String, message: String },
    #[error("{code}: {message}")]
    Internal { code: String, message: String },
}

impl EngineError {
    pub fn code_str(&self) -> &str {
        match self {
            EngineError::Config { code, .. }
            | EngineError::UnsupportedOperation { code, .. }
            | EngineError::Io { code, .. }
            | EngineError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            EngineError::Config { message, .. }
            | EngineError::UnsupportedOperation { message, .. }
            | EngineError::Io { message, .. }
            | EngineError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn config<S: Into<String>>(code: S, msg: S) -> Self { EngineError::Config { code: code.into(), message: msg.into() } }
    pub fn unsupported<S: Into<String>>(code: S, msg: S) -> Self { EngineError::UnsupportedOperation { code: code.into(), message: msg.into() } }
    pub fn io<S: Into<String>>(code: S, msg: S) -> Self { EngineError::Io { code: code.into(), message: msg.into() } }
    pub fn internal<S: Into<String>>(code: S, msg: S) -> Self { EngineError::Internal { code: code.into(), message: msg.into() } }

    /// Fatal errors indicate an integration bug and must abort rather than degrade per request.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EngineError::UnsupportedOperation { .. })
    }

    /// Process exit code used by the CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            EngineError::Config { .. } => 78,               // EX_CONFIG
            EngineError::UnsupportedOperation { .. } => 70, // EX_SOFTWARE
            EngineError::Io { .. } => 74,                   // EX_IOERR
            EngineError::Internal { .. } => 70,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        let code = match err.kind() {
            std::io::ErrorKind::NotFound => "io_not_found",
            std::io::ErrorKind::PermissionDenied => "io_permission_denied",
            _ => "io_error",
        };
        EngineError::Io { code: code.into(), message: err.to_string() }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Config { code: "config_parse".into(), message: err.to_string() }
    }
}

impl From<anyhow::Error> for EngineError {
    fn from(err: anyhow::Error) -> Self {
        // Default mapping: treat as Internal unless downcasted elsewhere
        match err.downcast::<EngineError>() {
            Ok(e) => e,
            Err(err) => EngineError::Internal { code: "internal".into(), message: err.to_string() },
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;
