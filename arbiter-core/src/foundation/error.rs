use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Crate-wide error type. Arbitration itself never fails hard; these
/// surface from the edges (store lock, transports, config, wire parsing).
#[derive(Error, Debug)]
pub enum ArbiterError {
    #[error("store error during {operation}: {details}")]
    StoreError { operation: String, details: String },

    #[error("config error: {0}")]
    ConfigError(String),

    #[error("transport error during {operation}: {details}")]
    TransportError { operation: String, details: String },

    #[error("priority directory error for {app_id}: {details}")]
    DirectoryError { app_id: String, details: String },

    #[error("malformed intent: {0}")]
    MalformedIntent(String),

    #[error("serialization error: {0}")]
    SerializationError(String),

    #[error("io error: {0}")]
    IoError(String),

    #[error("{0}")]
    Message(String),
}

/// Stable machine-readable classification of an [`ArbiterError`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Store,
    Config,
    Transport,
    Directory,
    Malformed,
    Serialization,
    Io,
    Internal,
}

impl ArbiterError {
    pub fn store(operation: impl Into<String>, details: impl Into<String>) -> Self {
        ArbiterError::StoreError { operation: operation.into(), details: details.into() }
    }

    pub fn transport(operation: impl Into<String>, details: impl Into<String>) -> Self {
        ArbiterError::TransportError { operation: operation.into(), details: details.into() }
    }

    pub fn directory(app_id: impl Into<String>, details: impl Into<String>) -> Self {
        ArbiterError::DirectoryError { app_id: app_id.into(), details: details.into() }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ArbiterError::StoreError { .. } => ErrorCode::Store,
            ArbiterError::ConfigError(_) => ErrorCode::Config,
            ArbiterError::TransportError { .. } => ErrorCode::Transport,
            ArbiterError::DirectoryError { .. } => ErrorCode::Directory,
            ArbiterError::MalformedIntent(_) => ErrorCode::Malformed,
            ArbiterError::SerializationError(_) => ErrorCode::Serialization,
            ArbiterError::IoError(_) => ErrorCode::Io,
            ArbiterError::Message(_) => ErrorCode::Internal,
        }
    }

    /// Extra detail beyond the display string, when a variant carries any.
    pub fn context(&self) -> Option<String> {
        match self {
            ArbiterError::StoreError { operation, .. } => Some(format!("operation={}", operation)),
            ArbiterError::TransportError { operation, .. } => Some(format!("operation={}", operation)),
            ArbiterError::DirectoryError { app_id, .. } => Some(format!("app_id={}", app_id)),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ArbiterError {
    fn from(err: std::io::Error) -> Self {
        ArbiterError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for ArbiterError {
    fn from(err: serde_json::Error) -> Self {
        ArbiterError::SerializationError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ArbiterError>;
