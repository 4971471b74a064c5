//! Unified error types for the enrichment engine.
//!
//! Error codes:
//! - BROKER_001-003: Broker connectivity and session errors
//! - DB_001-002: Store errors
//! - UPSTREAM_001-002: External lookup service errors

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Broker error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerErrorCode {
    /// BROKER_001: Could not connect or subscribe
    Connect,
    /// BROKER_002: Fetch or produce failed
    Transport,
    /// BROKER_003: Consumer session expired before commit
    SessionExpired,
}

impl BrokerErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Connect => "BROKER_001",
            Self::Transport => "BROKER_002",
            Self::SessionExpired => "BROKER_003",
        }
    }
}

/// Store error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbErrorCode {
    /// DB_001: Failed to write rows
    WriteFailed,
    /// DB_002: Failed to read rows
    ReadFailed,
}

impl DbErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::WriteFailed => "DB_001",
            Self::ReadFailed => "DB_002",
        }
    }
}

/// External lookup error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamErrorCode {
    /// UPSTREAM_001: Request failed, timed out, or returned non-2xx
    RequestFailed,
    /// UPSTREAM_002: Response body could not be parsed
    InvalidResponse,
}

impl UpstreamErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::RequestFailed => "UPSTREAM_001",
            Self::InvalidResponse => "UPSTREAM_002",
        }
    }
}

/// Unified error type for the enrichment engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Broker error with code.
    #[error("[{code}] {message}")]
    Broker { code: &'static str, message: String },

    /// Store error with code.
    #[error("[{code}] {message}")]
    Database { code: &'static str, message: String },

    /// External lookup error with code.
    #[error("[{code}] {service}: {message}")]
    Upstream {
        code: &'static str,
        service: &'static str,
        message: String,
    },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a broker error.
    pub fn broker(code: BrokerErrorCode, msg: impl Into<String>) -> Self {
        Self::Broker {
            code: code.code(),
            message: msg.into(),
        }
    }

    /// Create a store error.
    pub fn database(code: DbErrorCode, msg: impl Into<String>) -> Self {
        Self::Database {
            code: code.code(),
            message: msg.into(),
        }
    }

    /// Create an external lookup error.
    pub fn upstream(code: UpstreamErrorCode, service: &'static str, msg: impl Into<String>) -> Self {
        Self::Upstream {
            code: code.code(),
            service,
            message: msg.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error means the consumer session was lost and the
    /// current batch will be redelivered.
    pub fn is_session_expired(&self) -> bool {
        matches!(
            self,
            Self::Broker { code, .. } if *code == BrokerErrorCode::SessionExpired.code()
        )
    }

    /// Get the error code if this is a coded error.
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::Broker { code, .. } => Some(code),
            Self::Database { code, .. } => Some(code),
            Self::Upstream { code, .. } => Some(code),
            _ => None,
        }
    }
}
