//! Error types for response validation, configuration and access policy.

use std::fmt;
use std::path::PathBuf;

/// Classification of a rejected response, ordered by trust level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The token violates basic structural rules.
    MalformedResponse,
    /// The token is well-formed but fails a semantic, temporal or
    /// cryptographic check.
    InvalidResponse,
    /// The token names a signing key that is not in the trust store.
    PublicKeyNotFound,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MalformedResponse => "malformed response",
            Self::InvalidResponse => "invalid response",
            Self::PublicKeyNotFound => "public key not found",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rejected WLS response.
///
/// Callers match on [`WlsError::kind`]; `detail` is for humans and logs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {detail}")]
pub struct WlsError {
    pub kind: ErrorKind,
    pub detail: String,
}

impl WlsError {
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedResponse, detail)
    }

    pub fn invalid(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidResponse, detail)
    }

    pub fn key_not_found(kid: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::PublicKeyNotFound,
            format!("no trusted public key for key id {kid}"),
        )
    }

    pub fn is_malformed(&self) -> bool {
        self.kind == ErrorKind::MalformedResponse
    }

    pub fn is_invalid(&self) -> bool {
        self.kind == ErrorKind::InvalidResponse
    }

    /// Exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self.kind {
            ErrorKind::MalformedResponse => 2,
            ErrorKind::InvalidResponse => 3,
            // Configuration gap rather than a hostile token
            ErrorKind::PublicKeyNotFound => 4,
        }
    }
}

/// Result type for response validation.
pub type WlsResult<T> = Result<T, WlsError>;

/// Configuration and key-material errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A config or key file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The YAML document could not be parsed.
    #[error("failed to parse config YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A trusted key entry could not be turned into an RSA public key.
    #[error("invalid public key for key id {kid}: {reason}")]
    InvalidKey { kid: String, reason: String },

    /// A value is out of range or inconsistent.
    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl ConfigError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// A validated response the application still refuses.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    /// The WLS reported a status other than 200.
    #[error("authentication unsuccessful: {status} ({description})")]
    Unsuccessful {
        status: u16,
        description: &'static str,
    },

    /// The principal lacks a required ptag.
    #[error("{principal} is not authorised: missing ptags {}", .missing.join(","))]
    NotAuthorised {
        principal: String,
        missing: Vec<String>,
    },

    /// The echoed params differ from what the request carried.
    #[error("params mismatch: expected {expected:?}, got {actual:?}")]
    ParamsMismatch { expected: String, actual: String },
}

impl PolicyError {
    /// Exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        5
    }
}
