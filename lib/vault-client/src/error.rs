use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failures while reading the transport configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {0}")]
    MissingField(String),

    #[error("Invalid configuration value for {name}: {reason}")]
    InvalidField { name: String, reason: String },

    #[error("Failed to load env file '{path}': {message}")]
    EnvFile { path: PathBuf, message: String },

    #[error("Invalid secret reference '{reference}': {reason}")]
    InvalidReference { reference: String, reason: String },
}

impl ConfigError {
    pub fn missing(name: impl Into<String>) -> Self {
        Self::MissingField(name.into())
    }

    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_reference(reference: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidReference {
            reference: reference.into(),
            reason: reason.into(),
        }
    }
}

/// Failures while building a client.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Invalid Vault address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Auth token contains characters not allowed in an HTTP header")]
    InvalidToken,

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

impl ConnectionError {
    pub fn invalid_address(address: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAddress {
            address: address.into(),
            reason: reason.into(),
        }
    }
}

/// Backend failure categories, surfaced verbatim from Vault's status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    Unauthenticated,
    Forbidden,
    NotFound,
    RateLimited,
    Unavailable,
    Network,
    InvalidResponse,
    UnexpectedStatus(u16),
}

impl BackendErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::RateLimited => "rate_limited",
            Self::Unavailable => "unavailable",
            Self::Network => "network",
            Self::InvalidResponse => "invalid_response",
            Self::UnexpectedStatus(_) => "unexpected_status",
        }
    }

    /// No backend kind is treated as transient; retry policy belongs to the caller.
    pub fn is_transient(&self) -> bool {
        false
    }
}

impl std::fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnexpectedStatus(status) => write!(f, "unexpected_status({status})"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Failures while resolving a single secret field.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("Timed out after {after:?} reading secret '{path}'")]
    Timeout { path: String, after: Duration },

    #[error("Key '{key}' not found in secret '{path}'")]
    KeyNotFound { path: String, key: String },

    #[error("Vault error ({kind}) reading secret '{path}': {message}")]
    Backend {
        kind: BackendErrorKind,
        path: String,
        message: String,
    },

    #[error("Read of secret '{path}' was cancelled")]
    Cancelled { path: String },
}

impl ResolutionError {
    pub fn backend(
        kind: BackendErrorKind,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Backend {
            kind,
            path: path.into(),
            message: message.into(),
        }
    }

    /// Backend kind, if this is a backend failure.
    pub fn kind(&self) -> Option<BackendErrorKind> {
        match self {
            Self::Backend { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Backend { kind, .. } => kind.is_transient(),
            Self::KeyNotFound { .. } | Self::Cancelled { .. } => false,
        }
    }
}

/// Every failure the crate can return, grouped by stage.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),
}

impl Error {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Resolution(e) => e.is_retryable(),
            Self::Config(_) | Self::Connection(_) => false,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
