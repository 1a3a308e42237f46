//! Error types shared across the store

use thiserror::Error;

use crate::catalog::PolicyId;

pub type StoreResult<T> = Result<T, StoreError>;

/// A value token that could not be read as an amount.
///
/// Recovered locally by the codec; only surfaced by [`crate::units::parse_amount`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty amount")]
    Empty,

    #[error("invalid amount '{0}'")]
    Invalid(String),

    #[error("amount '{0}' overflows when converted to cakes")]
    Overflow(String),
}

/// Failures of the external settings provider
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("settings i/o failed for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("settings file {path} is not valid JSON: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("settings provider unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unknown factor key '{0}'")]
    UnknownKey(String),

    #[error("failed to persist {policy:?} settings: {source}")]
    Persist {
        policy: PolicyId,
        #[source]
        source: ProviderError,
    },

    #[error("settings provider failed: {0}")]
    Provider(#[source] ProviderError),

    #[error("store service is closed")]
    Closed,
}

impl StoreError {
    pub fn is_unknown_key(&self) -> bool {
        matches!(self, StoreError::UnknownKey(_))
    }
}
