//! Error taxonomy for the resolution engine
//!
//! Callers need to tell "the input was bad" apart from "an upstream dependency
//! failed" and from "the database failed", so each of those is its own
//! variant of [`ResolutionError`].

use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::session::SessionError;

/// External collaborator that produced a [`ProviderError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collaborator {
    Vision,
    BackgroundRemoval,
    ObjectStorage,
    BarcodeCatalog,
    IdentityProvider,
}

impl Collaborator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collaborator::Vision => "vision analysis",
            Collaborator::BackgroundRemoval => "background removal",
            Collaborator::ObjectStorage => "object storage",
            Collaborator::BarcodeCatalog => "barcode catalog",
            Collaborator::IdentityProvider => "identity provider",
        }
    }
}

impl fmt::Display for Collaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of an external collaborator call
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The collaborator answered, but has nothing for the given key
    #[error("{collaborator} has no record for {key}")]
    NotFound {
        collaborator: Collaborator,
        key: String,
    },

    /// The bounding timeout elapsed before the collaborator answered
    #[error("{collaborator} did not answer within {after:?}")]
    Timeout {
        collaborator: Collaborator,
        after: Duration,
    },

    /// Network, quota, auth or decoding failure
    #[error("{collaborator} failed: {message}")]
    Upstream {
        collaborator: Collaborator,
        message: String,
    },
}

impl ProviderError {
    pub fn upstream(collaborator: Collaborator, message: impl fmt::Display) -> Self {
        ProviderError::Upstream {
            collaborator,
            message: message.to_string(),
        }
    }

    pub fn not_found(collaborator: Collaborator, key: impl Into<String>) -> Self {
        ProviderError::NotFound {
            collaborator,
            key: key.into(),
        }
    }

    pub fn collaborator(&self) -> Collaborator {
        match self {
            ProviderError::NotFound { collaborator, .. }
            | ProviderError::Timeout { collaborator, .. }
            | ProviderError::Upstream { collaborator, .. } => *collaborator,
        }
    }
}

/// Outcome of a persistence operation that did not succeed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    /// A unique constraint rejected the write
    #[error("unique constraint violated: {0}")]
    Conflict(String),

    /// I/O or driver failure
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Failure of the one-way credential primitive
#[derive(Error, Debug)]
#[error("credential operation failed: {0}")]
pub struct CredentialError(pub String);

/// Error type surfaced by every resolution operation
#[derive(Error, Debug)]
pub enum ResolutionError {
    /// Malformed identifiers or missing required fields; nothing was done
    #[error("validation failed: {0}")]
    Validation(String),

    /// An upstream dependency failed
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The persistence layer failed
    #[error("persistence error: {0}")]
    Persistence(StoreError),

    /// A uniqueness rule rejected the entity
    #[error("conflict: {0}")]
    Conflict(String),

    /// Login with a wrong password or an unknown account
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Hashing or token signing failed
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ResolutionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(what) => ResolutionError::Conflict(what),
            other => ResolutionError::Persistence(other),
        }
    }
}

impl From<CredentialError> for ResolutionError {
    fn from(err: CredentialError) -> Self {
        ResolutionError::Internal(err.to_string())
    }
}

impl From<SessionError> for ResolutionError {
    fn from(err: SessionError) -> Self {
        ResolutionError::Internal(err.to_string())
    }
}

/// Type alias for Result with ResolutionError
pub type ResolutionResult<T> = Result<T, ResolutionError>;
