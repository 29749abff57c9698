//! Classified build failures.

use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Why a query could not be built. Every variant carries the full,
/// newline-joined message shown to the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// Failed schema validation, or not valid syntax for its format
    #[error("{message}")]
    Malformed { message: String },

    /// Well formed, but semantically invalid
    #[error("{message}")]
    InvalidQuery { message: String },

    /// Names bags the user does not have
    #[error("{message}")]
    MissingBags {
        names: BTreeSet<String>,
        message: String,
    },

    /// Names bags that need a manual upgrade first
    #[error("{message}")]
    StaleBags {
        names: BTreeSet<String>,
        message: String,
    },

    /// Schema retrieval, JSON binding or the bag source failed
    #[error("{message}")]
    Internal { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Malformed,
    InvalidQuery,
    MissingBags,
    StaleBags,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Malformed => "malformed",
            ErrorKind::InvalidQuery => "invalid-query",
            ErrorKind::MissingBags => "missing-bags",
            ErrorKind::StaleBags => "stale-bags",
            ErrorKind::Internal => "internal",
        }
    }

    /// Caused by the request rather than the service
    pub fn is_client_error(self) -> bool {
        matches!(
            self,
            ErrorKind::Malformed | ErrorKind::InvalidQuery | ErrorKind::MissingBags
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl BuildError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BuildError::Malformed { .. } => ErrorKind::Malformed,
            BuildError::InvalidQuery { .. } => ErrorKind::InvalidQuery,
            BuildError::MissingBags { .. } => ErrorKind::MissingBags,
            BuildError::StaleBags { .. } => ErrorKind::StaleBags,
            BuildError::Internal { .. } => ErrorKind::Internal,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.kind().is_client_error()
    }

    pub fn message(&self) -> &str {
        match self {
            BuildError::Malformed { message }
            | BuildError::InvalidQuery { message }
            | BuildError::MissingBags { message, .. }
            | BuildError::StaleBags { message, .. }
            | BuildError::Internal { message } => message,
        }
    }

    /// Bag names behind a bag failure
    pub fn bag_names(&self) -> Option<&BTreeSet<String>> {
        match self {
            BuildError::MissingBags { names, .. } | BuildError::StaleBags { names, .. } => {
                Some(names)
            }
            _ => None,
        }
    }

    pub(crate) fn internal(e: impl fmt::Display) -> Self {
        BuildError::Internal {
            message: e.to_string(),
        }
    }
}
