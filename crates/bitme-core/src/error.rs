use std::fmt::{Display, Formatter};
use thiserror::Error;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Why a write was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteErrorKind {
    /// A short or admin URL is already taken.
    DuplicateKey,
    /// The short URL was never registered.
    Unregistered,
    /// Any other schema constraint rejected the row.
    Constraint,
    /// The statement failed for a reason unrelated to the data.
    Other,
}

impl Display for WriteErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteErrorKind::DuplicateKey => write!(f, "duplicate key"),
            WriteErrorKind::Unregistered => write!(f, "unregistered"),
            WriteErrorKind::Constraint => write!(f, "constraint violation"),
            WriteErrorKind::Other => write!(f, "other"),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("storage connection failed: {0}")]
    Connection(String),
    #[error("storage write failed ({kind}): {message}")]
    Write {
        kind: WriteErrorKind,
        message: String,
    },
    #[error("storage read failed: {0}")]
    Read(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl StorageError {
    pub fn write(kind: WriteErrorKind, message: impl Into<String>) -> Self {
        Self::Write {
            kind,
            message: message.into(),
        }
    }

    pub fn duplicate_key(message: impl Into<String>) -> Self {
        Self::write(WriteErrorKind::DuplicateKey, message)
    }

    pub fn unregistered(short_url: &str) -> Self {
        Self::write(
            WriteErrorKind::Unregistered,
            format!("short url '{short_url}' is not registered"),
        )
    }

    /// Returns the write error kind, if this is a write error.
    pub fn write_kind(&self) -> Option<WriteErrorKind> {
        match self {
            StorageError::Write { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Connection failures may succeed when retried with backoff.
    /// Nothing else is retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StorageError::Connection(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_connection_errors_are_retryable() {
        assert!(StorageError::Connection("pool timed out".into()).is_retryable());
        assert!(!StorageError::duplicate_key("ab12").is_retryable());
        assert!(!StorageError::Read("boom".into()).is_retryable());
        assert!(!StorageError::NotFound("ab12".into()).is_retryable());
    }

    #[test]
    fn write_error_display_includes_kind() {
        let err = StorageError::unregistered("ab12");
        assert_eq!(err.write_kind(), Some(WriteErrorKind::Unregistered));
        assert_eq!(
            err.to_string(),
            "storage write failed (unregistered): short url 'ab12' is not registered"
        );
    }
}
