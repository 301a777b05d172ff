//! Translation of driver errors into [`StorageError`].
//!
//! Connection-level failures are classified the same way on every path.
//! Everything else is reported as a read or a write failure depending on
//! the operation that hit it.

use bitme_core::{StorageError, WriteErrorKind};
use sqlx::error::{DatabaseError, ErrorKind};

/// SQLSTATE classes that mean the session itself is unusable.
const CONNECTION_EXCEPTION_CLASS: &str = "08";
const INVALID_AUTHORIZATION_CLASS: &str = "28";
const OPERATOR_INTERVENTION_CLASS: &str = "57";

fn sqlstate_class(err: &dyn DatabaseError) -> Option<String> {
    err.code().map(|code| code.chars().take(2).collect())
}

fn is_connection_error(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Protocol(_) => true,
        sqlx::Error::Database(db) => matches!(
            sqlstate_class(&**db).as_deref(),
            Some(CONNECTION_EXCEPTION_CLASS)
                | Some(INVALID_AUTHORIZATION_CLASS)
                | Some(OPERATOR_INTERVENTION_CLASS)
        ),
        _ => false,
    }
}

/// Maps failures hit while acquiring a connection or opening a transaction.
pub fn map_connection_error(err: sqlx::Error) -> StorageError {
    match err {
        sqlx::Error::Configuration(source) => StorageError::InvalidArgument(source.to_string()),
        other => StorageError::Connection(other.to_string()),
    }
}

/// Maps failures on read paths.
pub fn map_read_error(err: sqlx::Error) -> StorageError {
    if is_connection_error(&err) {
        return map_connection_error(err);
    }
    StorageError::Read(err.to_string())
}

/// Maps failures on write paths, including the commit.
pub fn map_write_error(err: sqlx::Error) -> StorageError {
    if is_connection_error(&err) {
        return map_connection_error(err);
    }

    let kind = match err.as_database_error().map(DatabaseError::kind) {
        Some(ErrorKind::UniqueViolation) => WriteErrorKind::DuplicateKey,
        Some(ErrorKind::ForeignKeyViolation)
        | Some(ErrorKind::NotNullViolation)
        | Some(ErrorKind::CheckViolation) => WriteErrorKind::Constraint,
        _ => WriteErrorKind::Other,
    };

    StorageError::write(kind, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_exhaustion_is_a_connection_error() {
        let err = map_read_error(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, StorageError::Connection(_)));

        let err = map_write_error(sqlx::Error::PoolClosed);
        assert!(matches!(err, StorageError::Connection(_)));
    }

    #[test]
    fn missing_row_on_read_path_is_a_read_error() {
        let err = map_read_error(sqlx::Error::RowNotFound);
        assert!(matches!(err, StorageError::Read(_)));
    }

    #[test]
    fn unclassified_write_failure_keeps_other_kind() {
        let err = map_write_error(sqlx::Error::RowNotFound);
        assert_eq!(err.write_kind(), Some(WriteErrorKind::Other));
    }

    #[test]
    fn bad_configuration_is_an_invalid_argument() {
        let err = map_connection_error(sqlx::Error::Configuration("bad dsn".into()));
        assert!(matches!(err, StorageError::InvalidArgument(_)));
    }
}
