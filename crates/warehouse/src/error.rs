//! Warehouse-side error taxonomy.
//!
//! Neither variant is retried automatically; retrying the whole series on a
//! later run is safe because the merge is idempotent.

use thiserror::Error;

/// Errors from the staging/merge protocol.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// Destination schema does not match the staged rows.
    #[error("merge conflict: {message}")]
    MergeConflict {
        /// Description of the schema mismatch.
        message: String,
    },

    /// Transient backend failure (connection, timeout, pool exhaustion).
    #[error("storage unavailable: {message}")]
    StorageUnavailable {
        /// Description of the backend failure.
        message: String,
    },
}

impl WarehouseError {
    /// Creates a merge-conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::MergeConflict {
            message: message.into(),
        }
    }

    /// Creates a storage-unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::StorageUnavailable {
            message: message.into(),
        }
    }
}

/// Postgres error codes indicating the statement disagreed with the schema
/// rather than the backend failing.
const SCHEMA_ERROR_CODES: [&str; 4] = [
    "42P01", // undefined_table
    "42703", // undefined_column
    "42804", // datatype_mismatch
    "42601", // syntax_error
];

/// Classifies a sqlx error into the warehouse taxonomy.
#[must_use]
pub fn classify(err: sqlx::Error) -> WarehouseError {
    if let sqlx::Error::Database(db_err) = &err {
        if let Some(code) = db_err.code() {
            if SCHEMA_ERROR_CODES.contains(&code.as_ref()) {
                return WarehouseError::conflict(db_err.to_string());
            }
        }
    }
    WarehouseError::unavailable(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_errors_are_storage_unavailable() {
        let err = classify(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, WarehouseError::StorageUnavailable { .. }));
    }

    #[test]
    fn test_display_formats() {
        let conflict = WarehouseError::conflict("column \"volume\" does not exist");
        assert!(conflict.to_string().contains("merge conflict"));

        let unavailable = WarehouseError::unavailable("connection refused");
        assert!(unavailable.to_string().contains("storage unavailable"));
    }
}
