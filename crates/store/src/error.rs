//! Storage-layer error model and sqlx error mapping.

use thiserror::Error;

use stockroom_core::DomainError;

/// Result type used across the storage layer.
pub type StoreResult<T> = Result<T, StoreError>;

/// Storage-layer error.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Deterministic domain failure, surfaced unchanged to the caller.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Two transactions collided; the operation took no effect and the
    /// caller may retry.
    #[error("storage conflict: {0}")]
    Conflict(String),

    /// The backing store is unreachable (pool closed, timed out).
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Any other backend failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Map sqlx errors to `StoreError`.
///
/// | PostgreSQL code | Meaning | Mapping |
/// |---|---|---|
/// | `23505` | unique violation (concurrent insert) | `Conflict` |
/// | `23503` | foreign key violation (movement rows reference the product) | domain `Conflict` |
/// | `23514` | check constraint violation (stock/qty bounds) | domain invariant |
/// | `40001` | serialization failure | `Conflict` |
pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {operation}: {}", db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                Some("23503") => {
                    StoreError::Domain(DomainError::conflict("product has recorded movements"))
                }
                Some("23514") => StoreError::Domain(DomainError::invariant(msg)),
                Some("40001") => StoreError::Conflict(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool closed in {operation}"))
        }
        sqlx::Error::PoolTimedOut => {
            StoreError::Unavailable(format!("connection pool timed out in {operation}"))
        }
        _ => StoreError::Backend(format!("sqlx error in {operation}: {err}")),
    }
}
