//! # Database Errors
//!
//! ```text
//!   sqlx::Error ──┐
//!                 ├──► DbError ──► PaymentError ──► ApiError (HTTP status)
//!   CoreError ────┘      │
//!                        └─ Domain(CoreError) is passed through untouched,
//!                           so InsufficientStock still reads as itself at
//!                           the edge
//! ```
//!
//! Lock contention is the one storage failure the checkout path retries;
//! [`DbError::is_retryable`] is what it asks.

use sqlx::error::ErrorKind;
use storefront_core::{CoreError, ValidationError};
use thiserror::Error;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A business rule said no.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// SQLITE_BUSY or SQLITE_LOCKED outlived the busy timeout. Nothing was
    /// committed.
    #[error("Concurrent modification, please retry: {0}")]
    ConcurrencyConflict(String),

    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    /// Usually a product deleted while still referenced by a cart or order.
    #[error("Foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),

    /// Negative stock or a non-positive quantity reached the table.
    #[error("Check constraint violated: {0}")]
    CheckViolation(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// True when re-running the whole operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DbError::ConcurrencyConflict(_) | DbError::PoolExhausted)
    }
}

// SQLite primary result codes. Extended codes keep these in the low byte
// (517 is BUSY_SNAPSHOT).
const SQLITE_BUSY: i64 = 5;
const SQLITE_LOCKED: i64 = 6;

fn is_lock_contention(code: Option<&str>, message: &str) -> bool {
    let primary = code
        .and_then(|c| c.parse::<i64>().ok())
        .map(|c| c & 0xff);

    matches!(primary, Some(SQLITE_BUSY) | Some(SQLITE_LOCKED))
        || message.contains("database is locked")
        || message.contains("database table is locked")
}

fn classify(err: &dyn sqlx::error::DatabaseError) -> DbError {
    let message = err.message().to_string();
    if is_lock_contention(err.code().as_deref(), &message) {
        return DbError::ConcurrencyConflict(message);
    }
    match err.kind() {
        ErrorKind::UniqueViolation => DbError::UniqueViolation(message),
        ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation(message),
        ErrorKind::CheckViolation | ErrorKind::NotNullViolation => {
            DbError::CheckViolation(message)
        }
        _ => DbError::QueryFailed(message),
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),
            sqlx::Error::Database(ref db_err) => classify(db_err.as_ref()),
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".to_string()),
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<ValidationError> for DbError {
    fn from(err: ValidationError) -> Self {
        DbError::Domain(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_contention_codes() {
        assert!(is_lock_contention(Some("5"), ""));
        assert!(is_lock_contention(Some("517"), ""));
        assert!(is_lock_contention(Some("6"), ""));
        assert!(is_lock_contention(None, "database is locked"));
        assert!(!is_lock_contention(Some("2067"), "UNIQUE constraint failed: products.id"));
    }

    #[test]
    fn test_domain_errors_keep_their_message() {
        let err: DbError = CoreError::EmptyCart.into();
        assert_eq!(err.to_string(), "Cart is empty");
        assert!(!err.is_retryable());
        assert!(DbError::ConcurrencyConflict("busy".into()).is_retryable());
        assert!(DbError::PoolExhausted.is_retryable());
    }

    #[tokio::test]
    async fn test_constraint_errors_are_classified() {
        let db = crate::Database::new(crate::DbConfig::in_memory())
            .await
            .unwrap();

        let err: DbError = sqlx::query(
            "INSERT INTO cart_items (id, cart_id, product_id, quantity, created_at, updated_at)
             VALUES ('i', 'missing', 'missing', 1, 'now', 'now')",
        )
        .execute(db.pool())
        .await
        .unwrap_err()
        .into();
        assert!(matches!(err, DbError::ForeignKeyViolation(_)), "{err:?}");
    }
}
