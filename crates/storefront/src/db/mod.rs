//! Database operations for the storefront `PostgreSQL`.
//!
//! ## Tables
//!
//! - `categories` - Two-level category tree (`parent_id`)
//! - `brands`
//! - `health_goals` - Goals products are tagged with (via `product_health_goals`)
//! - `products` / `product_variants`
//! - `reviews` - Read-only from this service
//! - `carts` - One per user or guest token
//! - `cart_items` - Lines keyed by `(cart_id, product_id, variant_id)`
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p nutrishop-cli -- migrate
//! ```

pub mod carts;
pub mod catalog;

use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use thiserror::Error;

use crate::config::DatabaseConfig;

pub use carts::CartRepository;
pub use catalog::CatalogRepository;

/// `PostgreSQL` error code raised when `statement_timeout` cancels a query.
const QUERY_CANCELED: &str = "57014";

/// Attempts made for a read-only query before giving up.
const READ_ATTEMPTS: u32 = 3;

/// Delay before the first read retry; doubles after each attempt.
const READ_RETRY_BASE_DELAY: Duration = Duration::from_millis(50);

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(sqlx::Error),

    /// No pooled connection became available within the acquire timeout.
    #[error("connection pool exhausted")]
    PoolExhausted,

    /// The statement ran past the server-side statement timeout.
    #[error("statement timed out")]
    Timeout,

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Unique constraint violation.
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// Foreign key violation (referenced row does not exist).
    #[error("invalid reference: {0}")]
    InvalidReference(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            let constraint = || db.constraint().unwrap_or_default().to_string();
            if db.code().as_deref() == Some(QUERY_CANCELED) {
                return Self::Timeout;
            }
            if db.is_foreign_key_violation() {
                return Self::InvalidReference(constraint());
            }
            if db.is_unique_violation() {
                return Self::Conflict(constraint());
            }
        }

        match err {
            sqlx::Error::PoolTimedOut => Self::PoolExhausted,
            other => Self::Database(other),
        }
    }
}

impl RepositoryError {
    /// Whether the storage layer is saturated rather than broken.
    ///
    /// Callers should answer with 503 and a `Retry-After` hint.
    #[must_use]
    pub const fn is_overloaded(&self) -> bool {
        matches!(self, Self::PoolExhausted | Self::Timeout)
    }

    /// Whether a read that failed this way may succeed if tried again.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::PoolExhausted | Self::Database(sqlx::Error::Io(_))
        )
    }
}

/// Create a `PostgreSQL` connection pool.
///
/// Every connection is opened with `statement_timeout` set, so a runaway
/// query is cancelled server-side instead of holding its connection.
///
/// # Errors
///
/// Returns `sqlx::Error` if the URL is invalid or the connection cannot be
/// established.
pub async fn create_pool(
    database_url: &SecretString,
    settings: &DatabaseConfig,
) -> Result<PgPool, sqlx::Error> {
    pool_options(settings)
        .connect_with(connect_options(database_url, settings)?)
        .await
}

/// Create a pool that connects on first use.
///
/// # Errors
///
/// Returns `sqlx::Error` if the URL is invalid.
pub fn create_lazy_pool(
    database_url: &SecretString,
    settings: &DatabaseConfig,
) -> Result<PgPool, sqlx::Error> {
    Ok(pool_options(settings).connect_lazy_with(connect_options(database_url, settings)?))
}

fn pool_options(settings: &DatabaseConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(settings.acquire_timeout)
}

fn connect_options(
    database_url: &SecretString,
    settings: &DatabaseConfig,
) -> Result<PgConnectOptions, sqlx::Error> {
    let statement_timeout_ms = settings.statement_timeout.as_millis().to_string();
    Ok(PgConnectOptions::from_str(database_url.expose_secret())?
        .options([("statement_timeout", statement_timeout_ms)]))
}

/// Run a read-only query, retrying transient failures with exponential backoff.
///
/// Only use this for idempotent reads. Mutations are never retried.
///
/// # Errors
///
/// Returns the last error once attempts are exhausted, or the first
/// non-transient error.
pub async fn retry_read<T, F, Fut>(mut op: F) -> Result<T, RepositoryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RepositoryError>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Err(err) if err.is_transient() && attempt < READ_ATTEMPTS => {
                let delay = READ_RETRY_BASE_DELAY * 2u32.pow(attempt - 1);
                tracing::warn!(
                    attempt,
                    error = %err,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "Transient database error, retrying read"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[test]
    fn test_pool_timeout_is_overloaded() {
        let err = RepositoryError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, RepositoryError::PoolExhausted));
        assert!(err.is_overloaded());
        assert!(err.is_transient());
    }

    #[test]
    fn test_row_not_found_is_not_transient() {
        let err = RepositoryError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, RepositoryError::Database(_)));
        assert!(!err.is_transient());
        assert!(!err.is_overloaded());
    }

    #[test]
    fn test_pool_closed_is_not_transient() {
        let err = RepositoryError::from(sqlx::Error::PoolClosed);
        assert!(!err.is_transient());
    }

    #[test]
    fn test_timeout_is_overloaded_but_not_retried() {
        let err = RepositoryError::Timeout;
        assert!(err.is_overloaded());
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_retry_read_recovers_from_transient_error() {
        let calls = AtomicU32::new(0);

        let result = retry_read(|| async {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(RepositoryError::PoolExhausted)
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_read_gives_up_after_attempts() {
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = retry_read(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(RepositoryError::PoolExhausted)
        })
        .await;

        assert!(matches!(result, Err(RepositoryError::PoolExhausted)));
        assert_eq!(calls.load(Ordering::SeqCst), READ_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_retry_read_does_not_retry_permanent_errors() {
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = retry_read(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(RepositoryError::DataCorruption("bad row".into()))
        })
        .await;

        assert!(matches!(result, Err(RepositoryError::DataCorruption(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
