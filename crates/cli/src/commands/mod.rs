//! CLI command implementations.

pub mod migrate;
pub mod seed;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

use nutrishop_storefront::config::DatabaseConfig;

/// Errors shared by commands that talk to the storefront database.
#[derive(Debug, Error)]
pub enum DatabaseSetupError {
    /// Neither database URL variable is set.
    #[error("Missing environment variable: STOREFRONT_DATABASE_URL (or DATABASE_URL)")]
    MissingDatabaseUrl,

    /// Connection failed.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Connect to the storefront database named by the environment.
///
/// Uses the same pool settings as the server so statements are bounded by
/// the same timeout.
///
/// # Errors
///
/// Returns an error if no URL is configured or the connection fails.
pub async fn connect() -> Result<PgPool, DatabaseSetupError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| DatabaseSetupError::MissingDatabaseUrl)?;

    tracing::info!("Connecting to storefront database...");
    let pool =
        nutrishop_storefront::db::create_pool(&database_url, &DatabaseConfig::default()).await?;

    Ok(pool)
}
