//! Database migration commands.
//!
//! Migrations are embedded at compile time from `crates/api/migrations/`
//! and applied in order against `API_DATABASE_URL`.

use super::CliError;

/// Run API database migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn api() -> Result<(), CliError> {
    let pool = super::connect().await?;

    tracing::info!("Running API migrations...");
    sqlx::migrate!("../api/migrations").run(&pool).await?;

    tracing::info!("API migrations complete!");
    Ok(())
}
