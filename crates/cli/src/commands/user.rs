//! User and bearer-token management commands.

use bazaar_core::UserRole;
use uuid::Uuid;

use super::CliError;

/// Create a user and print a fresh bearer token.
///
/// # Errors
///
/// Returns an error for an invalid role/email, an existing email, or a
/// database failure.
pub async fn create(email: &str, name: &str, role: &str) -> Result<i32, CliError> {
    let role: UserRole = role
        .parse()
        .map_err(|_| CliError::InvalidRole(role.to_owned()))?;

    if !email.contains('@') || !email.contains('.') {
        return Err(CliError::InvalidEmail(email.to_owned()));
    }

    let pool = super::connect().await?;

    let existing: Option<i32> = sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(&pool)
        .await?;
    if existing.is_some() {
        return Err(CliError::UserExists(email.to_owned()));
    }

    let user_id: i32 = sqlx::query_scalar(
        "INSERT INTO users (email, name, role) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(email)
    .bind(name)
    .bind(role.as_str())
    .fetch_one(&pool)
    .await?;

    let token = insert_token(&pool, user_id).await?;
    tracing::info!("User created! ID: {user_id}, Email: {email}, Role: {role}");
    tracing::info!("Bearer token: {token}");

    Ok(user_id)
}

/// Issue a fresh bearer token for an existing user.
///
/// # Errors
///
/// Returns `CliError::UserNotFound` if the ID does not exist.
pub async fn issue_token(user_id: i32) -> Result<Uuid, CliError> {
    let pool = super::connect().await?;

    let exists: Option<i32> = sqlx::query_scalar("SELECT id FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&pool)
        .await?;
    if exists.is_none() {
        return Err(CliError::UserNotFound(user_id));
    }

    let token = insert_token(&pool, user_id).await?;
    tracing::info!("Bearer token for user {user_id}: {token}");
    Ok(token)
}

pub(crate) async fn insert_token(pool: &sqlx::PgPool, user_id: i32) -> Result<Uuid, CliError> {
    let token = Uuid::new_v4();
    sqlx::query("INSERT INTO api_tokens (token, user_id) VALUES ($1, $2)")
        .bind(token)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(token)
}
