//! Schema bootstrap.
//!
//! Statements are idempotent and run in one transaction.

use crate::{PgPool, StorageResult};

const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS oauth_clients (
        client_id                  TEXT PRIMARY KEY,
        client_name                TEXT,
        redirect_uris              TEXT[] NOT NULL,
        token_endpoint_auth_method TEXT NOT NULL,
        grant_types                TEXT[] NOT NULL,
        response_types             TEXT[] NOT NULL,
        issued_at                  TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS oauth_authorization_codes (
        code                  TEXT PRIMARY KEY,
        user_id               TEXT NOT NULL,
        client_id             TEXT NOT NULL REFERENCES oauth_clients (client_id) ON DELETE CASCADE,
        device_name           TEXT NOT NULL,
        code_challenge        TEXT NOT NULL,
        code_challenge_method TEXT NOT NULL,
        scopes                TEXT[] NOT NULL,
        redirect_uri          TEXT NOT NULL,
        created_at            TIMESTAMPTZ NOT NULL,
        expires_at            TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS oauth_authorization_codes_expires_at_idx
        ON oauth_authorization_codes (expires_at)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS oauth_token_grants (
        id                 UUID PRIMARY KEY,
        user_id            TEXT NOT NULL,
        client_id          TEXT NOT NULL REFERENCES oauth_clients (client_id) ON DELETE CASCADE,
        device_name        TEXT NOT NULL,
        access_token_hash  TEXT NOT NULL UNIQUE,
        refresh_token_hash TEXT NOT NULL UNIQUE,
        scopes             TEXT[] NOT NULL,
        created_at         TIMESTAMPTZ NOT NULL,
        expires_at         TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS oauth_token_grants_user_id_idx
        ON oauth_token_grants (user_id)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS user_sessions (
        id         TEXT PRIMARY KEY,
        user_id    TEXT NOT NULL,
        expires_at TIMESTAMPTZ NOT NULL
    )
    "#,
];

/// Creates every auth table and index that does not exist yet.
///
/// # Errors
///
/// Returns an error if a statement or the commit fails.
pub async fn ensure_schema(pool: &PgPool) -> StorageResult<()> {
    let mut tx = pool.begin().await?;
    for statement in STATEMENTS {
        sqlx_core::query::query(*statement).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    tracing::info!("Auth schema ready");
    Ok(())
}
