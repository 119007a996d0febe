//! PostgreSQL authorization code storage.
//!
//! `take` is a single `DELETE ... RETURNING`, so concurrent redemptions of
//! the same code see exactly one row between them.

use std::sync::Arc;

use async_trait::async_trait;
use docket_auth::AuthResult;
use docket_auth::oauth::PkceChallengeMethod;
use docket_auth::storage::AuthorizationCodeStorage;
use docket_auth::types::{AuthorizationCode, ScopeSet};
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use time::OffsetDateTime;

use crate::{PgPool, StorageError, StorageResult, into_auth};

type CodeRow = (
    String,
    String,
    String,
    String,
    String,
    String,
    Vec<String>,
    String,
    OffsetDateTime,
    OffsetDateTime,
);

/// Authorization codes in `oauth_authorization_codes`.
#[derive(Debug, Clone)]
pub struct PgCodeStorage {
    pool: Arc<PgPool>,
}

impl PgCodeStorage {
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    async fn insert(&self, code: &AuthorizationCode) -> StorageResult<()> {
        query(
            r#"
            INSERT INTO oauth_authorization_codes (code, user_id, client_id, device_name,
                code_challenge, code_challenge_method, scopes, redirect_uri, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(&code.code)
        .bind(&code.user_id)
        .bind(&code.client_id)
        .bind(&code.device_name)
        .bind(&code.code_challenge)
        .bind(code.code_challenge_method.as_str())
        .bind(code.scopes.to_strings())
        .bind(&code.redirect_uri)
        .bind(code.created_at)
        .bind(code.expires_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| StorageError::from_insert(e, "Authorization code"))?;

        Ok(())
    }

    async fn delete_returning(&self, code: &str) -> StorageResult<Option<AuthorizationCode>> {
        let row: Option<CodeRow> = query_as(
            r#"
            DELETE FROM oauth_authorization_codes
            WHERE code = $1
            RETURNING code, user_id, client_id, device_name, code_challenge,
                      code_challenge_method, scopes, redirect_uri, created_at, expires_at
            "#,
        )
        .bind(code)
        .fetch_optional(&*self.pool)
        .await?;

        row.map(code_from_row).transpose()
    }

    async fn delete_expired(&self) -> StorageResult<u64> {
        let result = query("DELETE FROM oauth_authorization_codes WHERE expires_at <= now()")
            .execute(&*self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

fn code_from_row(row: CodeRow) -> StorageResult<AuthorizationCode> {
    let (
        code,
        user_id,
        client_id,
        device_name,
        code_challenge,
        method,
        scopes,
        redirect_uri,
        created_at,
        expires_at,
    ) = row;

    let code_challenge_method = PkceChallengeMethod::parse(&method).map_err(|_| {
        StorageError::invalid_data(format!("unknown code_challenge_method '{method}'"))
    })?;

    Ok(AuthorizationCode {
        code,
        user_id,
        client_id,
        device_name,
        code_challenge,
        code_challenge_method,
        scopes: ScopeSet::from_tokens(scopes.iter().map(String::as_str)),
        redirect_uri,
        created_at,
        expires_at,
    })
}

#[async_trait]
impl AuthorizationCodeStorage for PgCodeStorage {
    async fn create(&self, code: &AuthorizationCode) -> AuthResult<()> {
        into_auth(self.insert(code).await)
    }

    async fn take(&self, code: &str) -> AuthResult<Option<AuthorizationCode>> {
        into_auth(self.delete_returning(code).await)
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        into_auth(self.delete_expired().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docket_auth::Scope;

    #[test]
    fn test_code_from_row() {
        let row: CodeRow = (
            "code-1".into(),
            "user-1".into(),
            "client-1".into(),
            "Laptop".into(),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM".into(),
            "S256".into(),
            vec!["docs:read".into(), "tasks:write".into()],
            "http://localhost:3000/callback".into(),
            OffsetDateTime::UNIX_EPOCH,
            OffsetDateTime::UNIX_EPOCH,
        );
        let code = code_from_row(row).unwrap();
        assert_eq!(code.code_challenge_method, PkceChallengeMethod::S256);
        assert!(code.scopes.contains(Scope::DocsRead));
        assert!(code.scopes.contains(Scope::TasksWrite));
    }

    #[test]
    fn test_code_from_row_rejects_plain() {
        let row: CodeRow = (
            "code-1".into(),
            "user-1".into(),
            "client-1".into(),
            "Laptop".into(),
            "verifier".into(),
            "plain".into(),
            vec![],
            "http://localhost:3000/callback".into(),
            OffsetDateTime::UNIX_EPOCH,
            OffsetDateTime::UNIX_EPOCH,
        );
        assert!(code_from_row(row).is_err());
    }
}
