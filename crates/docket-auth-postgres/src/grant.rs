//! PostgreSQL token grant storage.
//!
//! Rotation is a conditional `UPDATE` keyed on both the grant id and the
//! previous refresh hash. Postgres row locking serializes concurrent
//! rotations, so only the first one matches.

use std::sync::Arc;

use async_trait::async_trait;
use docket_auth::AuthResult;
use docket_auth::storage::TokenGrantStorage;
use docket_auth::types::{GrantRotation, ScopeSet, TokenGrant};
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{PgPool, StorageError, StorageResult, into_auth};

type GrantRow = (
    Uuid,
    String,
    String,
    String,
    String,
    String,
    Vec<String>,
    OffsetDateTime,
    OffsetDateTime,
);

const GRANT_COLUMNS: &str = "id, user_id, client_id, device_name, access_token_hash, \
                             refresh_token_hash, scopes, created_at, expires_at";

/// Token grants in `oauth_token_grants`.
#[derive(Debug, Clone)]
pub struct PgGrantStorage {
    pool: Arc<PgPool>,
}

impl PgGrantStorage {
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    async fn insert(&self, grant: &TokenGrant) -> StorageResult<()> {
        query(
            r#"
            INSERT INTO oauth_token_grants (id, user_id, client_id, device_name,
                access_token_hash, refresh_token_hash, scopes, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(grant.id)
        .bind(&grant.user_id)
        .bind(&grant.client_id)
        .bind(&grant.device_name)
        .bind(&grant.access_token_hash)
        .bind(&grant.refresh_token_hash)
        .bind(grant.scopes.to_strings())
        .bind(grant.created_at)
        .bind(grant.expires_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| StorageError::from_insert(e, &format!("Grant {}", grant.id)))?;

        Ok(())
    }

    async fn find_by_refresh(&self, refresh_token_hash: &str) -> StorageResult<Option<TokenGrant>> {
        let sql = format!("SELECT {GRANT_COLUMNS} FROM oauth_token_grants WHERE refresh_token_hash = $1");
        let row: Option<GrantRow> = query_as(&sql)
            .bind(refresh_token_hash)
            .fetch_optional(&*self.pool)
            .await?;
        Ok(row.map(grant_from_row))
    }

    async fn compare_and_swap(&self, rotation: &GrantRotation) -> StorageResult<Option<TokenGrant>> {
        let sql = format!(
            r#"
            UPDATE oauth_token_grants
            SET access_token_hash = $3, refresh_token_hash = $4, expires_at = $5
            WHERE id = $1 AND refresh_token_hash = $2
            RETURNING {GRANT_COLUMNS}
            "#
        );
        let row: Option<GrantRow> = query_as(&sql)
            .bind(rotation.id)
            .bind(&rotation.expected_refresh_hash)
            .bind(&rotation.access_token_hash)
            .bind(&rotation.refresh_token_hash)
            .bind(rotation.expires_at)
            .fetch_optional(&*self.pool)
            .await?;
        Ok(row.map(grant_from_row))
    }

    async fn delete_by_id(&self, id: Uuid) -> StorageResult<bool> {
        let result = query("DELETE FROM oauth_token_grants WHERE id = $1")
            .bind(id)
            .execute(&*self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_matching_hash(&self, token_hash: &str) -> StorageResult<u64> {
        let result = query(
            "DELETE FROM oauth_token_grants WHERE access_token_hash = $1 OR refresh_token_hash = $1",
        )
        .bind(token_hash)
        .execute(&*self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn list_for_user(&self, user_id: &str) -> StorageResult<Vec<TokenGrant>> {
        let sql = format!(
            "SELECT {GRANT_COLUMNS} FROM oauth_token_grants WHERE user_id = $1 ORDER BY created_at DESC"
        );
        let rows: Vec<GrantRow> = query_as(&sql)
            .bind(user_id)
            .fetch_all(&*self.pool)
            .await?;
        Ok(rows.into_iter().map(grant_from_row).collect())
    }

    async fn delete_owned(&self, id: Uuid, user_id: &str) -> StorageResult<bool> {
        let result = query("DELETE FROM oauth_token_grants WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&*self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_expired(&self) -> StorageResult<u64> {
        let result = query("DELETE FROM oauth_token_grants WHERE expires_at <= now()")
            .execute(&*self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

fn grant_from_row(row: GrantRow) -> TokenGrant {
    let (
        id,
        user_id,
        client_id,
        device_name,
        access_token_hash,
        refresh_token_hash,
        scopes,
        created_at,
        expires_at,
    ) = row;

    TokenGrant {
        id,
        user_id,
        client_id,
        device_name,
        access_token_hash,
        refresh_token_hash,
        scopes: ScopeSet::from_tokens(scopes.iter().map(String::as_str)),
        created_at,
        expires_at,
    }
}

#[async_trait]
impl TokenGrantStorage for PgGrantStorage {
    async fn create(&self, grant: &TokenGrant) -> AuthResult<()> {
        into_auth(self.insert(grant).await)
    }

    async fn find_by_refresh_hash(
        &self,
        refresh_token_hash: &str,
    ) -> AuthResult<Option<TokenGrant>> {
        into_auth(self.find_by_refresh(refresh_token_hash).await)
    }

    async fn rotate(&self, rotation: &GrantRotation) -> AuthResult<Option<TokenGrant>> {
        into_auth(self.compare_and_swap(rotation).await)
    }

    async fn delete(&self, id: Uuid) -> AuthResult<bool> {
        into_auth(self.delete_by_id(id).await)
    }

    async fn delete_by_token_hash(&self, token_hash: &str) -> AuthResult<u64> {
        into_auth(self.delete_matching_hash(token_hash).await)
    }

    async fn list_by_user(&self, user_id: &str) -> AuthResult<Vec<TokenGrant>> {
        into_auth(self.list_for_user(user_id).await)
    }

    async fn delete_for_user(&self, id: Uuid, user_id: &str) -> AuthResult<bool> {
        into_auth(self.delete_owned(id, user_id).await)
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        into_auth(self.delete_expired().await)
    }
}
