//! PostgreSQL OAuth client storage.

use std::sync::Arc;

use async_trait::async_trait;
use docket_auth::AuthResult;
use docket_auth::storage::ClientStorage;
use docket_auth::types::{GrantType, OAuthClient, ResponseType, TokenEndpointAuthMethod};
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use time::OffsetDateTime;

use crate::{PgPool, StorageError, StorageResult, into_auth};

type ClientRow = (
    String,
    Option<String>,
    Vec<String>,
    String,
    Vec<String>,
    Vec<String>,
    OffsetDateTime,
);

/// Client registrations in `oauth_clients`.
#[derive(Debug, Clone)]
pub struct PgClientStorage {
    pool: Arc<PgPool>,
}

impl PgClientStorage {
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    async fn find(&self, client_id: &str) -> StorageResult<Option<OAuthClient>> {
        let row: Option<ClientRow> = query_as(
            r#"
            SELECT client_id, client_name, redirect_uris, token_endpoint_auth_method,
                   grant_types, response_types, issued_at
            FROM oauth_clients
            WHERE client_id = $1
            "#,
        )
        .bind(client_id)
        .fetch_optional(&*self.pool)
        .await?;

        row.map(client_from_row).transpose()
    }

    async fn insert(&self, client: &OAuthClient) -> StorageResult<()> {
        query(
            r#"
            INSERT INTO oauth_clients (client_id, client_name, redirect_uris,
                token_endpoint_auth_method, grant_types, response_types, issued_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&client.client_id)
        .bind(&client.name)
        .bind(&client.redirect_uris)
        .bind(client.auth_method.as_str())
        .bind(
            client
                .grant_types
                .iter()
                .map(|g| g.as_str().to_string())
                .collect::<Vec<_>>(),
        )
        .bind(
            client
                .response_types
                .iter()
                .map(|r| r.as_str().to_string())
                .collect::<Vec<_>>(),
        )
        .bind(client.issued_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| StorageError::from_insert(e, &format!("Client {}", client.client_id)))?;

        Ok(())
    }
}

fn client_from_row(row: ClientRow) -> StorageResult<OAuthClient> {
    let (client_id, name, redirect_uris, auth_method, grant_types, response_types, issued_at) =
        row;

    let auth_method = match auth_method.as_str() {
        "none" => TokenEndpointAuthMethod::None,
        other => {
            return Err(StorageError::invalid_data(format!(
                "unknown token_endpoint_auth_method '{other}' for client {client_id}"
            )));
        }
    };

    let grant_types = grant_types
        .iter()
        .map(|g| {
            GrantType::parse(g).ok_or_else(|| {
                StorageError::invalid_data(format!("unknown grant type '{g}' for client {client_id}"))
            })
        })
        .collect::<StorageResult<Vec<_>>>()?;

    let response_types = response_types
        .iter()
        .map(|r| match r.as_str() {
            "code" => Ok(ResponseType::Code),
            other => Err(StorageError::invalid_data(format!(
                "unknown response type '{other}' for client {client_id}"
            ))),
        })
        .collect::<StorageResult<Vec<_>>>()?;

    Ok(OAuthClient {
        client_id,
        name,
        redirect_uris,
        auth_method,
        grant_types,
        response_types,
        issued_at,
    })
}

#[async_trait]
impl ClientStorage for PgClientStorage {
    async fn find_by_client_id(&self, client_id: &str) -> AuthResult<Option<OAuthClient>> {
        into_auth(self.find(client_id).await)
    }

    async fn create(&self, client: &OAuthClient) -> AuthResult<()> {
        into_auth(self.insert(client).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(grant_types: &[&str]) -> ClientRow {
        (
            "0123456789abcdef0123456789abcdef".to_string(),
            Some("CLI".to_string()),
            vec!["http://localhost:3000/callback".to_string()],
            "none".to_string(),
            grant_types.iter().map(|s| s.to_string()).collect(),
            vec!["code".to_string()],
            OffsetDateTime::UNIX_EPOCH,
        )
    }

    #[test]
    fn test_client_from_row() {
        let client = client_from_row(row(&["authorization_code", "refresh_token"])).unwrap();
        assert_eq!(client.name.as_deref(), Some("CLI"));
        assert_eq!(
            client.grant_types,
            vec![GrantType::AuthorizationCode, GrantType::RefreshToken]
        );
        assert_eq!(client.response_types, vec![ResponseType::Code]);
    }

    #[test]
    fn test_client_from_row_rejects_unknown_grant() {
        let err = client_from_row(row(&["password"])).unwrap_err();
        assert!(matches!(err, StorageError::InvalidData(_)));
    }
}
