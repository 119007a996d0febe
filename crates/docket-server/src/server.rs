use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use docket_auth::storage::{AuthStores, AuthorizationCodeStorage, MemoryStorage, TokenGrantStorage};
use docket_auth::{OAuthState, oauth_router};
use docket_auth_postgres::PostgresAuthStorage;
use serde_json::json;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::config::{AppConfig, StorageBackend, StorageConfig};

pub struct DocketServer {
    addr: SocketAddr,
    app: Router,
    cleanup: Option<JoinHandle<()>>,
}

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

/// Assembles the OAuth routes, a health check and the request trace layer.
pub fn build_app(cfg: &AppConfig, stores: AuthStores) -> Router {
    let state = OAuthState::new(stores, cfg.auth.clone());
    oauth_router(state)
        .route("/healthz", get(healthz))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    // Query strings on /oauth/authorize carry PKCE challenges and state.
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.path = %req.uri().path(),
                        http.status_code = Empty,
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>, latency: Duration, span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
}

/// Opens the configured storage backend.
///
/// # Errors
///
/// Fails when the PostgreSQL pool cannot connect or the schema cannot be
/// created.
pub async fn open_storage(cfg: &StorageConfig) -> anyhow::Result<AuthStores> {
    match cfg.backend {
        StorageBackend::Memory => {
            let storage = Arc::new(MemoryStorage::new());
            for (session_id, user_id) in &cfg.bootstrap_sessions {
                storage.insert_session(session_id.clone(), user_id.clone());
            }
            tracing::warn!(
                bootstrap_sessions = cfg.bootstrap_sessions.len(),
                "Using in-memory storage; data is lost on restart"
            );
            Ok(AuthStores::memory(storage))
        }
        StorageBackend::Postgres => {
            let url = cfg
                .url
                .as_deref()
                .context("storage.url is required for the postgres backend")?;
            let storage = PostgresAuthStorage::connect(url, cfg.max_connections)
                .await
                .context("connecting to PostgreSQL")?;
            storage
                .ensure_schema()
                .await
                .context("creating auth schema")?;
            tracing::info!(max_connections = cfg.max_connections, "Using PostgreSQL storage");
            Ok(storage.stores())
        }
    }
}

/// Periodically deletes expired authorization codes and token grants.
pub fn spawn_cleanup(stores: AuthStores, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match stores.codes.cleanup_expired().await {
                Ok(0) => {}
                Ok(n) => tracing::info!(deleted = n, "Expired authorization codes purged"),
                Err(e) => tracing::warn!(error = %e, "Authorization code cleanup failed"),
            }
            match stores.grants.cleanup_expired().await {
                Ok(0) => {}
                Ok(n) => tracing::info!(deleted = n, "Expired token grants purged"),
                Err(e) => tracing::warn!(error = %e, "Token grant cleanup failed"),
            }
        }
    })
}

pub struct ServerBuilder {
    config: AppConfig,
    stores: Option<AuthStores>,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            stores: None,
        }
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.config = cfg;
        self
    }

    /// Uses the given stores instead of opening `storage.backend`.
    pub fn with_stores(mut self, stores: AuthStores) -> Self {
        self.stores = Some(stores);
        self
    }

    pub async fn build(self) -> anyhow::Result<DocketServer> {
        let stores = match self.stores {
            Some(stores) => stores,
            None => open_storage(&self.config.storage).await?,
        };

        let cleanup = self
            .config
            .storage
            .cleanup_interval
            .map(|every| spawn_cleanup(stores.clone(), every));

        Ok(DocketServer {
            addr: self.config.addr(),
            app: build_app(&self.config, stores),
            cleanup,
        })
    }
}

impl DocketServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .with_context(|| format!("binding {}", self.addr))?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        if let Some(cleanup) = self.cleanup {
            cleanup.abort();
        }
        Ok(())
    }
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use docket_auth::storage::SessionStore;

    #[tokio::test]
    async fn test_memory_backend_seeds_sessions() {
        let mut cfg = StorageConfig::default();
        cfg.bootstrap_sessions
            .insert("dev-session".into(), "dev-user".into());
        let stores = open_storage(&cfg).await.unwrap();
        let session = stores.sessions.get("dev-session").await.unwrap().unwrap();
        assert_eq!(session.user_id, "dev-user");
        assert!(stores.sessions.get("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_postgres_backend_requires_url() {
        let cfg = StorageConfig {
            backend: StorageBackend::Postgres,
            ..Default::default()
        };
        let err = open_storage(&cfg).await.err().unwrap();
        assert!(err.to_string().contains("storage.url"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_purges_expired_grants() {
        use docket_auth::types::{ScopeSet, TokenGrant, hash_token};

        let storage = Arc::new(MemoryStorage::new());
        let stores = AuthStores::memory(storage.clone());
        let past = time::OffsetDateTime::now_utc() - time::Duration::hours(1);
        TokenGrantStorage::create(
            storage.as_ref(),
            &TokenGrant {
                id: uuid::Uuid::new_v4(),
                user_id: "user-1".into(),
                client_id: "client-1".into(),
                device_name: "Laptop".into(),
                access_token_hash: hash_token("a"),
                refresh_token_hash: hash_token("r"),
                scopes: ScopeSet::filter("docs:read"),
                created_at: past,
                expires_at: past,
            },
        )
        .await
        .unwrap();

        let handle = spawn_cleanup(stores, Duration::from_secs(60));
        tokio::time::sleep(Duration::from_secs(61)).await;
        tokio::task::yield_now().await;
        assert_eq!(storage.grant_count(), 0);
        handle.abort();
    }
}
