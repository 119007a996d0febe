//! Docket authorization server binary support.
//!
//! - [`config`] - application configuration and loader
//! - [`observability`] - tracing subscriber setup
//! - [`server`] - storage backend selection, router assembly and serving

pub mod config;
pub mod observability;
pub mod server;

pub use config::AppConfig;
pub use server::{DocketServer, ServerBuilder, build_app, open_storage, spawn_cleanup};
