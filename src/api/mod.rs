//! HTTP interface built on axum.
//!
//! Handlers are thin: they extract the request, call into [`crate::core`] and
//! let [`crate::errors::Error`] render itself. Authentication happens in front
//! of this service, so every request that reaches the router is trusted.

mod certificados;
mod directory;
pub mod error;
mod health;
mod items;
mod mediciones;
mod obras;
mod presupuestos;

use crate::cache::{Cache, MemoryCache};
use axum::Router;
use sea_orm::DatabaseConnection;
use std::{sync::Arc, time::Duration};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Dependencies shared by every handler.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
    /// Read-through cache for catalog and directory listings
    pub cache: Arc<dyn Cache>,
    /// Lifetime of cached listings
    pub cache_ttl: Duration,
}

impl AppState {
    /// Creates state backed by a process-local [`MemoryCache`].
    #[must_use]
    pub fn new(db: DatabaseConnection, cache_ttl: Duration) -> Self {
        Self {
            db: Arc::new(db),
            cache: Arc::new(MemoryCache::new()),
            cache_ttl,
        }
    }
}

/// Builds the full application router: `/health` plus everything under `/api`.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .merge(obras::router())
        .merge(directory::router())
        .merge(items::router())
        .merge(presupuestos::router())
        .merge(mediciones::router())
        .merge(certificados::router());

    Router::new()
        .merge(health::router())
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
