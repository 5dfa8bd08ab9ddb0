//! Syncline Server - push/pull endpoint for offline-first clients.
//!
//! Clients push batches of named mutations and pull patches plus the last
//! applied mutation id of every client in their group. Each request runs in
//! one serializable PostgreSQL transaction through `syncline-engine`.

mod auth;
mod config;
mod db;
mod error;
mod handlers;
mod routes;
mod space;

use crate::config::Config;
use crate::db::PgStore;
use crate::space::RecordSpace;
use axum::Router;
use std::sync::Arc;
use syncline_engine::Syncer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application state shared across handlers.
pub struct AppState<S, H> {
    pub syncer: Arc<Syncer<S, H>>,
    pub config: Arc<Config>,
}

impl<S, H> Clone for AppState<S, H> {
    fn clone(&self) -> Self {
        Self {
            syncer: Arc::clone(&self.syncer),
            config: Arc::clone(&self.config),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "syncline_server=debug,syncline_engine=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!("Starting Syncline Server on {}:{}", config.host, config.port);

    // Create database pool
    let pool = db::create_pool(&config.database_url, config.database_max_connections).await?;

    // Run migrations
    tracing::info!("Running database migrations...");
    db::run_migrations(&pool).await?;

    // Build application state
    let syncer = Syncer::new(PgStore::new(pool), RecordSpace::new())
        .with_config(config.sync_config());
    let state = AppState {
        syncer: Arc::new(syncer),
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = Router::new()
        .merge(routes::create_routes::<PgStore, RecordSpace>())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
