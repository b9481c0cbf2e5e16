//! Historical Server - configuration-history pipeline for cloud resources.
//!
//! Exposes the pipeline stages as host-invoked batch endpoints: the
//! collector resolves change events into Current-table state, the proxy
//! forwards (and shrinks) Current-table stream records, and the differ
//! appends materially-changed revisions to the Durable table.

mod auth;
mod config;
mod describe;
mod error;
mod forward;
mod handlers;
mod rehydrate;
mod routes;
mod store;

use crate::config::Config;
use crate::describe::{Describe, HttpDescriber};
use crate::forward::{HttpPublisher, Publish};
use crate::store::{CurrentStore, DurableStore, PgCurrentStore, PgDurableStore, Pool};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    #[allow(dead_code)]
    pub pool: Pool,
    pub config: Arc<Config>,
    pub current: Arc<dyn CurrentStore>,
    pub durable: Arc<dyn DurableStore>,
    pub describer: Option<Arc<dyn Describe>>,
    pub publisher: Option<Arc<dyn Publish>>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "historical_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!("Starting Historical Server on {}:{}", config.host, config.port);

    // Create database pool
    let pool = store::create_pool(&config).await?;

    // Run migrations
    tracing::info!("Running database migrations...");
    store::run_migrations(&pool).await?;

    // Build application state
    let describer = config
        .describe_url
        .clone()
        .map(|url| Arc::new(HttpDescriber::new(url)) as Arc<dyn Describe>);
    let publisher = config
        .forward_url
        .clone()
        .map(|url| Arc::new(HttpPublisher::new(url)) as Arc<dyn Publish>);

    let state = AppState {
        pool: pool.clone(),
        config: Arc::new(config.clone()),
        current: Arc::new(PgCurrentStore::new(pool.clone())),
        durable: Arc::new(PgDurableStore::new(pool)),
        describer,
        publisher,
    };

    // Build router
    let app = Router::new()
        .merge(routes::create_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
