//! HTTP API application wiring (Axum router + store selection).
//!
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: request decoding and response bodies
//! - `errors.rs`: consistent error responses
//! - `layers.rs`: CORS and panic recovery

use std::sync::Arc;

use anyhow::Context;
use axum::{routing::get, Extension, Router};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use roster_infra::store::{InMemoryEmployeeStore, PostgresEmployeeStore, RedisEmployeeStore};
use roster_infra::{CrudService, EmployeeStore};

use crate::config::{AppConfig, StorageBackend};

pub mod dto;
pub mod errors;
pub mod layers;
pub mod routes;

/// Build the full HTTP router over one store.
///
/// The store type is fixed for the router's lifetime; handlers are
/// monomorphized per backend.
pub fn build_app<S: EmployeeStore>(store: S) -> Router {
    let service = Arc::new(CrudService::new(store));

    Router::new()
        .route("/", get(routes::system::home))
        .route("/health", get(routes::system::health))
        .merge(routes::router::<S>().layer(Extension(service)))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(layers::cors())
                .layer(layers::catch_panic()),
        )
}

/// Connect the configured backend and build the router over it.
pub async fn build_app_from_config(config: &AppConfig) -> anyhow::Result<Router> {
    let app = match config.backend {
        StorageBackend::Memory => build_app(InMemoryEmployeeStore::new()),
        StorageBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL is required for the postgres backend")?;
            let store = PostgresEmployeeStore::connect(url, config.store_timeout)
                .await
                .context("failed to connect to postgres")?;
            build_app(store)
        }
        StorageBackend::Redis => {
            let store = RedisEmployeeStore::connect(
                &config.redis_url,
                config.redis_key_prefix.clone(),
                config.store_timeout,
            )
            .await
            .context("failed to connect to redis")?;
            build_app(store)
        }
    };

    tracing::info!(backend = config.backend.as_str(), "storage backend ready");
    Ok(app)
}

/// Serve until Ctrl-C or SIGTERM, then drain in-flight requests.
pub async fn serve(config: AppConfig, listener: TcpListener) -> anyhow::Result<()> {
    let app = build_app_from_config(&config).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received, draining connections");
}
