use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    routing::{get, post},
};

use powercheck_core::config::{Config, PublicOriginConfig};
use powercheck_core::store::{DocumentStore, MongoStore};

mod cors;
mod dto;
mod error;
mod handlers;

#[cfg(test)]
mod tests;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) store: Arc<dyn DocumentStore>,
    pub(crate) origin: PublicOriginConfig,
}

/// Connect the document store, bind the API server, and block until
/// shutdown.
///
/// # Errors
/// Returns an error when the runtime cannot be created, the store client
/// cannot be initialized, the socket cannot be bound, or the server exits
/// with a runtime failure.
pub fn serve(config: &Config, host: &str, port: u16) -> Result<()> {
    let bind_addr = format!("{host}:{port}");
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build API runtime")?;

    runtime.block_on(async move {
        let store = MongoStore::connect(&config.store)
            .await
            .context("failed to initialize document store client")?;
        let state = AppState {
            store: Arc::new(store),
            origin: config.origin.clone(),
        };

        let listener = tokio::net::TcpListener::bind(&bind_addr)
            .await
            .with_context(|| format!("failed to bind API server at {bind_addr}"))?;
        let addr = listener.local_addr()?;
        tracing::info!(%addr, "report API listening");

        axum::serve(listener, app_router(state))
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await
            .context("API server failed")
    })
}

pub(crate) fn app_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/reports",
            post(handlers::create_report)
                .get(handlers::list_reports)
                .options(handlers::preflight),
        )
        .route(
            "/api/reports/{id}",
            get(handlers::show_report).options(handlers::preflight),
        )
        .route(
            "/api/plugins",
            get(handlers::list_plugins).options(handlers::preflight),
        )
        .route(
            "/api/plugins/{id}",
            get(handlers::show_plugin).options(handlers::preflight),
        )
        .route(
            "/api/scripts",
            get(handlers::list_scripts).options(handlers::preflight),
        )
        .route(
            "/api/scripts/{id}",
            get(handlers::show_script).options(handlers::preflight),
        )
        .fallback(handlers::catch_all)
        .with_state(state)
}
