//! HTTP/JSON surface over the ledger service.

mod error;
mod handlers;
mod middleware;
pub mod views;

use std::sync::Arc;

use anyhow::Context;
use axum::routing::{get, post, put};
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use crate::application::LedgerService;
use crate::config::ServerConfig;

pub use error::{ApiError, status_for};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<LedgerService>,
}

/// Build the router for the full API.
pub fn router(service: Arc<LedgerService>) -> Router {
    let state = AppState { service };

    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/customers",
            get(handlers::list_customers).post(handlers::create_customer),
        )
        .route(
            "/customers/:id",
            get(handlers::get_customer)
                .put(handlers::update_customer)
                .delete(handlers::delete_customer),
        )
        .route(
            "/accounts",
            get(handlers::list_accounts).post(handlers::create_account),
        )
        .route(
            "/accounts/low-balance",
            get(handlers::list_low_balance_accounts),
        )
        .route(
            "/accounts/customer/:id",
            get(handlers::list_customer_accounts),
        )
        .route(
            "/accounts/:id",
            get(handlers::get_account)
                .put(handlers::update_account)
                .delete(handlers::delete_account),
        )
        .route(
            "/loans",
            get(handlers::list_loans).post(handlers::apply_loan),
        )
        .route("/loans/customer/:id", get(handlers::list_customer_loans))
        .route(
            "/loans/:id",
            get(handlers::get_loan).delete(handlers::delete_loan),
        )
        .route("/loans/:id/approve", put(handlers::approve_loan))
        .route("/loans/:id/close", put(handlers::close_loan))
        .route("/transactions", get(handlers::list_transactions))
        .route(
            "/transactions/account/:id",
            get(handlers::list_account_transactions),
        )
        .route("/transactions/deposit", post(handlers::deposit))
        .route("/transactions/withdraw", post(handlers::withdraw))
        .route("/transactions/transfer", post(handlers::transfer))
        .route("/dashboard/stats", get(handlers::dashboard_stats))
        .layer(axum::middleware::from_fn(middleware::request_tracing))
        .with_state(state)
}

/// Open the ledger and serve the API until Ctrl-C.
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let service = LedgerService::init(&config.database)
        .await
        .with_context(|| format!("Failed to open database {}", config.database))?
        .with_operation_timeout(config.operation_timeout);

    let app = router(Arc::new(service));

    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!(
        addr = %config.bind,
        database = %config.database,
        timeout_ms = config.operation_timeout.as_millis() as u64,
        "ledger API listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("ledger API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
    }
}
