//! HTTP router.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::{handlers, services::LedgerEngine, store::Storage};

/// Build the application router over any storage backend.
pub fn router<S: Storage>(engine: Arc<LedgerEngine<S>>) -> Router {
    let api = Router::new()
        // Account management routes
        .route("/api/v1/accounts", post(handlers::accounts::create_account::<S>))
        .route(
            "/api/v1/accounts/{account_number}",
            get(handlers::accounts::get_account::<S>)
                .delete(handlers::accounts::delete_account::<S>),
        )
        // Transaction routes
        .route(
            "/api/v1/transactions/deposit",
            post(handlers::transactions::deposit::<S>),
        )
        .route(
            "/api/v1/transactions/withdraw",
            post(handlers::transactions::withdraw::<S>),
        )
        .route(
            "/api/v1/transactions/transfer",
            post(handlers::transactions::transfer::<S>),
        )
        .route(
            "/api/v1/transactions/history/{account_number}",
            get(handlers::transactions::history::<S>),
        );

    Router::new()
        .route("/health", get(handlers::health::health_check::<S>))
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .with_state(engine)
}
