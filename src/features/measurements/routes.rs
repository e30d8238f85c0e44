use std::sync::Arc;

use axum::{middleware::from_fn_with_state, routing::put, Router};

use crate::core::middleware::measurement_secret_middleware;
use crate::features::measurements::handlers;
use crate::features::reports::LedgerService;

/// Callback routes for the measurement service, guarded by the shared secret
pub fn routes(ledger: Arc<LedgerService>, shared_secret: Arc<String>) -> Router {
    Router::new()
        .route("/api/measurements/facts", put(handlers::record_fact))
        .route_layer(from_fn_with_state(
            shared_secret,
            measurement_secret_middleware,
        ))
        .with_state(ledger)
}
