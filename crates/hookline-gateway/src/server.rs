// SPDX-FileCopyrightText: 2026 Hookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for webhook ingestion.

use axum::{
    Router,
    routing::{get, post},
};
use hookline_core::HooklineError;
use hookline_storage::Database;
use tower_http::cors::CorsLayer;

use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// Storage handle for raw-event persistence and enqueueing.
    pub db: Database,
    /// Shared HMAC signing secret. `None` rejects every post (fail-closed).
    pub signing_secret: Option<String>,
    /// Accepted payload timestamp skew, in seconds.
    pub timestamp_tolerance_secs: i64,
    /// Attempt budget stamped onto enqueued tasks.
    pub max_attempts: u32,
}

/// Build the ingestion router.
///
/// Routes:
/// - POST /webhooks/openphone (signature-verified ingestion)
/// - GET /webhooks/openphone/health (unauthenticated config status)
///
/// Method routing gives every other verb on these paths a 405.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/webhooks/openphone", post(handlers::post_webhook))
        .route("/webhooks/openphone/health", get(handlers::get_health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve the gateway until the process exits.
pub async fn start_server(host: &str, port: u16, state: GatewayState) -> Result<(), HooklineError> {
    let app = router(state);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| HooklineError::Gateway {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| HooklineError::Gateway {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    Ok(())
}
