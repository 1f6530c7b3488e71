//! Route definitions for the checkout service.

pub mod checkout;
pub mod webhook;

use axum::{Router, routing::post};

use crate::middleware;
use crate::state::AppState;

/// Build the service router.
///
/// Session creation sits behind the strict limiter; the webhook receiver
/// is signature-gated instead and only accepts POST.
pub fn routes() -> Router<AppState> {
    let checkout = Router::new()
        .route("/checkout", post(checkout::create))
        .layer(middleware::checkout_rate_limiter());

    let webhooks = Router::new()
        .route("/webhooks/payment", post(webhook::receive))
        .layer(middleware::api_rate_limiter());

    Router::new().merge(checkout).merge(webhooks)
}
