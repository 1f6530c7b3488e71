//! Payment processor webhook receiver.
//!
//! The processor signs each delivery with HMAC-SHA256 over the raw body;
//! anything without a valid `X-Webhook-Signature` is rejected with 401
//! before the payload is even parsed. The route only accepts POST, so
//! probes with other methods get 405 from method routing.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use hmac::{Hmac, Mac};
use secrecy::ExposeSecret;
use serde::Deserialize;
use sha2::Sha256;
use tracing::instrument;

use haberdash_core::CheckoutSessionId;

use crate::error::{AppError, Result};
use crate::platform::PlatformApi;
use crate::state::AppState;

/// Header carrying the hex-encoded HMAC-SHA256 of the raw body.
pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

type HmacSha256 = Hmac<Sha256>;

/// A payment event delivered by the processor.
#[derive(Debug, Deserialize)]
struct WebhookEvent {
    #[serde(rename = "type")]
    kind: String,
    session_id: CheckoutSessionId,
}

/// POST /webhooks/payment - verify the signature, then apply the event.
#[instrument(skip(state, headers, body))]
pub async fn receive(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("missing webhook signature".to_string()))?;

    if !verify_signature(
        &body,
        signature,
        state.config().webhook_secret.expose_secret(),
    ) {
        tracing::warn!("Webhook delivery with invalid signature rejected");
        return Err(AppError::Unauthorized(
            "invalid webhook signature".to_string(),
        ));
    }

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("malformed webhook payload: {e}")))?;

    match event.kind.as_str() {
        "checkout.session.completed" => {
            state.platform().mark_order_paid(&event.session_id).await?;
            tracing::info!(session_id = %event.session_id, "Order marked paid");
        }
        "checkout.session.expired" => {
            tracing::info!(session_id = %event.session_id, "Checkout session expired");
        }
        other => {
            // Acknowledge unrecognized events so the processor stops retrying.
            tracing::debug!(kind = other, "Ignoring unhandled webhook event");
        }
    }

    Ok(StatusCode::OK)
}

/// Verify a hex-encoded HMAC-SHA256 signature over the raw body.
///
/// Uses `Mac::verify_slice`, which compares in constant time.
fn verify_signature(body: &[u8], signature: &str, secret: &str) -> bool {
    let provided = signature
        .strip_prefix("sha256=")
        .unwrap_or(signature)
        .trim();

    let Ok(provided_bytes) = hex::decode(provided) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);

    mac.verify_slice(&provided_bytes).is_ok()
}

/// Compute the hex signature for a body. Shared with the CLI probes and
/// integration tests so they can produce valid deliveries.
#[must_use]
pub fn sign(body: &[u8], secret: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}
