//! Checkout submission route handler.

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use haberdash_core::{CheckoutSessionId, ProductId, VariantId};

use crate::cart::{Cart, CartLine};
use crate::flow::{CartRejection, CheckoutDraft, SubmitError};
use crate::platform::PlatformError;
use crate::state::AppState;

/// One cart line as submitted by the client, carrying the price the
/// shopper saw when the item was added.
#[derive(Debug, Deserialize)]
pub struct CheckoutItem {
    pub product_id: ProductId,
    #[serde(default)]
    pub variant_id: Option<VariantId>,
    pub quantity: u32,
    pub unit_price: Decimal,
    #[serde(default)]
    pub customization: BTreeMap<String, String>,
}

/// Checkout submission request body.
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<CheckoutItem>,
    pub contact: CheckoutDraft,
    /// When the checkout view mounted; starts the soft-expiration window.
    #[serde(default)]
    pub opened_at: Option<DateTime<Utc>>,
}

/// Successful submission response.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub session_id: CheckoutSessionId,
    pub url: String,
}

/// POST /checkout - validate, revalidate, and create one session.
#[instrument(skip(state, request), fields(items = request.items.len()))]
pub async fn create(State(state): State<AppState>, Json(request): Json<CheckoutRequest>) -> Response {
    let mut cart = Cart::with_opened_at(request.opened_at.unwrap_or_else(Utc::now));

    for item in request.items {
        match CartLine::new(
            item.product_id,
            item.variant_id,
            item.quantity,
            item.unit_price,
            item.customization,
        ) {
            Ok(line) => cart.add(line),
            Err(e) => {
                return rejection_response(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "invalid_item",
                    &e.to_string(),
                );
            }
        }
    }

    match state
        .flow()
        .submit(state.platform(), &mut cart, &request.contact)
        .await
    {
        Ok(created) => (
            StatusCode::OK,
            Json(CheckoutResponse {
                session_id: created.session_id,
                url: created.url,
            }),
        )
            .into_response(),
        Err(e) => submit_error_response(&e),
    }
}

/// Map a submission failure onto the wire.
///
/// Expected failures carry machine-readable reason codes so the client
/// can render field- or cart-specific messaging; infrastructure failures
/// collapse to a retryable 502/503.
fn submit_error_response(error: &SubmitError) -> Response {
    match error {
        SubmitError::EmptyCart => {
            rejection_response(StatusCode::UNPROCESSABLE_ENTITY, "cart_empty", "Cart is empty")
        }
        SubmitError::InFlight => rejection_response(
            StatusCode::CONFLICT,
            "submission_in_flight",
            "A submission for this cart is already in progress",
        ),
        SubmitError::InvalidForm(fields) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "error": "invalid_form",
                "message": "Please fix the highlighted fields",
                "fields": fields,
            })),
        )
            .into_response(),
        SubmitError::Rejected(rejection) => {
            let status = match rejection {
                // Unknown references are a client payload problem.
                CartRejection::UnknownVariant { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                // Everything else is valid-but-stale state.
                _ => StatusCode::CONFLICT,
            };
            rejection_response(status, rejection_code(rejection), &rejection.to_string())
        }
        SubmitError::Platform(platform_err) => {
            let event_id = sentry::capture_error(platform_err);
            tracing::error!(
                error = %platform_err,
                sentry_event_id = %event_id,
                "Platform call failed during checkout"
            );

            let status = match platform_err {
                PlatformError::RateLimited(_) => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::BAD_GATEWAY,
            };
            (
                status,
                Json(json!({
                    "error": "platform_unavailable",
                    "message": "Checkout is temporarily unavailable, please try again",
                    "retryable": platform_err.is_retryable(),
                })),
            )
                .into_response()
        }
    }
}

const fn rejection_code(rejection: &CartRejection) -> &'static str {
    match rejection {
        CartRejection::Expired { .. } => "cart_expired",
        CartRejection::UnknownVariant { .. } => "unknown_variant",
        CartRejection::Unavailable { .. } => "product_unavailable",
        CartRejection::InsufficientInventory { .. } => "insufficient_inventory",
        CartRejection::PriceDrift { .. } => "price_drift",
    }
}

fn rejection_response(status: StatusCode, code: &'static str, message: &str) -> Response {
    (
        status,
        Json(json!({
            "error": code,
            "message": message,
        })),
    )
        .into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_codes_are_stable() {
        let rejection = CartRejection::Expired { ttl_minutes: 30 };
        assert_eq!(rejection_code(&rejection), "cart_expired");

        let rejection = CartRejection::PriceDrift {
            variant_id: VariantId::new(uuid::Uuid::nil()),
            product_name: "Suit".to_string(),
            remembered: Decimal::new(10000, 2),
            live: Decimal::new(11000, 2),
        };
        assert_eq!(rejection_code(&rejection), "price_drift");
    }

    #[test]
    fn test_submit_error_statuses() {
        let response = submit_error_response(&SubmitError::EmptyCart);
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = submit_error_response(&SubmitError::InFlight);
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = submit_error_response(&SubmitError::Rejected(
            CartRejection::UnknownVariant {
                variant_id: VariantId::new(uuid::Uuid::nil()),
            },
        ));
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = submit_error_response(&SubmitError::Platform(
            PlatformError::RateLimited(3),
        ));
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
