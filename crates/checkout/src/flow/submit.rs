//! Checkout submission.
//!
//! One submission attempt walks Idle -> Validating -> Revalidating ->
//! Submitting; any failure returns control with errors attached and the
//! cart and draft untouched, so the shopper can correct and retry.
//! Success clears the cart before the session URL is handed back.

use std::collections::HashSet;
use std::sync::Mutex;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, instrument};

use haberdash_core::CartKey;

use crate::cart::Cart;
use crate::config::CheckoutPolicy;
use crate::platform::types::{SessionCreated, SessionRequest};
use crate::platform::{PlatformApi, PlatformError};

use super::form::{CheckoutDraft, FieldError};
use super::revalidate::{CartRejection, RevalidateError, revalidate_cart};

/// Why a submission attempt did not produce a session.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// Nothing to check out.
    #[error("cart is empty")]
    EmptyCart,

    /// A submission for this cart is already in flight; the duplicate is
    /// suppressed rather than queued.
    #[error("a submission for this cart is already in progress")]
    InFlight,

    /// Field-level validation failed; every invalid field is listed.
    #[error("form validation failed ({} fields)", .0.len())]
    InvalidForm(Vec<FieldError>),

    /// Live-state revalidation rejected the cart.
    #[error(transparent)]
    Rejected(CartRejection),

    /// The platform call itself failed; safe to retry.
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

/// Coordinates checkout submission attempts.
///
/// Holds the policy values and the in-flight set that guarantees at most
/// one session-creation call per cart at a time.
pub struct CheckoutFlow {
    policy: CheckoutPolicy,
    success_url: String,
    cancel_url: String,
    in_flight: Mutex<HashSet<CartKey>>,
}

impl CheckoutFlow {
    /// Create a flow with redirect URLs derived from the public base URL.
    #[must_use]
    pub fn new(policy: CheckoutPolicy, base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            policy,
            success_url: format!("{base}/order/success?session_id={{CHECKOUT_SESSION_ID}}"),
            cancel_url: format!("{base}/cart"),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// The configured policy values.
    #[must_use]
    pub const fn policy(&self) -> &CheckoutPolicy {
        &self.policy
    }

    /// Submit the cart: validate the form, re-verify the cart against
    /// live state, and create exactly one checkout session.
    ///
    /// On success the cart is cleared so a back-navigation after the
    /// redirect cannot resurrect it. On any failure the cart is left
    /// untouched and no retry is attempted here.
    ///
    /// # Errors
    ///
    /// See [`SubmitError`]; a concurrent attempt for the same cart fails
    /// fast with [`SubmitError::InFlight`] without touching the network.
    #[instrument(
        skip(self, platform, cart, draft),
        fields(cart_key = %cart.key(), lines = cart.len(), subtotal = %cart.subtotal())
    )]
    pub async fn submit<P: PlatformApi>(
        &self,
        platform: &P,
        cart: &mut Cart,
        draft: &CheckoutDraft,
    ) -> Result<SessionCreated, SubmitError> {
        if cart.is_empty() {
            return Err(SubmitError::EmptyCart);
        }

        let _guard = self
            .begin(cart.key())
            .ok_or(SubmitError::InFlight)?;

        debug!(phase = "validating");
        let contact = draft.validate().map_err(SubmitError::InvalidForm)?;

        debug!(phase = "revalidating");
        let repriced = revalidate_cart(platform, cart, &self.policy, Utc::now())
            .await
            .map_err(|e| match e {
                RevalidateError::Rejected(rejection) => SubmitError::Rejected(rejection),
                RevalidateError::Platform(platform_err) => SubmitError::Platform(platform_err),
            })?;

        debug!(phase = "submitting");
        let request = SessionRequest {
            items: repriced
                .into_iter()
                .map(super::revalidate::RepricedLine::into_session_item)
                .collect(),
            customer_email: contact.email.as_str().to_string(),
            success_url: self.success_url.clone(),
            cancel_url: self.cancel_url.clone(),
            customer_details: contact.into_customer_details(),
        };

        let created = platform.create_checkout_session(&request).await?;

        cart.clear();
        tracing::info!(session_id = %created.session_id, "Checkout session created, cart cleared");

        Ok(created)
    }

    /// Claim the in-flight slot for a cart, or return `None` if an
    /// attempt is already running.
    fn begin(&self, key: CartKey) -> Option<InFlightGuard<'_>> {
        let mut set = self
            .in_flight
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if !set.insert(key) {
            return None;
        }

        Some(InFlightGuard { flow: self, key })
    }

    fn finish(&self, key: CartKey) {
        self.in_flight
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(&key);
    }
}

/// Releases the in-flight slot when the attempt ends, success or failure.
struct InFlightGuard<'a> {
    flow: &'a CheckoutFlow,
    key: CartKey,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flow.finish(self.key);
    }
}
