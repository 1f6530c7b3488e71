//! HTTP implementation of the platform API client.

use std::sync::Arc;

use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use haberdash_core::{CheckoutSessionId, VariantId};

use crate::config::PlatformConfig;

use super::types::{InventoryLevel, SessionCreated, SessionRequest, VariantRecord};
use super::{PlatformApi, PlatformError};

/// Client for the commerce platform API.
///
/// Cheaply cloneable via `Arc`. Deliberately cache-free: everything this
/// service reads is re-verified at submission time, and a stale read
/// here would defeat that.
#[derive(Clone)]
pub struct PlatformClient {
    inner: Arc<PlatformClientInner>,
}

struct PlatformClientInner {
    client: reqwest::Client,
    endpoint: String,
    service_key: String,
}

impl PlatformClient {
    /// Create a new platform API client.
    #[must_use]
    pub fn new(config: &PlatformConfig) -> Self {
        let endpoint = format!(
            "{}/api/{}",
            config.url.trim_end_matches('/'),
            config.api_version
        );

        Self {
            inner: Arc::new(PlatformClientInner {
                client: reqwest::Client::new(),
                endpoint,
                service_key: config.service_key.expose_secret().to_string(),
            }),
        }
    }

    /// Issue a GET and decode the body into `T`.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        context: &'static str,
    ) -> Result<T, PlatformError> {
        let response = self
            .inner
            .client
            .get(format!("{}{path}", self.inner.endpoint))
            .bearer_auth(&self.inner.service_key)
            .send()
            .await?;

        let body = Self::check_status(response, context).await?;
        decode(context, &body)
    }

    /// Issue a POST with a JSON body and decode the response into `T`.
    async fn post_json<B: serde::Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        context: &'static str,
    ) -> Result<T, PlatformError> {
        let response = self
            .inner
            .client
            .post(format!("{}{path}", self.inner.endpoint))
            .bearer_auth(&self.inner.service_key)
            .json(body)
            .send()
            .await?;

        let body = Self::check_status(response, context).await?;
        decode(context, &body)
    }

    /// Map non-success statuses to platform errors and return the body.
    async fn check_status(
        response: reqwest::Response,
        context: &'static str,
    ) -> Result<String, PlatformError> {
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(PlatformError::RateLimited(retry_after));
        }

        let body = response.text().await?;

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(PlatformError::NotFound(context.to_string()));
        }

        if status.is_client_error() {
            return Err(PlatformError::Rejected(error_message(&body)));
        }

        if !status.is_success() {
            tracing::error!(
                status = %status,
                context,
                body = %body.chars().take(500).collect::<String>(),
                "Platform API returned non-success status"
            );
            return Err(PlatformError::Status {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        Ok(body)
    }
}

impl PlatformApi for PlatformClient {
    #[instrument(skip(self), fields(variant_id = %id))]
    async fn variant(&self, id: VariantId) -> Result<VariantRecord, PlatformError> {
        self.get_json(&format!("/variants/{id}"), "variant").await
    }

    #[instrument(skip(self), fields(variant_id = %id))]
    async fn available_inventory(&self, id: VariantId) -> Result<i64, PlatformError> {
        let level: InventoryLevel = self
            .get_json(&format!("/variants/{id}/inventory"), "inventory")
            .await?;
        Ok(level.available)
    }

    #[instrument(skip(self, request), fields(items = request.items.len()))]
    async fn create_checkout_session(
        &self,
        request: &SessionRequest,
    ) -> Result<SessionCreated, PlatformError> {
        let created: SessionCreated = self
            .post_json("/checkout/sessions", request, "checkout session")
            .await?;

        debug!(session_id = %created.session_id, "Checkout session created");
        Ok(created)
    }

    #[instrument(skip(self), fields(session_id = %session_id))]
    async fn mark_order_paid(&self, session_id: &CheckoutSessionId) -> Result<(), PlatformError> {
        let response = self
            .inner
            .client
            .post(format!(
                "{}/orders/{session_id}/paid",
                self.inner.endpoint
            ))
            .bearer_auth(&self.inner.service_key)
            .send()
            .await?;

        Self::check_status(response, "order payment").await?;
        Ok(())
    }
}

/// Decode a platform response body into `T`.
fn decode<T: DeserializeOwned>(context: &'static str, body: &str) -> Result<T, PlatformError> {
    serde_json::from_str(body).map_err(|source| {
        tracing::error!(
            context,
            body = %body.chars().take(500).collect::<String>(),
            "Failed to decode platform response"
        );
        PlatformError::Malformed { context, source }
    })
}

/// Pull a human-readable message out of a platform error body.
fn error_message(body: &str) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        error: String,
    }

    serde_json::from_str::<ErrorBody>(body).map_or_else(
        |_| body.chars().take(200).collect(),
        |parsed| parsed.error,
    )
}
