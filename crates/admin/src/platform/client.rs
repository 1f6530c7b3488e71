//! HTTP implementation of the admin platform API client.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, instrument};

use haberdash_core::ProductId;

use crate::config::PlatformConfig;

use super::types::{ChangeEvent, ProductPatch, ProductRow};
use super::{AdminPlatformApi, AdminPlatformError};

/// How long a cached product list stays valid.
const LIST_CACHE_TTL: Duration = Duration::from_secs(60);

/// Client for the commerce platform API, admin surface.
///
/// Cheaply cloneable via `Arc`. Product list reads are cached briefly;
/// [`AdminPlatformClient::invalidate_products`] drops the cache after
/// any write so the editor reloads fresh rows.
#[derive(Clone)]
pub struct AdminPlatformClient {
    inner: Arc<AdminPlatformClientInner>,
}

struct AdminPlatformClientInner {
    client: reqwest::Client,
    endpoint: String,
    service_key: String,
    list_cache: Cache<String, Arc<Vec<ProductRow>>>,
}

impl AdminPlatformClient {
    /// Create a new admin platform API client.
    #[must_use]
    pub fn new(config: &PlatformConfig) -> Self {
        let list_cache = Cache::builder()
            .max_capacity(100)
            .time_to_live(LIST_CACHE_TTL)
            .build();

        let endpoint = format!(
            "{}/api/{}",
            config.url.trim_end_matches('/'),
            config.api_version
        );

        Self {
            inner: Arc::new(AdminPlatformClientInner {
                client: reqwest::Client::new(),
                endpoint,
                service_key: config.service_key.expose_secret().to_string(),
                list_cache,
            }),
        }
    }

    /// Drop every cached product list. Called after commits and imports.
    pub async fn invalidate_products(&self) {
        self.inner.list_cache.invalidate_all();
        self.inner.list_cache.run_pending_tasks().await;
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        context: &'static str,
    ) -> Result<T, AdminPlatformError> {
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

    async fn send_json<B: serde::Serialize>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &B,
        context: &'static str,
    ) -> Result<(), AdminPlatformError> {
        let response = self
            .inner
            .client
            .request(method, format!("{}{path}", self.inner.endpoint))
            .bearer_auth(&self.inner.service_key)
            .json(body)
            .send()
            .await?;

        Self::check_status(response, context).await?;
        Ok(())
    }

    async fn check_status(
        response: reqwest::Response,
        context: &'static str,
    ) -> Result<String, AdminPlatformError> {
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(AdminPlatformError::RateLimited(retry_after));
        }

        let body = response.text().await?;

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(AdminPlatformError::NotFound(context.to_string()));
        }

        if status.is_client_error() {
            return Err(AdminPlatformError::Rejected(
                body.chars().take(200).collect(),
            ));
        }

        if !status.is_success() {
            tracing::error!(
                status = %status,
                context,
                body = %body.chars().take(500).collect::<String>(),
                "Platform API returned non-success status"
            );
            return Err(AdminPlatformError::Status {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        Ok(body)
    }
}

impl AdminPlatformApi for AdminPlatformClient {
    #[instrument(skip(self))]
    async fn list_products(
        &self,
        query: Option<&str>,
    ) -> Result<Vec<ProductRow>, AdminPlatformError> {
        let cache_key = query.unwrap_or("").to_string();

        if let Some(rows) = self.inner.list_cache.get(&cache_key).await {
            debug!("Cache hit for product list");
            return Ok(rows.as_ref().clone());
        }

        let path = query.map_or_else(
            || "/products".to_string(),
            |q| {
                let encoded: String = url::form_urlencoded::byte_serialize(q.as_bytes()).collect();
                format!("/products?q={encoded}")
            },
        );

        let rows: Vec<ProductRow> = self.get_json(&path, "product list").await?;

        self.inner
            .list_cache
            .insert(cache_key, Arc::new(rows.clone()))
            .await;

        Ok(rows)
    }

    #[instrument(skip(self, patch), fields(product_id = %id))]
    async fn update_product(
        &self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<(), AdminPlatformError> {
        self.send_json(
            reqwest::Method::PATCH,
            &format!("/products/{id}"),
            patch,
            "product update",
        )
        .await
    }

    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    async fn insert_backup(
        &self,
        label: &str,
        rows: &[ProductRow],
    ) -> Result<(), AdminPlatformError> {
        self.send_json(
            reqwest::Method::POST,
            "/products/backups",
            &json!({ "label": label, "rows": rows }),
            "backup insert",
        )
        .await
    }

    #[instrument(skip(self))]
    async fn changes_since(&self, cursor: u64) -> Result<Vec<ChangeEvent>, AdminPlatformError> {
        self.get_json(&format!("/changes?after={cursor}"), "change feed")
            .await
    }
}

/// Decode a platform response body into `T`.
fn decode<T: DeserializeOwned>(context: &'static str, body: &str) -> Result<T, AdminPlatformError> {
    serde_json::from_str(body).map_err(|source| {
        tracing::error!(
            context,
            body = %body.chars().take(500).collect::<String>(),
            "Failed to decode platform response"
        );
        AdminPlatformError::Malformed { context, source }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_product_rows() {
        let body = r#"[{
            "id": "7f9a2f44-1111-4f3e-9d28-3a1c6f6e7a02",
            "name": "Charcoal Wool Blazer",
            "price": "249.00",
            "category": "Blazers",
            "status": "active"
        }]"#;

        let rows: Vec<ProductRow> = decode("product list", body).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Charcoal Wool Blazer");
        assert_eq!(rows[0].description, None);
    }

    #[test]
    fn test_decode_malformed_body() {
        let err = decode::<Vec<ProductRow>>("product list", "{not json").unwrap_err();
        assert!(matches!(
            err,
            AdminPlatformError::Malformed {
                context: "product list",
                ..
            }
        ));
    }
}
