//! Admin-side commerce platform API client.
//!
//! Separate from the checkout service's client on purpose: this one
//! carries the mutation surface (product updates, backup copies) and the
//! audit feed, and it caches product list reads because the bulk editor
//! refreshes them constantly. The cache is invalidated after every
//! commit so the operator sees fresh rows.

mod client;
pub mod types;

pub use client::AdminPlatformClient;
pub use types::*;

use haberdash_core::ProductId;
use thiserror::Error;

/// Errors that can occur when interacting with the platform API.
#[derive(Debug, Error)]
pub enum AdminPlatformError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body did not match the expected shape.
    #[error("Malformed {context} response: {source}")]
    Malformed {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the platform.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The platform rejected the request (e.g. invalid input).
    #[error("Rejected: {0}")]
    Rejected(String),

    /// Unexpected status code from the platform.
    #[error("Unexpected status {status}: {message}")]
    Status { status: u16, message: String },
}

/// The platform operations the admin service depends on.
///
/// Constructed once at startup and injected through application state;
/// tests substitute in-memory doubles.
#[allow(async_fn_in_trait)]
pub trait AdminPlatformApi {
    /// List catalog products, optionally filtered by a search string.
    async fn list_products(
        &self,
        query: Option<&str>,
    ) -> Result<Vec<ProductRow>, AdminPlatformError>;

    /// Apply a partial field update to one product.
    async fn update_product(
        &self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<(), AdminPlatformError>;

    /// Copy product rows into the platform-side backup table.
    async fn insert_backup(
        &self,
        label: &str,
        rows: &[ProductRow],
    ) -> Result<(), AdminPlatformError>;

    /// Fetch audit-feed events past the given cursor.
    async fn changes_since(&self, cursor: u64) -> Result<Vec<ChangeEvent>, AdminPlatformError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_platform_error_display() {
        let err = AdminPlatformError::Rejected("price must be non-negative".to_string());
        assert_eq!(err.to_string(), "Rejected: price must be non-negative");

        let err = AdminPlatformError::RateLimited(10);
        assert_eq!(err.to_string(), "Rate limited, retry after 10 seconds");
    }
}
