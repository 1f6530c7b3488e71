//! Commerce platform API client.
//!
//! # Architecture
//!
//! - The platform is source of truth for catalog, inventory, and orders -
//!   no local sync, direct API calls
//! - Every response is decoded into the typed entities in [`types`];
//!   payloads that fail to decode surface as [`PlatformError::Malformed`]
//!   instead of leaking loose JSON into the service
//! - Nothing is cached here: other shoppers and operators mutate price
//!   and inventory concurrently, which is the whole reason the flow
//!   re-reads them at submission time

mod client;
pub mod types;

pub use client::PlatformClient;
pub use types::*;

use haberdash_core::{CheckoutSessionId, VariantId};
use thiserror::Error;

/// Errors that can occur when interacting with the platform API.
#[derive(Debug, Error)]
pub enum PlatformError {
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

impl PlatformError {
    /// Whether retrying the same request later could succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::RateLimited(_) | Self::Status { .. }
        )
    }
}

/// The subset of platform operations the checkout service depends on.
///
/// The concrete [`PlatformClient`] is constructed once at startup and
/// handed to the flow through application state; tests substitute
/// in-memory doubles.
#[allow(async_fn_in_trait)]
pub trait PlatformApi {
    /// Fetch a variant with its live price and parent product.
    async fn variant(&self, id: VariantId) -> Result<VariantRecord, PlatformError>;

    /// Fetch live available inventory for a variant. Never cached.
    async fn available_inventory(&self, id: VariantId) -> Result<i64, PlatformError>;

    /// Create a hosted checkout session for a validated cart snapshot.
    async fn create_checkout_session(
        &self,
        request: &SessionRequest,
    ) -> Result<SessionCreated, PlatformError>;

    /// Mark the order behind a completed session as paid.
    async fn mark_order_paid(&self, session_id: &CheckoutSessionId) -> Result<(), PlatformError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_error_display() {
        let err = PlatformError::NotFound("variant 123".to_string());
        assert_eq!(err.to_string(), "Not found: variant 123");

        let err = PlatformError::RateLimited(30);
        assert_eq!(err.to_string(), "Rate limited, retry after 30 seconds");
    }

    #[test]
    fn test_malformed_error_names_context() {
        let source = serde_json::from_str::<VariantRecord>("{}").unwrap_err();
        let err = PlatformError::Malformed {
            context: "variant",
            source,
        };
        assert!(err.to_string().starts_with("Malformed variant response"));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(PlatformError::RateLimited(5).is_retryable());
        assert!(
            PlatformError::Status {
                status: 502,
                message: String::new()
            }
            .is_retryable()
        );
        assert!(!PlatformError::NotFound(String::new()).is_retryable());
        assert!(!PlatformError::Rejected(String::new()).is_retryable());
    }
}
