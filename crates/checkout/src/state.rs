//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::CheckoutConfig;
use crate::flow::CheckoutFlow;
use crate::platform::PlatformClient;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// platform client and the checkout flow. Both are constructed exactly
/// once at startup and torn down with the process; nothing here is a
/// module-level global.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: CheckoutConfig,
    platform: PlatformClient,
    flow: CheckoutFlow,
}

impl AppState {
    /// Create a new application state from configuration.
    #[must_use]
    pub fn new(config: CheckoutConfig) -> Self {
        let platform = PlatformClient::new(&config.platform);
        let flow = CheckoutFlow::new(config.policy, &config.base_url);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                platform,
                flow,
            }),
        }
    }

    /// Get a reference to the service configuration.
    #[must_use]
    pub fn config(&self) -> &CheckoutConfig {
        &self.inner.config
    }

    /// Get a reference to the platform API client.
    #[must_use]
    pub fn platform(&self) -> &PlatformClient {
        &self.inner.platform
    }

    /// Get a reference to the checkout flow.
    #[must_use]
    pub fn flow(&self) -> &CheckoutFlow {
        &self.inner.flow
    }
}
