//! Application state shared across handlers.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::bulk::{BackupGate, BulkWorkspace};
use crate::config::AdminConfig;
use crate::platform::AdminPlatformClient;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. The platform client, the editing
/// workspace, and the backup gate are constructed once at startup and
/// live for the whole process.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    platform: AdminPlatformClient,
    workspace: Mutex<BulkWorkspace>,
    backup_gate: BackupGate,
}

impl AppState {
    /// Create a new application state from configuration.
    #[must_use]
    pub fn new(config: AdminConfig) -> Self {
        let platform = AdminPlatformClient::new(&config.platform);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                platform,
                workspace: Mutex::new(BulkWorkspace::default()),
                backup_gate: BackupGate::default(),
            }),
        }
    }

    /// Get a reference to the service configuration.
    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    /// Get a reference to the platform API client.
    #[must_use]
    pub fn platform(&self) -> &AdminPlatformClient {
        &self.inner.platform
    }

    /// The bulk editing workspace. Held across commit so staging and
    /// committing cannot interleave.
    #[must_use]
    pub fn workspace(&self) -> &Mutex<BulkWorkspace> {
        &self.inner.workspace
    }

    /// The session backup gate.
    #[must_use]
    pub fn backup_gate(&self) -> &BackupGate {
        &self.inner.backup_gate
    }
}
