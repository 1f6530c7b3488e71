//! The backup gate: bulk writes are refused until a recovery artifact
//! exists for the current session.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use thiserror::Error;
use tracing::instrument;

use crate::platform::{AdminPlatformApi, AdminPlatformError};

/// Session-scoped flag recording that a backup was completed.
///
/// Reset only by process restart; a new session starts un-backed-up.
#[derive(Debug, Default)]
pub struct BackupGate {
    confirmed: AtomicBool,
}

impl BackupGate {
    /// Whether a backup has been completed this session.
    #[must_use]
    pub fn is_confirmed(&self) -> bool {
        self.confirmed.load(Ordering::SeqCst)
    }

    /// Record that a recovery artifact now exists.
    pub fn confirm(&self) {
        self.confirmed.store(true, Ordering::SeqCst);
    }
}

/// Where the recovery artifact ended up.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackupArtifact {
    /// Rows copied into the platform's backup table.
    PlatformTable { label: String },
    /// Platform copy failed; rows exported to a local JSON file instead.
    LocalExport { path: PathBuf },
}

/// Errors that can prevent a backup from being produced at all.
#[derive(Debug, Error)]
pub enum BackupError {
    /// Could not even load the rows to back up.
    #[error("failed to load products for backup: {0}")]
    Load(#[source] AdminPlatformError),

    /// Platform copy failed and the local export did too.
    #[error("backup export failed: {0}")]
    Export(#[from] std::io::Error),

    /// Backup rows could not be serialized (should never happen).
    #[error("backup serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Produce a recovery artifact and open the gate.
///
/// Prefers copying rows into the platform's backup table; if that insert
/// fails, falls back to a timestamped JSON export under `export_dir`.
/// Either way the operator ends up holding something restorable before
/// any destructive write is permitted.
///
/// # Errors
///
/// Fails without opening the gate if the rows cannot be loaded, or if
/// both the platform copy and the local export fail.
#[instrument(skip(platform, gate, export_dir))]
pub async fn create_backup<P: AdminPlatformApi>(
    platform: &P,
    gate: &BackupGate,
    export_dir: &Path,
) -> Result<BackupArtifact, BackupError> {
    let rows = platform
        .list_products(None)
        .await
        .map_err(BackupError::Load)?;

    let label = Utc::now().format("%Y%m%dT%H%M%SZ").to_string();

    let artifact = match platform.insert_backup(&label, &rows).await {
        Ok(()) => {
            tracing::info!(rows = rows.len(), label, "Backup copied to platform table");
            BackupArtifact::PlatformTable { label }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Platform backup failed, falling back to local export");

            tokio::fs::create_dir_all(export_dir).await?;
            let path = export_dir.join(format!("products_backup_{label}.json"));
            let body = serde_json::to_vec_pretty(&rows)?;
            tokio::fs::write(&path, body).await?;

            tracing::info!(rows = rows.len(), path = %path.display(), "Backup exported locally");
            BackupArtifact::LocalExport { path }
        }
    };

    gate.confirm();
    Ok(artifact)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::bulk::testing::MockAdminPlatform;

    #[test]
    fn test_gate_starts_closed() {
        let gate = BackupGate::default();
        assert!(!gate.is_confirmed());
        gate.confirm();
        assert!(gate.is_confirmed());
    }

    #[tokio::test]
    async fn test_backup_prefers_platform_table() {
        let platform = MockAdminPlatform::new().with_products(3);
        let gate = BackupGate::default();
        let dir = std::env::temp_dir().join("haberdash-backup-test-unused");

        let artifact = create_backup(&platform, &gate, &dir).await.unwrap();

        assert!(matches!(artifact, BackupArtifact::PlatformTable { .. }));
        assert!(gate.is_confirmed());
        assert_eq!(platform.backup_inserts(), 1);
    }

    #[tokio::test]
    async fn test_backup_falls_back_to_local_export() {
        let platform = MockAdminPlatform::new()
            .with_products(2)
            .with_failing_backups();
        let gate = BackupGate::default();
        let dir = std::env::temp_dir().join(format!("haberdash-backup-{}", uuid::Uuid::new_v4()));

        let artifact = create_backup(&platform, &gate, &dir).await.unwrap();

        let BackupArtifact::LocalExport { path } = artifact else {
            panic!("expected local export");
        };
        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(contents.contains("price"));
        assert!(gate.is_confirmed());

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
