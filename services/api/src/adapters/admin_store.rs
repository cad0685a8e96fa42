//! services/api/src/adapters/admin_store.rs
//!
//! This module contains the file-backed admin configuration store. It
//! implements the `AdminConfigService` port from the `core` crate: one
//! global record with an explicit load/save contract, passed by handle to
//! the route handlers instead of living as a module-level global.

use async_trait::async_trait;
use std::path::PathBuf;
use teeforge_core::domain::{AdminConfig, AdminConfigPatch};
use teeforge_core::ports::{AdminConfigService, PortError, PortResult};
use tokio::sync::RwLock;
use tracing::{info, warn};

/// A JSON-file-backed implementation of the `AdminConfigService` port.
pub struct FileAdminStore {
    path: PathBuf,
    config: RwLock<AdminConfig>,
}

impl FileAdminStore {
    /// Loads the store from `path`. A missing file yields the defaults; a
    /// partial file is merged over them. Unreadable contents are an error
    /// so a corrupt config never silently resets the shop.
    pub async fn load(path: PathBuf) -> PortResult<Self> {
        let config = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<AdminConfig>(&bytes).map_err(|e| {
                PortError::Unexpected(format!("unreadable admin config {}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No admin config at {}, using defaults", path.display());
                AdminConfig::default()
            }
            Err(e) => {
                return Err(PortError::Unexpected(format!(
                    "failed to read admin config {}: {e}",
                    path.display()
                )))
            }
        };
        Ok(Self {
            path,
            config: RwLock::new(config),
        })
    }

    async fn persist(&self, config: &AdminConfig) -> PortResult<()> {
        let bytes = serde_json::to_vec_pretty(config)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        tokio::fs::write(&self.path, bytes).await.map_err(|e| {
            PortError::Unexpected(format!(
                "failed to save admin config {}: {e}",
                self.path.display()
            ))
        })
    }
}

#[async_trait]
impl AdminConfigService for FileAdminStore {
    async fn get(&self) -> AdminConfig {
        self.config.read().await.clone()
    }

    async fn update(&self, patch: AdminConfigPatch) -> PortResult<AdminConfig> {
        let mut config = self.config.write().await;
        let mut updated = config.clone();
        updated.apply(patch);
        self.persist(&updated).await.inspect_err(|e| {
            warn!("Admin config update not persisted: {e}");
        })?;
        *config = updated.clone();
        Ok(updated)
    }
}
