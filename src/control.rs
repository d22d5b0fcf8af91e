//! Session-bus control interface for the tray/CLI layer.

use std::sync::Arc;

use anyhow::Result;
use zbus::fdo;

use tb_app::{PortalInjector, TrimWatcher};
use tb_core::Aggressiveness;

pub const BUS_NAME: &str = "dev.trimboard.Trimboard";
pub const OBJECT_PATH: &str = "/dev/trimboard/Trimboard";

pub struct Control {
    watcher: Arc<TrimWatcher>,
    injector: Arc<PortalInjector>,
}

#[zbus::interface(name = "dev.trimboard.Trimboard1")]
impl Control {
    async fn paste_trimmed(&self) -> fdo::Result<()> {
        self.watcher.paste_trimmed().await.map_err(to_fdo)
    }

    async fn paste_original(&self) -> fdo::Result<()> {
        self.watcher.paste_original().await.map_err(to_fdo)
    }

    async fn restore_last_copy(&self) -> fdo::Result<()> {
        self.watcher.restore_last_copy().await.map_err(to_fdo)
    }

    /// Returns whether the value actually changed.
    async fn set_auto_trim(&self, enabled: bool) -> fdo::Result<bool> {
        self.watcher
            .set_auto_trim_enabled(enabled)
            .await
            .map_err(to_fdo)
    }

    async fn set_aggressiveness(&self, level: &str) -> fdo::Result<bool> {
        let level = match level {
            "low" => Aggressiveness::Low,
            "normal" => Aggressiveness::Normal,
            "high" => Aggressiveness::High,
            other => {
                return Err(fdo::Error::InvalidArgs(format!(
                    "unknown aggressiveness {:?}",
                    other
                )))
            }
        };
        self.watcher.set_aggressiveness(level).await.map_err(to_fdo)
    }

    async fn set_enabled(&self, enabled: bool) {
        self.watcher.set_enabled(enabled).await;
    }

    async fn last_summary(&self) -> String {
        self.watcher.last_summary().await.unwrap_or_default()
    }

    async fn session_state(&self) -> String {
        self.injector.session_state().await.label().to_string()
    }

    async fn request_permission(&self) {
        self.injector.request_permission().await;
    }

    async fn request_preauthorization(&self) {
        self.injector.request_preauthorization().await;
    }
}

fn to_fdo(e: anyhow::Error) -> fdo::Error {
    fdo::Error::Failed(format!("{:#}", e))
}

/// Claim the well-known name and serve the control object. The returned
/// connection must be kept alive for the lifetime of the process.
pub async fn serve(
    watcher: Arc<TrimWatcher>,
    injector: Arc<PortalInjector>,
) -> Result<zbus::Connection> {
    let connection = zbus::connection::Builder::session()?
        .name(BUS_NAME)?
        .serve_at(OBJECT_PATH, Control { watcher, injector })?
        .build()
        .await?;
    Ok(connection)
}
