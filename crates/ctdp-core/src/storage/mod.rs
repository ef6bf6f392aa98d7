mod config;
pub mod migrations;
mod store;

pub use config::{Config, DailyLogConfig, NotificationsConfig, PollerConfig, StatusBarConfig};
pub use store::TaskStore;

use std::path::PathBuf;

use crate::error::StoreError;

/// Returns `~/.config/ctdp[-dev]/` based on CTDP_ENV.
///
/// Set CTDP_ENV=dev to use development data directory.
/// CTDP_DATA_DIR overrides the location entirely (used by tests).
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, StoreError> {
    let dir = match std::env::var_os("CTDP_DATA_DIR").filter(|v| !v.is_empty()) {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("CTDP_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("ctdp-dev")
            } else {
                base_dir.join("ctdp")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| StoreError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
