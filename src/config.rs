// ═══════════════════════════════════════════════════════════════════════════════
//  Config Persistence  (~/.config/nixie-settings/config.json)
// ═══════════════════════════════════════════════════════════════════════════════

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::controller::Timing;
use crate::device::DEFAULT_DEVICE;
use crate::form::TimezoneOption;

pub fn config_dir() -> PathBuf {
    // When running via sudo, keep config in the real user's home
    let home = std::env::var("SUDO_USER")
        .ok()
        .map(|u| format!("/home/{u}"))
        .or_else(|| std::env::var("HOME").ok())
        .unwrap_or_else(|| "/tmp".into());
    PathBuf::from(home).join(".config").join("nixie-settings")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

pub fn log_path() -> PathBuf {
    config_dir().join("nixie-settings.log")
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    pub device: String,
    pub debounce_ms: u64,
    pub static_resync_ms: u64,
    pub request_timeout_ms: u64,
    /// Appended to the built-in timezone table.
    pub timezones: Vec<TimezoneOption>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            device: DEFAULT_DEVICE.into(),
            debounce_ms: 10,
            static_resync_ms: 100,
            request_timeout_ms: 5000,
            timezones: Vec::new(),
        }
    }
}

impl ClientConfig {
    /// Missing or unreadable files give the defaults.
    pub fn load(path: &Path) -> Self {
        fs::read_to_string(path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    pub fn timing(&self) -> Timing {
        Timing {
            debounce: Duration::from_millis(self.debounce_ms),
            static_resync: Duration::from_millis(self.static_resync_ms),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
