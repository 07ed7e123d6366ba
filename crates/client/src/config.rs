// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

/// Configuration for the EduHub gateway.
#[derive(Debug, Clone, clap::Args)]
pub struct GatewayConfig {
    /// Base URL of the EduHub API.
    #[arg(long, default_value = "http://localhost:5000/api/v1", env = "EDUHUB_API_URL")]
    pub api_url: String,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 30, env = "EDUHUB_TIMEOUT_SECS")]
    pub timeout_secs: u64,

    /// Directory for persisted state (credentials). Defaults to the
    /// platform state directory.
    #[arg(long, env = "EDUHUB_STATE_DIR")]
    pub state_dir: Option<PathBuf>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:5000/api/v1".to_owned(),
            timeout_secs: 30,
            state_dir: None,
        }
    }
}

impl GatewayConfig {
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }

    /// Path of the credentials file inside the resolved state directory.
    pub fn credentials_path(&self) -> PathBuf {
        self.resolved_state_dir().join("credentials.json")
    }

    fn resolved_state_dir(&self) -> PathBuf {
        if let Some(ref dir) = self.state_dir {
            return dir.clone();
        }
        state_dir()
    }
}

/// Resolve the default state directory for EduHub client data.
///
/// Checks `EDUHUB_STATE_DIR`, then `$XDG_STATE_HOME/eduhub`,
/// then `$HOME/.local/state/eduhub`.
pub fn state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("EDUHUB_STATE_DIR") {
        return PathBuf::from(dir);
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(xdg).join("eduhub");
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local/state/eduhub");
    }
    PathBuf::from(".eduhub")
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
