// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Media configuration, persisted as JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;

/// Which backing the manager should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendPreference {
    /// Use the native bridge when the platform offers one, else the direct backing.
    #[default]
    Auto,
    /// Always wrap a local audio primitive.
    Direct,
    /// Always forward to the native command bridge.
    Bridged,
}

/// Persistent media settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Namespace every bridge command is sent under.
    pub namespace: String,
    /// Action name of the standing status subscription.
    pub channel_action: String,
    /// Backing selection policy.
    pub backend: BackendPreference,
    /// Volume applied to freshly created primitives (0.0–1.0).
    pub default_volume: f64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            namespace: "Media".into(),
            channel_action: "messageChannel".into(),
            backend: BackendPreference::Auto,
            default_volume: 1.0,
        }
    }
}

impl MediaConfig {
    /// Load settings from `path`, falling back to defaults when the file does
    /// not exist. A file that exists but does not parse is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "no media config on disk, using defaults");
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)?;
        info!(path = %path.display(), backend = ?config.backend, "media config loaded");
        Ok(config)
    }

    /// Persist settings as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }
}
