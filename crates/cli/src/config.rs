//! CLI configuration file
//!
//! ```toml
//! events = "create,delete"
//!
//! [session]
//! nonblocking = false
//! close_on_exec = true
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use watcher::SessionConfig;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Default event kinds when --events is not given
    pub events: Option<String>,

    pub session: SessionConfig,
}

/// Load config from `path`, or defaults when no path is given
pub fn load(path: Option<&Path>) -> Result<CliConfig> {
    let Some(path) = path else {
        return Ok(CliConfig::default());
    };

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: CliConfig = toml::from_str(&text)
        .with_context(|| format!("Invalid config file {}", path.display()))?;

    tracing::debug!(?config, "Loaded config");
    Ok(config)
}
