//! Action host configuration stored as TOML (e.g. `actionbuf.toml`).

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Action host configuration (TOML).
///
/// Missing fields take their defaults, so an empty file is valid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ActionConfig {
    /// Seconds between client refreshes while an action is running.
    pub refresh_secs: u32,

    /// URL the refresh directive points clients at.
    pub display_url: String,

    /// Application label shown by layouts (name or version string).
    pub app_name: String,

    /// Label of the model whose actions this host runs.
    pub controller_name: String,

    /// Hard per-action deadline. Unset means actions may run indefinitely.
    pub action_timeout_secs: Option<u64>,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            refresh_secs: 1,
            display_url: "/display".to_string(),
            app_name: "actionbuf".to_string(),
            controller_name: "actionbuf controller".to_string(),
            action_timeout_secs: None,
        }
    }
}

impl ActionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.refresh_secs == 0 {
            return Err(anyhow!("refresh_secs must be > 0"));
        }
        if !self.display_url.starts_with('/') {
            return Err(anyhow!("display_url must start with '/'"));
        }
        if self.display_url == "/" {
            return Err(anyhow!("display_url must not be the root route"));
        }
        if let Some(bad) = self
            .display_url
            .chars()
            .find(|&c| c.is_whitespace() || c.is_control() || matches!(c, '"' | '\'' | '<' | '>' | '&'))
        {
            return Err(anyhow!("display_url must not contain {bad:?}"));
        }
        if self.action_timeout_secs == Some(0) {
            return Err(anyhow!("action_timeout_secs must be > 0 when set"));
        }
        Ok(())
    }

    pub fn action_timeout(&self) -> Option<Duration> {
        self.action_timeout_secs.map(Duration::from_secs)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `ActionConfig::default()`.
pub fn load_config(path: &Path) -> Result<ActionConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "config missing, using defaults");
        let cfg = ActionConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ActionConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

/// Write config to disk, replacing any existing file in one rename.
///
/// The TOML is staged beside the target as `.<name>.partial`.
pub fn write_config(path: &Path, cfg: &ActionConfig) -> Result<()> {
    cfg.validate()?;
    let mut body = toml::to_string_pretty(cfg).context("serialize config toml")?;
    body.push('\n');

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let name = path
        .file_name()
        .with_context(|| format!("config path has no file name: {}", path.display()))?;
    fs::create_dir_all(dir).with_context(|| format!("create config dir {}", dir.display()))?;

    let staged = dir.join(format!(".{}.partial", name.to_string_lossy()));
    fs::write(&staged, &body).with_context(|| format!("stage config {}", staged.display()))?;
    fs::rename(&staged, path).with_context(|| format!("install config {}", path.display()))?;
    debug!(path = %path.display(), bytes = body.len(), "wrote config");
    Ok(())
}
