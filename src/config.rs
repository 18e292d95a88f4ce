use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Server configuration
// ---------------------------------------------------------------------------

/// Everything the server needs, assembled from CLI flags and the optional
/// settings file.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// TCP port the HTTP listener binds to.
    pub port: u16,
    /// Root directory under which bare mirrors are stored.
    pub cache_root: PathBuf,
    pub settings: Settings,
}

// ---------------------------------------------------------------------------
// Optional settings file
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Seconds between want-satisfaction re-checks while an upstream fetch
    /// is in flight.
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,
    /// Emit one structured log line per served request.
    #[serde(default = "bool_true")]
    pub log_requests: bool,
    /// Bearer token attached to upstream calls when the client sends no
    /// credential of its own.
    #[serde(default)]
    pub upstream_token: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            check_interval_secs: default_check_interval(),
            log_requests: bool_true(),
            upstream_token: None,
        }
    }
}

fn default_check_interval() -> u64 {
    1
}

fn bool_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

/// Load and validate [`Settings`] from a YAML file at `path`.
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read settings file: {}", path.display()))?;
    let settings: Settings = serde_yaml::from_str(&contents)
        .with_context(|| format!("failed to parse settings file: {}", path.display()))?;
    validate_settings(&settings)?;
    Ok(settings)
}

/// Sanity checks that cannot be expressed purely with serde.
fn validate_settings(settings: &Settings) -> Result<()> {
    anyhow::ensure!(
        settings.check_interval_secs >= 1,
        "check_interval_secs must be at least 1"
    );
    Ok(())
}
