//! Per-repository configuration
//!
//! Loads optional settings from a `gitchurn.toml` in the repository root.
//! CLI flags win over config values, config values over built-in defaults.
//!
//! ```toml
//! # gitchurn.toml
//!
//! [defaults]
//! format = "json"
//! max_changes = 20
//!
//! [tools]
//! git_bin = "/usr/local/bin/git"
//! ctags_bin = "/opt/uctags/bin/ctags"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

pub const CONFIG_FILE: &str = "gitchurn.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub tools: Tools,
}

/// Defaults for flags the user did not pass.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Defaults {
    /// Tag output format: "human" or "json".
    pub format: Option<String>,
    /// Skip commits touching more than this many files.
    pub max_changes: Option<usize>,
}

/// External tool locations.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Tools {
    pub git_bin: Option<String>,
    pub ctags_bin: Option<String>,
}

/// Load `gitchurn.toml` from the repository root; absence is not an error.
pub fn load(repo: &Path) -> Result<ProjectConfig> {
    let path = repo.join(CONFIG_FILE);
    if !path.exists() {
        debug!("no {} in {:?}, using defaults", CONFIG_FILE, repo);
        return Ok(ProjectConfig::default());
    }
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {:?}", path))?;
    let config: ProjectConfig =
        toml::from_str(&text).with_context(|| format!("invalid config in {:?}", path))?;
    debug!("loaded config from {:?}", path);
    Ok(config)
}
