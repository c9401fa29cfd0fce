//! Config loading: code defaults, then an optional TOML file, then env
//! overrides, then validation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::env::apply_env_overrides;
use crate::schema::MnemoConfig;

/// Load the effective configuration.
///
/// `path` forces a specific config file (an error if unreadable). Otherwise
/// `$MNEMO_CONFIG`, then `./mnemo.toml`, then the user config dir are tried;
/// a missing file just means defaults.
pub fn load(path: Option<&Path>) -> Result<MnemoConfig> {
    let mut config = match path {
        Some(p) => read_config_file(p)?,
        None => match discover_config_file() {
            Some(p) => read_config_file(&p)?,
            None => MnemoConfig::default(),
        },
    };

    apply_env_overrides(&mut config);
    config.validate()?;
    Ok(config)
}

fn read_config_file(path: &Path) -> Result<MnemoConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config = toml::from_str(&raw)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;
    debug!(path = %path.display(), "Loaded config file");
    Ok(config)
}

fn discover_config_file() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("MNEMO_CONFIG") {
        let p = PathBuf::from(p);
        if p.exists() {
            return Some(p);
        }
    }

    let local = PathBuf::from("mnemo.toml");
    if local.exists() {
        return Some(local);
    }

    let user = dirs::config_dir()?.join("mnemo").join("config.toml");
    user.exists().then_some(user)
}
