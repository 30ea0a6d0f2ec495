//! User configuration loading for agent-follow.
//!
//! User config location: $XDG_CONFIG_HOME/agent-follow/agent-follow.toml
//! Fallback: the platform config directory (`dirs::config_dir()`), e.g.
//! ~/.config/agent-follow/agent-follow.toml on Linux.

use std::path::PathBuf;

use thiserror::Error;

use super::CONFIG_FILE_NAME;
use super::settings::FollowConfig;

const APP_DIR: &str = "agent-follow";

/// Errors raised while loading the user configuration file.
#[derive(Debug, Error)]
pub enum UserConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

pub type UserConfigResult<T> = Result<T, UserConfigError>;

/// Returns the path to the user configuration file.
///
/// The path is determined by:
/// 1. If $XDG_CONFIG_HOME is set: $XDG_CONFIG_HOME/agent-follow/agent-follow.toml
/// 2. Otherwise: `dirs::config_dir()`/agent-follow/agent-follow.toml
///
/// Returns None if neither can be determined.
pub fn user_config_path() -> Option<PathBuf> {
    let base = match std::env::var_os("XDG_CONFIG_HOME") {
        Some(xdg_config) if !xdg_config.is_empty() => PathBuf::from(xdg_config),
        _ => dirs::config_dir()?,
    };
    Some(base.join(APP_DIR).join(CONFIG_FILE_NAME))
}

/// Load the user configuration layer.
///
/// Returns `Ok(None)` when no user config file exists.
pub fn load_user_config() -> UserConfigResult<Option<FollowConfig>> {
    let Some(path) = user_config_path() else {
        return Ok(None);
    };
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(&path).map_err(|source| UserConfigError::Read {
        path: path.clone(),
        source,
    })?;
    toml::from_str(&contents)
        .map(Some)
        .map_err(|source| UserConfigError::Parse { path, source })
}
