//! Layered configuration for agent-follow.
//!
//! Layers, lowest precedence first:
//! 1. Programmed defaults ([`defaults::default_config`])
//! 2. User config (`$XDG_CONFIG_HOME/agent-follow/agent-follow.toml`)
//! 3. Project config (`<root>/agent-follow.toml`)
//!
//! A layer that fails to load is skipped and reported as a warning event;
//! configuration problems never stop a session from starting.

pub mod defaults;
pub mod settings;
pub mod user;

use std::fs;
use std::path::Path;

pub use settings::{
    Faces, FacesConfig, FollowConfig, FollowSettings, LocateConfig, PreviewConfig, ViewportConfig,
};
pub use user::{UserConfigError, UserConfigResult, load_user_config, user_config_path};

/// File name of both the user and the project configuration.
pub const CONFIG_FILE_NAME: &str = "agent-follow.toml";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettingsEventKind {
    Info,
    Warning,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettingsEvent {
    pub kind: SettingsEventKind,
    pub message: String,
}

impl SettingsEvent {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: SettingsEventKind::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            kind: SettingsEventKind::Warning,
            message: message.into(),
        }
    }
}

#[derive(Debug)]
pub struct SettingsLoadOutcome {
    pub settings: FollowSettings,
    pub events: Vec<SettingsEvent>,
}

impl SettingsLoadOutcome {
    /// Forward the loader messages to the log.
    pub fn log_events(&self) {
        for event in &self.events {
            match event.kind {
                SettingsEventKind::Info => {
                    log::info!(target: "agent_follow::config", "{}", event.message)
                }
                SettingsEventKind::Warning => {
                    log::warn!(target: "agent_follow::config", "{}", event.message)
                }
            }
        }
    }
}

pub fn load_settings(root_path: Option<&Path>) -> SettingsLoadOutcome {
    let mut events = Vec::new();

    // Layer 1: Programmed defaults (lowest precedence)
    let defaults = Some(defaults::default_config());

    // Layer 2: User config from XDG_CONFIG_HOME
    let user_config = load_user_config_with_events(&mut events);

    // Layer 3: Project config from root_path/agent-follow.toml
    let project_config = load_toml_settings(root_path, &mut events);

    let merged = merge_all(&[defaults, user_config, project_config]).unwrap_or_default();
    let settings = FollowSettings::resolve(merged, &mut events);

    SettingsLoadOutcome { settings, events }
}

/// Merge multiple configuration layers in order.
/// Later layers in the slice have higher precedence.
pub fn merge_all(configs: &[Option<FollowConfig>]) -> Option<FollowConfig> {
    configs.iter().cloned().reduce(merge_settings).flatten()
}

/// Merge two layers, preferring values from `primary` over `fallback`
pub fn merge_settings(
    fallback: Option<FollowConfig>,
    primary: Option<FollowConfig>,
) -> Option<FollowConfig> {
    match (fallback, primary) {
        (None, None) => None,
        (Some(config), None) | (None, Some(config)) => Some(config),
        (Some(fallback), Some(primary)) => Some(fallback.merge(primary)),
    }
}

/// Load user config and add appropriate events to the events vector.
fn load_user_config_with_events(events: &mut Vec<SettingsEvent>) -> Option<FollowConfig> {
    match load_user_config() {
        Ok(Some(config)) => {
            events.push(SettingsEvent::info("Loaded user config"));
            Some(config)
        }
        // No user config file exists - this is fine (zero-config experience)
        Ok(None) => None,
        Err(err) => {
            events.push(SettingsEvent::warning(format!(
                "Failed to load user config: {}",
                err
            )));
            None
        }
    }
}

fn load_toml_settings(
    root_path: Option<&Path>,
    events: &mut Vec<SettingsEvent>,
) -> Option<FollowConfig> {
    let root = root_path?;
    let config_path = root.join(CONFIG_FILE_NAME);
    if !config_path.exists() {
        return None;
    }

    events.push(SettingsEvent::info(format!(
        "Found config file: {}",
        config_path.display()
    )));

    match fs::read_to_string(&config_path) {
        Ok(contents) => match toml::from_str::<FollowConfig>(&contents) {
            Ok(config) => {
                events.push(SettingsEvent::info(format!(
                    "Successfully loaded {}",
                    CONFIG_FILE_NAME
                )));
                Some(config)
            }
            Err(err) => {
                events.push(SettingsEvent::warning(format!(
                    "Failed to parse {}: {}",
                    CONFIG_FILE_NAME, err
                )));
                None
            }
        },
        Err(err) => {
            events.push(SettingsEvent::warning(format!(
                "Failed to read {}: {}",
                CONFIG_FILE_NAME, err
            )));
            None
        }
    }
}
