//! Default configuration values for agent-follow.
//!
//! This module provides the programmed defaults, the lowest configuration
//! layer. They are also what `agent-follow config init` writes out.

use std::time::Duration;

use super::settings::{FacesConfig, FollowConfig, LocateConfig, PreviewConfig, ViewportConfig};
use crate::error::{FollowError, FollowResult};
use crate::text::locate::{WINDOW_LINES_AFTER, WINDOW_LINES_BEFORE};

/// Debounce delay for follow requests, in seconds.
pub const DEFAULT_DEBOUNCE_DELAY: f64 = 0.3;

/// Duration of the fading highlight after an applied write, in seconds.
pub const DEFAULT_HIGHLIGHT_DURATION: f64 = 0.6;

/// Delays of the settle passes after a viewport move, in seconds.
pub const DEFAULT_SETTLE_DELAYS: [f64; 2] = [0.1, 0.3];

/// Preview decorations sit above ordinary syntax/selection decorations.
pub const DEFAULT_PREVIEW_PRIORITY: i32 = 100;

/// Returns the fully populated default configuration layer.
pub fn default_config() -> FollowConfig {
    FollowConfig {
        enabled: Some(true),
        debounce_delay: Some(DEFAULT_DEBOUNCE_DELAY),
        highlight: Some(true),
        highlight_duration: Some(DEFAULT_HIGHLIGHT_DURATION),
        faces: FacesConfig {
            pulse: Some("agent-follow-pulse".to_string()),
            removed: Some("diff-removed".to_string()),
            added: Some("diff-added".to_string()),
            context: Some("diff-context".to_string()),
        },
        preview: PreviewConfig {
            priority: Some(DEFAULT_PREVIEW_PRIORITY),
        },
        locate: LocateConfig {
            window_before: Some(WINDOW_LINES_BEFORE),
            window_after: Some(WINDOW_LINES_AFTER),
        },
        viewport: ViewportConfig {
            settle_delays: Some(DEFAULT_SETTLE_DELAYS.to_vec()),
        },
    }
}

pub fn default_settle_delays() -> Vec<Duration> {
    DEFAULT_SETTLE_DELAYS
        .iter()
        .copied()
        .map(Duration::from_secs_f64)
        .collect()
}

/// Render the default configuration as TOML.
pub fn default_config_toml() -> FollowResult<String> {
    toml::to_string_pretty(&default_config()).map_err(|err| FollowError::config(err.to_string()))
}
