use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::SettingsEvent;
use super::defaults::default_config;
use crate::text::SearchWindow;

/// Style selectors used by previews and highlights.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct FacesConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pulse: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct PreviewConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct LocateConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_before: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_after: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ViewportConfig {
    /// Delays (seconds) of the settle passes after each viewport move.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settle_delays: Option<Vec<f64>>,
}

/// One configuration layer as written in `agent-follow.toml`.
///
/// Every field is optional so that layers can be merged key by key.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct FollowConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Debounce delay for follow requests, in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debounce_delay: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight: Option<bool>,
    /// Duration of the fading highlight, in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight_duration: Option<f64>,
    #[serde(default)]
    pub faces: FacesConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
    #[serde(default)]
    pub locate: LocateConfig,
    #[serde(default)]
    pub viewport: ViewportConfig,
}

impl FollowConfig {
    /// Merge two layers, preferring values from `primary`.
    pub fn merge(self, primary: FollowConfig) -> FollowConfig {
        FollowConfig {
            enabled: primary.enabled.or(self.enabled),
            debounce_delay: primary.debounce_delay.or(self.debounce_delay),
            highlight: primary.highlight.or(self.highlight),
            highlight_duration: primary.highlight_duration.or(self.highlight_duration),
            faces: FacesConfig {
                pulse: primary.faces.pulse.or(self.faces.pulse),
                removed: primary.faces.removed.or(self.faces.removed),
                added: primary.faces.added.or(self.faces.added),
                context: primary.faces.context.or(self.faces.context),
            },
            preview: PreviewConfig {
                priority: primary.preview.priority.or(self.preview.priority),
            },
            locate: LocateConfig {
                window_before: primary.locate.window_before.or(self.locate.window_before),
                window_after: primary.locate.window_after.or(self.locate.window_after),
            },
            viewport: ViewportConfig {
                settle_delays: primary.viewport.settle_delays.or(self.viewport.settle_delays),
            },
        }
    }
}

/// Resolved style selectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Faces {
    pub pulse: String,
    pub removed: String,
    pub added: String,
    pub context: String,
}

/// Effective settings of one session.
#[derive(Debug, Clone, PartialEq)]
pub struct FollowSettings {
    pub enabled: bool,
    pub debounce_delay: Duration,
    pub highlight: bool,
    pub highlight_duration: Duration,
    pub faces: Faces,
    pub preview_priority: i32,
    pub window: SearchWindow,
    pub settle_delays: Vec<Duration>,
}

impl Default for FollowSettings {
    fn default() -> Self {
        Self::resolve(FollowConfig::default(), &mut Vec::new())
    }
}

impl FollowSettings {
    /// Resolve a merged configuration against the programmed defaults.
    ///
    /// Invalid durations are replaced by their default and reported as
    /// warnings in `events`.
    pub fn resolve(config: FollowConfig, events: &mut Vec<SettingsEvent>) -> Self {
        let config = default_config().merge(config);
        let defaults = default_config();

        let mut seconds = |key: &str, value: Option<f64>, fallback: Option<f64>| {
            let fallback = fallback.unwrap_or_default();
            let value = value.unwrap_or(fallback);
            Duration::try_from_secs_f64(value).unwrap_or_else(|_| {
                events.push(SettingsEvent::warning(format!(
                    "Invalid {} {}; using {}",
                    key, value, fallback
                )));
                Duration::from_secs_f64(fallback)
            })
        };

        let debounce_delay = seconds(
            "debounce_delay",
            config.debounce_delay,
            defaults.debounce_delay,
        );
        let highlight_duration = seconds(
            "highlight_duration",
            config.highlight_duration,
            defaults.highlight_duration,
        );
        let settle_delays = config
            .viewport
            .settle_delays
            .unwrap_or_default()
            .into_iter()
            .filter_map(|delay| match Duration::try_from_secs_f64(delay) {
                Ok(duration) => Some(duration),
                Err(_) => {
                    events.push(SettingsEvent::warning(format!(
                        "Ignoring invalid settle delay {}",
                        delay
                    )));
                    None
                }
            })
            .collect();

        FollowSettings {
            enabled: config.enabled.unwrap_or(true),
            debounce_delay,
            highlight: config.highlight.unwrap_or(true),
            highlight_duration,
            faces: Faces {
                pulse: config.faces.pulse.unwrap_or_default(),
                removed: config.faces.removed.unwrap_or_default(),
                added: config.faces.added.unwrap_or_default(),
                context: config.faces.context.unwrap_or_default(),
            },
            preview_priority: config.preview.priority.unwrap_or_default(),
            window: SearchWindow {
                before: config.locate.window_before.unwrap_or_default(),
                after: config.locate.window_after.unwrap_or_default(),
            },
            settle_delays,
        }
    }
}

impl From<&FollowSettings> for FollowConfig {
    fn from(settings: &FollowSettings) -> Self {
        FollowConfig {
            enabled: Some(settings.enabled),
            debounce_delay: Some(settings.debounce_delay.as_secs_f64()),
            highlight: Some(settings.highlight),
            highlight_duration: Some(settings.highlight_duration.as_secs_f64()),
            faces: FacesConfig {
                pulse: Some(settings.faces.pulse.clone()),
                removed: Some(settings.faces.removed.clone()),
                added: Some(settings.faces.added.clone()),
                context: Some(settings.faces.context.clone()),
            },
            preview: PreviewConfig {
                priority: Some(settings.preview_priority),
            },
            locate: LocateConfig {
                window_before: Some(settings.window.before),
                window_after: Some(settings.window.after),
            },
            viewport: ViewportConfig {
                settle_delays: Some(
                    settings
                        .settle_delays
                        .iter()
                        .map(Duration::as_secs_f64)
                        .collect(),
                ),
            },
        }
    }
}
