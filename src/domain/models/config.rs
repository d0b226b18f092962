//! Configuration model.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::quote::InsuranceType;

/// Main configuration structure for cartguard
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Widget instances mounted in the checkout
    #[serde(default = "default_widgets")]
    pub widgets: Vec<WidgetConfig>,

    /// Actor runtime configuration
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// Cross-instance advisory channel configuration
    #[serde(default)]
    pub advisory: AdvisoryConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_widgets() -> Vec<WidgetConfig> {
    vec![WidgetConfig::default()]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            widgets: default_widgets(),
            runtime: RuntimeConfig::default(),
            advisory: AdvisoryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Identity of one widget instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WidgetConfig {
    /// Instance name, also the prefix of its UI node ids
    pub name: String,

    /// Insurance product type
    pub insurance_type: InsuranceType,
}

impl WidgetConfig {
    /// Widget named `name` selling `insurance_type`.
    pub fn new(name: impl Into<String>, insurance_type: InsuranceType) -> Self {
        Self {
            name: name.into(),
            insurance_type,
        }
    }
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            name: "return-assurance".to_string(),
            insurance_type: InsuranceType::Ra,
        }
    }
}

/// Actor runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RuntimeConfig {
    /// Capacity of the widget inbox (cart observations, checkbox toggles)
    #[serde(default = "default_inbox_capacity")]
    pub inbox_capacity: usize,

    /// Capacity of the widget event bus
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

const fn default_inbox_capacity() -> usize {
    64
}

const fn default_event_capacity() -> usize {
    256
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            inbox_capacity: default_inbox_capacity(),
            event_capacity: default_event_capacity(),
        }
    }
}

/// Advisory channel shared by widget instances
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AdvisoryConfig {
    /// Channel name, used as the notice topic
    #[serde(default = "default_channel_name")]
    pub channel_name: String,

    /// Buffered notices per subscriber
    #[serde(default = "default_advisory_capacity")]
    pub capacity: usize,
}

fn default_channel_name() -> String {
    "cartguard-extensions-channel".to_string()
}

const fn default_advisory_capacity() -> usize {
    32
}

impl Default for AdvisoryConfig {
    fn default() -> Self {
        Self {
            channel_name: default_channel_name(),
            capacity: default_advisory_capacity(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stdout only when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Rotation: daily, hourly or never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}
