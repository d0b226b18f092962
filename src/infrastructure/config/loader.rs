//! Layered configuration loading.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Directory holding project configuration, relative to the working directory.
pub const CONFIG_DIR: &str = ".cartguard";

/// Prefix of environment overrides (`CARTGUARD_RUNTIME__INBOX_CAPACITY=8`).
pub const ENV_PREFIX: &str = "CARTGUARD_";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    /// `widgets` is empty.
    #[error("At least one widget must be configured")]
    NoWidgets,

    /// A widget has a blank name.
    #[error("Widget name cannot be empty")]
    EmptyWidgetName,

    /// Two widgets share a name.
    #[error("Duplicate widget name: {0}")]
    DuplicateWidgetName(String),

    /// A channel capacity is zero.
    #[error("Invalid {0}: must be at least 1")]
    ZeroCapacity(&'static str),

    /// The advisory channel has no name.
    #[error("Advisory channel name cannot be empty")]
    EmptyChannelName,

    /// Unknown log level.
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    /// Unknown log format.
    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    /// Unknown rotation policy.
    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .cartguard/config.yaml
    /// 3. .cartguard/local.yaml (optional local overrides)
    /// 4. Environment variables (CARTGUARD_* prefix, `__` nests)
    pub fn load() -> Result<Config> {
        Self::load_from_dir(".")
    }

    /// Same as [`ConfigLoader::load`] with the project rooted at `root`.
    pub fn load_from_dir(root: impl AsRef<Path>) -> Result<Config> {
        let dir = root.as_ref().join(CONFIG_DIR);
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(dir.join("config.yaml")))
            .merge(Yaml::file(dir.join("local.yaml")))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.widgets.is_empty() {
            return Err(ConfigError::NoWidgets);
        }

        let mut names = HashSet::new();
        for widget in &config.widgets {
            if widget.name.trim().is_empty() {
                return Err(ConfigError::EmptyWidgetName);
            }
            if !names.insert(widget.name.as_str()) {
                return Err(ConfigError::DuplicateWidgetName(widget.name.clone()));
            }
        }

        if config.runtime.inbox_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("runtime.inbox_capacity"));
        }
        if config.runtime.event_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("runtime.event_capacity"));
        }
        if config.advisory.capacity == 0 {
            return Err(ConfigError::ZeroCapacity("advisory.capacity"));
        }
        if config.advisory.channel_name.is_empty() {
            return Err(ConfigError::EmptyChannelName);
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{InsuranceType, WidgetConfig};
    use std::fs;
    use tempfile::TempDir;

    fn project_with(config_yaml: &str, local_yaml: Option<&str>) -> TempDir {
        let dir = TempDir::new().unwrap();
        let config_dir = dir.path().join(CONFIG_DIR);
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(config_dir.join("config.yaml"), config_yaml).unwrap();
        if let Some(local) = local_yaml {
            fs::write(config_dir.join("local.yaml"), local).unwrap();
        }
        dir
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.widgets.len(), 1);
        assert_eq!(config.widgets[0].name, "return-assurance");
        assert_eq!(config.widgets[0].insurance_type, InsuranceType::Ra);
        assert_eq!(config.advisory.channel_name, "cartguard-extensions-channel");
        assert_eq!(config.logging.level, "info");
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
widgets:
  - name: return-assurance
    insurance_type: ra
  - name: delivery-guarantee
    insurance_type: sp
runtime:
  inbox_capacity: 16
logging:
  level: debug
  format: json
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.widgets.len(), 2);
        assert_eq!(config.widgets[1].insurance_type, InsuranceType::Sp);
        assert_eq!(config.runtime.inbox_capacity, 16);
        assert_eq!(config.runtime.event_capacity, 256);
        assert_eq!(config.logging.format, "json");
        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_duplicate_widget_names() {
        let mut config = Config::default();
        config
            .widgets
            .push(WidgetConfig::new("return-assurance", InsuranceType::Bp));

        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::DuplicateWidgetName(name)) if name == "return-assurance"
        ));
    }

    #[test]
    fn test_validate_empty_widgets_and_names() {
        let mut config = Config::default();
        config.widgets.clear();
        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::NoWidgets)));

        config.widgets.push(WidgetConfig::new("  ", InsuranceType::Ra));
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::EmptyWidgetName)
        ));
    }

    #[test]
    fn test_validate_zero_capacities() {
        let mut config = Config::default();
        config.runtime.inbox_capacity = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::ZeroCapacity("runtime.inbox_capacity"))
        ));

        let mut config = Config::default();
        config.advisory.capacity = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::ZeroCapacity("advisory.capacity"))
        ));
    }

    #[test]
    fn test_validate_invalid_logging() {
        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        match ConfigLoader::validate(&config) {
            Err(ConfigError::InvalidLogLevel(level)) => assert_eq!(level, "loud"),
            other => panic!("Expected InvalidLogLevel error, got {other:?}"),
        }

        let mut config = Config::default();
        config.logging.format = "xml".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidLogFormat(_))
        ));

        let mut config = Config::default();
        config.logging.rotation = "weekly".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidRotation(_))
        ));
    }

    #[test]
    fn test_hierarchical_merging() {
        let project = project_with(
            "runtime:\n  inbox_capacity: 8\nlogging:\n  level: info\n  format: json\n",
            Some("logging:\n  level: debug\n"),
        );

        let config = temp_env::with_vars_unset(
            ["CARTGUARD_LOGGING__LEVEL", "CARTGUARD_RUNTIME__INBOX_CAPACITY"],
            || ConfigLoader::load_from_dir(project.path()),
        )
        .unwrap();

        assert_eq!(config.runtime.inbox_capacity, 8);
        assert_eq!(config.logging.level, "debug", "Local overrides should win");
        assert_eq!(
            config.logging.format, "json",
            "Base value should persist when not overridden"
        );
    }

    #[test]
    fn test_env_override() {
        let project = project_with("logging:\n  level: info\n", None);

        let config = temp_env::with_vars(
            [
                ("CARTGUARD_LOGGING__LEVEL", Some("warn")),
                ("CARTGUARD_RUNTIME__EVENT_CAPACITY", Some("32")),
            ],
            || ConfigLoader::load_from_dir(project.path()),
        )
        .unwrap();

        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.runtime.event_capacity, 32);
    }

    #[test]
    fn test_missing_files_fall_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let config = temp_env::with_vars_unset(["CARTGUARD_LOGGING__LEVEL"], || {
            ConfigLoader::load_from_dir(dir.path())
        })
        .unwrap();
        assert_eq!(config.widgets, Config::default().widgets);
    }

    #[test]
    fn test_load_from_file_rejects_invalid() {
        let project = project_with("logging:\n  format: xml\n", None);
        let path = project.path().join(CONFIG_DIR).join("config.yaml");
        let err = ConfigLoader::load_from_file(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid log format"));
    }
}
