//! `cartguard config`

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;

/// Arguments of `cartguard config`.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Config subcommand.
    #[command(subcommand)]
    pub command: ConfigCommands,
}

/// `cartguard config` subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective configuration after merging files and environment
    Show,
}

/// Output of `cartguard config show`.
#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct ConfigOutput {
    /// Effective configuration.
    pub config: Config,
}

impl CommandOutput for ConfigOutput {
    fn to_human(&self) -> String {
        serde_yaml::to_string(&self.config)
            .context("Failed to render configuration")
            .unwrap_or_else(|e| format!("{e:#}"))
    }
}

/// Run a config subcommand.
pub fn execute(args: ConfigArgs, config: &Config, json_mode: bool) -> Result<()> {
    match args.command {
        ConfigCommands::Show => {
            output(
                &ConfigOutput {
                    config: config.clone(),
                },
                json_mode,
            );
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_output_is_yaml() {
        let out = ConfigOutput {
            config: Config::default(),
        };
        let text = out.to_human();
        assert!(text.contains("return-assurance"));
        assert!(text.contains("cartguard-extensions-channel"));
        assert_eq!(out.to_json()["runtime"]["inbox_capacity"], 64);
    }
}
