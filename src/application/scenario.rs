//! Simulation scenarios.
//!
//! A scenario describes a checkout: the merchant's config, the quotes the
//! quote service will hand out, the cart the buyer starts with, and a script
//! of buyer and host actions.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::domain::models::{MerchantConfig, Quote, WidgetConfig};

/// A scripted checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Widget under test.
    #[serde(default)]
    pub widget: WidgetConfig,

    /// Merchant config served by the quote service; absent means no config.
    #[serde(default)]
    pub merchant: Option<MerchantConfig>,

    /// Merchandise known to the cart, beyond what `lines` introduces.
    #[serde(default)]
    pub catalog: Vec<CatalogSpec>,

    /// Quotes served in order; the last one keeps being served.
    #[serde(default)]
    pub quotes: Vec<Option<Quote>>,

    /// Cart lines present before the widget starts.
    #[serde(default)]
    pub lines: Vec<LineSpec>,

    /// Steps are written as single-key maps (`- toggle: false`) or bare names (`- settle`).
    #[serde(default, with = "serde_yaml::with::singleton_map_recursive")]
    pub steps: Vec<ScenarioStep>,
}

impl Scenario {
    /// Parse a scenario document.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("Failed to parse scenario")
    }

    /// Read and parse a scenario file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        Self::from_yaml(&yaml).with_context(|| format!("Invalid scenario {}", path.display()))
    }
}

/// Merchandise the cart can add.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSpec {
    /// Numeric product id.
    pub product: String,
    /// Numeric variant id.
    pub variant: String,
    /// Display title.
    #[serde(default)]
    pub title: Option<String>,
    /// Unit price in minor units.
    #[serde(default = "default_price")]
    pub price: i64,
}

const fn default_price() -> i64 {
    2_500
}

/// A starting cart line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineSpec {
    /// Numeric product id.
    pub product: String,
    /// Numeric variant id.
    pub variant: String,
    /// Units, default 1.
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

const fn default_quantity() -> u32 {
    1
}

/// One scripted action. Lines are addressed by their numeric variant id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStep {
    /// Wait for the widget to go quiet.
    Settle,
    /// Buyer adds merchandise.
    AddLine {
        /// Numeric product id.
        product: String,
        /// Numeric variant id.
        variant: String,
        /// Units, default 1.
        #[serde(default = "default_quantity")]
        quantity: u32,
    },
    /// Buyer changes the quantity of the first line with `variant`.
    SetQuantity {
        /// Numeric variant id.
        variant: String,
        /// New quantity.
        quantity: u32,
    },
    /// Buyer removes the first line with `variant`.
    RemoveLine {
        /// Numeric variant id.
        variant: String,
    },
    /// Buyer clicks the checkbox.
    Toggle(bool),
    /// The host rejects the next cart mutation.
    FailNextMutation(String),
}
