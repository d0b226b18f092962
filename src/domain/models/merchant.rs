//! Merchant configuration for one insurance type.

use serde::{Deserialize, Serialize};

/// Whether the merchant has the product switched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MerchantStatus {
    /// Widget runs.
    Active,
    /// Kill switch engaged.
    Void,
}

/// Return policy details shown by return-assurance widgets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReturnConfig {
    /// Days a buyer has to start a return.
    #[serde(default)]
    pub return_window: Option<u32>,
    /// Where buyers file returns.
    #[serde(default)]
    pub resolution_center_link: Option<String>,
    /// Fee charged for return shipping.
    #[serde(default)]
    pub return_shipping_fee: Option<f64>,
}

/// Per-type merchant settings fetched during LOADING.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MerchantConfig {
    /// Kill switch.
    pub status: MerchantStatus,
    /// Pre-check the checkbox when no insurance line exists yet.
    #[serde(default)]
    pub default_opt: bool,
    /// Return policy, return-assurance only.
    #[serde(default)]
    pub return_config: Option<ReturnConfig>,
}

impl MerchantConfig {
    /// Whether the widget may go past LOADING.
    pub fn is_active(&self) -> bool {
        self.status == MerchantStatus::Active
    }
}
