//! The controller's current belief about one widget instance.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::cart::{CartSummary, LineKey, LinesBrief};
use super::merchant::MerchantConfig;
use super::phase::WidgetPhase;
use super::quote::{InsuranceType, Quote};

/// Plain-data state of a widget instance.
///
/// Owned by the `SnapshotStore`; readers get clones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidgetSnapshot {
    /// Widget instance name.
    pub name: String,
    /// Product type offered.
    pub insurance_type: InsuranceType,
    /// `None` until the machine starts.
    pub phase: Option<WidgetPhase>,
    /// Set by LOADING.
    pub merchant_config: Option<MerchantConfig>,
    /// Set by PROCESSING.
    pub cart: Option<CartSummary>,
    /// Session user id, set by PROCESSING.
    pub user_id: Option<String>,
    /// Session device id, set by PROCESSING.
    pub device_id: Option<String>,
    /// Latest quote; `None` when the quote service had no offer.
    pub quote: Option<Quote>,
    /// Last known insurance product id, kept after the quote is cleared.
    pub sticky_product_id: Option<String>,
    /// Buyer's desired opt-in state.
    pub current_widget_status: bool,
    /// Brief of the last observed line list.
    pub lines_brief: LinesBrief,
    /// Brief keys of mutations planned by reconciliation that the observer
    /// has not seen yet.
    #[serde(skip)]
    pub self_mutations: HashMap<LineKey, usize>,
}

impl WidgetSnapshot {
    /// Fresh state before INIT.
    pub fn new(name: impl Into<String>, insurance_type: InsuranceType) -> Self {
        Self {
            name: name.into(),
            insurance_type,
            phase: None,
            merchant_config: None,
            cart: None,
            user_id: None,
            device_id: None,
            quote: None,
            sticky_product_id: None,
            current_widget_status: false,
            lines_brief: LinesBrief::default(),
            self_mutations: HashMap::new(),
        }
    }

    /// The product id the widget considers its own: the live quote's, else the sticky one.
    pub fn own_product_id(&self) -> Option<&str> {
        self.quote
            .as_ref()
            .map(Quote::product)
            .or(self.sticky_product_id.as_deref())
    }

    /// Merchant config was fetched and reports the product switched off.
    pub fn is_killed(&self) -> bool {
        self.merchant_config
            .as_ref()
            .is_some_and(|config| !config.is_active())
    }

    /// Consume one pending self-mutation tag for `key`, if any.
    pub fn take_self_mutation(&mut self, key: &LineKey) -> bool {
        match self.self_mutations.get_mut(key) {
            Some(count) if *count > 1 => {
                *count -= 1;
                true
            }
            Some(_) => {
                self.self_mutations.remove(key);
                true
            }
            None => false,
        }
    }

    /// Tag `key` as about to change because of this widget.
    pub fn record_self_mutation(&mut self, key: LineKey) {
        *self.self_mutations.entry(key).or_insert(0) += 1;
    }
}
