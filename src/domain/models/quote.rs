//! Insurance types and quotes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::cart::{strip_gid, CartSummary};

/// Protection product a widget instance offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsuranceType {
    /// Return assurance.
    Ra,
    /// Shipping protection.
    Bp,
    /// Delivery guarantee.
    Sp,
}

impl InsuranceType {
    /// Lower-case code.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ra => "ra",
            Self::Bp => "bp",
            Self::Sp => "sp",
        }
    }

    /// Cart attribute recording the quote id this widget carted.
    pub fn quote_attribute_key(self) -> String {
        format!("{}_quote_id", self.as_str())
    }

    /// Cart attribute recording the buyer's last checkbox choice.
    pub fn checked_attribute_key(self) -> String {
        format!("{}-checked", self.as_str())
    }
}

impl fmt::Display for InsuranceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InsuranceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ra" => Ok(Self::Ra),
            "bp" => Ok(Self::Bp),
            "sp" => Ok(Self::Sp),
            other => Err(format!("unknown insurance type: {other}")),
        }
    }
}

/// Where a quote request originates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteSource {
    /// Checkout extension.
    Checkout,
    /// Storefront pages.
    Index,
}

/// Quote status; only `Accepted` allows the product into the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStatus {
    /// Offer may be carted.
    Accepted,
    /// Offer declined by the quote service.
    Rejected,
    /// Any status this crate does not know.
    #[serde(other)]
    Unknown,
}

/// A priced offer for the insurance product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Quote id, written to the cart attribute.
    pub quote_id: String,
    /// Variant to cart.
    pub variant_id: String,
    /// Insurance product.
    pub product_id: String,
    /// Premium, in major currency units.
    pub price: f64,
    /// Covered value, in major currency units.
    pub value: f64,
    /// ISO currency code.
    pub currency_code: String,
    /// Acceptance status.
    pub status: QuoteStatus,
}

impl Quote {
    /// Whether the product may go into the cart.
    pub fn is_accepted(&self) -> bool {
        self.status == QuoteStatus::Accepted
    }

    /// Numeric product id.
    pub fn product(&self) -> &str {
        strip_gid(&self.product_id)
    }

    /// Numeric variant id.
    pub fn variant(&self) -> &str {
        strip_gid(&self.variant_id)
    }
}

/// Everything the quote service needs for one request.
#[derive(Debug, Clone, Serialize)]
pub struct QuoteRequest {
    /// Product type being quoted.
    pub insurance_type: InsuranceType,
    /// Requesting surface.
    pub source: QuoteSource,
    /// Cart at request time.
    pub cart: CartSummary,
    /// Session user id.
    pub user_id: String,
    /// Session device id.
    pub device_id: String,
}
