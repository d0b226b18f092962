//! Plain-data domain models.

pub mod cart;
pub mod config;
pub mod merchant;
pub mod phase;
pub mod quote;
pub mod snapshot;

pub use cart::{
    strip_gid, variant_gid, BriefDiff, CartItem, CartLine, CartLineChange, CartOperation,
    CartSummary, LineKey, LinesBrief, MutationOutcome,
};
pub use config::{AdvisoryConfig, Config, LoggingConfig, RuntimeConfig, WidgetConfig};
pub use merchant::{MerchantConfig, MerchantStatus, ReturnConfig};
pub use phase::{PhaseTransition, RestartPoint, WidgetPhase};
pub use quote::{InsuranceType, Quote, QuoteRequest, QuoteSource, QuoteStatus};
pub use snapshot::WidgetSnapshot;
