//! Merchant config and quote port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{InsuranceType, MerchantConfig, Quote, QuoteRequest};

/// Port for the protection vendor's merchant and quote endpoints
#[async_trait]
pub trait QuoteService: Send + Sync {
    /// Fetch the merchant configuration for an insurance type.
    ///
    /// `Ok(None)` means the service answered without a usable config.
    async fn fetch_merchant_config(
        &self,
        insurance_type: InsuranceType,
    ) -> DomainResult<Option<MerchantConfig>>;

    /// Request a quote for the current cart; `Ok(None)` when nothing is offered.
    async fn fetch_quote(&self, request: &QuoteRequest) -> DomainResult<Option<Quote>>;
}
