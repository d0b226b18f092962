//! Cart port.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::domain::errors::DomainResult;
use crate::domain::models::{CartLine, CartLineChange, CartSummary, MutationOutcome};

/// Port for the host checkout's cart.
#[async_trait]
pub trait CartGateway: Send + Sync {
    /// Live cart lines right now.
    fn current_lines(&self) -> Vec<CartLine>;

    /// Receive the full line list after every addition, removal or quantity change.
    ///
    /// Dropping the receiver unsubscribes.
    fn subscribe_lines(&self) -> broadcast::Receiver<Vec<CartLine>>;

    /// Build the cart summary sent with quote requests, enriched with product data.
    async fn build_cart_summary(&self) -> DomainResult<CartSummary>;

    /// Apply one line mutation. `Err` means the call itself failed; a rejected
    /// mutation is `Ok(MutationOutcome::Error { .. })`.
    async fn apply_change(&self, change: CartLineChange) -> DomainResult<MutationOutcome>;

    /// Write a cart attribute.
    async fn set_attribute(&self, key: &str, value: &str) -> DomainResult<()>;
}
