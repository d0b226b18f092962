//! Session storage port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;

/// Port for key-value storage scoped to the checkout session.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Value stored under `key`, if any.
    async fn read(&self, key: &str) -> DomainResult<Option<String>>;

    /// Store `value` under `key`.
    async fn write(&self, key: &str, value: &str) -> DomainResult<()>;
}
