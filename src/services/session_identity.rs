//! Session-scoped buyer identifiers.
//!
//! `user_id` lives as long as the checkout session. `device_id` is generated
//! the same way when the host offers no better identifier.

use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::ports::SessionStorage;

/// Storage key of the user id.
pub const USER_ID_KEY: &str = "cartguard_user_id";
/// Storage key of the device id.
pub const DEVICE_ID_KEY: &str = "cartguard_device_id";

/// Reads buyer ids from session storage, creating them on first use.
pub struct SessionIdentity {
    storage: Arc<dyn SessionStorage>,
}

impl SessionIdentity {
    /// Identity over `storage`.
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self { storage }
    }

    /// Stored user id, or a new UUID v4.
    pub async fn get_or_create_user_id(&self) -> DomainResult<String> {
        self.get_or_create(USER_ID_KEY).await
    }

    /// Stored device id, or a new UUID v4.
    pub async fn get_or_create_device_id(&self) -> DomainResult<String> {
        self.get_or_create(DEVICE_ID_KEY).await
    }

    async fn get_or_create(&self, key: &str) -> DomainResult<String> {
        if let Some(existing) = self.storage.read(key).await?.filter(|v| !v.is_empty()) {
            return Ok(existing);
        }

        let id = Uuid::new_v4().to_string();
        if let Err(e) = self.storage.write(key, &id).await {
            warn!(key, error = %e, "failed to persist session identifier");
        }
        Ok(id)
    }
}
