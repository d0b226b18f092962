//! In-memory session storage.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::SessionStorage;

/// Session storage backed by a map.
#[derive(Default)]
pub struct InMemorySessionStorage {
    values: RwLock<HashMap<String, String>>,
    fail_writes: AtomicBool,
}

impl InMemorySessionStorage {
    /// Empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following write fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl SessionStorage for InMemorySessionStorage {
    async fn read(&self, key: &str) -> DomainResult<Option<String>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn write(&self, key: &str, value: &str) -> DomainResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DomainError::collaborator("session_storage.write", "storage is read-only"));
        }
        self.values
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
