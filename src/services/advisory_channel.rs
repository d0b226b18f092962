//! Cross-instance advisory channel.
//!
//! Widget instances sharing a checkout post notes about cart changes they are
//! about to make. Notes are diagnostic only: nothing reads them for decisions
//! and a send with no listeners is silently dropped.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::info;

use crate::domain::models::AdvisoryConfig;

/// A note one widget posts for the others.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisoryNotice {
    /// Posting widget name.
    pub sender: String,
    /// Free-form note.
    pub message: String,
}

/// Broadcast shared by every widget of a checkout; clones share the channel.
#[derive(Clone)]
pub struct AdvisoryChannel {
    name: String,
    sender: broadcast::Sender<AdvisoryNotice>,
}

impl AdvisoryChannel {
    /// Open a channel sized by `config`.
    pub fn new(config: &AdvisoryConfig) -> Self {
        let (sender, _) = broadcast::channel(config.capacity.max(1));
        Self {
            name: config.channel_name.clone(),
            sender,
        }
    }

    /// Channel name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Broadcast a note; dropped when nobody listens.
    pub fn post(&self, sender: &str, message: impl Into<String>) {
        let _ = self.sender.send(AdvisoryNotice {
            sender: sender.to_string(),
            message: message.into(),
        });
    }

    /// Receive every later note.
    pub fn subscribe(&self) -> broadcast::Receiver<AdvisoryNotice> {
        self.sender.subscribe()
    }

    /// Log notices from every sender other than `listener` until the channel closes.
    pub fn spawn_listener(&self, listener: String) -> JoinHandle<()> {
        let mut rx = self.subscribe();
        let channel = self.name.clone();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(notice) if notice.sender != listener => {
                        info!(
                            widget = %listener,
                            channel = %channel,
                            from = %notice.sender,
                            "received message: {}",
                            notice.message
                        );
                    }
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}
