//! Observable state container for one widget instance.
//!
//! All writes go through batched closures so readers never observe a
//! half-applied phase or observation. Phase changes are only possible through
//! `start`, `advance` and `restart_at`, which enforce the transition table and
//! the two allowed restart targets.

use std::sync::Arc;

use tokio::sync::{watch, RwLock};
use tracing::debug;

use crate::domain::models::{
    InsuranceType, PhaseTransition, RestartPoint, WidgetPhase, WidgetSnapshot,
};
use crate::services::event_bus::{WidgetEvent, WidgetEventBus, WidgetEventPayload};

/// Position of the machine: the phase plus the epoch of the write that set it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTicket {
    /// Phase to run.
    pub phase: WidgetPhase,
    /// Bumped by every start and restart.
    pub epoch: u64,
}

struct StoreState {
    snapshot: WidgetSnapshot,
    phase: Option<WidgetPhase>,
    epoch: u64,
}

/// Single source of truth for one widget instance.
pub struct SnapshotStore {
    state: RwLock<StoreState>,
    phase_tx: watch::Sender<Option<WidgetPhase>>,
    bus: Arc<WidgetEventBus>,
}

impl SnapshotStore {
    /// Store for a widget that has not started; events go to `bus`.
    pub fn new(
        name: impl Into<String>,
        insurance_type: InsuranceType,
        bus: Arc<WidgetEventBus>,
    ) -> Self {
        let (phase_tx, _) = watch::channel(None);
        Self {
            state: RwLock::new(StoreState {
                snapshot: WidgetSnapshot::new(name, insurance_type),
                phase: None,
                epoch: 0,
            }),
            phase_tx,
            bus,
        }
    }

    /// Consistent copy of the current state.
    pub async fn snapshot(&self) -> WidgetSnapshot {
        let state = self.state.read().await;
        let mut snapshot = state.snapshot.clone();
        snapshot.phase = state.phase;
        snapshot
    }

    /// Current phase, `None` before `start`.
    pub fn phase(&self) -> Option<WidgetPhase> {
        *self.phase_tx.borrow()
    }

    /// Watch phase changes.
    pub fn subscribe_phase(&self) -> watch::Receiver<Option<WidgetPhase>> {
        self.phase_tx.subscribe()
    }

    /// The widget's event bus.
    pub fn bus(&self) -> &Arc<WidgetEventBus> {
        &self.bus
    }

    /// Apply a batch of field updates atomically.
    ///
    /// The phase is not reachable from here.
    pub async fn update<R>(&self, apply: impl FnOnce(&mut WidgetSnapshot) -> R) -> R {
        let mut state = self.state.write().await;
        apply(&mut state.snapshot)
    }

    /// Put the machine at `Init`.
    pub async fn start(&self) -> PhaseTicket {
        let mut state = self.state.write().await;
        let from = state.phase;
        self.set_phase(&mut state, from, WidgetPhase::Init, PhaseTransition::Start)
    }

    /// Step forward from `ticket.phase` if the machine is still where the ticket
    /// says it is. Returns the new ticket, or `None` when the ticket is stale or
    /// the phase is terminal.
    pub async fn advance(&self, ticket: PhaseTicket) -> Option<PhaseTicket> {
        let mut state = self.state.write().await;
        if state.phase != Some(ticket.phase) || state.epoch != ticket.epoch {
            debug!(
                phase = %ticket.phase,
                epoch = ticket.epoch,
                current_epoch = state.epoch,
                "stale advance dropped"
            );
            return None;
        }
        let next = ticket.phase.next()?;
        Some(self.set_phase(&mut state, Some(ticket.phase), next, PhaseTransition::Advance))
    }

    /// Move the machine back to a restart point.
    pub async fn restart_at(&self, point: RestartPoint) -> PhaseTicket {
        let mut state = self.state.write().await;
        let from = state.phase;
        self.set_phase(&mut state, from, point.phase(), PhaseTransition::Restart)
    }

    fn set_phase(
        &self,
        state: &mut StoreState,
        from: Option<WidgetPhase>,
        to: WidgetPhase,
        transition: PhaseTransition,
    ) -> PhaseTicket {
        state.phase = Some(to);
        state.epoch += 1;
        self.phase_tx.send_replace(Some(to));
        self.bus.publish(WidgetEvent::new(
            state.snapshot.name.clone(),
            WidgetEventPayload::PhaseChanged {
                from,
                to,
                transition,
            },
        ));
        PhaseTicket {
            phase: to,
            epoch: state.epoch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SnapshotStore {
        SnapshotStore::new("w", InsuranceType::Ra, Arc::new(WidgetEventBus::new(64)))
    }

    #[tokio::test]
    async fn test_phase_none_before_start() {
        let store = store();
        assert_eq!(store.phase(), None);
        assert!(store.snapshot().await.phase.is_none());
    }

    #[tokio::test]
    async fn test_advance_follows_transition_table() {
        let store = store();
        let mut ticket = store.start().await;
        let mut seen = vec![ticket.phase];
        while let Some(next) = store.advance(ticket).await {
            seen.push(next.phase);
            ticket = next;
        }
        assert_eq!(seen, WidgetPhase::ALL.to_vec());
        assert_eq!(store.phase(), Some(WidgetPhase::Completion));
    }

    #[tokio::test]
    async fn test_stale_ticket_is_rejected() {
        let store = store();
        let ticket = store.start().await;
        let ticket = store.advance(ticket).await.unwrap();
        let ticket = store.advance(ticket).await.unwrap();
        assert_eq!(ticket.phase, WidgetPhase::Processing);

        let restarted = store.restart_at(RestartPoint::Processing).await;
        assert_eq!(restarted.phase, WidgetPhase::Processing);
        assert!(store.advance(ticket).await.is_none());
        assert_eq!(store.phase(), Some(WidgetPhase::Processing));

        let next = store.advance(restarted).await.unwrap();
        assert_eq!(next.phase, WidgetPhase::Quoting);
    }

    #[tokio::test]
    async fn test_phase_changes_are_published_in_order() {
        let store = store();
        let mut rx = store.bus().subscribe();
        let ticket = store.start().await;
        store.advance(ticket).await;

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert!(matches!(
            first.payload,
            WidgetEventPayload::PhaseChanged { to: WidgetPhase::Init, transition: PhaseTransition::Start, .. }
        ));
        assert!(matches!(
            second.payload,
            WidgetEventPayload::PhaseChanged {
                from: Some(WidgetPhase::Init),
                to: WidgetPhase::Loading,
                transition: PhaseTransition::Advance,
            }
        ));
    }

    #[tokio::test]
    async fn test_update_is_batched() {
        let store = store();
        store
            .update(|s| {
                s.current_widget_status = true;
                s.sticky_product_id = Some("42".to_string());
            })
            .await;
        let snap = store.snapshot().await;
        assert!(snap.current_widget_status);
        assert_eq!(snap.sticky_product_id.as_deref(), Some("42"));
    }
}
