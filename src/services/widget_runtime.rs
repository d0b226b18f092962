//! Widget runtime.
//!
//! One actor task per widget instance. The actor owns the phase sequence and an
//! inbox of external inputs (cart changes, checkbox toggles). While a phase body
//! is in flight the inbox keeps being served; a restart requested from the inbox
//! bumps the store's epoch so the overtaken phase's advance is dropped and the
//! machine continues from the restart point.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{CartLine, RuntimeConfig, WidgetConfig};
use crate::domain::ports::CheckboxBinding;
use crate::services::advisory_channel::AdvisoryChannel;
use crate::services::event_bus::{WidgetEvent, WidgetEventBus, WidgetEventPayload};
use crate::services::phase_controller::{PhaseController, WidgetCollaborators};
use crate::services::snapshot_store::{PhaseTicket, SnapshotStore};

/// Input delivered to the widget actor.
#[derive(Debug, Clone)]
pub enum WidgetCommand {
    /// The live cart changed.
    LinesChanged(Vec<CartLine>),
    /// The buyer clicked the checkbox.
    CheckboxToggled(bool),
    /// Stop the actor.
    Dispose,
}

/// A widget instance that has not been started yet.
///
/// Subscribe to [`WidgetRuntime::events`] before [`WidgetRuntime::spawn`] to
/// observe the lifecycle from `Init`.
pub struct WidgetRuntime {
    widget: WidgetConfig,
    store: Arc<SnapshotStore>,
    collaborators: WidgetCollaborators,
    advisory: AdvisoryChannel,
    inbox_capacity: usize,
}

impl WidgetRuntime {
    /// Wire a widget to its collaborators without starting it.
    pub fn new(
        widget: WidgetConfig,
        collaborators: WidgetCollaborators,
        advisory: AdvisoryChannel,
        runtime: &RuntimeConfig,
    ) -> Self {
        let bus = Arc::new(WidgetEventBus::new(runtime.event_capacity));
        let store = Arc::new(SnapshotStore::new(
            widget.name.clone(),
            widget.insurance_type,
            bus,
        ));
        Self {
            widget,
            store,
            collaborators,
            advisory,
            inbox_capacity: runtime.inbox_capacity.max(1),
        }
    }

    /// The widget's store.
    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    /// Subscribe to the event bus.
    pub fn events(&self) -> broadcast::Receiver<WidgetEvent> {
        self.store.bus().subscribe()
    }

    /// Start the actor, the cart forwarder and the advisory listener.
    pub fn spawn(self) -> WidgetHandle {
        let (tx, rx) = mpsc::channel(self.inbox_capacity);

        let weak = tx.downgrade();
        let binding = CheckboxBinding::new(move |checked| {
            weak.upgrade()
                .is_some_and(|tx| tx.try_send(WidgetCommand::CheckboxToggled(checked)).is_ok())
        });

        let lines = self.collaborators.cart.subscribe_lines();
        let forwarder = tokio::spawn(forward_lines(
            lines,
            self.collaborators.clone(),
            tx.clone(),
        ));
        let listener = self.advisory.spawn_listener(self.widget.name.clone());

        let controller = PhaseController::new(
            &self.widget,
            self.store.clone(),
            self.collaborators,
            self.advisory,
            binding,
        );
        let actor = tokio::spawn(run_actor(controller, rx));

        info!(widget = %self.widget.name, insurance_type = %self.widget.insurance_type, "widget spawned");

        WidgetHandle {
            name: self.widget.name,
            store: self.store,
            tx,
            actor: Some(actor),
            forwarders: vec![forwarder, listener],
        }
    }
}

/// Relay cart line notifications into the actor's inbox.
async fn forward_lines(
    mut lines: broadcast::Receiver<Vec<CartLine>>,
    collaborators: WidgetCollaborators,
    tx: mpsc::Sender<WidgetCommand>,
) {
    loop {
        let next = match lines.recv().await {
            Ok(next) => next,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(skipped, "cart notifications lagged; resending live lines");
                collaborators.cart.current_lines()
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };
        if tx.send(WidgetCommand::LinesChanged(next)).await.is_err() {
            break;
        }
    }
}

async fn run_actor(controller: PhaseController, mut inbox: mpsc::Receiver<WidgetCommand>) {
    let mut next = Some(controller.start().await);

    loop {
        if let Some(ticket) = next.take() {
            let phase_run = controller.run_phase(ticket);
            tokio::pin!(phase_run);
            let mut restarted: Option<PhaseTicket> = None;

            loop {
                tokio::select! {
                    biased;
                    command = inbox.recv() => {
                        match command {
                            Some(WidgetCommand::Dispose) | None => return,
                            Some(command) => {
                                if let Some(ticket) = handle_command(&controller, command).await {
                                    restarted = Some(ticket);
                                }
                            }
                        }
                    }
                    advanced = &mut phase_run => {
                        next = restarted.or(advanced);
                        break;
                    }
                }
            }
        } else {
            match inbox.recv().await {
                Some(WidgetCommand::Dispose) | None => return,
                Some(command) => next = handle_command(&controller, command).await,
            }
        }
    }
}

async fn handle_command(controller: &PhaseController, command: WidgetCommand) -> Option<PhaseTicket> {
    match command {
        WidgetCommand::LinesChanged(lines) => controller.observe_lines(lines).await,
        WidgetCommand::CheckboxToggled(checked) => {
            controller.handle_toggle(checked).await;
            None
        }
        WidgetCommand::Dispose => None,
    }
}

/// Handle to a running widget instance.
pub struct WidgetHandle {
    name: String,
    store: Arc<SnapshotStore>,
    tx: mpsc::Sender<WidgetCommand>,
    actor: Option<JoinHandle<()>>,
    forwarders: Vec<JoinHandle<()>>,
}

impl WidgetHandle {
    /// Widget instance name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The widget's store.
    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    /// Subscribe to the event bus.
    pub fn events(&self) -> broadcast::Receiver<WidgetEvent> {
        self.store.bus().subscribe()
    }

    /// Deliver a buyer's checkbox toggle as if the host had fired it.
    pub async fn toggle_checkbox(&self, checked: bool) -> DomainResult<()> {
        self.tx
            .send(WidgetCommand::CheckboxToggled(checked))
            .await
            .map_err(|_| DomainError::ChannelClosed(format!("widget {} inbox", self.name)))
    }

    /// Stop the actor and its helper tasks.
    pub async fn dispose(mut self) {
        for forwarder in &self.forwarders {
            forwarder.abort();
        }
        if self.tx.send(WidgetCommand::Dispose).await.is_err() {
            debug!(widget = %self.name, "actor already stopped");
        }
        if let Some(actor) = self.actor.take() {
            if let Err(e) = actor.await {
                warn!(widget = %self.name, error = %e, "widget actor ended abnormally");
            }
        }
        self.store
            .bus()
            .publish(WidgetEvent::new(self.name.clone(), WidgetEventPayload::Disposed));
        info!(widget = %self.name, "widget disposed");
    }
}

impl Drop for WidgetHandle {
    fn drop(&mut self) {
        for forwarder in &self.forwarders {
            forwarder.abort();
        }
        if let Some(actor) = &self.actor {
            actor.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{
        InMemoryCart, InMemorySessionStorage, RecordingSurface, StaticQuoteService,
    };
    use crate::domain::models::{
        AdvisoryConfig, InsuranceType, MerchantConfig, MerchantStatus, Quote, QuoteStatus,
        WidgetPhase,
    };
    use std::time::Duration;

    fn quote() -> Quote {
        Quote {
            quote_id: "quote-1".to_string(),
            variant_id: "9001".to_string(),
            product_id: "9000".to_string(),
            price: 1.99,
            value: 80.0,
            currency_code: "USD".to_string(),
            status: QuoteStatus::Accepted,
        }
    }

    fn active() -> MerchantConfig {
        MerchantConfig {
            status: MerchantStatus::Active,
            default_opt: true,
            return_config: None,
        }
    }

    async fn wait_for(store: &SnapshotStore, phase: WidgetPhase) {
        let mut rx = store.subscribe_phase();
        tokio::time::timeout(Duration::from_secs(2), async {
            while *rx.borrow_and_update() != Some(phase) {
                if rx.changed().await.is_err() {
                    break;
                }
            }
        })
        .await
        .unwrap();
    }

    fn spawn_widget(
        cart: Arc<InMemoryCart>,
        surface: Arc<RecordingSurface>,
    ) -> (WidgetHandle, broadcast::Receiver<WidgetEvent>) {
        let collaborators = WidgetCollaborators {
            quotes: Arc::new(StaticQuoteService::new(Some(active())).with_quote(quote())),
            cart,
            storage: Arc::new(InMemorySessionStorage::new()),
            surface,
        };
        let runtime = WidgetRuntime::new(
            WidgetConfig::new("return-assurance", InsuranceType::Ra),
            collaborators,
            AdvisoryChannel::new(&AdvisoryConfig::default()),
            &RuntimeConfig::default(),
        );
        let events = runtime.events();
        (runtime.spawn(), events)
    }

    #[tokio::test]
    async fn test_runs_to_completion_and_disposes() {
        let cart = Arc::new(InMemoryCart::new());
        cart.register_variant("9000", "9001", "Return assurance", 199);
        cart.add_line("10", "100", 1);
        let surface = Arc::new(RecordingSurface::new());
        let (handle, mut events) = spawn_widget(cart.clone(), surface.clone());

        wait_for(handle.store(), WidgetPhase::Completion).await;
        assert!(surface.is_bound());
        assert_eq!(cart.lines().len(), 2);
        assert!(cart.line_for_variant("9001").is_some());
        assert!(handle.store().snapshot().await.current_widget_status);

        handle.dispose().await;
        let mut saw_disposed = false;
        while let Ok(event) = events.try_recv() {
            saw_disposed |= matches!(event.payload, WidgetEventPayload::Disposed);
        }
        assert!(saw_disposed);
    }

    #[tokio::test]
    async fn test_unknown_insurance_variant_rolls_back_and_completes() {
        let cart = Arc::new(InMemoryCart::new());
        cart.add_line("10", "100", 1);
        let surface = Arc::new(RecordingSurface::new());
        let (handle, _events) = spawn_widget(cart.clone(), surface.clone());

        wait_for(handle.store(), WidgetPhase::Completion).await;
        assert_eq!(cart.lines().len(), 1);
        assert!(!handle.store().snapshot().await.current_widget_status);
        assert!(surface.is_bound());

        handle.dispose().await;
    }
}
