//! Phase controller.
//!
//! Executes the body of each lifecycle phase against the collaborators and
//! decides whether the machine may advance. Also owns the two reactive entry
//! points that run outside the phase sequence: applying a cart observation and
//! handling a buyer's checkbox toggle. Every entry point is an error boundary;
//! failures are logged and published, never propagated to the host.

use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    variant_gid, CartLine, CartLineChange, InsuranceType, LineKey, LinesBrief, MerchantConfig,
    QuoteRequest, QuoteSource, WidgetConfig, WidgetPhase,
};
use crate::domain::ports::{
    CartGateway, CheckboxBinding, CheckboxUpdate, QuoteService, SessionStorage, WidgetProps,
    WidgetSurface,
};
use crate::services::advisory_channel::AdvisoryChannel;
use crate::services::cart_observer::observe;
use crate::services::cart_reconciler::{plan, split_lines, CartReconciler};
use crate::services::event_bus::{RenderAction, WidgetEvent, WidgetEventPayload};
use crate::services::phase_timer::PhaseTimer;
use crate::services::session_identity::SessionIdentity;
use crate::services::snapshot_store::{PhaseTicket, SnapshotStore};

/// Host-side collaborators of one widget instance.
#[derive(Clone)]
pub struct WidgetCollaborators {
    /// Merchant config and quotes.
    pub quotes: Arc<dyn QuoteService>,
    /// Live cart.
    pub cart: Arc<dyn CartGateway>,
    /// Session key-value storage.
    pub storage: Arc<dyn SessionStorage>,
    /// Render target.
    pub surface: Arc<dyn WidgetSurface>,
}

/// What a phase body decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseOutcome {
    /// Step to the next phase.
    Advance,
    /// Stay until something external restarts the machine.
    Hold(String),
    /// Terminal phase reached.
    Done,
}

/// Runs phase bodies, cart observations and checkbox toggles for one widget.
pub struct PhaseController {
    name: String,
    insurance_type: InsuranceType,
    store: Arc<SnapshotStore>,
    quotes: Arc<dyn QuoteService>,
    cart: Arc<dyn CartGateway>,
    surface: Arc<dyn WidgetSurface>,
    identity: SessionIdentity,
    reconciler: CartReconciler,
    advisory: AdvisoryChannel,
    timer: PhaseTimer,
    binding: CheckboxBinding,
}

impl PhaseController {
    /// Controller writing to `store`; `binding` is attached during BINDING.
    pub fn new(
        widget: &WidgetConfig,
        store: Arc<SnapshotStore>,
        collaborators: WidgetCollaborators,
        advisory: AdvisoryChannel,
        binding: CheckboxBinding,
    ) -> Self {
        Self {
            name: widget.name.clone(),
            insurance_type: widget.insurance_type,
            store,
            quotes: collaborators.quotes,
            reconciler: CartReconciler::new(collaborators.cart.clone()),
            cart: collaborators.cart,
            surface: collaborators.surface,
            identity: SessionIdentity::new(collaborators.storage),
            advisory,
            timer: PhaseTimer::new(),
            binding,
        }
    }

    /// Seed the brief from the live cart and put the machine at `Init`.
    pub async fn start(&self) -> PhaseTicket {
        let lines = self.cart.current_lines();
        self.store
            .update(|snapshot| {
                snapshot.lines_brief = LinesBrief::from_lines(&lines);
            })
            .await;
        self.store.start().await
    }

    fn publish(&self, payload: WidgetEventPayload) {
        self.store
            .bus()
            .publish(WidgetEvent::new(self.name.clone(), payload));
    }

    // ========================================================================
    // Phase execution
    // ========================================================================

    /// Run the body of `ticket.phase` and advance on success.
    ///
    /// Returns the ticket of the next phase, or `None` when the machine holds,
    /// failed, reached `Completion`, or was restarted while the body ran.
    #[instrument(skip(self), fields(widget = %self.name, insurance_type = %self.insurance_type, phase = %ticket.phase))]
    pub async fn run_phase(&self, ticket: PhaseTicket) -> Option<PhaseTicket> {
        let phase = ticket.phase;
        self.timer.mark(phase);

        match self.execute(phase).await {
            Ok(PhaseOutcome::Advance) => {
                let next = self.store.advance(ticket).await;
                if next.is_none() {
                    warn!("phase outcome discarded after restart");
                    self.publish(WidgetEventPayload::PhaseOutcomeDiscarded { phase });
                }
                next
            }
            Ok(PhaseOutcome::Hold(reason)) => {
                info!(reason = %reason, "phase holding");
                self.publish(WidgetEventPayload::PhaseHeld { phase, reason });
                None
            }
            Ok(PhaseOutcome::Done) => None,
            Err(e) => {
                error!(error = %e, "phase failed; machine stalled");
                self.publish(WidgetEventPayload::PhaseFailed {
                    phase,
                    error: e.to_string(),
                });
                None
            }
        }
    }

    async fn execute(&self, phase: WidgetPhase) -> DomainResult<PhaseOutcome> {
        match phase {
            WidgetPhase::Init => Ok(self.run_init()),
            WidgetPhase::Loading => self.run_loading().await,
            WidgetPhase::Processing => self.run_processing().await,
            WidgetPhase::Quoting => self.run_quoting().await,
            WidgetPhase::Carting => self.run_carting().await,
            WidgetPhase::Rendering => self.run_rendering().await,
            WidgetPhase::Binding => self.run_binding(),
            WidgetPhase::Completion => Ok(self.run_completion()),
        }
    }

    fn run_init(&self) -> PhaseOutcome {
        info!("widget initialized");
        PhaseOutcome::Advance
    }

    async fn run_loading(&self) -> DomainResult<PhaseOutcome> {
        let config = self
            .quotes
            .fetch_merchant_config(self.insurance_type)
            .await?;
        let active = config.as_ref().is_some_and(MerchantConfig::is_active);
        info!(
            status = ?config.as_ref().map(|c| &c.status),
            default_opt = config.as_ref().is_some_and(|c| c.default_opt),
            "merchant config loaded"
        );
        self.store
            .update(|snapshot| snapshot.merchant_config = config)
            .await;

        if active {
            Ok(PhaseOutcome::Advance)
        } else {
            Ok(PhaseOutcome::Hold(
                "merchant config missing or inactive".to_string(),
            ))
        }
    }

    async fn run_processing(&self) -> DomainResult<PhaseOutcome> {
        let summary = self.cart.build_cart_summary().await?;
        let user_id = self.identity.get_or_create_user_id().await?;
        let device_id = self.identity.get_or_create_device_id().await?;
        debug!(items = summary.items.len(), "cart summary built");

        self.store
            .update(|snapshot| {
                snapshot.cart = Some(summary);
                snapshot.user_id = Some(user_id);
                snapshot.device_id = Some(device_id);
            })
            .await;
        Ok(PhaseOutcome::Advance)
    }

    async fn run_quoting(&self) -> DomainResult<PhaseOutcome> {
        let snapshot = self.store.snapshot().await;
        let request = QuoteRequest {
            insurance_type: self.insurance_type,
            source: QuoteSource::Checkout,
            cart: snapshot.cart.unwrap_or_default(),
            user_id: snapshot.user_id.unwrap_or_default(),
            device_id: snapshot.device_id.unwrap_or_default(),
        };

        let quote = self.quotes.fetch_quote(&request).await?;
        let quote_id = quote.as_ref().map(|q| q.quote_id.clone());
        let accepted = quote.as_ref().is_some_and(|q| q.is_accepted());
        info!(quote_id = ?quote_id, accepted, "quote received");

        self.store
            .update(|snapshot| {
                if let Some(q) = &quote {
                    snapshot.sticky_product_id = Some(q.product().to_string());
                }
                snapshot.quote = quote;
            })
            .await;
        self.publish(WidgetEventPayload::QuoteUpdated { quote_id, accepted });
        Ok(PhaseOutcome::Advance)
    }

    async fn run_carting(&self) -> DomainResult<PhaseOutcome> {
        let snapshot = self.store.snapshot().await;
        let lines = self.cart.current_lines();
        let split = split_lines(
            &lines,
            snapshot.quote.as_ref(),
            snapshot.sticky_product_id.as_deref(),
        );

        let desired = self.surface.checkbox_value().unwrap_or_else(|| {
            split.matched.is_some()
                || snapshot
                    .merchant_config
                    .as_ref()
                    .is_some_and(|config| config.default_opt)
        });

        let planned = plan(snapshot.quote.as_ref(), desired, &split);
        let planned_keys: Vec<LineKey> = planned.keys().cloned().collect();
        self.store
            .update(|snapshot| {
                snapshot.current_widget_status = desired;
                snapshot.self_mutations.clear();
                for key in planned_keys {
                    snapshot.record_self_mutation(key);
                }
            })
            .await;

        if !planned.is_empty() {
            self.advisory.post(
                &self.name,
                format!(
                    "{} will update cart -> {}",
                    self.name,
                    serde_json::to_string(&planned)?
                ),
            );
        }

        let report = self.reconciler.execute(&planned).await;
        let rollback = report.rollback_status();
        let failed_keys: Vec<LineKey> = report.failed_keys().cloned().collect();
        self.store
            .update(|snapshot| {
                for key in &failed_keys {
                    snapshot.take_self_mutation(key);
                }
                if let Some(status) = rollback {
                    snapshot.current_widget_status = status;
                }
            })
            .await;

        if let Some(status) = rollback {
            warn!(status, "cart mutation failed; checkbox rolled back");
        }
        info!(
            mutations = report.mutation_count(),
            desired,
            "cart reconciled"
        );
        self.publish(WidgetEventPayload::CartReconciled {
            operation: report.primary.as_ref().map(|r| r.operation),
            succeeded: report.primary.as_ref().map(|r| r.succeeded),
            stale_removed: report.stale_removals.iter().filter(|r| r.succeeded).count(),
        });

        let quote_id = snapshot
            .quote
            .as_ref()
            .map(|q| q.quote_id.as_str())
            .unwrap_or_default();
        if let Err(e) = self
            .cart
            .set_attribute(&self.insurance_type.quote_attribute_key(), quote_id)
            .await
        {
            warn!(error = %e, "failed to record quote id on cart");
        }

        Ok(PhaseOutcome::Advance)
    }

    async fn run_rendering(&self) -> DomainResult<PhaseOutcome> {
        let snapshot = self.store.snapshot().await;

        let action = match snapshot.quote.as_ref().filter(|q| q.is_accepted()) {
            None => {
                if self.surface.remove_widget()? {
                    RenderAction::Removed
                } else {
                    RenderAction::Skipped
                }
            }
            Some(quote) if self.surface.has_widget() => {
                self.surface
                    .update_description(&self.surface.describe(quote))?;
                self.surface.update_checkbox(CheckboxUpdate::both(
                    snapshot.current_widget_status,
                    true,
                ))?;
                RenderAction::Updated
            }
            Some(quote) => {
                self.surface.render_widget(WidgetProps {
                    name: self.name.clone(),
                    checked: snapshot.current_widget_status,
                    quote: quote.clone(),
                    merchant_config: snapshot.merchant_config.clone(),
                    description: self.surface.describe(quote),
                })?;
                RenderAction::Appended
            }
        };
        debug!(?action, "widget rendered");
        self.publish(WidgetEventPayload::WidgetRendered { action });

        if self.surface.is_mounted() {
            Ok(PhaseOutcome::Advance)
        } else {
            Ok(PhaseOutcome::Hold("render target not mounted".to_string()))
        }
    }

    fn run_binding(&self) -> DomainResult<PhaseOutcome> {
        if self.surface.has_widget() {
            self.surface.bind_checkbox(self.binding.clone())?;
            self.surface
                .update_checkbox(CheckboxUpdate::disabled(false))?;
            info!("checkbox enabled and bound");
        }
        Ok(PhaseOutcome::Advance)
    }

    fn run_completion(&self) -> PhaseOutcome {
        info!("ready for user input");
        self.timer.report(&self.name);
        PhaseOutcome::Done
    }

    // ========================================================================
    // Reactive entry points
    // ========================================================================

    /// Apply a cart change notification.
    ///
    /// Returns the restart ticket when the change restarted the machine.
    #[instrument(skip(self, lines), fields(widget = %self.name, lines = lines.len()))]
    pub async fn observe_lines(&self, lines: Vec<CartLine>) -> Option<PhaseTicket> {
        let phase = self.store.phase();
        let observation = self
            .store
            .update(|snapshot| observe(snapshot, phase, &lines))
            .await;

        if observation.diff.is_empty() {
            return None;
        }

        info!(
            added = observation.diff.added.len(),
            removed = observation.diff.removed.len(),
            updated = observation.diff.updated.len(),
            self_originated = observation.self_originated.len(),
            restart = ?observation.restart,
            "cart mutation captured"
        );
        self.publish(WidgetEventPayload::CartMutationCaptured {
            diff: observation.diff.clone(),
            restart: observation.restart,
        });

        if observation.disables_checkbox() && self.surface.checkbox_value().is_some() {
            if let Err(e) = self
                .surface
                .update_checkbox(CheckboxUpdate::disabled(true))
            {
                error!(error = %e, "failed to disable checkbox");
                self.publish(WidgetEventPayload::ObserverFailed {
                    error: e.to_string(),
                });
            }
        }

        match observation.restart {
            Some(point) => Some(self.store.restart_at(point).await),
            None => None,
        }
    }

    /// Apply the buyer's checkbox choice to the cart.
    #[instrument(skip(self), fields(widget = %self.name))]
    pub async fn handle_toggle(&self, checked: bool) {
        if let Err(e) = self.toggle(checked).await {
            error!(error = %e, "checkbox toggle failed");
            self.publish(WidgetEventPayload::ToggleFailed {
                error: e.to_string(),
            });
        }
    }

    async fn toggle(&self, checked: bool) -> DomainResult<()> {
        self.surface
            .update_checkbox(CheckboxUpdate::both(checked, true))?;

        let snapshot = self.store.snapshot().await;
        let Some(quote) = snapshot.quote.filter(|q| q.is_accepted()) else {
            warn!("toggle without an accepted quote; reverting");
            self.surface
                .update_checkbox(CheckboxUpdate::both(!checked, false))?;
            return Ok(());
        };

        let key = LineKey::new(quote.product(), quote.variant());
        let succeeded = if checked {
            let change = CartLineChange::AddCartLine {
                merchandise_id: variant_gid(&quote.variant_id),
                quantity: 1,
            };
            self.reconciler.apply(change, key).await.succeeded
        } else {
            let matched = self
                .cart
                .current_lines()
                .into_iter()
                .find(|line| line.key() == key);
            match matched {
                Some(line) => {
                    let change = CartLineChange::RemoveCartLine {
                        id: line.id.clone(),
                        quantity: line.quantity.max(1),
                    };
                    self.reconciler.apply(change, key).await.succeeded
                }
                None => true,
            }
        };

        let effective = if succeeded { checked } else { !checked };
        self.surface
            .update_checkbox(CheckboxUpdate::both(effective, false))?;
        self.store
            .update(|snapshot| snapshot.current_widget_status = effective)
            .await;
        info!(requested = checked, effective, "checkbox toggled");
        self.publish(WidgetEventPayload::CheckboxToggled {
            requested: checked,
            effective,
        });

        if let Err(e) = self
            .cart
            .set_attribute(
                &self.insurance_type.checked_attribute_key(),
                &effective.to_string(),
            )
            .await
        {
            warn!(error = %e, "failed to record checkbox choice on cart");
        }
        Ok(())
    }
}
