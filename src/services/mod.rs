//! Widget services: state, lifecycle and cart synchronisation.

pub mod advisory_channel;
pub mod cart_observer;
pub mod cart_reconciler;
pub mod event_bus;
pub mod phase_controller;
pub mod phase_timer;
pub mod session_identity;
pub mod snapshot_store;
pub mod widget_runtime;

pub use advisory_channel::{AdvisoryChannel, AdvisoryNotice};
pub use cart_observer::{observe, Observation};
pub use cart_reconciler::{
    plan, split_lines, CartReconciler, LineSplit, MutationRecord, PlannedChange, ReconcilePlan,
    ReconcileReport,
};
pub use event_bus::{
    EventSeverity, RenderAction, SequenceNumber, WidgetEvent, WidgetEventBus, WidgetEventPayload,
};
pub use phase_controller::{PhaseController, PhaseOutcome, WidgetCollaborators};
pub use phase_timer::PhaseTimer;
pub use session_identity::SessionIdentity;
pub use snapshot_store::{PhaseTicket, SnapshotStore};
pub use widget_runtime::{WidgetCommand, WidgetHandle, WidgetRuntime};
