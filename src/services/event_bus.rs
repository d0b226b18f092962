//! Widget event bus for ordered diagnostic events.
//!
//! Provides a broadcast-based event stream with sequence numbering. Every
//! phase change, captured cart mutation, reconciliation result and boundary
//! failure of a widget instance is published here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::domain::models::{
    BriefDiff, CartOperation, PhaseTransition, RestartPoint, WidgetPhase,
};

/// Unique identifier for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
    /// Fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonically increasing sequence number assigned by the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SequenceNumber(pub u64);

impl std::fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Event severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSeverity {
    /// Fine-grained detail.
    Debug,
    /// Normal progress.
    Info,
    /// Held or discarded work.
    Warning,
    /// A failure at a phase or handler boundary.
    Error,
}

impl std::fmt::Display for EventSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// What the rendering phase did to the widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderAction {
    /// First render.
    Appended,
    /// Description and checkbox refreshed in place.
    Updated,
    /// Stale widget removed, no valid quote.
    Removed,
    /// Nothing rendered, no valid quote.
    Skipped,
}

/// Event envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidgetEvent {
    /// Event id.
    pub id: EventId,
    /// Position on the bus.
    pub sequence: SequenceNumber,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
    /// Derived from the payload.
    pub severity: EventSeverity,
    /// Publishing widget.
    pub widget: String,
    /// What happened.
    pub payload: WidgetEventPayload,
}

impl WidgetEvent {
    /// Build an envelope; the sequence number is assigned on publish.
    pub fn new(widget: impl Into<String>, payload: WidgetEventPayload) -> Self {
        Self {
            id: EventId::new(),
            sequence: SequenceNumber(0),
            timestamp: Utc::now(),
            severity: payload.severity(),
            widget: widget.into(),
            payload,
        }
    }
}

/// Event payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum WidgetEventPayload {
    /// The machine moved.
    PhaseChanged {
        /// Previous phase, `None` at start.
        from: Option<WidgetPhase>,
        /// New phase.
        to: WidgetPhase,
        /// Advance, restart or start.
        transition: PhaseTransition,
    },
    /// A phase chose not to advance.
    PhaseHeld {
        /// Holding phase.
        phase: WidgetPhase,
        /// Why it holds.
        reason: String,
    },
    /// A phase body returned an error; the machine stalls.
    PhaseFailed {
        /// Failing phase.
        phase: WidgetPhase,
        /// Error text.
        error: String,
    },
    /// A phase finished after a restart overtook it; its outcome was dropped.
    PhaseOutcomeDiscarded {
        /// Overtaken phase.
        phase: WidgetPhase,
    },
    /// QUOTING stored a quote.
    QuoteUpdated {
        /// Quote id, `None` when nothing was offered.
        quote_id: Option<String>,
        /// Whether the quote may be carted.
        accepted: bool,
    },
    /// The observer saw the cart change.
    CartMutationCaptured {
        /// Brief diff.
        diff: BriefDiff,
        /// Restart requested, if any.
        restart: Option<RestartPoint>,
    },
    /// CARTING finished a reconciliation pass.
    CartReconciled {
        /// Primary operation, if one was needed.
        operation: Option<CartOperation>,
        /// Primary outcome.
        succeeded: Option<bool>,
        /// Stale lines removed.
        stale_removed: usize,
    },
    /// RENDERING touched the widget.
    WidgetRendered {
        /// What was done.
        action: RenderAction,
    },
    /// The buyer clicked the checkbox.
    CheckboxToggled {
        /// Value clicked.
        requested: bool,
        /// Value after the cart mutation.
        effective: bool,
    },
    /// Handling a cart change failed.
    ObserverFailed {
        /// Error text.
        error: String,
    },
    /// Handling a click failed.
    ToggleFailed {
        /// Error text.
        error: String,
    },
    /// The widget stopped.
    Disposed,
}

impl WidgetEventPayload {
    /// Severity stamped on the envelope.
    pub const fn severity(&self) -> EventSeverity {
        match self {
            Self::PhaseFailed { .. } | Self::ObserverFailed { .. } | Self::ToggleFailed { .. } => {
                EventSeverity::Error
            }
            Self::PhaseHeld { .. } | Self::PhaseOutcomeDiscarded { .. } => EventSeverity::Warning,
            Self::CartMutationCaptured { .. } => EventSeverity::Debug,
            _ => EventSeverity::Info,
        }
    }
}

/// Broadcast bus for one widget instance.
pub struct WidgetEventBus {
    sender: broadcast::Sender<WidgetEvent>,
    sequence: AtomicU64,
}

impl WidgetEventBus {
    /// Create a bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            sequence: AtomicU64::new(0),
        }
    }

    /// Publish an event, assigning its sequence number.
    pub fn publish(&self, mut event: WidgetEvent) {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        event.sequence = SequenceNumber(seq);

        // No subscribers is fine.
        let _ = self.sender.send(event);
    }

    /// Subscribe to the event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<WidgetEvent> {
        self.sender.subscribe()
    }

    /// Get the current sequence number.
    pub fn current_sequence(&self) -> SequenceNumber {
        SequenceNumber(self.sequence.load(Ordering::SeqCst))
    }

    /// Get the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
