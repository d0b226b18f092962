//! Widget lifecycle phases.
//!
//! ```text
//! Init → Loading → Processing → Quoting → Carting → Rendering → Binding → Completion
//!                      ↑                      ↑
//!                      └── observer restart ──┘ (only these two targets)
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered lifecycle phase of one widget instance.
///
/// The derive order is the lifecycle order, so `Ord` comparisons such as
/// `phase > WidgetPhase::Carting` mean "further along the lifecycle".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WidgetPhase {
    /// Session start.
    Init,
    /// Merchant configuration fetch (kill switch).
    Loading,
    /// Cart summary and session identity.
    Processing,
    /// Quote request.
    Quoting,
    /// Cart reconciliation.
    Carting,
    /// Widget render/update/removal.
    Rendering,
    /// Checkbox handler binding.
    Binding,
    /// Terminal, ready for buyer input.
    Completion,
}

impl WidgetPhase {
    /// All phases in lifecycle order.
    pub const ALL: [Self; 8] = [
        Self::Init,
        Self::Loading,
        Self::Processing,
        Self::Quoting,
        Self::Carting,
        Self::Rendering,
        Self::Binding,
        Self::Completion,
    ];

    /// Transition table: the phase that follows `self`, `None` for the terminal phase.
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Init => Some(Self::Loading),
            Self::Loading => Some(Self::Processing),
            Self::Processing => Some(Self::Quoting),
            Self::Quoting => Some(Self::Carting),
            Self::Carting => Some(Self::Rendering),
            Self::Rendering => Some(Self::Binding),
            Self::Binding => Some(Self::Completion),
            Self::Completion => None,
        }
    }

    /// `Completion` only.
    pub const fn is_terminal(self) -> bool {
        self.next().is_none()
    }

    /// Zero-based position in the lifecycle.
    pub const fn ordinal(self) -> usize {
        match self {
            Self::Init => 0,
            Self::Loading => 1,
            Self::Processing => 2,
            Self::Quoting => 3,
            Self::Carting => 4,
            Self::Rendering => 5,
            Self::Binding => 6,
            Self::Completion => 7,
        }
    }

    /// Single-bit flag for the phase, kept for log compatibility with hosts that
    /// report phases as bit values.
    pub const fn bit(self) -> u8 {
        1 << self.ordinal()
    }

    /// Upper-case phase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "INIT",
            Self::Loading => "LOADING",
            Self::Processing => "PROCESSING",
            Self::Quoting => "QUOTING",
            Self::Carting => "CARTING",
            Self::Rendering => "RENDERING",
            Self::Binding => "BINDING",
            Self::Completion => "COMPLETION",
        }
    }
}

impl fmt::Display for WidgetPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The only phases the cart observer may move the machine back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartPoint {
    /// Re-quote: cart composition changed.
    Processing,
    /// Re-validate the insurance line only.
    Carting,
}

impl RestartPoint {
    /// Phase the machine resumes at.
    pub const fn phase(self) -> WidgetPhase {
        match self {
            Self::Processing => WidgetPhase::Processing,
            Self::Carting => WidgetPhase::Carting,
        }
    }
}

/// How a phase change came about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseTransition {
    /// Machine started at `Init`.
    Start,
    /// Forward step along the transition table.
    Advance,
    /// Observer-driven reset to an earlier phase.
    Restart,
}
