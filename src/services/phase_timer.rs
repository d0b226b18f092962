//! Phase timing diagnostics.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::info;

use crate::domain::models::WidgetPhase;

/// Marks when each phase last started and reports the gaps at completion.
#[derive(Default)]
pub struct PhaseTimer {
    marks: Mutex<HashMap<WidgetPhase, Instant>>,
}

impl PhaseTimer {
    /// Timer with no marks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `phase` starts now.
    pub fn mark(&self, phase: WidgetPhase) {
        if let Ok(mut marks) = self.marks.lock() {
            marks.insert(phase, Instant::now());
        }
    }

    /// Duration from each marked phase to the next marked phase, in lifecycle
    /// order. Clears the marks.
    pub fn measure(&self) -> Vec<(WidgetPhase, Duration)> {
        let Ok(mut marks) = self.marks.lock() else {
            return Vec::new();
        };
        let ordered: Vec<(WidgetPhase, Instant)> = WidgetPhase::ALL
            .iter()
            .filter_map(|phase| marks.get(phase).map(|at| (*phase, *at)))
            .collect();
        marks.clear();

        ordered
            .windows(2)
            .map(|pair| (pair[0].0, pair[1].1.saturating_duration_since(pair[0].1)))
            .collect()
    }

    /// Log every measured duration.
    pub fn report(&self, widget: &str) {
        for (phase, duration) in self.measure() {
            info!(
                widget,
                phase = %phase,
                duration_ms = duration.as_millis(),
                "phase duration"
            );
        }
    }
}
