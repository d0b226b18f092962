//! `cartguard phases`

use anyhow::Result;
use serde::Serialize;

use crate::cli::output::{output, table, CommandOutput};
use crate::domain::models::{RestartPoint, WidgetPhase};

/// One phase of the lifecycle table.
#[derive(Debug, Serialize)]
pub struct PhaseRow {
    /// The phase.
    pub phase: WidgetPhase,
    /// Position in the lifecycle.
    pub ordinal: usize,
    /// Bit value.
    pub bit: u8,
    /// Successor, `None` for the terminal phase.
    pub next: Option<WidgetPhase>,
    /// Whether cart changes can restart the machine here.
    pub restart_target: bool,
}

/// Output of `cartguard phases`.
#[derive(Debug, Serialize)]
pub struct PhasesOutput {
    /// Every phase in order.
    pub phases: Vec<PhaseRow>,
}

impl PhasesOutput {
    /// Build the table from the phase model.
    pub fn collect() -> Self {
        let restart_targets = [
            RestartPoint::Processing.phase(),
            RestartPoint::Carting.phase(),
        ];
        let phases = WidgetPhase::ALL
            .iter()
            .map(|&phase| PhaseRow {
                phase,
                ordinal: phase.ordinal(),
                bit: phase.bit(),
                next: phase.next(),
                restart_target: restart_targets.contains(&phase),
            })
            .collect();
        Self { phases }
    }
}

impl CommandOutput for PhasesOutput {
    fn to_human(&self) -> String {
        let mut table = table(["#", "Phase", "Bit", "Next", "Restart target"]);
        for row in &self.phases {
            table.add_row(vec![
                row.ordinal.to_string(),
                row.phase.to_string(),
                format!("{:#04x}", row.bit),
                row.next.map_or_else(|| "-".to_string(), |next| next.to_string()),
                if row.restart_target { "yes" } else { "" }.to_string(),
            ]);
        }
        table.to_string()
    }
}

/// Print the lifecycle table.
pub fn execute(json_mode: bool) -> Result<()> {
    output(&PhasesOutput::collect(), json_mode);
    Ok(())
}
