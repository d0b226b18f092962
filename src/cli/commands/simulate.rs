//! `cartguard simulate <scenario.yaml>`

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::application::{Scenario, ScenarioStep, SimulationReport, Simulator, TraceEntry};
use crate::cli::output::{output, table, truncate, CommandOutput};
use crate::domain::models::Config;
use crate::services::WidgetEventPayload;

/// Arguments of `cartguard simulate`.
#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Scenario file (YAML)
    pub scenario: PathBuf,

    /// Milliseconds of silence after which the widget counts as settled
    #[arg(long, default_value = "50")]
    pub quiet_ms: u64,
}

/// Output of `cartguard simulate`.
#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct SimulateOutput {
    /// Simulation result.
    pub report: SimulationReport,
}

impl CommandOutput for SimulateOutput {
    fn to_human(&self) -> String {
        let report = &self.report;
        let mut sections = Vec::new();

        let mut trace = table(["Seq", "Kind", "Detail"]);
        for entry in &report.trace {
            match entry {
                TraceEntry::Step { index, step, note } => {
                    let mut detail = describe_step(step);
                    if let Some(note) = note {
                        detail.push_str(&format!(" ({note})"));
                    }
                    trace.add_row(vec![format!("step {index}"), "step".to_string(), detail]);
                }
                TraceEntry::Event(event) => {
                    trace.add_row(vec![
                        event.sequence.0.to_string(),
                        format!("{:?}", event.severity).to_lowercase(),
                        truncate(&describe_event(&event.payload), 80),
                    ]);
                }
            }
        }
        sections.push(format!("Trace for {}:\n{trace}", report.widget));

        let mut cart = table(["Line", "Product", "Variant", "Qty"]);
        for line in &report.lines {
            cart.add_row(vec![
                line.id.clone(),
                line.product().to_string(),
                line.variant().to_string(),
                line.quantity.to_string(),
            ]);
        }
        sections.push(format!("Final cart:\n{cart}"));

        let phase = report
            .final_phase
            .map_or_else(|| "not started".to_string(), |p| p.to_string());
        let checkbox = report.checkbox.as_ref().map_or_else(
            || "not rendered".to_string(),
            |c| format!("checked={} disabled={}", c.checked, c.disabled),
        );
        let attributes = report
            .attributes
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(", ");
        sections.push(format!(
            "Final phase: {phase}\nCheckbox: {checkbox}\nAttributes: {attributes}\nMutations: {}  Quote requests: {}",
            report.mutation_count, report.quote_requests
        ));

        sections.join("\n\n")
    }
}

fn describe_step(step: &ScenarioStep) -> String {
    match step {
        ScenarioStep::Settle => "settle".to_string(),
        ScenarioStep::AddLine {
            product,
            variant,
            quantity,
        } => format!("add_line {product}/{variant} x{quantity}"),
        ScenarioStep::SetQuantity { variant, quantity } => {
            format!("set_quantity {variant} -> {quantity}")
        }
        ScenarioStep::RemoveLine { variant } => format!("remove_line {variant}"),
        ScenarioStep::Toggle(checked) => format!("toggle {checked}"),
        ScenarioStep::FailNextMutation(message) => format!("fail_next_mutation \"{message}\""),
    }
}

/// One-line summary of a widget event.
pub fn describe_event(payload: &WidgetEventPayload) -> String {
    match payload {
        WidgetEventPayload::PhaseChanged {
            from,
            to,
            transition,
        } => match from {
            Some(from) => format!("{transition:?}: {from} -> {to}"),
            None => format!("{transition:?}: {to}"),
        },
        WidgetEventPayload::PhaseHeld { phase, reason } => format!("{phase} held: {reason}"),
        WidgetEventPayload::PhaseFailed { phase, error } => format!("{phase} failed: {error}"),
        WidgetEventPayload::PhaseOutcomeDiscarded { phase } => {
            format!("{phase} outcome discarded")
        }
        WidgetEventPayload::QuoteUpdated { quote_id, accepted } => format!(
            "quote {} ({})",
            quote_id.as_deref().unwrap_or("none"),
            if *accepted { "accepted" } else { "not accepted" }
        ),
        WidgetEventPayload::CartMutationCaptured { diff, restart } => format!(
            "cart changed: +{} -{} ~{}{}",
            diff.added.len(),
            diff.removed.len(),
            diff.updated.len(),
            restart.map_or_else(String::new, |point| format!(", restart at {}", point.phase()))
        ),
        WidgetEventPayload::CartReconciled {
            operation,
            succeeded,
            stale_removed,
        } => match (operation, succeeded) {
            (Some(op), Some(ok)) => format!(
                "reconciled: {op} {}, {stale_removed} stale removed",
                if *ok { "ok" } else { "failed" }
            ),
            _ => format!("reconciled: no change, {stale_removed} stale removed"),
        },
        WidgetEventPayload::WidgetRendered { action } => format!("widget {action:?}").to_lowercase(),
        WidgetEventPayload::CheckboxToggled {
            requested,
            effective,
        } => format!("checkbox toggled: requested {requested}, now {effective}"),
        WidgetEventPayload::ObserverFailed { error } => format!("observer failed: {error}"),
        WidgetEventPayload::ToggleFailed { error } => format!("toggle failed: {error}"),
        WidgetEventPayload::Disposed => "disposed".to_string(),
    }
}

/// Load and run a scenario, then print its report.
pub async fn execute(args: SimulateArgs, config: &Config, json_mode: bool) -> Result<()> {
    let scenario = Scenario::load(&args.scenario)?;
    let report = Simulator::new(scenario)
        .with_runtime(config.runtime.clone(), config.advisory.clone())
        .with_quiet_period(Duration::from_millis(args.quiet_ms.max(1)))
        .run()
        .await?;
    output(&SimulateOutput { report }, json_mode);
    Ok(())
}
