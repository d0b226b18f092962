//! Scenario simulator.
//!
//! Runs one widget instance against the in-memory collaborators, plays the
//! scenario's script and collects the event trace and the final cart.

use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};

use super::scenario::{Scenario, ScenarioStep};
use crate::adapters::memory::{
    InMemoryCart, InMemorySessionStorage, RecordingSurface, RenderedWidget, StaticQuoteService,
};
use crate::domain::models::{AdvisoryConfig, CartLine, RuntimeConfig, WidgetPhase};
use crate::services::{AdvisoryChannel, WidgetCollaborators, WidgetEvent, WidgetRuntime};

/// How long the widget must stay silent to count as settled.
const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(50);
/// Upper bound on a single settle.
const SETTLE_DEADLINE: Duration = Duration::from_secs(5);

/// What happened during a simulation.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    /// Widget instance name.
    pub widget: String,
    /// Phase when the last step settled.
    pub final_phase: Option<WidgetPhase>,
    /// Steps interleaved with the events they caused.
    pub trace: Vec<TraceEntry>,
    /// Final cart lines.
    pub lines: Vec<CartLine>,
    /// Final cart attributes.
    pub attributes: BTreeMap<String, String>,
    /// Final widget state.
    pub checkbox: Option<RenderedWidget>,
    /// Cart mutations requested through the gateway.
    pub mutation_count: usize,
    /// Quote requests made.
    pub quote_requests: usize,
}

/// A step marker or an event published by the widget.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceEntry {
    /// A scripted step was applied.
    Step {
        /// Position in the script.
        index: usize,
        /// The step.
        step: ScenarioStep,
        /// Set when the step could not be applied.
        note: Option<String>,
    },
    /// An event from the widget bus.
    Event(WidgetEvent),
}

/// Plays a scenario against one widget.
pub struct Simulator {
    scenario: Scenario,
    runtime: RuntimeConfig,
    advisory: AdvisoryConfig,
    quiet_period: Duration,
}

impl Simulator {
    /// Simulator with default runtime settings.
    pub fn new(scenario: Scenario) -> Self {
        Self {
            scenario,
            runtime: RuntimeConfig::default(),
            advisory: AdvisoryConfig::default(),
            quiet_period: DEFAULT_QUIET_PERIOD,
        }
    }

    /// Override runtime and advisory settings.
    #[must_use]
    pub fn with_runtime(mut self, runtime: RuntimeConfig, advisory: AdvisoryConfig) -> Self {
        self.runtime = runtime;
        self.advisory = advisory;
        self
    }

    /// Silence that counts as settled.
    #[must_use]
    pub const fn with_quiet_period(mut self, quiet_period: Duration) -> Self {
        self.quiet_period = quiet_period;
        self
    }

    /// Run the whole script and report.
    pub async fn run(self) -> Result<SimulationReport> {
        let cart = Arc::new(InMemoryCart::new());
        // Quoted variants first so explicit catalog entries win.
        for quote in self.scenario.quotes.iter().flatten() {
            cart.register_variant(quote.product(), quote.variant(), "Protection", minor_units(quote.price));
        }
        for item in &self.scenario.catalog {
            let title = item
                .title
                .clone()
                .unwrap_or_else(|| format!("Product {}", item.product));
            cart.register_variant(&item.product, &item.variant, &title, item.price);
        }
        for line in &self.scenario.lines {
            cart.add_line(&line.product, &line.variant, line.quantity);
        }

        let quotes = Arc::new(StaticQuoteService::new(self.scenario.merchant.clone()));
        for quote in &self.scenario.quotes {
            quotes.push_quote(quote.clone());
        }
        let surface = Arc::new(RecordingSurface::new());

        let runtime = WidgetRuntime::new(
            self.scenario.widget.clone(),
            WidgetCollaborators {
                quotes: quotes.clone(),
                cart: cart.clone(),
                storage: Arc::new(InMemorySessionStorage::new()),
                surface: surface.clone(),
            },
            AdvisoryChannel::new(&self.advisory),
            &self.runtime,
        );
        let mut events = runtime.events();
        let handle = runtime.spawn();
        info!(widget = %handle.name(), steps = self.scenario.steps.len(), "simulation started");

        let mut trace = Vec::new();
        self.settle(&mut events, &mut trace).await;

        for (index, step) in self.scenario.steps.iter().enumerate() {
            let note = apply_step(step, &cart, &surface);
            if let Some(ref note) = note {
                warn!(index, note = %note, "step had no effect");
            }
            trace.push(TraceEntry::Step {
                index,
                step: step.clone(),
                note,
            });
            self.settle(&mut events, &mut trace).await;
        }

        let report = SimulationReport {
            widget: handle.name().to_string(),
            final_phase: handle.store().phase(),
            trace,
            lines: cart.lines(),
            attributes: cart.attributes(),
            checkbox: surface.widget(),
            mutation_count: cart.mutations().len(),
            quote_requests: quotes.requests().len(),
        };
        handle.dispose().await;
        debug!("simulation finished");
        Ok(report)
    }

    /// Collect events until the widget has been quiet for the quiet period.
    async fn settle(&self, events: &mut broadcast::Receiver<WidgetEvent>, trace: &mut Vec<TraceEntry>) {
        let deadline = Instant::now() + SETTLE_DEADLINE;
        while Instant::now() < deadline {
            match timeout(self.quiet_period, events.recv()).await {
                Ok(Ok(event)) => trace.push(TraceEntry::Event(event)),
                Ok(Err(broadcast::error::RecvError::Lagged(skipped))) => {
                    warn!(skipped, "trace lagged behind the widget");
                }
                Ok(Err(broadcast::error::RecvError::Closed)) | Err(_) => return,
            }
        }
        warn!("widget did not settle before the deadline");
    }
}

#[allow(clippy::cast_possible_truncation)]
fn minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

/// Apply a step; returns a note when it could not be applied.
fn apply_step(step: &ScenarioStep, cart: &InMemoryCart, surface: &RecordingSurface) -> Option<String> {
    match step {
        ScenarioStep::Settle => None,
        ScenarioStep::AddLine {
            product,
            variant,
            quantity,
        } => {
            cart.add_line(product, variant, *quantity);
            None
        }
        ScenarioStep::SetQuantity { variant, quantity } => match cart.line_for_variant(variant) {
            Some(line) => {
                cart.set_quantity(&line.id, *quantity);
                None
            }
            None => Some(format!("no line with variant {variant}")),
        },
        ScenarioStep::RemoveLine { variant } => match cart.line_for_variant(variant) {
            Some(line) => {
                cart.remove_line(&line.id);
                None
            }
            None => Some(format!("no line with variant {variant}")),
        },
        ScenarioStep::Toggle(checked) => {
            if surface.click(*checked) {
                None
            } else {
                Some("checkbox is not rendered, bound and enabled".to_string())
            }
        }
        ScenarioStep::FailNextMutation(message) => {
            cart.fail_next_mutation(message.clone());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"
merchant:
  status: active
  default_opt: true
quotes:
  - quote_id: q-1
    variant_id: "9001"
    product_id: "9000"
    price: 1.99
    value: 80.0
    currency_code: USD
    status: accepted
lines:
  - { product: "10", variant: "100" }
steps:
  - toggle: false
"#;

    #[tokio::test]
    async fn test_default_opt_in_then_buyer_opts_out() {
        let scenario = Scenario::from_yaml(SCENARIO).unwrap();
        let report = Simulator::new(scenario).run().await.unwrap();

        assert_eq!(report.final_phase, Some(WidgetPhase::Completion));
        assert_eq!(report.lines.len(), 1, "insurance line removed after opt-out");
        assert_eq!(report.attributes.get("ra_quote_id").map(String::as_str), Some("q-1"));
        assert_eq!(report.attributes.get("ra-checked").map(String::as_str), Some("false"));
        assert_eq!(report.checkbox.map(|c| c.checked), Some(false));
    }

    #[tokio::test]
    async fn test_void_merchant_never_quotes() {
        let scenario = Scenario::from_yaml("merchant:\n  status: void\nsteps:\n  - add_line: { product: \"1\", variant: \"2\" }\n").unwrap();
        let report = Simulator::new(scenario).run().await.unwrap();
        assert_eq!(report.final_phase, Some(WidgetPhase::Loading));
        assert_eq!(report.quote_requests, 0);
        assert_eq!(report.mutation_count, 0);
    }
}
