//! Cart reconciliation engine.
//!
//! Converges the insurance product's lines in the cart to the desired
//! checkbox state with the fewest mutations:
//!
//! 1. lines of the widget's product are split into the one *matched* line
//!    (variant equals the quote's variant) and *unmatched* stale lines;
//! 2. every unmatched line is removed, in parallel, whatever the desired state;
//! 3. opted in with an accepted quote: the matched line is forced to quantity 1,
//!    or one unit of the quote's variant is added;
//! 4. otherwise the matched line, if any, is removed.

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::models::{
    variant_gid, CartLine, CartLineChange, CartOperation, LineKey, MutationOutcome, Quote,
};
use crate::domain::ports::CartGateway;

/// Insurance lines found in the cart, relative to the current quote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LineSplit {
    /// The line carrying the quote's variant.
    pub matched: Option<CartLine>,
    /// Stale lines of the same product.
    pub unmatched: Vec<CartLine>,
}

impl LineSplit {
    /// No insurance lines in the cart.
    pub fn is_empty(&self) -> bool {
        self.matched.is_none() && self.unmatched.is_empty()
    }
}

/// Split live lines into matched and unmatched insurance lines.
///
/// The product is the quote's, or the sticky product id without a quote (in
/// which case every line of that product is unmatched). A second line carrying
/// the matched variant is treated as unmatched so it gets removed.
pub fn split_lines(
    lines: &[CartLine],
    quote: Option<&Quote>,
    sticky_product_id: Option<&str>,
) -> LineSplit {
    let Some(product_id) = quote.map(Quote::product).or(sticky_product_id) else {
        return LineSplit::default();
    };

    let mut split = LineSplit::default();
    for line in lines.iter().filter(|line| line.product() == product_id) {
        let is_quoted_variant = quote.is_some_and(|q| q.variant() == line.variant());
        if is_quoted_variant && split.matched.is_none() {
            split.matched = Some(line.clone());
        } else {
            split.unmatched.push(line.clone());
        }
    }
    split
}

/// A mutation the pass intends to make, with the brief key it touches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedChange {
    /// Request sent to the gateway.
    pub change: CartLineChange,
    /// Brief key of the line it changes.
    pub key: LineKey,
}

impl PlannedChange {
    fn remove(line: &CartLine) -> Self {
        Self {
            change: CartLineChange::RemoveCartLine {
                id: line.id.clone(),
                quantity: line.quantity,
            },
            key: line.key(),
        }
    }
}

/// Mutations one pass will make.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcilePlan {
    /// Removals of unmatched lines.
    pub stale_removals: Vec<PlannedChange>,
    /// Change to the matched line.
    pub primary: Option<PlannedChange>,
}

impl ReconcilePlan {
    /// The cart already matches.
    pub fn is_empty(&self) -> bool {
        self.stale_removals.is_empty() && self.primary.is_none()
    }

    /// Every key the plan will touch.
    pub fn keys(&self) -> impl Iterator<Item = &LineKey> {
        self.stale_removals
            .iter()
            .chain(self.primary.iter())
            .map(|planned| &planned.key)
    }
}

/// Decide the mutations that converge the cart to `opted_in`.
pub fn plan(quote: Option<&Quote>, opted_in: bool, split: &LineSplit) -> ReconcilePlan {
    let stale_removals = split.unmatched.iter().map(PlannedChange::remove).collect();

    let accepted_quote = quote.filter(|q| q.is_accepted());
    let primary = match (accepted_quote, &split.matched) {
        (Some(_), Some(matched)) if opted_in => (matched.quantity != 1).then(|| PlannedChange {
            change: CartLineChange::UpdateCartLine {
                id: matched.id.clone(),
                merchandise_id: matched.variant_id.clone(),
                quantity: 1,
            },
            key: matched.key(),
        }),
        (Some(quote), None) if opted_in => Some(PlannedChange {
            change: CartLineChange::AddCartLine {
                merchandise_id: variant_gid(&quote.variant_id),
                quantity: 1,
            },
            key: LineKey::new(quote.product(), quote.variant()),
        }),
        (_, Some(matched)) => Some(PlannedChange::remove(matched)),
        (_, None) => None,
    };

    ReconcilePlan {
        stale_removals,
        primary,
    }
}

/// One mutation call and how it went.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationRecord {
    /// Operation kind.
    pub operation: CartOperation,
    /// Brief key of the line.
    pub key: LineKey,
    /// Whether the host applied it.
    pub succeeded: bool,
    /// Host message or call error on failure.
    pub error: Option<String>,
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Removals of unmatched lines.
    pub stale_removals: Vec<MutationRecord>,
    /// The add/update/remove of the matched line, if one was needed.
    pub primary: Option<MutationRecord>,
}

impl ReconcileReport {
    /// Mutation calls made.
    pub fn mutation_count(&self) -> usize {
        self.stale_removals.len() + usize::from(self.primary.is_some())
    }

    fn records(&self) -> impl Iterator<Item = &MutationRecord> {
        self.stale_removals.iter().chain(self.primary.iter())
    }

    /// Brief keys of the mutations that did not go through.
    pub fn failed_keys(&self) -> impl Iterator<Item = &LineKey> {
        self.records()
            .filter(|record| !record.succeeded)
            .map(|record| &record.key)
    }

    /// Checkbox state to fall back to when the primary mutation failed.
    ///
    /// A failed add leaves the buyer opted out, a failed removal leaves them
    /// opted in; a failed quantity update changes nothing.
    pub fn rollback_status(&self) -> Option<bool> {
        match &self.primary {
            Some(record) if !record.succeeded => match record.operation {
                CartOperation::AddCartLine => Some(false),
                CartOperation::RemoveCartLine => Some(true),
                CartOperation::UpdateCartLine => None,
            },
            _ => None,
        }
    }
}

/// Runs reconciliation passes against a cart gateway.
pub struct CartReconciler {
    gateway: Arc<dyn CartGateway>,
}

impl CartReconciler {
    /// Reconciler over `gateway`.
    pub fn new(gateway: Arc<dyn CartGateway>) -> Self {
        Self { gateway }
    }

    /// Plan and execute one reconciliation pass.
    pub async fn reconcile(
        &self,
        quote: Option<&Quote>,
        opted_in: bool,
        split: &LineSplit,
    ) -> ReconcileReport {
        self.execute(&plan(quote, opted_in, split)).await
    }

    /// Execute a plan: stale removals in parallel, then the primary mutation.
    pub async fn execute(&self, plan: &ReconcilePlan) -> ReconcileReport {
        let stale_removals = join_all(
            plan.stale_removals
                .iter()
                .map(|planned| self.apply(planned.change.clone(), planned.key.clone())),
        )
        .await;

        let primary = match &plan.primary {
            Some(planned) => Some(self.apply(planned.change.clone(), planned.key.clone()).await),
            None => None,
        };

        ReconcileReport {
            stale_removals,
            primary,
        }
    }

    /// Apply a single change and record the result.
    pub async fn apply(&self, change: CartLineChange, key: LineKey) -> MutationRecord {
        let operation = change.operation();
        let (succeeded, error) = match self.gateway.apply_change(change).await {
            Ok(MutationOutcome::Success) => (true, None),
            Ok(MutationOutcome::Error { message }) => (false, Some(message)),
            Err(e) => (false, Some(e.to_string())),
        };

        if let Some(ref error) = error {
            warn!(%operation, key = %key, error = %error, "cart mutation failed");
        } else {
            debug!(%operation, key = %key, "cart mutation applied");
        }

        MutationRecord {
            operation,
            key,
            succeeded,
            error,
        }
    }
}
