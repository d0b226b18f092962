//! In-memory cart gateway.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    strip_gid, CartItem, CartLine, CartLineChange, CartSummary, MutationOutcome,
};
use crate::domain::ports::CartGateway;

const DEFAULT_UNIT_PRICE: i64 = 2_500;

/// Merchandise known to the cart, keyed by numeric variant id.
#[derive(Debug, Clone)]
struct CatalogEntry {
    product_id: String,
    title: String,
    unit_price: i64,
}

#[derive(Debug, Clone)]
enum InjectedFailure {
    /// The host answers with an error outcome.
    Rejected(String),
    /// The call itself fails.
    Unavailable(String),
}

#[derive(Default)]
struct CartState {
    lines: Vec<CartLine>,
    catalog: HashMap<String, CatalogEntry>,
    attributes: BTreeMap<String, String>,
    mutations: Vec<CartLineChange>,
    failures: VecDeque<InjectedFailure>,
    fail_attributes: bool,
    next_line: u64,
}

impl CartState {
    fn catalog_entry(&mut self, product: &str, variant: &str) -> &CatalogEntry {
        self.catalog
            .entry(variant.to_string())
            .or_insert_with(|| CatalogEntry {
                product_id: product.to_string(),
                title: format!("Product {product}"),
                unit_price: DEFAULT_UNIT_PRICE,
            })
    }

    fn push_line(&mut self, product: &str, variant: &str, quantity: u32) -> String {
        self.next_line += 1;
        let id = format!("gid://shopify/CartLine/{}", self.next_line);
        let unit_price = self.catalog_entry(product, variant).unit_price;
        let mut line = CartLine::new(
            id.clone(),
            format!("gid://shopify/Product/{product}"),
            format!("gid://shopify/ProductVariant/{variant}"),
            quantity,
        );
        line.total_amount = Some(unit_price * i64::from(quantity));
        self.lines.push(line);
        id
    }

    fn set_quantity(&mut self, line_id: &str, quantity: u32) -> bool {
        let Some(index) = self.lines.iter().position(|line| line.id == line_id) else {
            return false;
        };
        if quantity == 0 {
            self.lines.remove(index);
            return true;
        }
        let unit_price = self
            .catalog
            .get(self.lines[index].variant())
            .map_or(DEFAULT_UNIT_PRICE, |entry| entry.unit_price);
        let line = &mut self.lines[index];
        line.quantity = quantity;
        line.total_amount = Some(unit_price * i64::from(quantity));
        true
    }

    fn apply(&mut self, change: &CartLineChange) -> MutationOutcome {
        match change {
            CartLineChange::AddCartLine {
                merchandise_id,
                quantity,
            } => {
                let variant = strip_gid(merchandise_id).to_string();
                let Some(product) = self.catalog.get(&variant).map(|e| e.product_id.clone())
                else {
                    return MutationOutcome::Error {
                        message: format!("unknown merchandise {merchandise_id}"),
                    };
                };
                let existing = self
                    .lines
                    .iter()
                    .find(|line| line.variant() == variant)
                    .map(|line| (line.id.clone(), line.quantity));
                match existing {
                    Some((id, current)) => {
                        self.set_quantity(&id, current + quantity);
                    }
                    None => {
                        self.push_line(&product, &variant, *quantity);
                    }
                }
                MutationOutcome::Success
            }
            CartLineChange::UpdateCartLine { id, quantity, .. } => {
                if self.set_quantity(id, *quantity) {
                    MutationOutcome::Success
                } else {
                    MutationOutcome::Error {
                        message: format!("no line {id}"),
                    }
                }
            }
            CartLineChange::RemoveCartLine { id, quantity } => {
                let remaining = self
                    .lines
                    .iter()
                    .find(|line| &line.id == id)
                    .map(|line| line.quantity.saturating_sub(*quantity));
                match remaining {
                    Some(remaining) => {
                        self.set_quantity(id, remaining);
                        MutationOutcome::Success
                    }
                    None => MutationOutcome::Error {
                        message: format!("no line {id}"),
                    },
                }
            }
        }
    }
}

/// Cart held in memory; every change is broadcast to line subscribers.
///
/// Buyer-side helpers (`add_line`, `set_quantity`, `remove_line`) act like the
/// shopper editing the cart. `add_line` always appends a new line, while an
/// `AddCartLine` mutation merges into an existing line of the same variant.
pub struct InMemoryCart {
    state: Mutex<CartState>,
    lines_tx: broadcast::Sender<Vec<CartLine>>,
    token: String,
    currency: String,
}

impl InMemoryCart {
    /// Empty USD cart with an empty catalog.
    pub fn new() -> Self {
        let (lines_tx, _) = broadcast::channel(64);
        Self {
            state: Mutex::new(CartState::default()),
            lines_tx,
            token: uuid::Uuid::new_v4().simple().to_string(),
            currency: "USD".to_string(),
        }
    }

    fn state(&self) -> MutexGuard<'_, CartState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, lines: Vec<CartLine>) {
        let _ = self.lines_tx.send(lines);
    }

    /// Make a variant known, so mutations can add it.
    pub fn register_variant(&self, product: &str, variant: &str, title: &str, unit_price: i64) {
        self.state().catalog.insert(
            variant.to_string(),
            CatalogEntry {
                product_id: product.to_string(),
                title: title.to_string(),
                unit_price,
            },
        );
    }

    /// Buyer adds merchandise; returns the new line id.
    pub fn add_line(&self, product: &str, variant: &str, quantity: u32) -> String {
        let (id, lines) = {
            let mut state = self.state();
            let id = state.push_line(product, variant, quantity);
            (id, state.lines.clone())
        };
        self.notify(lines);
        id
    }

    /// Buyer changes a line's quantity; zero removes it.
    pub fn set_quantity(&self, line_id: &str, quantity: u32) -> bool {
        let (changed, lines) = {
            let mut state = self.state();
            (state.set_quantity(line_id, quantity), state.lines.clone())
        };
        if changed {
            self.notify(lines);
        }
        changed
    }

    /// Buyer removes a line.
    pub fn remove_line(&self, line_id: &str) -> bool {
        self.set_quantity(line_id, 0)
    }

    /// Find a line by its numeric variant id.
    pub fn line_for_variant(&self, variant: &str) -> Option<CartLine> {
        self.state()
            .lines
            .iter()
            .find(|line| line.variant() == variant)
            .cloned()
    }

    /// The next mutation is answered with an error outcome.
    pub fn fail_next_mutation(&self, message: impl Into<String>) {
        self.state()
            .failures
            .push_back(InjectedFailure::Rejected(message.into()));
    }

    /// The next mutation call itself fails.
    pub fn break_next_mutation(&self, message: impl Into<String>) {
        self.state()
            .failures
            .push_back(InjectedFailure::Unavailable(message.into()));
    }

    /// Make attribute writes fail.
    pub fn fail_attributes(&self, fail: bool) {
        self.state().fail_attributes = fail;
    }

    /// Live lines.
    pub fn lines(&self) -> Vec<CartLine> {
        self.state().lines.clone()
    }

    /// Every mutation requested through the gateway, in order.
    pub fn mutations(&self) -> Vec<CartLineChange> {
        self.state().mutations.clone()
    }

    /// Cart attribute value.
    pub fn attribute(&self, key: &str) -> Option<String> {
        self.state().attributes.get(key).cloned()
    }

    /// All cart attributes.
    pub fn attributes(&self) -> BTreeMap<String, String> {
        self.state().attributes.clone()
    }
}

impl Default for InMemoryCart {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CartGateway for InMemoryCart {
    fn current_lines(&self) -> Vec<CartLine> {
        self.lines()
    }

    fn subscribe_lines(&self) -> broadcast::Receiver<Vec<CartLine>> {
        self.lines_tx.subscribe()
    }

    async fn build_cart_summary(&self) -> DomainResult<CartSummary> {
        let state = self.state();
        let items = state
            .lines
            .iter()
            .map(|line| {
                let entry = state.catalog.get(line.variant());
                let price = entry.map_or(DEFAULT_UNIT_PRICE, |e| e.unit_price);
                CartItem {
                    id: line.id.clone(),
                    quantity: line.quantity,
                    variant_id: line.variant().to_string(),
                    product_id: line.product().to_string(),
                    title: entry.map_or_else(|| format!("Product {}", line.product()), |e| e.title.clone()),
                    price,
                    line_price: line.total_amount.unwrap_or(price * i64::from(line.quantity)),
                    sku: None,
                    requires_shipping: true,
                }
            })
            .collect();
        Ok(CartSummary {
            items,
            token: self.token.clone(),
            currency: self.currency.clone(),
        })
    }

    async fn apply_change(&self, change: CartLineChange) -> DomainResult<MutationOutcome> {
        let (outcome, lines) = {
            let mut state = self.state();
            state.mutations.push(change.clone());
            match state.failures.pop_front() {
                Some(InjectedFailure::Unavailable(message)) => {
                    return Err(DomainError::collaborator(change.operation().to_string(), message));
                }
                Some(InjectedFailure::Rejected(message)) => {
                    return Ok(MutationOutcome::Error { message });
                }
                None => {}
            }
            let outcome = state.apply(&change);
            (outcome, state.lines.clone())
        };
        if outcome.is_success() {
            self.notify(lines);
        }
        Ok(outcome)
    }

    async fn set_attribute(&self, key: &str, value: &str) -> DomainResult<()> {
        let mut state = self.state();
        if state.fail_attributes {
            return Err(DomainError::collaborator("set_attribute", "attributes unavailable"));
        }
        state.attributes.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_buyer_edits_are_broadcast() {
        let cart = InMemoryCart::new();
        let mut rx = cart.subscribe_lines();
        let id = cart.add_line("10", "100", 2);
        assert_eq!(rx.recv().await.unwrap().len(), 1);

        assert!(cart.set_quantity(&id, 5));
        assert_eq!(rx.recv().await.unwrap()[0].quantity, 5);

        assert!(cart.remove_line(&id));
        assert!(rx.recv().await.unwrap().is_empty());
        assert!(!cart.remove_line(&id));
    }

    #[tokio::test]
    async fn test_add_merges_into_existing_variant() {
        let cart = InMemoryCart::new();
        cart.register_variant("500", "501", "Return assurance", 199);
        let add = CartLineChange::AddCartLine {
            merchandise_id: "gid://shopify/ProductVariant/501".to_string(),
            quantity: 1,
        };
        cart.apply_change(add.clone()).await.unwrap();
        cart.apply_change(add).await.unwrap();
        let lines = cart.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 2);
        assert_eq!(lines[0].total_amount, Some(398));
    }

    #[tokio::test]
    async fn test_unknown_merchandise_is_rejected() {
        let cart = InMemoryCart::new();
        let outcome = cart
            .apply_change(CartLineChange::AddCartLine {
                merchandise_id: "gid://shopify/ProductVariant/1".to_string(),
                quantity: 1,
            })
            .await
            .unwrap();
        assert!(!outcome.is_success());
    }

    #[tokio::test]
    async fn test_injected_failures_are_consumed_in_order() {
        let cart = InMemoryCart::new();
        let id = cart.add_line("10", "100", 1);
        cart.fail_next_mutation("rejected");
        cart.break_next_mutation("offline");
        let remove = CartLineChange::RemoveCartLine {
            id: id.clone(),
            quantity: 1,
        };

        let first = cart.apply_change(remove.clone()).await.unwrap();
        assert_eq!(first, MutationOutcome::Error { message: "rejected".to_string() });
        assert!(cart.apply_change(remove.clone()).await.is_err());
        assert!(cart.apply_change(remove).await.unwrap().is_success());
        assert!(cart.lines().is_empty());
        assert_eq!(cart.mutations().len(), 3);
    }

    #[tokio::test]
    async fn test_summary_uses_numeric_ids() {
        let cart = InMemoryCart::new();
        cart.register_variant("10", "100", "Jacket", 12_000);
        cart.add_line("10", "100", 2);
        let summary = cart.build_cart_summary().await.unwrap();
        assert_eq!(summary.items[0].product_id, "10");
        assert_eq!(summary.items[0].line_price, 24_000);
        assert_eq!(summary.currency, "USD");
    }
}
