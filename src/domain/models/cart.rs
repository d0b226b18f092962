//! Cart lines, briefs and mutation requests.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

const VARIANT_GID_PREFIX: &str = "gid://shopify/ProductVariant/";

/// Return the trailing id segment of a global id (`gid://shopify/Product/42` → `42`).
///
/// Plain ids pass through unchanged.
pub fn strip_gid(gid: &str) -> &str {
    gid.rsplit('/').next().unwrap_or(gid)
}

/// Build the variant global id used when adding a line.
pub fn variant_gid(variant_id: &str) -> String {
    format!("{VARIANT_GID_PREFIX}{}", strip_gid(variant_id))
}

/// One line of the buyer's live cart, as reported by the host checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Line id (global id).
    pub id: String,
    /// Merchandise variant id (global id).
    pub variant_id: String,
    /// Product id of the merchandise (global id).
    pub product_id: String,
    /// Units on the line.
    pub quantity: u32,
    /// Line total in minor units, when the host reports one.
    #[serde(default)]
    pub total_amount: Option<i64>,
}

impl CartLine {
    /// Line without a reported total.
    pub fn new(
        id: impl Into<String>,
        product_id: impl Into<String>,
        variant_id: impl Into<String>,
        quantity: u32,
    ) -> Self {
        Self {
            id: id.into(),
            variant_id: variant_id.into(),
            product_id: product_id.into(),
            quantity,
            total_amount: None,
        }
    }

    /// Numeric product id.
    pub fn product(&self) -> &str {
        strip_gid(&self.product_id)
    }

    /// Numeric variant id.
    pub fn variant(&self) -> &str {
        strip_gid(&self.variant_id)
    }

    /// Brief key of this line.
    pub fn key(&self) -> LineKey {
        LineKey::new(self.product(), self.variant())
    }
}

/// Brief key: `"{productId}__{variantId}"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineKey(String);

impl LineKey {
    const SEPARATOR: &'static str = "__";

    /// Key for a product/variant pair; global ids are stripped.
    pub fn new(product_id: &str, variant_id: &str) -> Self {
        Self(format!(
            "{}{}{}",
            strip_gid(product_id),
            Self::SEPARATOR,
            strip_gid(variant_id)
        ))
    }

    /// Product part of the key.
    pub fn product_id(&self) -> &str {
        self.0
            .split_once(Self::SEPARATOR)
            .map_or(self.0.as_str(), |(product, _)| product)
    }

    /// Raw key text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Aggregated quantity per line key, used purely for change detection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinesBrief(BTreeMap<LineKey, u32>);

impl LinesBrief {
    /// Summarise live lines; lines sharing a key have their quantities summed.
    pub fn from_lines(lines: &[CartLine]) -> Self {
        let mut brief = BTreeMap::new();
        for line in lines {
            *brief.entry(line.key()).or_insert(0) += line.quantity;
        }
        Self(brief)
    }

    /// Quantity recorded for `key`.
    pub fn get(&self, key: &LineKey) -> Option<u32> {
        self.0.get(key).copied()
    }

    /// Whether `key` is present.
    pub fn contains(&self, key: &LineKey) -> bool {
        self.0.contains_key(key)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the cart had no lines.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Keys with their quantities, in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&LineKey, u32)> {
        self.0.iter().map(|(k, v)| (k, *v))
    }

    /// Key-set diff of `next` against `self`.
    pub fn diff(&self, next: &Self) -> BriefDiff {
        let mut diff = BriefDiff::default();
        for (key, qty) in next.iter() {
            match self.get(key) {
                None => {
                    diff.added.insert(key.clone(), qty);
                }
                Some(prev) if prev != qty => {
                    diff.updated.insert(key.clone(), qty);
                }
                Some(_) => {}
            }
        }
        for (key, qty) in self.iter() {
            if !next.contains(key) {
                diff.removed.insert(key.clone(), qty);
            }
        }
        diff
    }
}

/// Result of diffing two briefs.
///
/// `added`/`updated` carry the new quantity, `removed` the last seen one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BriefDiff {
    /// Keys only in the new brief.
    pub added: BTreeMap<LineKey, u32>,
    /// Keys only in the old brief.
    pub removed: BTreeMap<LineKey, u32>,
    /// Keys in both with a changed quantity.
    pub updated: BTreeMap<LineKey, u32>,
}

impl BriefDiff {
    /// True when nothing changed.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.updated.is_empty()
    }

    /// Every key touched by the diff.
    pub fn keys(&self) -> impl Iterator<Item = &LineKey> {
        self.added
            .keys()
            .chain(self.removed.keys())
            .chain(self.updated.keys())
    }
}

/// An item of the cart summary sent to the quote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Line id.
    pub id: String,
    /// Units on the line.
    pub quantity: u32,
    /// Numeric variant id.
    pub variant_id: String,
    /// Numeric product id.
    pub product_id: String,
    /// Merchandise title.
    pub title: String,
    /// Unit price in minor units.
    pub price: i64,
    /// Line price in minor units.
    pub line_price: i64,
    /// Stock keeping unit, if the merchandise has one.
    #[serde(default)]
    pub sku: Option<String>,
    /// Whether the merchandise ships.
    #[serde(default)]
    pub requires_shipping: bool,
}

/// Point-in-time summary of the buyer's cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSummary {
    /// One item per live line.
    pub items: Vec<CartItem>,
    /// Cart token from the host.
    pub token: String,
    /// ISO currency code.
    pub currency: String,
}

/// Kind of cart line mutation, named as the host reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CartOperation {
    /// New line.
    AddCartLine,
    /// Quantity change on an existing line.
    UpdateCartLine,
    /// Line removal.
    RemoveCartLine,
}

impl fmt::Display for CartOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AddCartLine => "addCartLine",
            Self::UpdateCartLine => "updateCartLine",
            Self::RemoveCartLine => "removeCartLine",
        })
    }
}

/// Cart line mutation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CartLineChange {
    /// Add units of a variant.
    #[serde(rename_all = "camelCase")]
    AddCartLine {
        /// Variant global id.
        merchandise_id: String,
        /// Units to add.
        quantity: u32,
    },
    /// Set the quantity of an existing line.
    #[serde(rename_all = "camelCase")]
    UpdateCartLine {
        /// Line id.
        id: String,
        /// Variant global id.
        merchandise_id: String,
        /// New quantity.
        quantity: u32,
    },
    /// Remove units from a line.
    RemoveCartLine {
        /// Line id.
        id: String,
        /// Units to remove.
        quantity: u32,
    },
}

impl CartLineChange {
    /// Operation kind of this request.
    pub const fn operation(&self) -> CartOperation {
        match self {
            Self::AddCartLine { .. } => CartOperation::AddCartLine,
            Self::UpdateCartLine { .. } => CartOperation::UpdateCartLine,
            Self::RemoveCartLine { .. } => CartOperation::RemoveCartLine,
        }
    }
}

/// Outcome reported by the host for a cart mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MutationOutcome {
    /// Applied.
    Success,
    /// Rejected by the host.
    Error {
        /// Host message.
        message: String,
    },
}

impl MutationOutcome {
    /// Whether the host applied the mutation.
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: &str, product: &str, variant: &str, qty: u32) -> CartLine {
        CartLine::new(
            format!("gid://shopify/CartLine/{id}"),
            format!("gid://shopify/Product/{product}"),
            format!("gid://shopify/ProductVariant/{variant}"),
            qty,
        )
    }

    #[test]
    fn test_strip_gid() {
        assert_eq!(strip_gid("gid://shopify/ProductVariant/123"), "123");
        assert_eq!(strip_gid("123"), "123");
        assert_eq!(variant_gid("77"), "gid://shopify/ProductVariant/77");
        assert_eq!(variant_gid("gid://shopify/ProductVariant/77"), "gid://shopify/ProductVariant/77");
    }

    #[test]
    fn test_line_key_product_id() {
        let key = line("1", "10", "100", 1).key();
        assert_eq!(key.as_str(), "10__100");
        assert_eq!(key.product_id(), "10");
    }

    #[test]
    fn test_brief_sums_same_variant() {
        let brief = LinesBrief::from_lines(&[line("1", "10", "100", 2), line("2", "10", "100", 3)]);
        assert_eq!(brief.len(), 1);
        assert_eq!(brief.get(&LineKey::new("10", "100")), Some(5));
    }

    #[test]
    fn test_diff_classifies_keys() {
        let old = LinesBrief::from_lines(&[line("1", "10", "100", 1), line("2", "20", "200", 1)]);
        let new = LinesBrief::from_lines(&[line("1", "10", "100", 4), line("3", "30", "300", 1)]);
        let diff = old.diff(&new);
        assert_eq!(diff.added.get(&LineKey::new("30", "300")), Some(&1));
        assert_eq!(diff.removed.get(&LineKey::new("20", "200")), Some(&1));
        assert_eq!(diff.updated.get(&LineKey::new("10", "100")), Some(&4));
        assert_eq!(diff.keys().count(), 3);
    }

    #[test]
    fn test_identical_briefs_have_empty_diff() {
        let brief = LinesBrief::from_lines(&[line("1", "10", "100", 1)]);
        assert!(brief.diff(&brief.clone()).is_empty());
        assert!(LinesBrief::default().diff(&LinesBrief::default()).is_empty());
    }

    #[test]
    fn test_cart_line_change_serde_shape() {
        let change = CartLineChange::AddCartLine {
            merchandise_id: variant_gid("5"),
            quantity: 1,
        };
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["type"], "addCartLine");
        assert_eq!(json["merchandiseId"], "gid://shopify/ProductVariant/5");
        assert_eq!(change.operation(), CartOperation::AddCartLine);
    }
}
