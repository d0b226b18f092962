//! Cart diff observer.
//!
//! Turns a fresh list of live cart lines into an [`Observation`]: the new
//! brief, its diff against the previous one, and which restart point (if any)
//! the change calls for. Re-quoting takes precedence over re-carting; only one
//! restart point is chosen per observation.

use crate::domain::models::{
    BriefDiff, CartLine, LineKey, LinesBrief, RestartPoint, WidgetPhase, WidgetSnapshot,
};

/// Classified result of one cart observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    /// Brief of the observed lines.
    pub brief: LinesBrief,
    /// Change against the previous brief.
    pub diff: BriefDiff,
    /// Unrelated merchandise changed.
    pub should_update_quote: bool,
    /// This widget's own line changed.
    pub should_update_cart: bool,
    /// Own-product keys matched against reconciliation's own mutations and ignored.
    pub self_originated: Vec<LineKey>,
    /// Where the machine should restart, if anywhere.
    pub restart: Option<RestartPoint>,
}

impl Observation {
    /// The checkbox must be locked while the widget re-synchronises.
    pub const fn disables_checkbox(&self) -> bool {
        self.should_update_quote || self.should_update_cart
    }
}

/// Observe `lines` against the snapshot's last brief.
///
/// Replaces `snapshot.lines_brief` unconditionally and consumes self-mutation
/// tags for own-product keys. Restarts are withheld before the machine reaches
/// `Processing` and while the merchant has the product switched off.
pub fn observe(
    snapshot: &mut WidgetSnapshot,
    phase: Option<WidgetPhase>,
    lines: &[CartLine],
) -> Observation {
    let brief = LinesBrief::from_lines(lines);
    let diff = snapshot.lines_brief.diff(&brief);
    snapshot.lines_brief = brief.clone();

    let mut should_update_quote = false;
    let mut should_update_cart = false;
    let mut self_originated = Vec::new();

    let own_product = snapshot.own_product_id().map(str::to_owned);
    for key in diff.keys() {
        if own_product.as_deref() == Some(key.product_id()) {
            if snapshot.take_self_mutation(key) {
                self_originated.push(key.clone());
            } else {
                should_update_cart = true;
            }
        } else {
            should_update_quote = true;
        }
    }

    let restart = if snapshot.is_killed() || phase < Some(WidgetPhase::Processing) {
        None
    } else if should_update_quote {
        Some(RestartPoint::Processing)
    } else if should_update_cart && phase > Some(WidgetPhase::Carting) {
        Some(RestartPoint::Carting)
    } else {
        None
    };

    Observation {
        brief,
        diff,
        should_update_quote,
        should_update_cart,
        self_originated,
        restart,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{InsuranceType, MerchantConfig, MerchantStatus};

    const OWN_PRODUCT: &str = "9000";

    fn line(id: u32, product: &str, variant: &str, qty: u32) -> CartLine {
        CartLine::new(
            format!("gid://shopify/CartLine/{id}"),
            format!("gid://shopify/Product/{product}"),
            format!("gid://shopify/ProductVariant/{variant}"),
            qty,
        )
    }

    fn snapshot_with(lines: &[CartLine]) -> WidgetSnapshot {
        let mut snap = WidgetSnapshot::new("return-assurance", InsuranceType::Ra);
        snap.sticky_product_id = Some(OWN_PRODUCT.to_string());
        snap.lines_brief = LinesBrief::from_lines(lines);
        snap
    }

    #[test]
    fn test_unrelated_addition_requotes_from_any_started_phase() {
        let before = vec![line(1, "10", "100", 1)];
        let after = vec![line(1, "10", "100", 1), line(2, "20", "200", 1)];
        for phase in &WidgetPhase::ALL[2..] {
            let mut snap = snapshot_with(&before);
            let obs = observe(&mut snap, Some(*phase), &after);
            assert!(obs.should_update_quote);
            assert_eq!(obs.restart, Some(RestartPoint::Processing), "phase {phase}");
        }
    }

    #[test]
    fn test_own_line_quantity_change_recarts_after_carting() {
        let before = vec![line(1, "10", "100", 1), line(2, OWN_PRODUCT, "901", 1)];
        let after = vec![line(1, "10", "100", 1), line(2, OWN_PRODUCT, "901", 3)];

        let mut snap = snapshot_with(&before);
        let obs = observe(&mut snap, Some(WidgetPhase::Completion), &after);
        assert!(obs.should_update_cart);
        assert!(!obs.should_update_quote);
        assert_eq!(obs.restart, Some(RestartPoint::Carting));
        assert!(obs.disables_checkbox());

        let mut snap = snapshot_with(&before);
        let obs = observe(&mut snap, Some(WidgetPhase::Carting), &after);
        assert_eq!(obs.restart, None);
    }

    #[test]
    fn test_requote_wins_over_recart() {
        let before = vec![line(2, OWN_PRODUCT, "901", 1)];
        let after = vec![line(2, OWN_PRODUCT, "901", 2), line(3, "30", "300", 1)];
        let mut snap = snapshot_with(&before);
        let obs = observe(&mut snap, Some(WidgetPhase::Completion), &after);
        assert!(obs.should_update_cart && obs.should_update_quote);
        assert_eq!(obs.restart, Some(RestartPoint::Processing));
    }

    #[test]
    fn test_brief_is_replaced_even_without_changes() {
        let lines = vec![line(1, "10", "100", 2)];
        let mut snap = snapshot_with(&lines);
        let obs = observe(&mut snap, Some(WidgetPhase::Completion), &lines);
        assert!(obs.diff.is_empty());
        assert!(!obs.disables_checkbox());
        assert_eq!(obs.restart, None);
        assert_eq!(snap.lines_brief, LinesBrief::from_lines(&lines));

        let obs = observe(&mut snap, Some(WidgetPhase::Completion), &[]);
        assert_eq!(obs.diff.removed.len(), 1);
        assert!(snap.lines_brief.is_empty());
    }

    #[test]
    fn test_self_mutation_is_not_a_restart() {
        let before = vec![line(1, "10", "100", 1)];
        let after = vec![line(1, "10", "100", 1), line(2, OWN_PRODUCT, "901", 1)];
        let mut snap = snapshot_with(&before);
        snap.record_self_mutation(LineKey::new(OWN_PRODUCT, "901"));

        let obs = observe(&mut snap, Some(WidgetPhase::Rendering), &after);
        assert_eq!(obs.self_originated, vec![LineKey::new(OWN_PRODUCT, "901")]);
        assert!(!obs.should_update_cart);
        assert_eq!(obs.restart, None);
        assert!(snap.self_mutations.is_empty());
    }

    #[test]
    fn test_no_restart_before_processing_or_when_killed() {
        let after = vec![line(1, "10", "100", 1)];

        let mut snap = snapshot_with(&[]);
        let obs = observe(&mut snap, Some(WidgetPhase::Loading), &after);
        assert!(obs.should_update_quote);
        assert_eq!(obs.restart, None);

        let mut snap = snapshot_with(&[]);
        snap.merchant_config = Some(MerchantConfig {
            status: MerchantStatus::Void,
            default_opt: false,
            return_config: None,
        });
        let obs = observe(&mut snap, Some(WidgetPhase::Completion), &after);
        assert_eq!(obs.restart, None);
        assert_eq!(snap.lines_brief, LinesBrief::from_lines(&after));
    }

    #[test]
    fn test_without_known_product_everything_requotes() {
        let mut snap = WidgetSnapshot::new("w", InsuranceType::Sp);
        let obs = observe(&mut snap, Some(WidgetPhase::Completion), &[line(1, OWN_PRODUCT, "901", 1)]);
        assert!(obs.should_update_quote);
        assert!(!obs.should_update_cart);
    }
}
