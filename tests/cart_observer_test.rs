//! Reactions to cart edits and checkbox toggles once the widget is running.

mod common;

use std::time::Duration;

use cartguard::domain::models::{PhaseTransition, RestartPoint, WidgetPhase};
use cartguard::services::{WidgetEvent, WidgetEventPayload, WidgetHandle};
use common::{quote, settle, wait_for_phase, Harness, INSURANCE_VARIANT};
use tokio::sync::broadcast;

fn restarts(events: &[WidgetEvent]) -> Vec<WidgetPhase> {
    events
        .iter()
        .filter_map(|event| match &event.payload {
            WidgetEventPayload::PhaseChanged {
                to,
                transition: PhaseTransition::Restart,
                ..
            } => Some(*to),
            _ => None,
        })
        .collect()
}

/// A widget that has reached `Completion` and gone quiet.
async fn running(default_opt: bool) -> (Harness, WidgetHandle, broadcast::Receiver<WidgetEvent>) {
    let harness = Harness::active(default_opt);
    let (handle, mut events) = harness.spawn();
    assert!(wait_for_phase(handle.store(), WidgetPhase::Completion).await);
    settle(&mut events, 100).await;
    (harness, handle, events)
}

#[tokio::test]
async fn test_unrelated_line_requotes() {
    let (harness, handle, mut events) = running(true).await;

    harness.cart.add_line("20", "200", 2);
    let events = settle(&mut events, 100).await;

    assert_eq!(restarts(&events), vec![WidgetPhase::Processing]);
    assert!(events.iter().any(|event| matches!(
        event.payload,
        WidgetEventPayload::CartMutationCaptured {
            restart: Some(RestartPoint::Processing),
            ..
        }
    )));
    assert_eq!(handle.store().phase(), Some(WidgetPhase::Completion));

    let requests = harness.quotes.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].cart.items.len(), 3);

    // Same quote, nothing to reconcile and the widget is refreshed in place.
    assert_eq!(harness.insurance_lines().len(), 1);
    assert_eq!(harness.surface.render_count(), 1);
    assert!(!harness.surface.widget().unwrap().disabled);

    handle.dispose().await;
}

#[tokio::test]
async fn test_removing_unrelated_line_requotes() {
    let (harness, handle, mut events) = running(false).await;

    let id = harness.cart.lines()[0].id.clone();
    assert!(harness.cart.remove_line(&id));
    let events = settle(&mut events, 100).await;

    assert_eq!(restarts(&events), vec![WidgetPhase::Processing]);
    assert_eq!(harness.quotes.requests().len(), 2);
    assert!(harness.quotes.requests()[1].cart.items.is_empty());

    handle.dispose().await;
}

#[tokio::test]
async fn test_own_line_quantity_change_recarts() {
    let (harness, handle, mut events) = running(true).await;

    let own = harness.insurance_lines().remove(0);
    assert!(harness.cart.set_quantity(&own.id, 3));
    let events = settle(&mut events, 100).await;

    assert_eq!(restarts(&events), vec![WidgetPhase::Carting]);
    assert_eq!(harness.quotes.requests().len(), 1);

    let lines = harness.insurance_lines();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].quantity, 1);
    assert_eq!(lines[0].id, own.id);
    assert!(harness.surface.widget().unwrap().checked);

    handle.dispose().await;
}

#[tokio::test]
async fn test_own_mutations_do_not_loop() {
    let harness = Harness::active(true);
    let (handle, mut events) = harness.spawn();
    assert!(wait_for_phase(handle.store(), WidgetPhase::Completion).await);
    let events = settle(&mut events, 150).await;

    assert!(restarts(&events).is_empty());
    let captured: Vec<_> = events
        .iter()
        .filter_map(|event| match &event.payload {
            WidgetEventPayload::CartMutationCaptured { restart, .. } => Some(*restart),
            _ => None,
        })
        .collect();
    assert_eq!(captured, vec![None]);
    assert!(handle.store().snapshot().await.self_mutations.is_empty());
    assert_eq!(harness.cart.mutations().len(), 1);

    handle.dispose().await;
}

#[tokio::test]
async fn test_new_quote_variant_replaces_line() {
    let (harness, handle, mut events) = running(true).await;

    harness.quotes.set_quote(Some(quote("quote-2", "9002")));
    harness.cart.add_line("20", "200", 1);
    let events = settle(&mut events, 150).await;

    assert_eq!(restarts(&events), vec![WidgetPhase::Processing]);
    let lines = harness.insurance_lines();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].variant(), "9002");
    assert_eq!(harness.cart.attribute("ra_quote_id").as_deref(), Some("quote-2"));

    handle.dispose().await;
}

#[tokio::test]
async fn test_quote_withdrawn_removes_line_and_widget() {
    let (harness, handle, mut events) = running(true).await;

    harness.quotes.set_quote(None);
    harness.cart.add_line("20", "200", 1);
    settle(&mut events, 150).await;

    // The sticky product still identifies the stale line.
    assert!(harness.insurance_lines().is_empty());
    assert!(harness.surface.widget().is_none());
    assert_eq!(handle.store().phase(), Some(WidgetPhase::Completion));

    handle.dispose().await;
}

#[tokio::test]
async fn test_toggle_off_removes_line() {
    let (harness, handle, mut events) = running(true).await;

    assert!(harness.surface.click(false));
    let events = settle(&mut events, 150).await;

    assert!(events.iter().any(|event| matches!(
        event.payload,
        WidgetEventPayload::CheckboxToggled {
            requested: false,
            effective: false
        }
    )));
    // The buyer's own removal re-validates the cart against the new choice.
    assert_eq!(restarts(&events), vec![WidgetPhase::Carting]);
    assert!(harness.insurance_lines().is_empty());

    let widget = harness.surface.widget().unwrap();
    assert!(!widget.checked);
    assert!(!widget.disabled);
    assert!(!handle.store().snapshot().await.current_widget_status);
    assert_eq!(harness.cart.attribute("ra-checked").as_deref(), Some("false"));

    handle.dispose().await;
}

#[tokio::test]
async fn test_toggle_on_adds_line() {
    let (harness, handle, mut events) = running(false).await;

    handle.toggle_checkbox(true).await.unwrap();
    settle(&mut events, 150).await;

    let lines = harness.insurance_lines();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].variant(), INSURANCE_VARIANT);
    assert_eq!(lines[0].quantity, 1);
    assert!(harness.surface.widget().unwrap().checked);
    assert_eq!(harness.cart.attribute("ra-checked").as_deref(), Some("true"));

    handle.dispose().await;
}

#[tokio::test]
async fn test_failed_toggle_reverts_checkbox() {
    let (harness, handle, mut events) = running(true).await;

    harness.cart.fail_next_mutation("line locked");
    assert!(harness.surface.click(false));
    let events = settle(&mut events, 150).await;

    assert!(events.iter().any(|event| matches!(
        event.payload,
        WidgetEventPayload::CheckboxToggled {
            requested: false,
            effective: true
        }
    )));
    assert!(restarts(&events).is_empty());
    assert_eq!(harness.insurance_lines().len(), 1);
    let widget = harness.surface.widget().unwrap();
    assert!(widget.checked);
    assert!(!widget.disabled);

    handle.dispose().await;
}

#[tokio::test]
async fn test_restart_discards_in_flight_quote() {
    let harness = Harness::active(true);
    harness.quotes.set_latency(Some(Duration::from_millis(200)));
    let (handle, mut events) = harness.spawn();

    assert!(wait_for_phase(handle.store(), WidgetPhase::Quoting).await);
    harness.cart.add_line("20", "200", 1);
    assert!(wait_for_phase(handle.store(), WidgetPhase::Completion).await);
    let events = settle(&mut events, 100).await;

    assert!(events.iter().any(|event| matches!(
        event.payload,
        WidgetEventPayload::PhaseOutcomeDiscarded {
            phase: WidgetPhase::Quoting
        }
    )));
    assert_eq!(restarts(&events), vec![WidgetPhase::Processing]);
    assert_eq!(harness.quotes.requests().len(), 2);
    assert_eq!(harness.quotes.requests()[1].cart.items.len(), 2);
    assert_eq!(harness.insurance_lines().len(), 1);

    handle.dispose().await;
}

#[tokio::test]
async fn test_disposed_widget_ignores_cart() {
    let (harness, handle, _events) = running(true).await;
    let store = handle.store().clone();

    handle.dispose().await;
    harness.cart.add_line("20", "200", 1);
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(store.phase(), Some(WidgetPhase::Completion));
    assert_eq!(harness.quotes.requests().len(), 1);
}
