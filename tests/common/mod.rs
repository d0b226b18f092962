//! Shared helpers for integration tests.

use std::sync::Arc;
use std::time::Duration;

use cartguard::adapters::memory::{
    InMemoryCart, InMemorySessionStorage, RecordingSurface, StaticQuoteService,
};
use cartguard::domain::models::{
    AdvisoryConfig, InsuranceType, MerchantConfig, MerchantStatus, Quote, QuoteStatus,
    RuntimeConfig, WidgetConfig, WidgetPhase,
};
use cartguard::services::{
    AdvisoryChannel, SnapshotStore, WidgetCollaborators, WidgetEvent, WidgetEventPayload,
    WidgetHandle, WidgetRuntime,
};
use tokio::sync::broadcast;

#[allow(dead_code)]
pub const INSURANCE_PRODUCT: &str = "9000";
#[allow(dead_code)]
pub const INSURANCE_VARIANT: &str = "9001";

/// Setup test logging
#[allow(dead_code)]
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

#[allow(dead_code)]
pub fn quote(id: &str, variant: &str) -> Quote {
    Quote {
        quote_id: id.to_string(),
        variant_id: variant.to_string(),
        product_id: INSURANCE_PRODUCT.to_string(),
        price: 1.99,
        value: 80.0,
        currency_code: "USD".to_string(),
        status: QuoteStatus::Accepted,
    }
}

#[allow(dead_code)]
pub fn merchant(status: MerchantStatus, default_opt: bool) -> MerchantConfig {
    MerchantConfig {
        status,
        default_opt,
        return_config: None,
    }
}

/// In-memory checkout with one widget wired to it.
#[allow(dead_code)]
pub struct Harness {
    pub cart: Arc<InMemoryCart>,
    pub quotes: Arc<StaticQuoteService>,
    pub storage: Arc<InMemorySessionStorage>,
    pub surface: Arc<RecordingSurface>,
}

#[allow(dead_code)]
impl Harness {
    /// Checkout whose quote service serves `merchant` and a quote for the
    /// default insurance variant. The buyer already has one unrelated line.
    pub fn new(merchant: Option<MerchantConfig>) -> Self {
        let cart = Arc::new(InMemoryCart::new());
        cart.register_variant(INSURANCE_PRODUCT, INSURANCE_VARIANT, "Return assurance", 199);
        cart.register_variant(INSURANCE_PRODUCT, "9002", "Return assurance plus", 299);
        cart.add_line("10", "100", 1);

        Self {
            cart,
            quotes: Arc::new(
                StaticQuoteService::new(merchant).with_quote(quote("quote-1", INSURANCE_VARIANT)),
            ),
            storage: Arc::new(InMemorySessionStorage::new()),
            surface: Arc::new(RecordingSurface::new()),
        }
    }

    pub fn active(default_opt: bool) -> Self {
        Self::new(Some(merchant(MerchantStatus::Active, default_opt)))
    }

    pub fn collaborators(&self) -> WidgetCollaborators {
        WidgetCollaborators {
            quotes: self.quotes.clone(),
            cart: self.cart.clone(),
            storage: self.storage.clone(),
            surface: self.surface.clone(),
        }
    }

    /// Spawn the widget, returning its handle and an event stream that
    /// starts at `Init`.
    pub fn spawn(&self) -> (WidgetHandle, broadcast::Receiver<WidgetEvent>) {
        let runtime = WidgetRuntime::new(
            WidgetConfig::new("return-assurance", InsuranceType::Ra),
            self.collaborators(),
            AdvisoryChannel::new(&AdvisoryConfig::default()),
            &RuntimeConfig::default(),
        );
        let events = runtime.events();
        (runtime.spawn(), events)
    }

    /// Lines of the insurance product currently in the cart.
    pub fn insurance_lines(&self) -> Vec<cartguard::domain::models::CartLine> {
        self.cart
            .lines()
            .into_iter()
            .filter(|line| line.product() == INSURANCE_PRODUCT)
            .collect()
    }
}

/// Wait until the store reports `phase`.
#[allow(dead_code)]
pub async fn wait_for_phase(store: &SnapshotStore, phase: WidgetPhase) -> bool {
    let mut rx = store.subscribe_phase();
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if *rx.borrow_and_update() == Some(phase) {
                return true;
            }
            if rx.changed().await.is_err() {
                return false;
            }
        }
    })
    .await
    .unwrap_or(false)
}

/// Collect events until the widget has been silent for `quiet_ms`.
#[allow(dead_code)]
pub async fn settle(events: &mut broadcast::Receiver<WidgetEvent>, quiet_ms: u64) -> Vec<WidgetEvent> {
    let mut collected = Vec::new();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        match tokio::time::timeout(Duration::from_millis(quiet_ms), events.recv()).await {
            Ok(Ok(event)) => collected.push(event),
            Ok(Err(broadcast::error::RecvError::Lagged(_))) => {}
            Ok(Err(broadcast::error::RecvError::Closed)) | Err(_) => break,
        }
    }
    collected
}

/// Target phases of every `PhaseChanged` event, in order.
#[allow(dead_code)]
pub fn phase_changes(events: &[WidgetEvent]) -> Vec<WidgetPhase> {
    events
        .iter()
        .filter_map(|event| match &event.payload {
            WidgetEventPayload::PhaseChanged { to, .. } => Some(*to),
            _ => None,
        })
        .collect()
}
