//! Scripted quote service.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{InsuranceType, MerchantConfig, Quote, QuoteRequest};
use crate::domain::ports::QuoteService;

#[derive(Default)]
struct Script {
    config: Option<MerchantConfig>,
    /// Upcoming quotes; the last one keeps being served.
    quotes: VecDeque<Option<Quote>>,
    fail_config: bool,
    fail_quotes: usize,
    latency: Option<Duration>,
    requests: Vec<QuoteRequest>,
}

/// Quote service answering from a script.
pub struct StaticQuoteService {
    script: Mutex<Script>,
    config_calls: AtomicUsize,
}

impl StaticQuoteService {
    /// Service answering config requests with `config` and offering no quote.
    pub fn new(config: Option<MerchantConfig>) -> Self {
        Self {
            script: Mutex::new(Script {
                config,
                ..Script::default()
            }),
            config_calls: AtomicUsize::new(0),
        }
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Serve `quote` from now on.
    #[must_use]
    pub fn with_quote(self, quote: Quote) -> Self {
        self.push_quote(Some(quote));
        self
    }

    /// Queue an answer behind the ones already scripted.
    pub fn push_quote(&self, quote: Option<Quote>) {
        self.script().quotes.push_back(quote);
    }

    /// Replace every scripted answer with `quote`.
    pub fn set_quote(&self, quote: Option<Quote>) {
        let mut script = self.script();
        script.quotes.clear();
        script.quotes.push_back(quote);
    }

    /// Replace the merchant config.
    pub fn set_config(&self, config: Option<MerchantConfig>) {
        self.script().config = config;
    }

    /// Make config requests fail.
    pub fn fail_config(&self, fail: bool) {
        self.script().fail_config = fail;
    }

    /// Fail the next `count` quote requests.
    pub fn fail_quotes(&self, count: usize) {
        self.script().fail_quotes = count;
    }

    /// Delay every quote response.
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.script().latency = latency;
    }

    /// Config requests received so far.
    pub fn config_calls(&self) -> usize {
        self.config_calls.load(Ordering::SeqCst)
    }

    /// Quote requests received so far.
    pub fn requests(&self) -> Vec<QuoteRequest> {
        self.script().requests.clone()
    }
}

#[async_trait]
impl QuoteService for StaticQuoteService {
    async fn fetch_merchant_config(
        &self,
        _insurance_type: InsuranceType,
    ) -> DomainResult<Option<MerchantConfig>> {
        self.config_calls.fetch_add(1, Ordering::SeqCst);
        let script = self.script();
        if script.fail_config {
            return Err(DomainError::collaborator(
                "fetch_merchant_config",
                "merchant service unavailable",
            ));
        }
        Ok(script.config.clone())
    }

    async fn fetch_quote(&self, request: &QuoteRequest) -> DomainResult<Option<Quote>> {
        let latency = self.script().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut script = self.script();
        script.requests.push(request.clone());
        if script.fail_quotes > 0 {
            script.fail_quotes -= 1;
            return Err(DomainError::collaborator("fetch_quote", "quote service unavailable"));
        }
        let quote = if script.quotes.len() > 1 {
            script.quotes.pop_front().flatten()
        } else {
            script.quotes.front().cloned().flatten()
        };
        Ok(quote)
    }
}
