// src/fetch/mod.rs
//! Resilient JSON fetching: one logical call, several transport strategies
//! tried strictly in order, each bounded by its own timer.

pub mod strategy;

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde_json::Value;
use std::{sync::Arc, time::Duration};
use url::Url;

use crate::error::{AttemptRecord, CompositeFailure, FetchError};
use crate::params::QueryParams;
pub use strategy::{Direct, PublicRelay, SameOriginRelay, Strategy};

/// Budget for strategies that do not declare their own.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Names and help text for every counter this crate emits.
pub(crate) fn describe_metrics() {
    describe_counter!(
        "vod_strategy_failures_total",
        "Strategy attempts that failed (transport, timeout, status, parse)."
    );
    describe_counter!(
        "vod_fetch_success_total",
        "Logical calls answered by some strategy."
    );
    describe_counter!(
        "vod_source_failures_total",
        "Sources that contributed nothing to an aggregate query."
    );
}

/// One-time metrics registration.
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(describe_metrics);
}

/// Successful payload plus the attempt trail that produced it (last entry is the success).
#[derive(Debug, Clone)]
pub struct Traced {
    pub value: Value,
    pub attempts: Vec<AttemptRecord>,
}

pub struct ResilientFetchClient {
    strategies: Vec<Arc<dyn Strategy>>,
    default_timeout: Duration,
}

impl ResilientFetchClient {
    pub fn new(strategies: Vec<Arc<dyn Strategy>>) -> Self {
        Self {
            strategies,
            default_timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Fetch `base_url` + `params` as JSON. `label` names the source in logs
    /// and in the failure message.
    pub async fn fetch_json(
        &self,
        label: &str,
        base_url: &Url,
        params: &QueryParams,
    ) -> Result<Value, CompositeFailure> {
        self.fetch_json_traced(label, base_url, params)
            .await
            .map(|t| t.value)
    }

    pub async fn fetch_json_traced(
        &self,
        label: &str,
        base_url: &Url,
        params: &QueryParams,
    ) -> Result<Traced, CompositeFailure> {
        ensure_metrics_described();

        let target = params.apply_to(base_url);
        let mut attempts = Vec::with_capacity(self.strategies.len());

        for strategy in &self.strategies {
            let name = strategy.name();
            let budget = strategy.timeout().unwrap_or(self.default_timeout);
            tracing::debug!(source = label, strategy = name, url = %target, "attempt");

            // Dropping the timed-out future aborts the request and its timer.
            let error = match tokio::time::timeout(budget, strategy.fetch(&target)).await {
                Ok(Ok(value)) => {
                    attempts.push(AttemptRecord::success(name));
                    counter!("vod_fetch_success_total", "strategy" => name).increment(1);
                    return Ok(Traced { value, attempts });
                }
                Ok(Err(FetchError::Timeout { .. })) | Err(_) => FetchError::Timeout {
                    after_ms: budget.as_millis() as u64,
                },
                Ok(Err(e)) => e,
            };

            tracing::warn!(source = label, strategy = name, error = %error, "strategy failed");
            counter!("vod_strategy_failures_total", "strategy" => name).increment(1);
            attempts.push(AttemptRecord::failed(name, error));
        }

        Err(CompositeFailure::new(label, attempts))
    }
}
