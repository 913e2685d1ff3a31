// tests/metrics_fetch.rs
//
// One test per binary: the recorder is process-wide and installs once.
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use vod_relay_client::metrics::Metrics;
use vod_relay_client::{
    FetchError, QueryParams, ResilientFetchClient, SourceAggregator, SourceConfig,
    SourceRegistry, Strategy,
};

/// Fails for hosts starting with "down", answers one record otherwise.
struct ByHost;

#[async_trait]
impl Strategy for ByHost {
    fn name(&self) -> &'static str {
        "by_host"
    }
    fn timeout(&self) -> Option<Duration> {
        Some(Duration::from_secs(1))
    }
    async fn fetch(&self, target: &Url) -> Result<Value, FetchError> {
        if target.host_str().is_some_and(|h| h.starts_with("down")) {
            Err(FetchError::http_status(503, "maintenance"))
        } else {
            Ok(json!({"list": [{"vod_id": 1}]}))
        }
    }
}

struct AlwaysRefused;

#[async_trait]
impl Strategy for AlwaysRefused {
    fn name(&self) -> &'static str {
        "refused"
    }
    fn timeout(&self) -> Option<Duration> {
        None
    }
    async fn fetch(&self, _target: &Url) -> Result<Value, FetchError> {
        Err(FetchError::transport("connection refused"))
    }
}

#[tokio::test]
async fn counters_exposed_after_fetch_and_aggregate() {
    let metrics = Metrics::init().expect("recorder");

    // Exhausted chain
    let exhausted = ResilientFetchClient::new(vec![
        Arc::new(AlwaysRefused) as Arc<dyn Strategy>,
        Arc::new(AlwaysRefused),
    ]);
    let base = Url::parse("https://up.test/api").unwrap();
    let err = exhausted
        .fetch_json("up", &base, &QueryParams::new())
        .await
        .unwrap_err();
    assert_eq!(err.attempts.len(), 2);

    // Partly failing aggregate
    let registry = SourceRegistry::from_configs([
        SourceConfig::new("up", "Up", "https://up.test/api"),
        SourceConfig::new("down", "Down", "https://down.test/api"),
    ])
    .unwrap();
    let client = ResilientFetchClient::new(vec![Arc::new(ByHost) as Arc<dyn Strategy>]);
    let agg = SourceAggregator::new(Arc::new(client), Arc::new(registry), "up").unwrap();
    let out = agg.search_all("繁花").await;
    assert_eq!(out.len(), 1);

    let text = metrics.render();
    assert!(text.contains("vod_strategy_failures_total"), "{text}");
    assert!(text.contains("vod_fetch_success_total"), "{text}");
    assert!(text.contains("vod_source_failures_total"), "{text}");
    assert!(text.contains(r#"strategy="refused""#), "{text}");
    assert!(text.contains(r#"source="down""#), "{text}");
}
