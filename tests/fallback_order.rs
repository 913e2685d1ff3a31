// tests/fallback_order.rs
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;
use url::Url;

use vod_relay_client::{FetchError, QueryParams, ResilientFetchClient, Strategy};

struct Counting {
    name: &'static str,
    ok: bool,
    calls: AtomicUsize,
}

impl Counting {
    fn new(name: &'static str, ok: bool) -> Arc<Self> {
        Arc::new(Self {
            name,
            ok,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Strategy for Counting {
    fn name(&self) -> &'static str {
        self.name
    }
    fn timeout(&self) -> Option<Duration> {
        None
    }
    async fn fetch(&self, _target: &Url) -> Result<Value, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.ok {
            Ok(json!({"from": self.name}))
        } else {
            Err(FetchError::transport("refused"))
        }
    }
}

const NAMES: [&str; 4] = ["s0", "s1", "s2", "s3"];

fn base() -> Url {
    Url::parse("https://api.test/provide/vod").unwrap()
}

#[tokio::test]
async fn first_success_stops_the_chain() {
    for winner in 0..NAMES.len() {
        let strategies: Vec<_> = NAMES
            .iter()
            .enumerate()
            .map(|(i, n)| Counting::new(*n, i == winner))
            .collect();
        let client = ResilientFetchClient::new(
            strategies
                .iter()
                .map(|s| s.clone() as Arc<dyn Strategy>)
                .collect(),
        );

        let t = client
            .fetch_json_traced("src", &base(), &QueryParams::new())
            .await
            .unwrap();

        assert_eq!(t.value["from"], NAMES[winner]);
        assert_eq!(t.attempts.len(), winner + 1);
        for (i, s) in strategies.iter().enumerate() {
            let expected = usize::from(i <= winner);
            assert_eq!(s.calls.load(Ordering::SeqCst), expected, "winner {winner}, strategy {i}");
        }
    }
}

#[tokio::test]
async fn exhaustion_has_one_record_per_strategy() {
    for n in 1..=NAMES.len() {
        let client = ResilientFetchClient::new(
            NAMES[..n]
                .iter()
                .map(|name| Counting::new(*name, false) as Arc<dyn Strategy>)
                .collect(),
        );
        let err = client
            .fetch_json("src", &base(), &QueryParams::new())
            .await
            .unwrap_err();
        assert_eq!(err.attempts.len(), n);
        assert!(err.attempts.iter().all(|a| a.error().is_some()));
    }
}
