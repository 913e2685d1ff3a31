// src/fetch/strategy.rs
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::error::FetchError;

/// One transport mechanism for reaching a source.
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Short name used in attempt records and logs.
    fn name(&self) -> &'static str;

    /// Own time budget. `None` inherits the client default.
    fn timeout(&self) -> Option<Duration>;

    /// Fetch `target` (base URL with the query already applied) and parse JSON.
    async fn fetch(&self, target: &Url) -> Result<Value, FetchError>;
}

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(4);

/// Shared HTTP client for all strategies, with the default connect timeout.
pub fn http_client() -> Result<Client, FetchError> {
    http_client_with(DEFAULT_CONNECT_TIMEOUT)
}

/// Referer propagation is off so upstreams never see where the request came
/// from. A connect timeout surfaces as `Transport`, never as the attempt's
/// `Timeout`.
pub fn http_client_with(connect_timeout: Duration) -> Result<Client, FetchError> {
    Client::builder()
        .referer(false)
        .connect_timeout(connect_timeout)
        .build()
        .map_err(FetchError::transport)
}

/// GET `url`, require 2xx, parse body as JSON.
async fn get_json(http: &Client, url: Url) -> Result<Value, FetchError> {
    let resp = http.get(url).send().await?;
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(FetchError::http_status(status.as_u16(), &body));
    }
    parse_body(&body)
}

/// Some collection APIs prefix their JSON with a UTF-8 BOM.
pub(crate) fn parse_body(body: &str) -> Result<Value, FetchError> {
    let trimmed = body.trim_start_matches('\u{feff}');
    serde_json::from_str(trimmed).map_err(|e| FetchError::Parse {
        message: e.to_string(),
    })
}

/// Request the upstream as is.
pub struct Direct {
    http: Client,
    timeout: Duration,
}

impl Direct {
    pub fn new(http: Client, timeout: Duration) -> Self {
        Self { http, timeout }
    }
}

#[async_trait]
impl Strategy for Direct {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn timeout(&self) -> Option<Duration> {
        Some(self.timeout)
    }

    async fn fetch(&self, target: &Url) -> Result<Value, FetchError> {
        get_json(&self.http, target.clone()).await
    }
}

/// Route through the deployment's own relay endpoint:
/// `<origin><path>?target=<base64(full target url)>`.
pub struct SameOriginRelay {
    http: Client,
    endpoint: Url,
    timeout: Duration,
}

impl SameOriginRelay {
    pub fn new(http: Client, origin: &Url, path: &str, timeout: Duration) -> Result<Self, FetchError> {
        let endpoint = origin.join(path).map_err(FetchError::transport)?;
        Ok(Self {
            http,
            endpoint,
            timeout,
        })
    }

    pub fn relay_url(&self, target: &Url) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .clear()
            .append_pair("target", &STANDARD.encode(target.as_str()));
        url
    }
}

#[async_trait]
impl Strategy for SameOriginRelay {
    fn name(&self) -> &'static str {
        "same_origin_relay"
    }

    fn timeout(&self) -> Option<Duration> {
        Some(self.timeout)
    }

    async fn fetch(&self, target: &Url) -> Result<Value, FetchError> {
        get_json(&self.http, self.relay_url(target)).await
    }
}

/// Third-party CORS relay of the form `<base>/?<percent-encoded target>`.
pub struct PublicRelay {
    http: Client,
    base: Url,
}

impl PublicRelay {
    pub fn new(http: Client, base: Url) -> Self {
        Self { http, base }
    }

    pub fn relay_url(&self, target: &Url) -> Result<Url, FetchError> {
        let encoded: String =
            url::form_urlencoded::byte_serialize(target.as_str().as_bytes()).collect();
        let root = self.base.as_str().trim_end_matches('/');
        Url::parse(&format!("{root}/?{encoded}")).map_err(FetchError::transport)
    }
}

#[async_trait]
impl Strategy for PublicRelay {
    fn name(&self) -> &'static str {
        "public_relay"
    }

    fn timeout(&self) -> Option<Duration> {
        None
    }

    async fn fetch(&self, target: &Url) -> Result<Value, FetchError> {
        let url = self.relay_url(target)?;
        get_json(&self.http, url).await
    }
}
