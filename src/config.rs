// src/config.rs
//! App configuration: relay endpoints, per-strategy budgets, scoring weights
//! and the source list.
//!
//! Resolution order:
//! 1) `$VOD_CONFIG_PATH` (must exist)
//! 2) `config/vod.toml`
//! 3) `config/vod.json`
//! 4) built-in defaults
//!
//! After loading, `VOD_RELAY_ORIGIN` / `VOD_PUBLIC_RELAY` override the relay
//! section (an empty value disables that relay).

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::fetch::strategy::{http_client_with, Direct, PublicRelay, SameOriginRelay, Strategy};
use crate::fetch::ResilientFetchClient;
use crate::playback::{PlaybackSourceSelector, ScoreWeights};
use crate::sources::{SourceConfig, SourceRegistry};

pub const ENV_CONFIG_PATH: &str = "VOD_CONFIG_PATH";
pub const ENV_RELAY_ORIGIN: &str = "VOD_RELAY_ORIGIN";
pub const ENV_PUBLIC_RELAY: &str = "VOD_PUBLIC_RELAY";
pub const DEFAULT_TOML_PATH: &str = "config/vod.toml";
pub const DEFAULT_JSON_PATH: &str = "config/vod.json";

fn default_active_source() -> String {
    "hongniu".to_string()
}
fn default_relay_path() -> String {
    "/relay".to_string()
}
fn default_public_base() -> Option<String> {
    Some("https://corsproxy.io".to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Origin of the deployment's own relay; `None` skips that strategy.
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default = "default_relay_path")]
    pub path: String,
    /// Public CORS relay base; `None` skips that strategy.
    #[serde(default = "default_public_base")]
    pub public_base: Option<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            origin: None,
            path: default_relay_path(),
            public_base: default_public_base(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub direct_ms: u64,
    pub relay_ms: u64,
    /// Budget for strategies without their own (public relay).
    pub default_ms: u64,
    /// TCP/TLS connect limit shared by every strategy.
    pub connect_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            direct_ms: 6_000,
            relay_ms: 12_000,
            default_ms: 10_000,
            connect_ms: 4_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_active_source")]
    pub active_source: String,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub scoring: ScoreWeights,
    /// Empty means "use the built-in seed".
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            active_source: default_active_source(),
            relay: RelayConfig::default(),
            timeouts: TimeoutConfig::default(),
            scoring: ScoreWeights::default(),
            sources: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load from an explicit path. TOML or JSON, chosen by extension.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        Self::parse(&content, &ext)
            .with_context(|| format!("parsing config {}", path.display()))
    }

    /// Env path, then default locations, then defaults; env overrides applied last.
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else if Path::new(DEFAULT_TOML_PATH).exists() {
            Self::load_from(Path::new(DEFAULT_TOML_PATH))?
        } else if Path::new(DEFAULT_JSON_PATH).exists() {
            Self::load_from(Path::new(DEFAULT_JSON_PATH))?
        } else {
            Self::default()
        };
        cfg.apply_env();
        Ok(cfg)
    }

    fn parse(s: &str, hint_ext: &str) -> Result<Self> {
        match hint_ext {
            "json" => Ok(serde_json::from_str(s)?),
            "toml" => Ok(toml::from_str(s)?),
            _ => toml::from_str(s)
                .or_else(|_| serde_json::from_str(s))
                .map_err(|_| anyhow!("unsupported config format")),
        }
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var(ENV_RELAY_ORIGIN) {
            self.relay.origin = Some(v.trim().to_string()).filter(|s| !s.is_empty());
        }
        if let Ok(v) = std::env::var(ENV_PUBLIC_RELAY) {
            self.relay.public_base = Some(v.trim().to_string()).filter(|s| !s.is_empty());
        }
    }

    /// Configured sources, or the built-in seed when none are listed.
    pub fn build_registry(&self) -> Result<SourceRegistry> {
        if self.sources.is_empty() {
            return Ok(SourceRegistry::default_seed());
        }
        SourceRegistry::from_configs(self.sources.iter().cloned())
    }

    /// Strategy chain in fixed priority: direct, same-origin relay, public relay.
    pub fn build_strategies(&self) -> Result<Vec<Arc<dyn Strategy>>> {
        let t = &self.timeouts;
        let http = http_client_with(Duration::from_millis(t.connect_ms))
            .map_err(|e| anyhow!("building http client: {e}"))?;

        let mut out: Vec<Arc<dyn Strategy>> = vec![Arc::new(Direct::new(
            http.clone(),
            Duration::from_millis(t.direct_ms),
        ))];

        if let Some(origin) = self.relay.origin.as_deref() {
            let origin = Url::parse(origin).context("relay.origin is not a URL")?;
            let relay = SameOriginRelay::new(
                http.clone(),
                &origin,
                &self.relay.path,
                Duration::from_millis(t.relay_ms),
            )
            .map_err(|e| anyhow!("relay.path: {e}"))?;
            out.push(Arc::new(relay));
        }

        if let Some(base) = self.relay.public_base.as_deref() {
            let base = Url::parse(base).context("relay.public_base is not a URL")?;
            out.push(Arc::new(PublicRelay::new(http, base)));
        }

        Ok(out)
    }

    pub fn build_client(&self) -> Result<ResilientFetchClient> {
        Ok(ResilientFetchClient::new(self.build_strategies()?)
            .with_default_timeout(Duration::from_millis(self.timeouts.default_ms)))
    }

    /// Mirror selector with the configured weights and random tie-breaking.
    pub fn selector(&self) -> PlaybackSourceSelector {
        PlaybackSourceSelector::new(self.scoring)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_with_partial_sections() {
        let s = r#"
active_source = "liangzi"

[relay]
origin = "http://127.0.0.1:8788"

[scoring]
m3u8_bonus = 20

[[sources]]
key = "liangzi"
name = "量子资源"
url = "https://cj.lziapi.com/api.php/provide/vod/at/json"
"#;
        let cfg = AppConfig::parse(s, "toml").unwrap();
        assert_eq!(cfg.active_source, "liangzi");
        assert_eq!(cfg.relay.path, "/relay");
        assert_eq!(cfg.relay.public_base.as_deref(), Some("https://corsproxy.io"));
        assert_eq!(cfg.timeouts, TimeoutConfig::default());
        assert_eq!(cfg.scoring.m3u8_bonus, 20);
        assert_eq!(cfg.scoring.hd_bonus, 3);
        assert_eq!(cfg.build_registry().unwrap().len(), 1);
    }

    #[test]
    fn strategy_chain_follows_relay_settings() {
        let mut cfg = AppConfig::default();
        let names: Vec<_> = cfg
            .build_strategies()
            .unwrap()
            .iter()
            .map(|s| s.name())
            .collect();
        assert_eq!(names, vec!["direct", "public_relay"]);

        cfg.relay.origin = Some("http://127.0.0.1:8788".into());
        cfg.relay.public_base = None;
        let names: Vec<_> = cfg
            .build_strategies()
            .unwrap()
            .iter()
            .map(|s| s.name())
            .collect();
        assert_eq!(names, vec!["direct", "same_origin_relay"]);
    }

    #[test]
    fn empty_sources_use_seed_and_duplicates_fail() {
        let mut cfg = AppConfig::default();
        assert_eq!(cfg.build_registry().unwrap().len(), 7);
        cfg.sources = vec![
            SourceConfig::new("a", "A", "https://a.test/api"),
            SourceConfig::new("a", "A", "https://a.test/api"),
        ];
        assert!(cfg.build_registry().is_err());
    }
}
