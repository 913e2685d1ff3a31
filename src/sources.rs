//! # Sources
//!
//! Static registry of upstream collection APIs ("sources").
//!
//! - Each source is an immutable [`SourceConfig`] keyed by a short identifier.
//! - The registry keeps insertion order, which fixes the output order of
//!   aggregate queries.
//! - Registration happens once at configuration time; afterwards the
//!   registry only hands out shared references.
//! - [`SourceRegistry::default_seed`] carries the built-in source list.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};
use url::Url;

/// Payload format served by a source. Only JSON collection APIs exist today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Json,
}

/// One upstream collection API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub key: String,
    /// Display name shown to users and attached to aggregated records.
    pub name: String,
    /// Absolute base URL of the API; query parameters are appended to it.
    pub url: String,
    #[serde(default)]
    pub kind: SourceKind,
}

impl SourceConfig {
    pub fn new(key: &str, name: &str, url: &str) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            url: url.to_string(),
            kind: SourceKind::Json,
        }
    }

    /// Parsed base URL. Registered sources are validated, so this only fails
    /// for hand-built configs that never went through the registry.
    pub fn base_url(&self) -> Result<Url> {
        Url::parse(&self.url).with_context(|| format!("source {} has invalid url", self.key))
    }
}

/// Ordered, append-only mapping from key to [`SourceConfig`].
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    entries: Vec<Arc<SourceConfig>>,
    index: HashMap<String, usize>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a source. Rejects duplicate keys and non-absolute URLs.
    pub fn register(&mut self, cfg: SourceConfig) -> Result<()> {
        let key = cfg.key.trim();
        if key.is_empty() {
            bail!("source key must not be empty");
        }
        if self.index.contains_key(key) {
            bail!("duplicate source key: {key}");
        }
        let url = Url::parse(&cfg.url)
            .with_context(|| format!("source {key}: url is not absolute: {}", cfg.url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("source {key}: unsupported scheme {}", url.scheme());
        }

        let key = key.to_string();
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push(Arc::new(SourceConfig { key, ..cfg }));
        Ok(())
    }

    pub fn from_configs<I: IntoIterator<Item = SourceConfig>>(configs: I) -> Result<Self> {
        let mut reg = Self::new();
        for cfg in configs {
            reg.register(cfg)?;
        }
        Ok(reg)
    }

    pub fn get(&self, key: &str) -> Option<&Arc<SourceConfig>> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// First registered source; used when the configured active key is unknown.
    pub fn first(&self) -> Option<&Arc<SourceConfig>> {
        self.entries.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<SourceConfig>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Built-in collection sources, `hongniu` first (the default).
    pub fn default_seed() -> Self {
        let mut reg = Self::new();
        for (key, name, url) in [
            (
                "hongniu",
                "红牛资源",
                "https://www.hongniuzy2.com/api.php/provide/vod/at/json",
            ),
            (
                "liangzi",
                "量子资源",
                "https://cj.lziapi.com/api.php/provide/vod/at/json",
            ),
            (
                "feifei",
                "非凡资源 (综合/18+)",
                "http://cj.ffzyapi.com/api.php/provide/vod/from/ffm3u8/at/json",
            ),
            (
                "uku",
                "Uku资源",
                "https://api.ukuapi.com/api.php/provide/vod/from/uku/at/json",
            ),
            (
                "wolong",
                "卧龙资源",
                "https://collect.wolongzyw.com/api.php/provide/vod/at/json",
            ),
            (
                "guangsu",
                "光速资源",
                "https://api.guangsuapi.com/api.php/provide/vod/from/gsm3u8/at/json",
            ),
            (
                "ikun",
                "IKUN资源",
                "https://ikunzyapi.com/api.php/provide/vod/from/ikm3u8/at/json",
            ),
        ] {
            // Seed entries are static and valid.
            let _ = reg.register(SourceConfig::new(key, name, url));
        }
        reg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_keeps_order_and_default_first() {
        let reg = SourceRegistry::default_seed();
        assert_eq!(reg.len(), 7);
        assert_eq!(reg.first().unwrap().key, "hongniu");
        let keys: Vec<_> = reg.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys[1], "liangzi");
        assert_eq!(keys[6], "ikun");
    }

    #[test]
    fn duplicate_key_is_rejected() {
        let mut reg = SourceRegistry::new();
        reg.register(SourceConfig::new("a", "A", "https://a.test/api"))
            .unwrap();
        let err = reg
            .register(SourceConfig::new("a", "A2", "https://b.test/api"))
            .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get("a").unwrap().name, "A");
    }

    #[test]
    fn relative_or_odd_urls_are_rejected() {
        let mut reg = SourceRegistry::new();
        assert!(reg
            .register(SourceConfig::new("rel", "R", "/api.php"))
            .is_err());
        assert!(reg
            .register(SourceConfig::new("ftp", "F", "ftp://x.test/api"))
            .is_err());
        assert!(reg.is_empty());
    }

    #[test]
    fn kind_deserializes_lowercase_and_defaults() {
        let cfg: SourceConfig =
            serde_json::from_str(r#"{"key":"k","name":"K","url":"https://k.test"}"#).unwrap();
        assert_eq!(cfg.kind, SourceKind::Json);
        let cfg: SourceConfig = serde_json::from_str(
            r#"{"key":"k","name":"K","url":"https://k.test","kind":"json"}"#,
        )
        .unwrap();
        assert_eq!(cfg.kind, SourceKind::Json);
    }
}
