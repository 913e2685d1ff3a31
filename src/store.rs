// src/store.rs
//! Local persistent state for the app glue: watch history, favorites,
//! search history and settings. One JSON file per collection inside a data
//! directory; writes go through a temp file and a rename.

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::vod::VodRecord;

const ENV_DATA_DIR: &str = "VOD_DATA_DIR";
const HISTORY_FILE: &str = "history.json";
const FAVORITES_FILE: &str = "favorites.json";
const SETTINGS_FILE: &str = "settings.json";
const SEARCH_FILE: &str = "search_history.json";

pub const HISTORY_LIMIT: usize = 100;
pub const SEARCH_HISTORY_LIMIT: usize = 20;

/// Playback progress for one title.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Position in seconds.
    #[serde(default)]
    pub time: f64,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub episode_url: String,
    #[serde(default)]
    pub ep_index: usize,
    /// Episode label, e.g. "第02集".
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub vod_title: String,
    /// Unix millis; stamped by [`Store::save_history`].
    #[serde(default)]
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Favorite {
    pub id: String,
    pub name: String,
    pub pic: String,
    #[serde(default)]
    pub type_name: Option<String>,
    pub added_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Active source key.
    pub source: String,
    pub skip_intro: bool,
    pub auto_skip_outro: bool,
    pub ad_block: bool,
    pub speed: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source: "hongniu".to_string(),
            skip_intro: false,
            auto_skip_outro: false,
            ad_block: false,
            speed: 1.0,
        }
    }
}

pub struct Store {
    dir: PathBuf,
    history: HashMap<String, HistoryEntry>,
    favorites: Vec<Favorite>,
    search_history: Vec<String>,
    settings: Settings,
}

impl Store {
    /// Open (creating if needed) a store in `dir`. Missing or unreadable
    /// files start from defaults.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating data dir {}", dir.display()))?;
        Ok(Self {
            history: load_or_default(&dir, HISTORY_FILE),
            favorites: load_or_default(&dir, FAVORITES_FILE),
            search_history: load_or_default(&dir, SEARCH_FILE),
            settings: load_or_default(&dir, SETTINGS_FILE),
            dir,
        })
    }

    /// `$VOD_DATA_DIR`, else `data/`.
    pub fn open_default() -> Result<Self> {
        let dir = std::env::var(ENV_DATA_DIR).unwrap_or_else(|_| "data".to_string());
        Self::open(dir)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    // ------------------------------------------------------------
    // History
    // ------------------------------------------------------------

    /// Record progress for `vod_id`; keeps the newest [`HISTORY_LIMIT`] titles.
    ///
    /// Stamps are strictly increasing so saves within one millisecond still
    /// evict in save order.
    pub fn save_history(&mut self, vod_id: &str, mut entry: HistoryEntry) -> Result<()> {
        if vod_id.trim().is_empty() {
            return Ok(());
        }
        let latest = self.history.values().map(|e| e.updated_at).max().unwrap_or(0);
        entry.updated_at = now_millis().max(latest + 1);
        self.history.insert(vod_id.to_string(), entry);

        while self.history.len() > HISTORY_LIMIT {
            // Ties (only possible in files written elsewhere) break on the key.
            let oldest = self
                .history
                .iter()
                .filter(|(k, _)| k.as_str() != vod_id)
                .min_by(|a, b| (a.1.updated_at, a.0).cmp(&(b.1.updated_at, b.0)))
                .map(|(k, _)| k.clone());
            match oldest {
                Some(k) => {
                    self.history.remove(&k);
                }
                None => break,
            }
        }
        save(&self.dir, HISTORY_FILE, &self.history)
    }

    pub fn get_history(&self, vod_id: &str) -> Option<&HistoryEntry> {
        self.history.get(vod_id)
    }

    /// Newest first.
    pub fn all_history(&self) -> Vec<(&str, &HistoryEntry)> {
        let mut all: Vec<_> = self
            .history
            .iter()
            .map(|(k, v)| (k.as_str(), v))
            .collect();
        all.sort_by(|a, b| b.1.updated_at.cmp(&a.1.updated_at));
        all
    }

    // ------------------------------------------------------------
    // Favorites
    // ------------------------------------------------------------

    /// Newest first; adding an existing id is a no-op.
    pub fn add_favorite(&mut self, vod: &VodRecord) -> Result<()> {
        if self.is_favorite(&vod.vod_id) {
            return Ok(());
        }
        self.favorites.insert(
            0,
            Favorite {
                id: vod.vod_id.clone(),
                name: vod.vod_name.clone(),
                pic: vod.vod_pic.clone(),
                type_name: vod.type_name.clone(),
                added_at: now_millis(),
            },
        );
        save(&self.dir, FAVORITES_FILE, &self.favorites)
    }

    pub fn remove_favorite(&mut self, vod_id: &str) -> Result<()> {
        self.favorites.retain(|f| f.id != vod_id);
        save(&self.dir, FAVORITES_FILE, &self.favorites)
    }

    pub fn is_favorite(&self, vod_id: &str) -> bool {
        self.favorites.iter().any(|f| f.id == vod_id)
    }

    pub fn favorites(&self) -> &[Favorite] {
        &self.favorites
    }

    // ------------------------------------------------------------
    // Search history
    // ------------------------------------------------------------

    pub fn add_search_history(&mut self, keyword: &str) -> Result<()> {
        let kw = keyword.trim();
        if kw.is_empty() {
            return Ok(());
        }
        self.search_history.retain(|k| k != kw);
        self.search_history.insert(0, kw.to_string());
        self.search_history.truncate(SEARCH_HISTORY_LIMIT);
        save(&self.dir, SEARCH_FILE, &self.search_history)
    }

    pub fn search_history(&self) -> &[String] {
        &self.search_history
    }

    // ------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn update_settings<F: FnOnce(&mut Settings)>(&mut self, f: F) -> Result<()> {
        f(&mut self.settings);
        save(&self.dir, SETTINGS_FILE, &self.settings)
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn load_or_default<T: DeserializeOwned + Default>(dir: &Path, name: &str) -> T {
    let path = dir.join(name);
    match fs::read_to_string(&path) {
        Ok(s) => serde_json::from_str(&s).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "corrupt store file; using defaults");
            T::default()
        }),
        Err(_) => T::default(),
    }
}

fn save<T: Serialize>(dir: &Path, name: &str, value: &T) -> Result<()> {
    let path = dir.join(name);
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string(value).context("serializing store file")?;
    let mut f =
        fs::File::create(&tmp).with_context(|| format!("creating {}", tmp.display()))?;
    f.write_all(json.as_bytes())?;
    fs::rename(&tmp, &path).with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}
