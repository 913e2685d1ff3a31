// src/lib.rs
// Public library surface for the CLI and integration tests.

pub mod config;
pub mod error;
pub mod params;
pub mod sources;
pub mod vod;

// Transport: strategy chain with per-attempt timeouts
pub mod fetch;

// Multi-source queries and playback mirror choice
pub mod aggregator;
pub mod playback;

// Local state (history, favorites, settings)
pub mod store;

// Optional Prometheus recorder
pub mod metrics;

// ---- Re-exports for stable public API ----
pub use crate::aggregator::{CategoryPage, HomeSection, SourceAggregator};
pub use crate::config::AppConfig;
pub use crate::error::{AttemptOutcome, AttemptRecord, CompositeFailure, FetchError};
pub use crate::fetch::{ResilientFetchClient, Strategy};
pub use crate::params::{Action, QueryParams};
pub use crate::playback::{Episode, PlaybackSourceSelector, ScoreWeights};
pub use crate::sources::{SourceConfig, SourceRegistry};
pub use crate::vod::{VodClass, VodRecord};

/// Default home rows (category id, title) used by `vodctl home`.
pub const DEFAULT_HOME_CATEGORIES: &[(u32, &str)] =
    &[(1, "电影"), (2, "连续剧"), (3, "综艺"), (4, "动漫")];
