// src/aggregator.rs
use futures::future::join_all;
use metrics::counter;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;

use crate::error::CompositeFailure;
use crate::fetch::{ensure_metrics_described, ResilientFetchClient};
use crate::params::{Action, QueryParams};
use crate::sources::{SourceConfig, SourceRegistry};
use crate::vod::{VodClass, VodPage, VodRecord};

const HOME_PAGE_SIZE: u32 = 24;
const CATEGORY_PAGE_SIZE: u32 = 20;

/// One page of a category listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryPage {
    pub list: Vec<VodRecord>,
    pub total: Option<u64>,
    pub page: u32,
    pub pagecount: Option<u32>,
}

/// A titled home-screen row backed by one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HomeSection {
    pub type_id: u32,
    pub title: String,
    pub list: Vec<VodRecord>,
}

/// Queries the registered sources through one [`ResilientFetchClient`].
///
/// Aggregate calls fan out to every source and never fail; single-source
/// calls go to the active source and surface [`CompositeFailure`].
pub struct SourceAggregator {
    client: Arc<ResilientFetchClient>,
    registry: Arc<SourceRegistry>,
    active: RwLock<Arc<SourceConfig>>,
}

impl SourceAggregator {
    /// `active_key` falls back to the first registered source when unknown.
    /// Returns `None` for an empty registry.
    pub fn new(
        client: Arc<ResilientFetchClient>,
        registry: Arc<SourceRegistry>,
        active_key: &str,
    ) -> Option<Self> {
        let active = match registry.get(active_key) {
            Some(s) => s.clone(),
            None => {
                let first = registry.first()?.clone();
                tracing::warn!(
                    requested = active_key,
                    using = %first.key,
                    "unknown active source; using first registered"
                );
                first
            }
        };
        Some(Self {
            client,
            registry,
            active: RwLock::new(active),
        })
    }

    pub fn sources(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Snapshot of the active source. In-flight calls keep the snapshot they took.
    pub fn active_source(&self) -> Arc<SourceConfig> {
        self.active.read().clone()
    }

    /// Switch the active source. Unknown keys are ignored.
    pub fn set_source(&self, key: &str) -> bool {
        match self.registry.get(key) {
            Some(s) => {
                *self.active.write() = s.clone();
                tracing::info!(source = %s.key, name = %s.name, "switched source");
                true
            }
            None => {
                tracing::warn!(source = key, "set_source: unknown key");
                false
            }
        }
    }

    async fn fetch_page(
        &self,
        source: &SourceConfig,
        params: &QueryParams,
    ) -> Result<VodPage, CompositeFailure> {
        let base = source.base_url().map_err(|e| {
            CompositeFailure {
                message: format!("{}: {e:#}", source.name),
                attempts: Vec::new(),
            }
        })?;
        let value = self.client.fetch_json(&source.name, &base, params).await?;
        Ok(VodPage::from_value(&value))
    }

    async fn fetch_active(&self, params: &QueryParams) -> Result<VodPage, CompositeFailure> {
        let source = self.active_source();
        self.fetch_page(&source, params).await
    }

    // ------------------------------------------------------------
    // Aggregate (all sources)
    // ------------------------------------------------------------

    /// Same query against every source concurrently. A failing source adds
    /// nothing; output follows registry order, each record tagged with its source.
    pub async fn query_all_sources(&self, params: &QueryParams) -> Vec<VodRecord> {
        ensure_metrics_described();

        let calls = self.registry.iter().map(|source| async move {
            (source, self.fetch_page(source, params).await)
        });

        let mut out = Vec::new();
        for (source, result) in join_all(calls).await {
            match result {
                Ok(page) => {
                    tracing::debug!(source = %source.key, items = page.list.len(), "source ok");
                    out.extend(
                        page.list
                            .into_iter()
                            .map(|r| r.tagged(&source.key, &source.name)),
                    );
                }
                Err(e) => {
                    tracing::warn!(source = %source.key, error = %e, attempts = e.attempts.len(), "source failed");
                    counter!("vod_source_failures_total", "source" => source.key.clone())
                        .increment(1);
                }
            }
        }
        out
    }

    /// Keyword search across every source. Blank keywords issue no request.
    pub async fn search_all(&self, keyword: &str) -> Vec<VodRecord> {
        if keyword.trim().is_empty() {
            return Vec::new();
        }
        let params = QueryParams::new()
            .action(Action::Detail)
            .keyword(keyword);
        self.query_all_sources(&params).await
    }

    /// One category query per `(type_id, title)`, concurrently. Failed or empty
    /// categories are left out; survivors keep input order.
    pub async fn get_home_sections(&self, categories: &[(u32, &str)]) -> Vec<HomeSection> {
        let source = self.active_source();
        let calls = categories.iter().map(|&(type_id, title)| {
            let source = source.clone();
            async move {
                let params = category_params(type_id, 1);
                let list = match self.fetch_page(&source, &params).await {
                    Ok(page) => page.list,
                    Err(e) => {
                        tracing::warn!(type_id, title, error = %e, "home section failed");
                        Vec::new()
                    }
                };
                HomeSection {
                    type_id,
                    title: title.to_string(),
                    list,
                }
            }
        });

        join_all(calls)
            .await
            .into_iter()
            .filter(|s| !s.list.is_empty())
            .collect()
    }

    // ------------------------------------------------------------
    // Single source (active)
    // ------------------------------------------------------------

    /// Latest updates: first page of 24 full records.
    pub async fn get_home_data(&self) -> Result<Vec<VodRecord>, CompositeFailure> {
        let params = QueryParams::new()
            .action(Action::Detail)
            .page(1)
            .page_size(HOME_PAGE_SIZE);
        Ok(self.fetch_active(&params).await?.list)
    }

    pub async fn search(&self, keyword: &str) -> Result<Vec<VodRecord>, CompositeFailure> {
        if keyword.trim().is_empty() {
            return Ok(Vec::new());
        }
        let params = QueryParams::new()
            .action(Action::Detail)
            .keyword(keyword);
        Ok(self.fetch_active(&params).await?.list)
    }

    /// First record for one id (or a comma-joined list of ids).
    pub async fn get_detail<S: AsRef<str>>(
        &self,
        ids: &[S],
    ) -> Result<Option<VodRecord>, CompositeFailure> {
        let params = QueryParams::new().action(Action::Detail).ids(ids);
        Ok(self.fetch_active(&params).await?.list.into_iter().next())
    }

    pub async fn get_category(
        &self,
        type_id: u32,
        page: u32,
    ) -> Result<CategoryPage, CompositeFailure> {
        let params = category_params(type_id, page);
        let p = self.fetch_active(&params).await?;
        Ok(CategoryPage {
            list: p.list,
            total: p.total,
            page: p.page.unwrap_or(page.max(1)),
            pagecount: p.pagecount,
        })
    }

    /// Category table; comes with any `ac=list` response, so ask for one item.
    pub async fn get_types(&self) -> Result<Vec<VodClass>, CompositeFailure> {
        let params = QueryParams::new().action(Action::List).page_size(1);
        Ok(self.fetch_active(&params).await?.class)
    }
}

fn category_params(type_id: u32, page: u32) -> QueryParams {
    QueryParams::new()
        .action(Action::Detail)
        .type_id(type_id)
        .page(page)
        .page_size(CATEGORY_PAGE_SIZE)
}
