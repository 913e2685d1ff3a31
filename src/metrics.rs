// src/metrics.rs
//! Prometheus recorder for the fetch/aggregate counters.
//!
//! Without an installed recorder the counters are no-ops. `vodctl` installs
//! one when `VOD_METRICS=1` and dumps the exposition text to stderr on exit.

use anyhow::{Context, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::fetch::describe_metrics;

pub const ENV_METRICS: &str = "VOD_METRICS";

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the process-wide recorder. Fails if one is already installed.
    pub fn init() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        // Descriptions given before the recorder existed were dropped.
        describe_metrics();
        Ok(Self { handle })
    }

    /// `init` when `VOD_METRICS=1`.
    pub fn from_env() -> Result<Option<Self>> {
        let enabled = std::env::var(ENV_METRICS).is_ok_and(|v| v == "1");
        if !enabled {
            return Ok(None);
        }
        Self::init().map(Some)
    }

    /// Prometheus exposition format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}
