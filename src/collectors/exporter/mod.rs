//! Exporter self-monitoring.
//!
//! Unlike the per-scrape Odyssey metrics, these live for the whole process in
//! one static registry:
//!
//! - [`ProcessMetrics`]: CPU, memory, threads and file descriptors of the
//!   exporter itself, via `sysinfo`.
//! - [`ScraperMetrics`]: scrape and per-step durations, step failures and the
//!   last scrape status.
//! - `odyssey_exporter_build_info{version,commit}`.
//!
//! ```promql
//! # memory usage MB
//! odyssey_exporter_process_resident_memory_bytes / 1024 / 1024
//!
//! # failing scrapes
//! odyssey_exporter_last_scrape_success == 0
//! ```
mod process;
mod scraper;

pub use process::ProcessMetrics;
pub use scraper::ScraperMetrics;

use crate::collectors::scrape::ScrapeOutcome;
use anyhow::Result;
use prometheus::proto::MetricFamily;
use prometheus::{IntGaugeVec, Opts, Registry};
use tracing::{debug, instrument};

/// The process-wide registry plus the collectors feeding it.
#[derive(Clone)]
pub struct ExporterMetrics {
    registry: Registry,
    process: ProcessMetrics,
    scraper: ScraperMetrics,
}

impl ExporterMetrics {
    /// # Errors
    ///
    /// Returns an error if a metric can't be created or registered.
    #[instrument(level = "debug", err)]
    pub fn new(version: &str, commit: &str) -> Result<Self> {
        let registry = Registry::new();

        let build_info = IntGaugeVec::new(
            Opts::new(
                "odyssey_exporter_build_info",
                "A metric with a constant '1' value labeled by version and commit",
            ),
            &["version", "commit"],
        )?;
        build_info.with_label_values(&[version, commit]).set(1);
        registry.register(Box::new(build_info))?;

        let process = ProcessMetrics::new();
        process.register(&registry)?;

        let scraper = ScraperMetrics::new();
        scraper.register(&registry)?;

        debug!("registered exporter metrics");

        Ok(Self {
            registry,
            process,
            scraper,
        })
    }

    /// Record the result of one scrape.
    pub fn observe(&self, outcome: &ScrapeOutcome) {
        self.scraper.observe(outcome);
    }

    /// Refresh the process numbers and gather everything.
    #[must_use]
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.process.refresh();
        self.registry.gather()
    }
}
