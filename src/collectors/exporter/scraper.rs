use crate::collectors::scrape::ScrapeOutcome;
use anyhow::Result;
use prometheus::{
    Gauge, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
};
use std::time::{SystemTime, UNIX_EPOCH};

const DURATION_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0];

/// Scrape performance and health, fed from every [`ScrapeOutcome`].
///
/// - `odyssey_exporter_scrapes_total`
/// - `odyssey_exporter_scrape_duration_seconds` (whole scrape, histogram)
/// - `odyssey_exporter_step_duration_seconds{step}` (histogram)
/// - `odyssey_exporter_step_failures_total{step,kind}`, kind is `error` or
///   `deadline`
/// - `odyssey_exporter_last_scrape_success` (1 or 0)
/// - `odyssey_exporter_last_scrape_timestamp_seconds`
///
/// ```promql
/// # slowest step (p99)
/// histogram_quantile(0.99, sum by (step, le) (rate(odyssey_exporter_step_duration_seconds_bucket[5m])))
///
/// # steps hitting the scrape timeout
/// rate(odyssey_exporter_step_failures_total{kind="deadline"}[5m]) > 0
/// ```
#[derive(Clone)]
pub struct ScraperMetrics {
    scrapes_total: IntCounter,
    scrape_duration_seconds: Histogram,
    step_duration_seconds: HistogramVec,
    step_failures_total: IntCounterVec,
    last_scrape_success: Gauge,
    last_scrape_timestamp: Gauge,
}

impl Default for ScraperMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ScraperMetrics {
    /// # Panics
    ///
    /// Panics if metric creation fails (should never happen with valid metric names)
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        let scrapes_total = IntCounter::with_opts(Opts::new(
            "odyssey_exporter_scrapes_total",
            "Total number of scrapes performed since start",
        ))
        .expect("odyssey_exporter_scrapes_total");

        let scrape_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "odyssey_exporter_scrape_duration_seconds",
                "Time spent on a whole scrape in seconds",
            )
            .buckets(DURATION_BUCKETS.to_vec()),
        )
        .expect("odyssey_exporter_scrape_duration_seconds");

        let step_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "odyssey_exporter_step_duration_seconds",
                "Time spent on each scrape step in seconds",
            )
            .buckets(DURATION_BUCKETS.to_vec()),
            &["step"],
        )
        .expect("odyssey_exporter_step_duration_seconds");

        let step_failures_total = IntCounterVec::new(
            Opts::new(
                "odyssey_exporter_step_failures_total",
                "Total number of failed scrape steps",
            ),
            &["step", "kind"],
        )
        .expect("odyssey_exporter_step_failures_total");

        let last_scrape_success = Gauge::with_opts(Opts::new(
            "odyssey_exporter_last_scrape_success",
            "Whether the last scrape was successful (1=success, 0=failure)",
        ))
        .expect("odyssey_exporter_last_scrape_success");

        let last_scrape_timestamp = Gauge::with_opts(Opts::new(
            "odyssey_exporter_last_scrape_timestamp_seconds",
            "Unix timestamp of the last scrape",
        ))
        .expect("odyssey_exporter_last_scrape_timestamp_seconds");

        Self {
            scrapes_total,
            scrape_duration_seconds,
            step_duration_seconds,
            step_failures_total,
            last_scrape_success,
            last_scrape_timestamp,
        }
    }

    /// # Errors
    ///
    /// Returns an error if any metric fails to register.
    pub fn register(&self, registry: &Registry) -> Result<()> {
        registry.register(Box::new(self.scrapes_total.clone()))?;
        registry.register(Box::new(self.scrape_duration_seconds.clone()))?;
        registry.register(Box::new(self.step_duration_seconds.clone()))?;
        registry.register(Box::new(self.step_failures_total.clone()))?;
        registry.register(Box::new(self.last_scrape_success.clone()))?;
        registry.register(Box::new(self.last_scrape_timestamp.clone()))?;
        Ok(())
    }

    pub fn observe(&self, outcome: &ScrapeOutcome) {
        self.scrapes_total.inc();
        self.scrape_duration_seconds
            .observe(outcome.elapsed.as_secs_f64());

        for timing in &outcome.timings {
            let step = timing.step.name();
            self.step_duration_seconds
                .with_label_values(&[step])
                .observe(timing.elapsed.as_secs_f64());

            if let Some(kind) = timing.failure {
                self.step_failures_total
                    .with_label_values(&[step, kind])
                    .inc();
            }
        }

        self.last_scrape_success
            .set(if outcome.is_up() { 1.0 } else { 0.0 });

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64();
        self.last_scrape_timestamp.set(timestamp);
    }
}
