use crate::collectors::catalogue::{self, MetricDesc, ValueKind};
use anyhow::{Result, anyhow};
use prometheus::proto::MetricFamily;
use prometheus::{CounterVec, GaugeVec, Opts, Registry};
use std::collections::HashMap;

/// One labelled value ready for exposition. Labels follow `desc.labels`.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricSample {
    pub desc: &'static MetricDesc,
    pub value: f64,
    pub labels: Vec<String>,
}

impl MetricSample {
    #[must_use]
    pub fn new<I, S>(desc: &'static MetricDesc, value: f64, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            desc,
            value,
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }
}

/// Destination for samples produced by the scrape steps.
pub trait MetricSink: Send {
    /// # Errors
    ///
    /// Returns an error if the sample can't be materialized.
    fn emit(&mut self, sample: MetricSample) -> Result<()>;
}

impl MetricSink for Vec<MetricSample> {
    fn emit(&mut self, sample: MetricSample) -> Result<()> {
        if sample.labels.len() != sample.desc.labels.len() {
            return Err(anyhow!(
                "{} expects {} labels, got {}",
                sample.desc.name,
                sample.desc.labels.len(),
                sample.labels.len()
            ));
        }
        self.push(sample);
        Ok(())
    }
}

/// Request-scoped prometheus registry holding one vec per catalogue entry.
///
/// A fresh one is built for every scrape so series from a previous scrape
/// never leak into the next one.
pub struct ScrapeRegistry {
    registry: Registry,
    gauges: HashMap<&'static str, GaugeVec>,
    counters: HashMap<&'static str, CounterVec>,
}

impl ScrapeRegistry {
    /// # Errors
    ///
    /// Returns an error if a catalogue descriptor is not a valid metric.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let mut gauges = HashMap::new();
        let mut counters = HashMap::new();

        for desc in catalogue::ALL {
            let opts = Opts::new(desc.name, desc.help);
            match desc.kind {
                ValueKind::Gauge => {
                    let vec = GaugeVec::new(opts, desc.labels)?;
                    registry.register(Box::new(vec.clone()))?;
                    gauges.insert(desc.name, vec);
                }
                ValueKind::Counter => {
                    let vec = CounterVec::new(opts, desc.labels)?;
                    registry.register(Box::new(vec.clone()))?;
                    counters.insert(desc.name, vec);
                }
            }
        }

        Ok(Self {
            registry,
            gauges,
            counters,
        })
    }

    #[must_use]
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }
}

impl MetricSink for ScrapeRegistry {
    fn emit(&mut self, sample: MetricSample) -> Result<()> {
        let labels: Vec<&str> = sample.labels.iter().map(String::as_str).collect();
        let name = sample.desc.name;

        match sample.desc.kind {
            ValueKind::Gauge => {
                let vec = self
                    .gauges
                    .get(name)
                    .ok_or_else(|| anyhow!("{name} is not in the catalogue"))?;
                vec.get_metric_with_label_values(labels.as_slice())?
                    .set(sample.value);
            }
            ValueKind::Counter => {
                if sample.value < 0.0 || sample.value.is_nan() {
                    return Err(anyhow!("{name} can't be set to {}", sample.value));
                }
                let vec = self
                    .counters
                    .get(name)
                    .ok_or_else(|| anyhow!("{name} is not in the catalogue"))?;
                let counter = vec.get_metric_with_label_values(labels.as_slice())?;
                // last write wins, same as the gauges
                counter.reset();
                counter.inc_by(sample.value);
            }
        }

        Ok(())
    }
}
