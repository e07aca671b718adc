//! The Odyssey scrape pipeline.
//!
//! A scrape opens one console connection, runs every [`steps::Step`] in
//! order and turns each response into samples pushed into a
//! [`sink::MetricSink`]. Self-monitoring of the exporter lives in
//! [`exporter`].

pub mod capacity;
pub mod catalogue;
pub mod console;
pub mod error;
pub mod exporter;
pub mod rows;
pub mod scrape;
pub mod sink;
pub mod steps;
pub mod value;

pub use console::{AdminConsole, PgConsole};
pub use error::{ScrapeError, StepError, StepFailure};
pub use scrape::{ScrapeOutcome, StepTiming, scrape, scrape_console};
pub use sink::{MetricSample, MetricSink, ScrapeRegistry};
