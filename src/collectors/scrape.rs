//! One scrape pass: connect, run every step in order, report liveness.

use crate::collectors::capacity::CapacityIndex;
use crate::collectors::catalogue::EXPORTER_UP;
use crate::collectors::console::{AdminConsole, PgConsole};
use crate::collectors::error::{ScrapeError, StepError, StepFailure};
use crate::collectors::rows::ResultSet;
use crate::collectors::sink::{MetricSample, MetricSink};
use crate::collectors::steps::{self, Step};
use sqlx::postgres::PgConnectOptions;
use std::time::Duration;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, error, info_span, instrument, warn};
use tracing_futures::Instrument as _;

/// How long one step took and how it ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepTiming {
    pub step: Step,
    pub elapsed: Duration,
    /// `None` on success, otherwise [`StepError::kind`].
    pub failure: Option<&'static str>,
}

#[derive(Debug)]
pub struct ScrapeOutcome {
    pub result: Result<(), ScrapeError>,
    pub timings: Vec<StepTiming>,
    pub elapsed: Duration,
}

impl ScrapeOutcome {
    /// Whether `odyssey_exporter_up` was reported as 1.
    #[must_use]
    pub const fn is_up(&self) -> bool {
        self.result.is_ok()
    }
}

/// Connect to the console and run a full scrape into `sink`.
///
/// Never fails: connection and step errors end up in the outcome, and
/// `odyssey_exporter_up` is always emitted.
#[instrument(skip(options, sink), level = "info", fields(otel.kind = "internal"))]
pub async fn scrape(
    options: &PgConnectOptions,
    timeout: Option<Duration>,
    sink: &mut dyn MetricSink,
) -> ScrapeOutcome {
    let started = Instant::now();
    let deadline = timeout.map(|timeout| started + timeout);

    match PgConsole::connect(options, deadline).await {
        Ok(console) => {
            let mut outcome = scrape_console(&console, deadline, sink).await;
            outcome.elapsed = started.elapsed();
            outcome
        }
        Err(err) => {
            error!(error = %err, "can't connect to Odyssey");
            emit_up(sink, false);
            ScrapeOutcome {
                result: Err(ScrapeError::Connect(err)),
                timings: Vec::new(),
                elapsed: started.elapsed(),
            }
        }
    }
}

/// Run every step against an already open console, then close it.
///
/// Steps run sequentially in [`Step::ALL`] order. A failing step is recorded
/// and the next one still runs; once `deadline` has passed the remaining
/// steps fail without touching the console.
pub async fn scrape_console(
    console: &dyn AdminConsole,
    deadline: Option<Instant>,
    sink: &mut dyn MetricSink,
) -> ScrapeOutcome {
    let started = Instant::now();
    let mut capacities = CapacityIndex::default();
    let mut failures = Vec::new();
    let mut timings = Vec::with_capacity(Step::ALL.len());

    for step in Step::ALL {
        let step_started = Instant::now();
        let span = info_span!("scrape.step", step = %step);

        let result = run_step(console, step, deadline, &mut capacities, sink)
            .instrument(span)
            .await;

        let elapsed = step_started.elapsed();

        match result {
            Ok(()) => {
                debug!(step = %step, elapsed = ?elapsed, "scrape step finished");
                timings.push(StepTiming {
                    step,
                    elapsed,
                    failure: None,
                });
            }
            Err(err) => {
                error!(step = %step, error = %err, "scrape step failed");
                timings.push(StepTiming {
                    step,
                    elapsed,
                    failure: Some(err.kind()),
                });
                failures.push(StepFailure { step, source: err });
            }
        }
    }

    console.close().await;

    emit_up(sink, failures.is_empty());

    ScrapeOutcome {
        result: if failures.is_empty() {
            Ok(())
        } else {
            Err(ScrapeError::Steps(failures))
        },
        timings,
        elapsed: started.elapsed(),
    }
}

async fn run_step(
    console: &dyn AdminConsole,
    step: Step,
    deadline: Option<Instant>,
    capacities: &mut CapacityIndex,
    sink: &mut dyn MetricSink,
) -> Result<(), StepError> {
    let set = query(console, step.command(), deadline).await?;

    match step {
        Step::Version => steps::version::process(&set, sink)?,
        Step::Lists => steps::lists::process(&set, sink)?,
        Step::IsPaused => steps::paused::process(&set, sink)?,
        Step::Errors => steps::errors::process(&set, sink)?,
        Step::Stats => steps::stats::process(&set, sink)?,
        Step::Databases => *capacities = CapacityIndex::from_databases(&set)?,
        Step::PoolsExtended => steps::pools::process(&set, capacities, sink)?,
    }

    Ok(())
}

async fn query(
    console: &dyn AdminConsole,
    command: &str,
    deadline: Option<Instant>,
) -> Result<ResultSet, StepError> {
    let Some(deadline) = deadline else {
        return Ok(console.query(command).await?);
    };

    if Instant::now() >= deadline {
        return Err(StepError::DeadlineExceeded);
    }

    match timeout_at(deadline, console.query(command)).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(StepError::DeadlineExceeded),
    }
}

fn emit_up(sink: &mut dyn MetricSink, up: bool) {
    let value = if up { 1.0 } else { 0.0 };
    if let Err(err) = sink.emit(MetricSample::new(&EXPORTER_UP, value, Vec::<String>::new())) {
        warn!(error = %err, "failed to emit odyssey_exporter_up");
    }
}
