use crate::collectors::steps::Step;
use std::fmt;
use thiserror::Error;

/// Why a single step (or the connection) failed.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("scrape deadline exceeded")]
    DeadlineExceeded,

    #[error("{0:#}")]
    Failed(anyhow::Error),
}

impl From<anyhow::Error> for StepError {
    fn from(err: anyhow::Error) -> Self {
        Self::Failed(err)
    }
}

impl StepError {
    /// Short label used by the failure counters.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::DeadlineExceeded => "deadline",
            Self::Failed(_) => "error",
        }
    }
}

/// A step error tagged with the step that produced it.
#[derive(Debug, Error)]
#[error("{step}: {source}")]
pub struct StepFailure {
    pub step: Step,
    pub source: StepError,
}

/// Everything that went wrong during one scrape.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("can't connect to Odyssey: {0}")]
    Connect(StepError),

    #[error("{}", JoinedFailures(.0))]
    Steps(Vec<StepFailure>),
}

impl ScrapeError {
    /// Per-step failures; empty for connection errors.
    #[must_use]
    pub fn failures(&self) -> &[StepFailure] {
        match self {
            Self::Connect(_) => &[],
            Self::Steps(failures) => failures,
        }
    }
}

struct JoinedFailures<'a>(&'a [StepFailure]);

impl fmt::Display for JoinedFailures<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{failure}")?;
        }
        Ok(())
    }
}
