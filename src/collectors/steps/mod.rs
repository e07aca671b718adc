//! Scrape steps: one console command each, run in a fixed order.

use std::fmt;

pub mod errors;
pub mod lists;
pub mod paused;
pub mod pools;
pub mod stats;
pub mod version;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Step {
    Version,
    Lists,
    IsPaused,
    Errors,
    Stats,
    Databases,
    PoolsExtended,
}

impl Step {
    /// Execution order. `Databases` must run before `PoolsExtended`.
    pub const ALL: [Self; 7] = [
        Self::Version,
        Self::Lists,
        Self::IsPaused,
        Self::Errors,
        Self::Stats,
        Self::Databases,
        Self::PoolsExtended,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Version => "version",
            Self::Lists => "lists",
            Self::IsPaused => "is_paused",
            Self::Errors => "errors",
            Self::Stats => "stats",
            Self::Databases => "databases",
            Self::PoolsExtended => "pools_extended",
        }
    }

    #[must_use]
    pub const fn command(self) -> &'static str {
        match self {
            Self::Version => "show version;",
            Self::Lists => "show lists;",
            Self::IsPaused => "show is_paused;",
            Self::Errors => "show errors;",
            Self::Stats => "show stats;",
            Self::Databases => "show databases;",
            Self::PoolsExtended => "show pools_extended;",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
