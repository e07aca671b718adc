//! `show pools_extended;` synthesizer.
//!
//! One row per route. Every column other than `database` and `user` must be
//! known: a table-driven metric, a latency quantile, a server state, the pool
//! mode, or a deprecated column. Each row yields its table metrics, five
//! `odyssey_server_pool_state_route` samples and one capacity sample.

use crate::collectors::capacity::CapacityIndex;
use crate::collectors::catalogue::{
    PoolColumn, ROUTE_POOL_MODE_INFO, SERVER_CAPACITY_ROUTE, SERVER_STATE_ROUTE, SERVER_STATES,
    Unit, pool_column,
};
use crate::collectors::rows::{ResultSet, cell};
use crate::collectors::sink::{MetricSample, MetricSink};
use anyhow::{Result, anyhow};
use tracing::trace;

const AGGREGATED: &str = "aggregated";

/// # Errors
///
/// Returns an error if `database`/`user` are missing, a column is unknown,
/// or a value can't be decoded. Samples emitted before the failing row stay
/// in the sink.
pub fn process(
    set: &ResultSet,
    capacities: &CapacityIndex,
    sink: &mut dyn MetricSink,
) -> Result<()> {
    if set.is_empty() {
        return Ok(());
    }

    let [database_idx, user_idx] = set.resolve("pools", ["database", "user"])?;

    let mut columns: Vec<(usize, &str, PoolColumn<'_>)> = Vec::with_capacity(set.columns.len());
    for (idx, name) in set.columns.iter().enumerate() {
        if idx == database_idx || idx == user_idx {
            continue;
        }
        let kind = pool_column(name).ok_or_else(|| anyhow!("got unexpected column {name:?}"))?;
        columns.push((idx, name.as_str(), kind));
    }

    for row in &set.rows {
        let database = cell(row, database_idx).to_text("database")?;
        let user = cell(row, user_idx).to_text("user")?;

        if database == AGGREGATED && user == AGGREGATED {
            continue;
        }

        let mut states = [0.0_f64; SERVER_STATES.len()];

        for (idx, name, kind) in &columns {
            let value = cell(row, *idx);

            match kind {
                PoolColumn::Deprecated => {}
                PoolColumn::PoolMode => {
                    if let Some(mode) = value.to_opt_text(name)? {
                        sink.emit(MetricSample::new(
                            &ROUTE_POOL_MODE_INFO,
                            1.0,
                            [user.as_str(), database.as_str(), mode.as_str()],
                        ))?;
                    }
                }
                PoolColumn::ServerState(slot) => {
                    if let Some(state) = states.get_mut(*slot) {
                        *state = value.to_f64_or_zero(name)?;
                    }
                }
                PoolColumn::Quantile { desc, quantile } => {
                    sink.emit(MetricSample::new(
                        *desc,
                        Unit::Microseconds.apply(value.to_f64_or_zero(name)?),
                        [user.as_str(), database.as_str(), *quantile],
                    ))?;
                }
                PoolColumn::Metric(metric) => {
                    if value.is_null() {
                        trace!(column = *name, %database, %user, "NULL value read as 0");
                    }
                    sink.emit(MetricSample::new(
                        metric.desc,
                        metric.unit.apply(value.to_f64_or_zero(name)?),
                        [user.as_str(), database.as_str()],
                    ))?;
                }
            }
        }

        let [active, idle, ..] = states;
        let capacity = match capacities.lookup(&database, &user) {
            Some(configured) if configured > 0.0 => configured,
            _ => active + idle,
        };
        sink.emit(MetricSample::new(
            &SERVER_CAPACITY_ROUTE,
            capacity,
            [user.as_str(), database.as_str()],
        ))?;

        for ((_, state), value) in SERVER_STATES.iter().zip(states) {
            sink.emit(MetricSample::new(
                &SERVER_STATE_ROUTE,
                value,
                [user.as_str(), database.as_str(), *state],
            ))?;
        }
    }

    Ok(())
}
