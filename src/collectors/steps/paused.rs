use crate::collectors::catalogue::IS_PAUSED;
use crate::collectors::rows::{ResultSet, cell};
use crate::collectors::sink::{MetricSample, MetricSink};
use anyhow::{Result, anyhow};

/// `show is_paused;` → `odyssey_is_paused` 1 or 0
///
/// # Errors
///
/// Returns an error if the `is_paused` column is missing, empty or not a
/// boolean.
pub fn process(set: &ResultSet, sink: &mut dyn MetricSink) -> Result<()> {
    let row = set
        .rows
        .first()
        .ok_or_else(|| anyhow!("empty paused command output"))?;

    let [paused_idx] = set.resolve("is_paused", ["is_paused"])?;
    let paused = cell(row, paused_idx).to_bool("is_paused")?;

    sink.emit(MetricSample::new(
        &IS_PAUSED,
        if paused { 1.0 } else { 0.0 },
        Vec::<String>::new(),
    ))
}
