use crate::collectors::catalogue::ERRORS_TOTAL;
use crate::collectors::rows::{ResultSet, cell};
use crate::collectors::sink::{MetricSample, MetricSink};
use anyhow::{Result, anyhow};

/// `show errors;` → `odyssey_errors_total{type}`
///
/// # Errors
///
/// Returns an error if `error_type` or `count` are missing or a count is not
/// numeric.
pub fn process(set: &ResultSet, sink: &mut dyn MetricSink) -> Result<()> {
    if set.is_empty() {
        return Ok(());
    }

    let [type_idx, count_idx] = set.resolve("errors", ["error_type", "count"])?;

    for row in &set.rows {
        let error_type = cell(row, type_idx).to_text("error_type")?;
        let count = cell(row, count_idx)
            .to_f64("count")
            .and_then(|count| count.ok_or_else(|| anyhow!("count is NULL")))
            .map_err(|e| anyhow!("can't parse count of {error_type:?}: {e}"))?;

        sink.emit(MetricSample::new(&ERRORS_TOTAL, count, [error_type]))?;
    }

    Ok(())
}
