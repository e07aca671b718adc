use crate::collectors::catalogue::list_metric;
use crate::collectors::rows::{ResultSet, cell};
use crate::collectors::sink::{MetricSample, MetricSink};
use anyhow::{Result, anyhow};
use tracing::trace;

/// `show lists;` → one `odyssey_lists_*` gauge per known list.
///
/// # Errors
///
/// Returns an error if `list` or `items` are missing or an item count is not
/// numeric.
pub fn process(set: &ResultSet, sink: &mut dyn MetricSink) -> Result<()> {
    if set.is_empty() {
        return Ok(());
    }

    let [list_idx, items_idx] = set.resolve("lists", ["list", "items"])?;

    for row in &set.rows {
        let list = cell(row, list_idx).to_text("list")?;
        let items = cell(row, items_idx)
            .to_f64("items")
            .and_then(|items| items.ok_or_else(|| anyhow!("items is NULL")))
            .map_err(|e| anyhow!("can't parse items of {list:?}: {e}"))?;

        match list_metric(&list) {
            Some(metric) => {
                sink.emit(MetricSample::new(
                    metric.desc,
                    metric.unit.apply(items),
                    Vec::<String>::new(),
                ))?;
            }
            None => trace!(list = %list, "ignoring unknown list"),
        }
    }

    Ok(())
}
