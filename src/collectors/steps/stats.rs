use crate::collectors::catalogue::{ColumnMetric, STATS_OPTIONAL, STATS_REQUIRED};
use crate::collectors::rows::{ResultSet, cell};
use crate::collectors::sink::{MetricSample, MetricSink};
use anyhow::{Result, anyhow};

/// `show stats;` → per-database averages.
///
/// Only `database`, `avg_xact_count` and `avg_query_count` are required;
/// the other averages are emitted when the running Odyssey reports them.
/// Null values read as zero and rows without a database are skipped.
///
/// # Errors
///
/// Returns an error if a required column is missing or a value is not
/// numeric.
pub fn process(set: &ResultSet, sink: &mut dyn MetricSink) -> Result<()> {
    if set.is_empty() {
        return Ok(());
    }

    let [database_idx] = set.resolve("stats", ["database"])?;

    let mut columns: Vec<(usize, &'static ColumnMetric)> = Vec::new();
    for metric in &STATS_REQUIRED {
        let [idx] = set.resolve("stats", [metric.column])?;
        columns.push((idx, metric));
    }
    for metric in &STATS_OPTIONAL {
        if let Some(idx) = set.position(metric.column) {
            columns.push((idx, metric));
        }
    }

    for row in &set.rows {
        let Some(database) = cell(row, database_idx).to_opt_text("database")? else {
            continue;
        };
        if database.is_empty() {
            continue;
        }

        for (idx, metric) in &columns {
            let value = cell(row, *idx)
                .to_f64_or_zero(metric.column)
                .map_err(|e| anyhow!("can't parse {} for {database}: {e}", metric.column))?;

            sink.emit(MetricSample::new(
                metric.desc,
                metric.unit.apply(value),
                [database.as_str()],
            ))?;
        }
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::collectors::value::CellValue;

    fn values(sink: &[MetricSample], name: &str) -> Vec<(String, f64)> {
        sink.iter()
            .filter(|s| s.desc.name == name)
            .map(|s| (s.labels.join(","), s.value))
            .collect()
    }

    #[test]
    fn test_minimal_columns() {
        let set = ResultSet::new(["database", "avg_xact_count", "avg_query_count"])
            .with_row(["app", "10", "20"]);
        let mut sink: Vec<MetricSample> = Vec::new();
        process(&set, &mut sink).unwrap();

        assert_eq!(sink.len(), 2);
        assert_eq!(
            values(&sink, "odyssey_database_avg_tx_per_second"),
            vec![("app".to_string(), 10.0)]
        );
        assert!(values(&sink, "odyssey_database_avg_wait_time_seconds").is_empty());
    }

    #[test]
    fn test_optional_columns_and_microseconds() {
        let set = ResultSet::new([
            "database",
            "avg_xact_count",
            "avg_query_count",
            "avg_recv",
            "avg_sent",
            "avg_xact_time",
            "avg_query_time",
            "avg_wait_time",
        ])
        .with_row(["app", "1", "2", "300", "400", "2000000", "500000", "0"]);
        let mut sink: Vec<MetricSample> = Vec::new();
        process(&set, &mut sink).unwrap();

        assert_eq!(sink.len(), 7);
        assert_eq!(
            values(&sink, "odyssey_database_avg_xact_time_seconds"),
            vec![("app".to_string(), 2.0)]
        );
        assert_eq!(
            values(&sink, "odyssey_database_avg_query_time_seconds"),
            vec![("app".to_string(), 0.5)]
        );
        assert_eq!(
            values(&sink, "odyssey_database_avg_recv_bytes_per_second"),
            vec![("app".to_string(), 300.0)]
        );
    }

    #[test]
    fn test_rows_without_database_are_skipped() {
        let set = ResultSet::new(["database", "avg_xact_count", "avg_query_count"])
            .with_row([CellValue::Null, CellValue::from("1"), CellValue::from("1")])
            .with_row(["", "1", "1"])
            .with_row(["app", "1", "1"]);
        let mut sink: Vec<MetricSample> = Vec::new();
        process(&set, &mut sink).unwrap();
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn test_null_reads_as_zero() {
        let set = ResultSet::new(["database", "avg_xact_count", "avg_query_count"])
            .with_row([CellValue::from("app"), CellValue::Null, CellValue::Int(4)]);
        let mut sink: Vec<MetricSample> = Vec::new();
        process(&set, &mut sink).unwrap();
        assert_eq!(
            values(&sink, "odyssey_database_avg_tx_per_second"),
            vec![("app".to_string(), 0.0)]
        );
    }

    #[test]
    fn test_missing_required_column() {
        let set = ResultSet::new(["database", "avg_xact_count"]).with_row(["app", "1"]);
        let err = process(&set, &mut Vec::<MetricSample>::new())
            .unwrap_err()
            .to_string();
        assert!(err.contains("avg_query_count"), "{err}");
    }

    #[test]
    fn test_bad_value_names_database() {
        let set = ResultSet::new(["database", "avg_xact_count", "avg_query_count"])
            .with_row(["app", "x", "1"]);
        let err = process(&set, &mut Vec::<MetricSample>::new())
            .unwrap_err()
            .to_string();
        assert!(err.contains("avg_xact_count for app"), "{err}");
    }
}
