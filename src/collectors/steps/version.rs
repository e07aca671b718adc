use crate::collectors::catalogue::VERSION_INFO;
use crate::collectors::rows::{ResultSet, cell};
use crate::collectors::sink::{MetricSample, MetricSink};
use anyhow::{Result, anyhow};

/// The version string reported by `show version;`.
///
/// # Errors
///
/// Returns an error if the `version` column is missing or nothing came back.
pub fn parse(set: &ResultSet) -> Result<String> {
    let row = set
        .rows
        .first()
        .ok_or_else(|| anyhow!("empty version command output"))?;

    let [version_idx] = set.resolve("version", ["version"])?;
    cell(row, version_idx).to_text("version")
}

/// `show version;` → `odyssey_version_info{version} 1`
///
/// # Errors
///
/// Same as [`parse`].
pub fn process(set: &ResultSet, sink: &mut dyn MetricSink) -> Result<()> {
    let version = parse(set)?;
    sink.emit(MetricSample::new(&VERSION_INFO, 1.0, [version]))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_version_info() {
        let set = ResultSet::new(["version"]).with_row(["1.4.1-abc"]);
        let mut sink: Vec<MetricSample> = Vec::new();
        process(&set, &mut sink).unwrap();
        assert_eq!(sink, vec![MetricSample::new(&VERSION_INFO, 1.0, ["1.4.1-abc"])]);
    }

    #[test]
    fn test_empty_output() {
        let err = process(&ResultSet::new(["version"]), &mut Vec::<MetricSample>::new())
            .unwrap_err()
            .to_string();
        assert!(err.contains("empty version"), "{err}");
    }

    #[test]
    fn test_parse() {
        let set = ResultSet::new(["version"]).with_row(["1.3"]).with_row(["ignored"]);
        assert_eq!(parse(&set).unwrap(), "1.3");
    }

    #[test]
    fn test_unexpected_format() {
        let set = ResultSet::new(["server_version"]).with_row(["1.4"]);
        let err = process(&set, &mut Vec::<MetricSample>::new()).unwrap_err().to_string();
        assert!(err.contains("unexpected version output format"), "{err}");
    }
}
