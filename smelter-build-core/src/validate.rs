//! Measure validation
//!
//! Compares the measures a scanned project reports against a golden
//! expectation file. Numeric measures are compared after rounding to two
//! decimals so float noise between server versions does not fail a run;
//! everything else is compared verbatim.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

use serde_json::Value;

use crate::error::{BuildError, BuildResult};
use crate::report::{CheckReport, Finding};

const SOURCE: &str = "measure-validation";

/// Parse a measures document into a metric-to-value map
///
/// Two shapes are accepted: a flat JSON object mapping metric keys to
/// values, and the server measures API response with a `component.measures`
/// array of `{metric, value}` objects.
pub fn normalize_measures(doc: &Value) -> BuildResult<BTreeMap<String, Value>> {
    if let Some(measures) = doc.pointer("/component/measures").and_then(Value::as_array) {
        let mut map = BTreeMap::new();
        for entry in measures {
            let metric = entry
                .get("metric")
                .and_then(Value::as_str)
                .ok_or_else(|| BuildError::Validation("measure entry without metric key".to_string()))?;
            let value = entry.get("value").cloned().unwrap_or(Value::Null);
            map.insert(metric.to_string(), value);
        }
        return Ok(map);
    }

    if let Some(object) = doc.as_object() {
        return Ok(object.iter().map(|(k, v)| (k.clone(), v.clone())).collect());
    }

    Err(BuildError::Validation(
        "measures document is neither a metric map nor a component response".to_string(),
    ))
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Whether two measure values match
///
/// If both parse as numbers they match when equal after rounding to two
/// decimals; otherwise the rendered values must be identical. Rounding goes
/// through two-decimal formatting, which rounds the exact decimal value of
/// the float; multiplying by 100 first can manufacture a `.5` tie that the
/// stored value does not have.
pub fn values_match(expected: &Value, measured: &Value) -> bool {
    match (as_number(expected), as_number(measured)) {
        (Some(a), Some(b)) => format!("{:.2}", a) == format!("{:.2}", b),
        _ => render(expected) == render(measured),
    }
}

/// Compare measured values against expectations, producing findings
///
/// Every expected metric must be present and matching. Metrics the
/// measurement reports beyond the expectation are ignored.
pub fn compare_measures(
    expected: &BTreeMap<String, Value>,
    measured: &BTreeMap<String, Value>,
) -> Vec<Finding> {
    let mut findings = Vec::new();
    for (metric, want) in expected {
        match measured.get(metric) {
            None => findings.push(Finding::error(
                metric,
                "expected measure is missing from the scan result".to_string(),
                SOURCE,
            )),
            Some(got) if values_match(want, got) => findings.push(Finding::info(
                metric,
                format!("matches expected value {}", render(want)),
                SOURCE,
            )),
            Some(got) => findings.push(Finding::error(
                metric,
                format!("expected {}, measured {}", render(want), render(got)),
                SOURCE,
            )),
        }
    }
    findings
}

fn load_measures_file(path: &Path) -> BuildResult<BTreeMap<String, Value>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| BuildError::Validation(format!("cannot read {}: {}", path.display(), e)))?;
    let doc: Value = serde_json::from_str(&content)
        .map_err(|e| BuildError::Validation(format!("invalid JSON in {}: {}", path.display(), e)))?;
    normalize_measures(&doc)
}

/// Validate a measured file against a golden expectation file
pub fn validate_files(
    project_root: &Path,
    expected_path: &Path,
    measured_path: &Path,
) -> BuildResult<CheckReport> {
    let start = Instant::now();
    let expected = load_measures_file(expected_path)?;
    let measured = load_measures_file(measured_path)?;

    let mut report = CheckReport::new(project_root.to_path_buf(), "validate");
    report.extend(compare_measures(&expected, &measured));
    Ok(report.finalize(start.elapsed().as_millis() as u64))
}

/// Fetch measures for a component from a running server
pub fn fetch_measures(base_url: &str, component: &str, metrics: &[&str]) -> BuildResult<Value> {
    let url = format!(
        "{}/api/measures/component?component={}&metricKeys={}",
        base_url,
        component,
        metrics.join(",")
    );
    reqwest::blocking::get(&url)
        .and_then(|r| r.error_for_status())
        .and_then(|r| r.json())
        .map_err(|e| BuildError::Validation(format!("measure fetch from {} failed: {}", url, e)))
}

/// Validate measures fetched from a running server against a golden file
pub fn validate_against_server(
    project_root: &Path,
    expected_path: &Path,
    base_url: &str,
    component: &str,
) -> BuildResult<CheckReport> {
    let start = Instant::now();
    let expected = load_measures_file(expected_path)?;
    let metrics: Vec<&str> = expected.keys().map(String::as_str).collect();
    let measured = normalize_measures(&fetch_measures(base_url, component, &metrics)?)?;

    let mut report = CheckReport::new(project_root.to_path_buf(), "validate");
    report.extend(compare_measures(&expected, &measured));
    Ok(report.finalize(start.elapsed().as_millis() as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(doc: Value) -> BTreeMap<String, Value> {
        normalize_measures(&doc).unwrap()
    }

    #[test]
    fn test_normalize_flat_object() {
        let m = map(json!({"LOC": 120, "McCC": "3.5"}));
        assert_eq!(m.len(), 2);
        assert_eq!(m["LOC"], json!(120));
        assert_eq!(m["McCC"], json!("3.5"));
    }

    #[test]
    fn test_normalize_component_response() {
        let m = map(json!({
            "component": {
                "key": "sample",
                "measures": [
                    {"metric": "LOC", "value": "120"},
                    {"metric": "McCC", "value": "3.5"}
                ]
            }
        }));
        assert_eq!(m.len(), 2);
        assert_eq!(m["LOC"], json!("120"));
    }

    #[test]
    fn test_normalize_rejects_other_shapes() {
        assert!(normalize_measures(&json!([1, 2, 3])).is_err());
        assert!(normalize_measures(&json!("LOC")).is_err());
    }

    #[test]
    fn test_numeric_match_rounds_to_two_decimals() {
        assert!(values_match(&json!(3.141), &json!(3.1449)));
        assert!(!values_match(&json!(3.14), &json!(3.15)));
        // Number/string pairs still compare numerically
        assert!(values_match(&json!("120"), &json!(120.0)));
        // 0.305 is stored just below the tie; it must round like 0.3049,
        // not get pushed to .31 by a multiply-then-round detour
        assert!(values_match(&json!("0.305"), &json!(0.3049)));
        assert!(values_match(&json!(0.305), &json!(0.30)));
    }

    #[test]
    fn test_non_numeric_match_is_exact() {
        assert!(values_match(&json!("OK"), &json!("OK")));
        assert!(!values_match(&json!("OK"), &json!("ok")));
    }

    #[test]
    fn test_compare_flags_missing_and_mismatched() {
        let expected = map(json!({"LOC": 120, "McCC": 3.5, "AD": "55.5"}));
        let measured = map(json!({"LOC": 120, "McCC": 4.0}));

        let findings = compare_measures(&expected, &measured);
        assert_eq!(findings.len(), 3);

        let missing = findings.iter().find(|f| f.subject == "AD").unwrap();
        assert!(missing.message.contains("missing"));

        let mismatch = findings.iter().find(|f| f.subject == "McCC").unwrap();
        assert!(mismatch.message.contains("expected 3.5"));

        let matching = findings.iter().find(|f| f.subject == "LOC").unwrap();
        assert_eq!(matching.severity, crate::report::Severity::Info);
    }

    #[test]
    fn test_validate_files_reports_success_and_failure() {
        let dir = tempfile::tempdir().unwrap();
        let expected = dir.path().join("expected.json");
        let measured = dir.path().join("measured.json");
        std::fs::write(&expected, r#"{"LOC": 120}"#).unwrap();
        std::fs::write(&measured, r#"{"LOC": "120", "EXTRA": 1}"#).unwrap();

        let report = validate_files(dir.path(), &expected, &measured).unwrap();
        assert!(report.is_success());
        assert_eq!(report.summary.total, 1);

        std::fs::write(&measured, r#"{"LOC": 121}"#).unwrap();
        let report = validate_files(dir.path(), &expected, &measured).unwrap();
        assert!(report.has_errors());
    }

    #[test]
    fn test_validate_files_missing_file_is_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let expected = dir.path().join("expected.json");
        std::fs::write(&expected, r#"{"LOC": 120}"#).unwrap();

        let err =
            validate_files(dir.path(), &expected, &dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, BuildError::Validation(_)));
    }
}
