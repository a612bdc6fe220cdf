//! Check reporting for validation and harness runs
//!
//! Findings collected during a run are aggregated into a [`CheckReport`] with
//! summary statistics, printable as colored human output or serialized as
//! JSON for tooling.

use std::fmt;
use std::path::PathBuf;

use colored::Colorize;
use serde::{Deserialize, Serialize};

/// Finding severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Failure that makes the overall check fail
    Error,
    /// Deviation worth noting that does not fail the check
    Warning,
    /// Informational message
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// Individual finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// What the finding is about (metric key, file, module name)
    pub subject: String,
    /// Severity level
    pub severity: Severity,
    /// Human-readable message
    pub message: String,
    /// Component that produced the finding (e.g. "validate", "harness")
    pub source: String,
}

impl Finding {
    /// Create a new finding
    pub fn new(subject: &str, severity: Severity, message: String, source: &str) -> Self {
        Self {
            subject: subject.to_string(),
            severity,
            message,
            source: source.to_string(),
        }
    }

    /// Create an error finding
    pub fn error(subject: &str, message: String, source: &str) -> Self {
        Self::new(subject, Severity::Error, message, source)
    }

    /// Create a warning finding
    pub fn warning(subject: &str, message: String, source: &str) -> Self {
        Self::new(subject, Severity::Warning, message, source)
    }

    /// Create an info finding
    pub fn info(subject: &str, message: String, source: &str) -> Self {
        Self::new(subject, Severity::Info, message, source)
    }
}

/// Summary statistics for a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Total number of findings
    pub total: usize,
    /// Number of errors
    pub errors: usize,
    /// Number of warnings
    pub warnings: usize,
    /// Number of info messages
    pub infos: usize,
    /// Duration of the run in milliseconds
    pub duration_ms: u64,
}

impl ReportSummary {
    /// Create a summary from a finding collection
    pub fn from_findings(findings: &[Finding], duration_ms: u64) -> Self {
        let mut errors = 0;
        let mut warnings = 0;
        let mut infos = 0;

        for finding in findings {
            match finding.severity {
                Severity::Error => errors += 1,
                Severity::Warning => warnings += 1,
                Severity::Info => infos += 1,
            }
        }

        Self {
            total: findings.len(),
            errors,
            warnings,
            infos,
            duration_ms,
        }
    }

    /// Check if there are any errors
    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    /// Check if the run was successful (no errors)
    pub fn is_success(&self) -> bool {
        !self.has_errors()
    }
}

/// Collection of findings with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckReport {
    /// Report format version
    pub version: String,
    /// Timestamp when the report was generated
    pub timestamp: String,
    /// Project root path
    pub project_root: String,
    /// Command that generated the report
    pub command: String,
    /// Individual findings
    pub findings: Vec<Finding>,
    /// Summary statistics
    pub summary: ReportSummary,
}

impl CheckReport {
    /// Create a new, empty report
    pub fn new(project_root: PathBuf, command: &str) -> Self {
        Self {
            version: "1.0".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            project_root: project_root.to_string_lossy().to_string(),
            command: command.to_string(),
            findings: Vec::new(),
            summary: ReportSummary {
                total: 0,
                errors: 0,
                warnings: 0,
                infos: 0,
                duration_ms: 0,
            },
        }
    }

    /// Add a finding
    pub fn add(&mut self, finding: Finding) {
        self.findings.push(finding);
    }

    /// Add multiple findings
    pub fn extend(&mut self, findings: Vec<Finding>) {
        self.findings.extend(findings);
    }

    /// Finalize the report with timing information
    pub fn finalize(mut self, duration_ms: u64) -> Self {
        self.summary = ReportSummary::from_findings(&self.findings, duration_ms);
        self
    }

    /// Check if the report contains any errors
    pub fn has_errors(&self) -> bool {
        self.findings.iter().any(|f| f.severity == Severity::Error)
    }

    /// Check if the run was successful
    pub fn is_success(&self) -> bool {
        !self.has_errors()
    }

    /// Print human-readable output
    pub fn print_human(&self) {
        for finding in &self.findings {
            let marker = match finding.severity {
                Severity::Error => "✗".bright_red(),
                Severity::Warning => "⚠".bright_yellow(),
                Severity::Info => "•".bright_blue(),
            };
            println!("  {} [{}] {}: {}", marker, finding.source, finding.subject, finding.message);
        }

        println!();
        if self.summary.has_errors() {
            println!(
                "{} {} failed: {} errors, {} warnings ({} findings)",
                "❌".bright_red(),
                self.command,
                self.summary.errors,
                self.summary.warnings,
                self.summary.total
            );
        } else {
            println!(
                "{} {} passed: {} warnings ({} findings)",
                "✅".bright_green(),
                self.command,
                self.summary.warnings,
                self.summary.total
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts() {
        let findings = vec![
            Finding::error("McCC", "expected 2.10, got 2.30".to_string(), "validate"),
            Finding::warning("LOC", "metric not measured".to_string(), "validate"),
            Finding::info("LLOC", "matches".to_string(), "validate"),
        ];

        let summary = ReportSummary::from_findings(&findings, 500);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.warnings, 1);
        assert_eq!(summary.infos, 1);
        assert_eq!(summary.duration_ms, 500);
        assert!(summary.has_errors());
        assert!(!summary.is_success());
    }

    #[test]
    fn test_report_lifecycle() {
        let mut report = CheckReport::new(PathBuf::from("/project"), "validate");
        assert!(report.is_success());

        report.add(Finding::error("NOS", "missing from measures".to_string(), "validate"));
        let report = report.finalize(42);

        assert!(report.has_errors());
        assert_eq!(report.summary.total, 1);
        assert_eq!(report.summary.duration_ms, 42);
    }

    #[test]
    fn test_report_serializes_to_json() {
        let mut report = CheckReport::new(PathBuf::from("/project"), "validate");
        report.add(Finding::info("LOC", "matches".to_string(), "validate"));
        let report = report.finalize(1);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["command"], "validate");
        assert_eq!(json["findings"][0]["severity"], "info");
        assert_eq!(json["summary"]["total"], 1);
    }
}
