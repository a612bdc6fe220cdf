//! Build, packaging and validation pipeline for Smelter analyzer plugins
//!
//! This crate drives the whole lifecycle of a Smelter plugin project:
//!
//! - **Build**: orchestrates the external build tool over the project's
//!   modules in dependency order, installs prerequisite artifacts and
//!   assembles the distributable package tree ([`build`])
//! - **Rules**: turns rul definition files and their CSV side tables into
//!   the platform rule catalog and default quality profile ([`rules`])
//! - **Harness**: downloads a server and scanner, installs the built
//!   plugins and scans a sample project end to end ([`harness`])
//! - **Validate**: compares measured values against a golden expectation
//!   file ([`validate`])
//!
//! Projects are described by a `smelter.toml` at their root; see
//! [`config::ProjectConfig`].

pub mod build;
pub mod config;
pub mod error;
pub mod harness;
pub mod report;
pub mod rules;
pub mod tools;
pub mod validate;

pub use build::{BuildResults, BuildSystem};
pub use config::{BuildConfig, ModuleSelection, ProjectConfig};
pub use error::{BuildError, BuildResult};
pub use report::{CheckReport, Finding, Severity};

/// Version of the build core
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Walk up from `start` to find the project root, marked by a `smelter.toml`
pub fn detect_project_root(start: &std::path::Path) -> BuildResult<std::path::PathBuf> {
    let mut current = start;
    loop {
        if current.join("smelter.toml").exists() {
            return Ok(current.to_path_buf());
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => {
                return Err(BuildError::Workspace(format!(
                    "no smelter.toml found in {} or any parent directory",
                    start.display()
                )))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_detect_project_root_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("smelter.toml"), r#"package_name = "pkg""#).unwrap();
        let nested = dir.path().join("src").join("core");
        std::fs::create_dir_all(&nested).unwrap();

        let root = detect_project_root(&nested).unwrap();
        assert_eq!(root, dir.path());
    }

    #[test]
    fn test_detect_project_root_fails_without_marker() {
        let dir = tempfile::tempdir().unwrap();
        let err = detect_project_root(dir.path()).unwrap_err();
        assert!(matches!(err, BuildError::Workspace(_)));
    }
}
