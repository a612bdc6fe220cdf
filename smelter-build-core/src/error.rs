//! Error types for the Smelter build system

use thiserror::Error;

/// Errors produced by build system operations
#[derive(Debug, Error)]
pub enum BuildError {
    /// A module build or packaging step failed
    #[error("build failed: {0}")]
    Build(String),

    /// An external tool could not be executed or was not found
    #[error("tool error: {0}")]
    Tool(String),

    /// The project layout or configuration is invalid
    #[error("workspace error: {0}")]
    Workspace(String),

    /// Rule catalog parsing or generation failed
    #[error("rule catalog error: {0}")]
    Catalog(String),

    /// The integration harness failed (download, extraction, server startup)
    #[error("harness error: {0}")]
    Harness(String),

    /// Measured values did not match the expected golden data
    #[error("validation failed: {0}")]
    Validation(String),

    /// Underlying I/O failure
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout the build system
pub type BuildResult<T> = Result<T, BuildError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BuildError::Build("module core-plugin exited with 1".to_string());
        assert_eq!(
            err.to_string(),
            "build failed: module core-plugin exited with 1"
        );

        let err = BuildError::Validation("2 metrics differ".to_string());
        assert_eq!(err.to_string(), "validation failed: 2 metrics differ");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: BuildError = io.into();
        assert!(matches!(err, BuildError::Io(_)));
    }
}
