//! Custom error types for the package updater.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for package maintenance operations.
#[derive(Error, Debug)]
pub enum UpdaterError {
    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Missing configuration file: {0}")]
    MissingConfigFile(PathBuf),

    // Consolidation errors
    #[error("Source package has no dbt_project.yml: {0}")]
    MissingSourceProject(PathBuf),

    #[error("Project file {path} is not a YAML mapping")]
    MalformedProject { path: PathBuf },

    // Version control errors
    #[error("Git operation failed: {0}")]
    GitError(#[from] git2::Error),

    #[error("Invalid repository URL: {0}")]
    UrlError(#[from] url::ParseError),

    // Parsing errors - automatic conversions via #[from]
    #[error("YAML parse error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid version format: {0}")]
    InvalidVersion(#[from] semver::Error),

    #[error("Regular expression error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("Directory walk failed: {0}")]
    WalkError(#[from] walkdir::Error),

    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] log::SetLoggerError),

    // Generic wrapper for other errors
    #[error(transparent)]
    Other(#[from] color_eyre::Report),
}

/// Result type alias using UpdaterError
pub type Result<T> = std::result::Result<T, UpdaterError>;

impl UpdaterError {
    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Whether this failure came from the version-control layer
    /// (clone, branch, commit, push).
    pub fn is_version_control(&self) -> bool {
        matches!(self, Self::GitError(_) | Self::UrlError(_))
    }
}

// Implement From for std::io::Error - wraps in Other variant for generic I/O errors
impl From<std::io::Error> for UpdaterError {
    fn from(err: std::io::Error) -> Self {
        Self::Other(color_eyre::Report::from(err))
    }
}
