//! Error types for the audit workflow

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while configuring, running or exporting an audit
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Raster engine error: {0}")]
    Engine(#[from] terraval_core::Error),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config serialization error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Scene manifest error: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("Scene catalog error: {0}")]
    Catalog(String),

    #[error("Export error: {0}")]
    Export(String),
}

impl AuditError {
    /// Whether the failure means a statistic cannot be trusted, as opposed to
    /// a configuration or I/O problem
    pub fn is_data_quality(&self) -> bool {
        matches!(
            self,
            AuditError::Engine(terraval_core::Error::EmptyComposite { .. })
        )
    }

    /// Whether a reduction or vectorization exceeded its pixel budget
    pub fn is_resource_limit(&self) -> bool {
        matches!(
            self,
            AuditError::Engine(terraval_core::Error::PixelBudgetExceeded { .. })
        )
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AuditError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, AuditError>;
