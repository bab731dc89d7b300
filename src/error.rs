//! Error types for the easyexcel library

use thiserror::Error;

/// Result type alias for export operations
pub type Result<T> = std::result::Result<T, ExportError>;

/// Main error type for all export operations
#[derive(Error, Debug)]
pub enum ExportError {
    /// Invalid export configuration, detected before any row is fetched
    #[error("Invalid export configuration: {0}")]
    Config(String),

    /// The row source rejected or failed a query
    #[error("Query failed: {0}")]
    Query(String),

    /// A column transform produced a value of the wrong shape
    #[error("Transform failed on row {row}: {message}")]
    Transform { row: u32, message: String },

    /// The request was rejected by a permission check
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Error occurred while writing the XLSX package
    #[error("Failed to write Excel file: {0}")]
    WriteError(String),

    /// IO error wrapper
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// A blocking export task could not be joined
    #[error("Export task failed: {0}")]
    Task(String),
}

impl ExportError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        ExportError::Config(msg.into())
    }

    pub(crate) fn query(msg: impl Into<String>) -> Self {
        ExportError::Query(msg.into())
    }
}

impl From<zip::result::ZipError> for ExportError {
    fn from(err: zip::result::ZipError) -> Self {
        ExportError::WriteError(err.to_string())
    }
}

#[cfg(feature = "postgres")]
impl From<postgres::Error> for ExportError {
    fn from(err: postgres::Error) -> Self {
        ExportError::Query(err.to_string())
    }
}
