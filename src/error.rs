use std::path::PathBuf;
use thiserror::Error;

use crate::record::Party;

/// Failure to read the shipment dataset.
///
/// Any of these aborts the current render pass: the dashboard shows the message
/// and nothing that depends on the table.
#[derive(Debug, Error)]
pub enum DataLoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open workbook {path}: {reason}")]
    Workbook { path: PathBuf, reason: String },

    #[error("workbook {0} has no worksheets")]
    NoWorksheet(PathBuf),

    #[error("dataset is empty (no header row)")]
    Empty,

    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("row {row}: invalid value {value:?} in column {column}")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },

    #[error("row {row}: expected {expected} cells, found {found}")]
    ShortRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("failed to parse CSV {path}: {reason}")]
    Csv { path: PathBuf, reason: String },

    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),
}

/// Errors surfaced by dashboard operations.
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error(transparent)]
    DataLoad(#[from] DataLoadError),

    /// The selected company has no shipments for the chosen role.
    #[error("no shipments found for {party} {company:?}")]
    NotFound { party: Party, company: String },

    #[error("please select a {0}")]
    NoCompanySelected(Party),

    #[error("export failed: {0}")]
    Export(String),
}

pub type Result<T, E = DashboardError> = std::result::Result<T, E>;
