//! Analytics error types.

use thiserror::Error;

/// Analytics errors.
#[derive(Error, Debug)]
pub enum AnalyticsError {
    /// DuckDB error
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Dataset location could not be parsed
    #[error("Invalid dataset source '{0}'")]
    InvalidSource(String),

    /// Local dataset does not exist
    #[error("Dataset not found: {0}")]
    SourceNotFound(String),

    /// Query issued before a dataset was loaded
    #[error("No dataset loaded")]
    NoDataset,

    /// Dataset has no records (or no bytes at all)
    #[error("Empty dataset: {source_name} contains no telemetry records")]
    EmptyDataset { source_name: String },

    /// The CSV reader could not parse the dataset
    #[error("Could not read {source_name} as CSV: {reason}")]
    MalformedCsv { source_name: String, reason: String },

    /// Required column absent from the header
    #[error("Missing required column '{column}' in {source_name} (found: {found})")]
    MissingColumn {
        source_name: String,
        column: &'static str,
        found: String,
    },

    /// A numeric column holds a value that is not a number
    #[error("Non-numeric value '{value}' in column '{column}' of {source_name} (data row {row})")]
    NonNumericValue {
        source_name: String,
        column: &'static str,
        row: i64,
        value: String,
    },

    /// Records exist but none are flight records
    #[error("No valid flight records in {source_name} ({total} records, all ground/invalid)")]
    NoValidRecords { source_name: String, total: u64 },

    /// An aggregate came back NULL because the channel has no values
    #[error("Column '{column}' has no values among valid flight records")]
    NullAggregate { column: &'static str },

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Result type for analytics operations.
pub type Result<T> = std::result::Result<T, AnalyticsError>;
