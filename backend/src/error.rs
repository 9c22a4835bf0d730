//! Error types for the Wellflow pipeline.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`GridError`] - Loading and saving spreadsheet grids
//! - [`TransformError`] - Grid shape violations inside a stage
//! - [`ConfigError`] - Invalid configuration values
//! - [`PipelineError`] - Top-level orchestration errors
//! - [`ServerError`] - HTTP API errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.
//!
//! Cells that fail numeric coercion, zero baselines and malformed column
//! filters are not errors: each stage degrades silently for those.

use std::path::PathBuf;

use thiserror::Error;

// =============================================================================
// Grid I/O Errors
// =============================================================================

/// Errors while loading or saving a grid.
#[derive(Debug, Error)]
pub enum GridError {
    /// Input file does not exist.
    #[error("Input file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Failed to read or write a file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Spreadsheet could not be opened or read.
    #[error("Failed to read workbook: {0}")]
    Workbook(#[from] calamine::Error),

    /// Spreadsheet could not be written.
    #[error("Failed to write workbook: {0}")]
    WorkbookWrite(#[from] rust_xlsxwriter::XlsxError),

    /// Delimited text could not be read or written.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Bytes could not be decoded to text.
    #[error("Failed to decode content: {0}")]
    Encoding(String),

    /// File extension not handled by the requested operation.
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Workbook contains no sheet.
    #[error("Workbook has no worksheet")]
    EmptyWorkbook,

    /// Grid exceeds spreadsheet limits.
    #[error("Grid too large for a worksheet: {rows} rows x {columns} columns")]
    TooLarge { rows: usize, columns: usize },
}

// =============================================================================
// Transformation Errors
// =============================================================================

/// Errors raised when a grid does not have the layout a stage expects.
#[derive(Debug, Error, PartialEq)]
pub enum TransformError {
    /// Grid has fewer structural rows than the stage layout requires.
    #[error("{stage}: expected at least {expected} rows, found {found}")]
    MissingRows {
        stage: &'static str,
        expected: usize,
        found: usize,
    },

    /// No row survived numeric coercion of the time column.
    #[error("{0}: no data rows with a numeric time value")]
    NoDataRows(&'static str),
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while reading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed.
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the error type returned by the file-level functions in
/// [`crate::transform::pipeline`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Grid I/O error.
    #[error(transparent)]
    Grid(#[from] GridError),

    /// Stage layout error.
    #[error(transparent)]
    Transform(#[from] TransformError),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for grid I/O.
pub type GridResult<T> = Result<T, GridError>;

/// Result type for stage transformations.
pub type TransformResult<T> = Result<T, TransformError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
