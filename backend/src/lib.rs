//! # Wellflow - plate-reader kinetics pipeline
//!
//! Wellflow turns raw plate-reader spreadsheet exports into per-well
//! summary features in three file-to-file stages.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Raw export  │────▶│  Transpose  │────▶│  Normalize  │────▶│  FP / AUC   │
//! │ (xlsx/csv)  │     │ (anchor B8) │     │ (t0 or avg) │     │ (per well)  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use wellflow::{run_all_file, PipelineConfig};
//! use std::path::Path;
//!
//! let reports = run_all_file(Path::new("plate.xlsx"), &PipelineConfig::default())?;
//! println!("Summary written to {}", reports[2].output.display());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Cells, grids and cell addresses
//! - [`config`] - Pipeline configuration with environment overrides
//! - [`workbook`] - Loading and saving grids (xlsx, xls, ods, csv)
//! - [`transform`] - Transpose, normalize, summarize and orchestration
//! - [`api`] - HTTP API server and log streaming

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Grid I/O
pub mod workbook;

// Transformation
pub mod transform;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError, GridError, GridResult, PipelineError, PipelineResult, ServerError,
    ServerResult, TransformError, TransformResult,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{column_index_to_letters, column_letters_to_index, Cell, CellRef, Grid};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::PipelineConfig;

// =============================================================================
// Re-exports - Grid I/O
// =============================================================================

pub use workbook::{grid_to_xlsx_bytes, load_grid, load_grid_bytes, save_grid, GridFormat};

// =============================================================================
// Re-exports - Stages
// =============================================================================

pub use transform::{
    normalize_avg, normalize_time_zero, summarize, transpose, ColumnFilter, NormalizeMethod,
    WellSummary,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{
    chain_for, default_output_path, normalize_file, run_all_file, run_stage_file, run_stages_bytes,
    summarize_file, transpose_file, Stage, StageReport,
};

// Server
pub mod server {
    pub use crate::api::server::{router, start_server};
}
