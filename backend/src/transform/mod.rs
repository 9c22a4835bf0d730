//! Grid transformations.
//!
//! - [`transpose`]: reorient raw reader output (wells across columns)
//! - [`normalize`]: rebase each well against its baseline
//! - [`summarize`]: First Peak and AUC per well
//! - [`pipeline`]: file-level orchestration of the three stages

pub mod filter;
pub mod normalize;
pub mod pipeline;
pub mod summarize;
pub mod transpose;

pub use filter::ColumnFilter;
pub use normalize::{normalize_avg, normalize_time_zero, NormalizeMethod};
pub use pipeline::*;
pub use summarize::{summarize, WellSummary};
pub use transpose::transpose;
