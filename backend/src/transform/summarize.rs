//! Summarizer: reduce each normalized well to First Peak and AUC.

use crate::error::{TransformError, TransformResult};
use crate::models::{Cell, Grid};

pub const FIRST_PEAK_LABEL: &str = "First Peak";
pub const AUC_LABEL: &str = "AUC";

/// Per-column features of one well.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WellSummary {
    /// Largest value, `None` when the column holds no number.
    pub first_peak: Option<f64>,
    /// Unweighted sum over rows (unit spacing, not time-weighted).
    pub auc: f64,
}

impl WellSummary {
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        values.into_iter().fold(
            Self {
                first_peak: None,
                auc: 0.0,
            },
            |acc, v| Self {
                first_peak: Some(acc.first_peak.map_or(v, |p| p.max(v))),
                auc: acc.auc + v,
            },
        )
    }
}

/// Summarize a normalized grid.
///
/// Input: row 0 is the baseline row (ignored), row 1 holds headers, rows
/// 2+ hold data with time in column 0 (excluded). Output:
///
/// ```text
/// ""          | A1  | A2  | ...
/// First Peak  | max | max | ...
/// AUC         | sum | sum | ...
/// ```
///
/// Not idempotent: the output does not have the input layout.
pub fn summarize(grid: &Grid) -> TransformResult<Grid> {
    if grid.height() < 2 {
        return Err(TransformError::MissingRows {
            stage: "summarize",
            expected: 2,
            found: grid.height(),
        });
    }

    let width = grid.width();
    let mut header_row = vec![Cell::text("")];
    let mut peak_row = vec![Cell::text(FIRST_PEAK_LABEL)];
    let mut auc_row = vec![Cell::text(AUC_LABEL)];

    for col in 1..width {
        let summary = WellSummary::from_values(
            (2..grid.height()).filter_map(|row| grid.get(row, col).as_number()),
        );
        header_row.push(Cell::text(grid.get(1, col).as_trimmed_text()));
        peak_row.push(summary.first_peak.map_or(Cell::Empty, Cell::Number));
        auc_row.push(Cell::Number(summary.auc));
    }

    Ok(Grid::from_rows(vec![header_row, peak_row, auc_row]))
}
