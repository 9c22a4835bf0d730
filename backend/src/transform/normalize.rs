//! Normalizer: rebase each well's time series against a baseline.
//!
//! Two variants:
//!
//! - [`normalize_time_zero`] - baseline is the first data row, with an
//!   optional time window limiting which rows are rebased
//! - [`normalize_avg`] - baseline is the mean of the first N reads, with an
//!   optional well filter
//!
//! Both compute `(value - baseline) / baseline`. A column whose baseline is
//! exactly 0 is passed through unchanged.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::filter::ColumnFilter;
use crate::error::{TransformError, TransformResult};
use crate::models::{Cell, Grid};

const COMMENT_TOKENS: [&str; 1] = ["comment"];

/// Normalizer variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum NormalizeMethod {
    /// Rebase against the first data row.
    TimeZero,
    /// Rebase against the mean of the first N reads.
    Average,
}

impl FromStr for NormalizeMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "time-zero" | "timezero" | "t0" => Ok(Self::TimeZero),
            "average" | "avg" | "mean" => Ok(Self::Average),
            other => Err(format!("unknown normalize method '{}'", other)),
        }
    }
}

impl fmt::Display for NormalizeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TimeZero => write!(f, "time-zero"),
            Self::Average => write!(f, "average"),
        }
    }
}

// =============================================================================
// Shared helpers
// =============================================================================

/// Rebase one value. `baseline` must be non-zero.
fn rebase(value: f64, baseline: f64) -> f64 {
    (value - baseline) / baseline
}

/// Replace a numeric cell with its rebased value; other cells are kept.
fn rebase_cell(cell: &mut Cell, baseline: f64) {
    if let Some(v) = cell.as_number() {
        *cell = Cell::Number(rebase(v, baseline));
    }
}

/// Coerce column 0 of each row to a number through `convert`, dropping
/// rows where coercion fails.
fn coerce_time_column<F>(rows: Vec<Vec<Cell>>, convert: F) -> Vec<(f64, Vec<Cell>)>
where
    F: Fn(f64) -> f64,
{
    let total = rows.len();
    let kept: Vec<(f64, Vec<Cell>)> = rows
        .into_iter()
        .filter_map(|mut row| {
            let time = convert(row.first()?.as_number()?);
            if time.is_nan() {
                return None;
            }
            row[0] = Cell::Number(time);
            Some((time, row))
        })
        .collect();

    if kept.len() != total {
        debug!(dropped = total - kept.len(), "dropped rows with non-numeric time");
    }
    kept
}

// =============================================================================
// Variant A: time zero
// =============================================================================

/// Normalize against the first data row.
///
/// Expected layout: `No.` row, optional `Comment` row (removed wherever it
/// appears), `Type` row, then data rows with time in milliseconds in
/// column 0. Rows whose time is not numeric are dropped.
///
/// With `max_seconds`, only rows with time `<= max_seconds * 1000` are
/// rebased; later rows keep their raw values. Zero-baseline columns are
/// left untouched in every row.
pub fn normalize_time_zero(grid: &Grid, max_seconds: Option<f64>) -> TransformResult<Grid> {
    let mut rows: Vec<Vec<Cell>> = grid
        .rows()
        .iter()
        .filter(|r| !r.first().is_some_and(|c| c.is_marker(&COMMENT_TOKENS)))
        .cloned()
        .collect();

    if rows.len() < 2 {
        return Err(TransformError::MissingRows {
            stage: "normalize (time zero)",
            expected: 2,
            found: rows.len(),
        });
    }

    let raw_data = rows.split_off(2);
    let mut data = coerce_time_column(raw_data, |t| t);

    let baseline_row = match data.first() {
        Some((_, row)) => row.clone(),
        None => return Err(TransformError::NoDataRows("normalize (time zero)")),
    };

    let max_ms = max_seconds.map(|s| s * 1000.0);
    let width = grid.width();

    for col in 1..width {
        let baseline = baseline_row.get(col).map_or(0.0, |c| c.as_number_or(0.0));
        if baseline == 0.0 {
            debug!(col, "zero baseline, column passed through");
            continue;
        }
        for (time, row) in data.iter_mut() {
            if max_ms.is_some_and(|limit| *time > limit) {
                continue;
            }
            if let Some(cell) = row.get_mut(col) {
                rebase_cell(cell, baseline);
            }
        }
    }

    rows.extend(data.into_iter().map(|(_, row)| row));
    Ok(Grid::from_rows(rows))
}

// =============================================================================
// Variant B: average of first N reads
// =============================================================================

/// Label of the synthetic baseline row.
pub fn average_label(n: usize) -> String {
    format!("Average first {}", n)
}

/// Normalize against the mean of the first `first_n_reads` data rows.
///
/// Expected layout: `No.` header row, then data rows with time in
/// milliseconds in column 0. When both `filter_letters` and `filter_range`
/// parse, only column 0 and the matching well columns are kept.
///
/// Output: `Average first {n}` row holding the raw baseline means, the
/// `No.` row, then the rebased data with time converted to seconds.
pub fn normalize_avg(
    grid: &Grid,
    first_n_reads: usize,
    filter_letters: Option<&str>,
    filter_range: Option<&str>,
) -> TransformResult<Grid> {
    let header = match grid.row(0) {
        Some(row) => row,
        None => {
            return Err(TransformError::MissingRows {
                stage: "normalize (average)",
                expected: 1,
                found: 0,
            })
        }
    };

    let selected = match ColumnFilter::from_specs(filter_letters, filter_range) {
        Some(filter) => {
            let columns = filter.select(header, grid.width());
            debug!(kept = columns.len() - 1, "applied well filter");
            grid.select_columns(&columns)
        }
        None => grid.clone(),
    };

    let width = selected.width();
    let mut rows = selected.into_rows();
    let raw_data = rows.split_off(1);
    let header_row = rows.pop().unwrap_or_default();

    let mut data = coerce_time_column(raw_data, |ms| ms / 1000.0);
    let n = first_n_reads.min(data.len());

    let baselines: Vec<Option<f64>> = (1..width)
        .map(|col| {
            let values: Vec<f64> = data[..n]
                .iter()
                .filter_map(|(_, row)| row.get(col).and_then(Cell::as_number))
                .collect();
            if values.is_empty() {
                None
            } else {
                Some(values.iter().sum::<f64>() / values.len() as f64)
            }
        })
        .collect();

    for (offset, baseline) in baselines.iter().enumerate() {
        let col = offset + 1;
        let baseline = baseline.unwrap_or(0.0);
        if baseline == 0.0 {
            debug!(col, "zero baseline, column passed through");
            continue;
        }
        for (_, row) in data.iter_mut() {
            if let Some(cell) = row.get_mut(col) {
                rebase_cell(cell, baseline);
            }
        }
    }

    let mut average_row = Vec::with_capacity(width.max(1));
    average_row.push(Cell::Text(average_label(n)));
    average_row.extend(baselines.iter().map(|b| b.map_or(Cell::Empty, Cell::Number)));

    let mut out = Vec::with_capacity(data.len() + 2);
    out.push(average_row);
    out.push(header_row);
    out.extend(data.into_iter().map(|(_, row)| row));
    Ok(Grid::from_rows(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> Cell {
        Cell::text(s)
    }

    fn n(v: f64) -> Cell {
        Cell::Number(v)
    }

    fn num(grid: &Grid, row: usize, col: usize) -> f64 {
        grid.get(row, col).as_number().unwrap()
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    /// Layout for the time-zero variant.
    fn time_zero_grid(scale: f64) -> Grid {
        Grid::from_rows(vec![
            vec![t("No."), t("A1"), t("A2"), t("A3")],
            vec![t("Comment"), t(""), t(""), t("")],
            vec![t("Type"), t("Raw"), t("Raw"), t("Raw")],
            vec![n(0.0), n(10.0 * scale), n(0.0), n(4.0 * scale)],
            vec![t("Time"), n(1.0), n(1.0), n(1.0)],
            vec![n(1000.0), n(15.0 * scale), n(5.0 * scale), n(8.0 * scale)],
            vec![n(2000.0), n(20.0 * scale), n(7.0 * scale), n(2.0 * scale)],
        ])
    }

    #[test]
    fn test_time_zero_basic() {
        let out = normalize_time_zero(&time_zero_grid(1.0), None).unwrap();

        // No. row, Type row, 3 numeric data rows
        assert_eq!(out.height(), 5);
        assert_eq!(out.get(0, 0), &t("No."));
        assert_eq!(out.get(1, 0), &t("Type"));

        assert_close(num(&out, 2, 1), 0.0);
        assert_close(num(&out, 3, 1), 0.5);
        assert_close(num(&out, 4, 1), 1.0);
        assert_close(num(&out, 4, 3), -0.5);
    }

    #[test]
    fn test_time_zero_zero_baseline_passthrough() {
        let out = normalize_time_zero(&time_zero_grid(1.0), None).unwrap();
        assert_eq!(out.get(2, 2), &n(0.0));
        assert_eq!(out.get(3, 2), &n(5.0));
        assert_eq!(out.get(4, 2), &n(7.0));
    }

    #[test]
    fn test_time_zero_scale_invariant() {
        let base = normalize_time_zero(&time_zero_grid(1.0), None).unwrap();
        for k in [0.5, 3.0, 1000.0] {
            let scaled = normalize_time_zero(&time_zero_grid(k), None).unwrap();
            for row in 2..base.height() {
                for col in [1, 3] {
                    assert_close(num(&base, row, col), num(&scaled, row, col));
                }
                // The zero-baseline column scales with k
                assert_close(num(&scaled, row, 2), num(&base, row, 2) * k);
            }
        }
    }

    #[test]
    fn test_time_zero_window() {
        let out = normalize_time_zero(&time_zero_grid(1.0), Some(1.0)).unwrap();

        // Rows up to 1000 ms are rebased
        assert_close(num(&out, 3, 1), 0.5);
        // The 2000 ms row keeps raw values
        assert_eq!(out.get(4, 1), &n(20.0));
        assert_eq!(out.get(4, 3), &n(2.0));
    }

    #[test]
    fn test_time_zero_window_ignored_for_zero_baseline() {
        let windowed = normalize_time_zero(&time_zero_grid(1.0), Some(1.0)).unwrap();
        let raw: Vec<&Cell> = (2..windowed.height()).map(|r| windowed.get(r, 2)).collect();
        assert_eq!(raw, vec![&n(0.0), &n(5.0), &n(7.0)]);
    }

    #[test]
    fn test_time_zero_comment_anywhere() {
        let grid = Grid::from_rows(vec![
            vec![t("No."), t("A1")],
            vec![t("Type"), t("Raw")],
            vec![n(0.0), n(2.0)],
            vec![t("comment"), t("note")],
            vec![t("100"), n(3.0)],
        ]);
        let out = normalize_time_zero(&grid, None).unwrap();
        assert_eq!(out.height(), 4);
        // Numeric text time is coerced
        assert_eq!(out.get(3, 0), &n(100.0));
        assert_close(num(&out, 3, 1), 0.5);
    }

    #[test]
    fn test_time_zero_errors() {
        let short = Grid::from_rows(vec![vec![t("No.")], vec![t("Comment")]]);
        assert!(matches!(
            normalize_time_zero(&short, None),
            Err(TransformError::MissingRows { found: 1, .. })
        ));

        let no_data = Grid::from_rows(vec![
            vec![t("No."), t("A1")],
            vec![t("Type"), t("Raw")],
            vec![t("Time"), n(1.0)],
        ]);
        assert_eq!(
            normalize_time_zero(&no_data, None),
            Err(TransformError::NoDataRows("normalize (time zero)"))
        );
    }

    /// Transposed layout: `No.` row then time (ms) + wells.
    fn average_grid() -> Grid {
        Grid::from_rows(vec![
            vec![t("No."), t("A1"), t("A2"), t("C1"), t("B2")],
            vec![n(0.0), n(10.0), n(0.0), n(1.0), n(4.0)],
            vec![n(1000.0), n(30.0), n(0.0), n(3.0), n(6.0)],
            vec![t("Temp"), n(99.0), n(99.0), n(99.0), n(99.0)],
            vec![n(2000.0), n(40.0), n(5.0), n(4.0), n(10.0)],
        ])
    }

    #[test]
    fn test_average_baseline_row() {
        let out = normalize_avg(&average_grid(), 2, None, None).unwrap();

        assert_eq!(out.get(0, 0), &t("Average first 2"));
        assert_close(num(&out, 0, 1), 20.0);
        assert_close(num(&out, 0, 2), 0.0);
        assert_close(num(&out, 0, 3), 2.0);
        assert_close(num(&out, 0, 4), 5.0);
        assert_eq!(out.get(1, 0), &t("No."));
        // Average row + No. row + 3 numeric data rows
        assert_eq!(out.height(), 5);
    }

    #[test]
    fn test_average_rebase_and_seconds() {
        let out = normalize_avg(&average_grid(), 2, None, None).unwrap();

        assert_eq!(out.get(2, 0), &n(0.0));
        assert_eq!(out.get(3, 0), &n(1.0));
        assert_eq!(out.get(4, 0), &n(2.0));
        assert_close(num(&out, 2, 1), -0.5);
        assert_close(num(&out, 3, 1), 0.5);
        assert_close(num(&out, 4, 1), 1.0);
        assert_close(num(&out, 4, 4), 1.0);
    }

    #[test]
    fn test_average_zero_baseline_passthrough() {
        let out = normalize_avg(&average_grid(), 2, None, None).unwrap();
        assert_eq!(out.get(2, 2), &n(0.0));
        assert_eq!(out.get(3, 2), &n(0.0));
        assert_eq!(out.get(4, 2), &n(5.0));
    }

    #[test]
    fn test_average_n_capped_by_rows() {
        let out = normalize_avg(&average_grid(), 30, None, None).unwrap();
        assert_eq!(out.get(0, 0), &t("Average first 3"));
        assert_close(num(&out, 0, 1), 80.0 / 3.0);
    }

    #[test]
    fn test_average_with_filter() {
        let out = normalize_avg(&average_grid(), 2, Some("A, B"), Some("1 to 3")).unwrap();

        assert_eq!(out.row(1).unwrap(), &[t("No."), t("A1"), t("A2"), t("B2")]);
        assert_eq!(out.width(), 4);
        assert_close(num(&out, 0, 3), 5.0);
    }

    #[test]
    fn test_average_malformed_filter_ignored() {
        let filtered = normalize_avg(&average_grid(), 2, Some("A"), Some("one to three")).unwrap();
        let plain = normalize_avg(&average_grid(), 2, None, None).unwrap();
        assert_eq!(filtered, plain);
    }

    #[test]
    fn test_average_empty_grid() {
        assert!(matches!(
            normalize_avg(&Grid::new(), 30, None, None),
            Err(TransformError::MissingRows { found: 0, .. })
        ));
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!("time-zero".parse::<NormalizeMethod>(), Ok(NormalizeMethod::TimeZero));
        assert_eq!("TIME_ZERO".parse::<NormalizeMethod>(), Ok(NormalizeMethod::TimeZero));
        assert_eq!("avg".parse::<NormalizeMethod>(), Ok(NormalizeMethod::Average));
        assert!("median".parse::<NormalizeMethod>().is_err());
        assert_eq!(NormalizeMethod::TimeZero.to_string(), "time-zero");
    }
}
