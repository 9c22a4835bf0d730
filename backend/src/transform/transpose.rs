//! Transposer: reorient raw plate-reader output.
//!
//! Instrument exports list one well per row with time points running
//! across. This stage cuts the region starting at the anchor cell, drops
//! marker rows and swaps axes so that wells run across columns and time
//! runs down rows.

use tracing::debug;

use crate::models::{CellRef, Grid};

/// First-cell tokens of rows removed before transposing.
pub const MARKER_TOKENS: [&str; 2] = ["comment", "type"];

/// Transpose the region of `grid` anchored at `anchor` (e.g. `"B8"`).
///
/// The anchor column becomes the first output row (`No.`, `A1`, `A2`, …).
/// An anchor outside the grid yields an empty grid.
pub fn transpose(grid: &Grid, anchor: &str) -> Grid {
    transpose_at(grid, CellRef::parse(anchor))
}

/// [`transpose`] with an already parsed anchor.
pub fn transpose_at(grid: &Grid, anchor: CellRef) -> Grid {
    let mut region = grid.slice_from(anchor.row, anchor.col);

    let before = region.height();
    region.retain_rows(|row| !row.first().is_some_and(|c| c.is_marker(&MARKER_TOKENS)));
    if region.height() != before {
        debug!(removed = before - region.height(), "dropped marker rows");
    }

    region.trim_trailing_rows();
    region.trim_trailing_columns();

    let mut out = region.transposed();
    out.drop_leading_empty_columns();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Cell;

    fn t(s: &str) -> Cell {
        Cell::text(s)
    }

    fn n(v: f64) -> Cell {
        Cell::Number(v)
    }

    /// Raw export: instrument header above row 8, wells as rows from B8.
    fn raw_export() -> Grid {
        let mut rows = vec![
            vec![t("Application: Spark")],
            vec![t("Device: reader")],
            vec![],
            vec![t("Plate"), t("96 well")],
            vec![],
            vec![],
            vec![],
        ];
        rows.push(vec![Cell::Empty, t("No."), n(0.0), n(1000.0), n(2000.0)]);
        rows.push(vec![Cell::Empty, t("Comment"), t("x"), t("x"), t("x")]);
        rows.push(vec![Cell::Empty, t("Type"), t("raw"), t("raw"), t("raw")]);
        rows.push(vec![Cell::Empty, t("A1"), n(10.0), n(11.0), n(12.0)]);
        rows.push(vec![Cell::Empty, t("A2"), n(20.0), n(21.0), n(22.0), Cell::Empty]);
        rows.push(vec![]);
        Grid::from_rows(rows)
    }

    #[test]
    fn test_transpose_export() {
        let out = transpose(&raw_export(), "B8");

        assert_eq!(out.height(), 4);
        assert_eq!(out.width(), 3);
        assert_eq!(out.row(0).unwrap(), &[t("No."), t("A1"), t("A2")]);
        assert_eq!(out.row(1).unwrap(), &[n(0.0), n(10.0), n(20.0)]);
        assert_eq!(out.row(3).unwrap(), &[n(2000.0), n(12.0), n(22.0)]);
    }

    #[test]
    fn test_first_row_is_anchor_column() {
        let grid = raw_export();
        let out = transpose(&grid, "B8");

        let anchor_column: Vec<Cell> = (7..grid.height())
            .map(|r| grid.get(r, 1).clone())
            .filter(|c| !c.is_marker(&MARKER_TOKENS) && !c.is_empty())
            .collect();
        assert_eq!(out.row(0).unwrap(), anchor_column.as_slice());
    }

    #[test]
    fn test_marker_rows_case_insensitive() {
        let grid = Grid::from_rows(vec![
            vec![t("No."), n(1.0), n(2.0)],
            vec![t("  COMMENT "), t("c"), t("c")],
            vec![t("type"), t("t"), t("t")],
            vec![t("A1"), n(3.0), n(4.0)],
        ]);
        let out = transpose(&grid, "A1");
        assert_eq!(out.row(0).unwrap(), &[t("No."), t("A1")]);
        assert_eq!(out.height(), 3);
    }

    #[test]
    fn test_interior_empty_column_preserved() {
        let grid = Grid::from_rows(vec![
            vec![t("No."), n(1.0), Cell::Empty, n(3.0)],
            vec![t("A1"), n(5.0), Cell::Empty, n(7.0)],
        ]);
        let out = transpose(&grid, "A1");
        // Interior empty source column becomes an empty output row
        assert_eq!(out.height(), 4);
        assert!(out.row(2).unwrap().iter().all(Cell::is_empty));
    }

    #[test]
    fn test_leading_empty_columns_dropped() {
        // A blank first row becomes a blank first column and shifts out
        let grid = Grid::from_rows(vec![
            vec![Cell::Empty, Cell::Empty],
            vec![t("No."), n(1.0)],
            vec![t("A1"), n(5.0)],
        ]);
        let out = transpose(&grid, "A1");
        assert_eq!(out.width(), 2);
        assert_eq!(out.row(0).unwrap(), &[t("No."), t("A1")]);
        assert_eq!(out.row(1).unwrap(), &[n(1.0), n(5.0)]);
    }

    #[test]
    fn test_anchor_out_of_bounds() {
        let grid = raw_export();
        assert!(transpose(&grid, "B200").is_empty());
        assert!(transpose(&grid, "ZZ8").is_empty());
        assert!(transpose(&grid, "B99999999999999999999999").is_empty());
    }

    #[test]
    fn test_anchor_defaults() {
        let grid = Grid::from_rows(vec![
            vec![t("No."), n(1.0)],
            vec![t("A1"), n(2.0)],
        ]);
        // Digit-less anchor starts at row 1
        assert_eq!(transpose(&grid, "A"), transpose(&grid, "A1"));
    }
}
