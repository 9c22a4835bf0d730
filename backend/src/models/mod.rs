//! Domain models for the Wellflow pipeline.
//!
//! This module contains the data structures shared by every stage:
//!
//! - [`Cell`] - One spreadsheet value: empty, number or text
//! - [`Grid`] - Ragged-tolerant 2D array of cells, addressed by 0-based index
//! - [`address`] - Column letters and anchor cell references
//!
//! Grids carry no schema. Header rows, time columns and marker rows are
//! positional conventions interpreted by each stage.

pub mod address;

use serde::{Deserialize, Serialize};

pub use address::{column_index_to_letters, column_letters_to_index, CellRef};

// =============================================================================
// Cell
// =============================================================================

static EMPTY: Cell = Cell::Empty;

/// A single spreadsheet value.
///
/// Coercions are explicit and total: no method panics and every fallback
/// is spelled out by the caller.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Cell {
    #[default]
    Empty,
    Number(f64),
    Text(String),
}

impl Cell {
    /// Build a text cell.
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    /// Interpret a raw string the way delimited files are read:
    /// blank becomes [`Cell::Empty`], numeric text becomes a number.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Cell::Empty;
        }
        match parse_number(trimmed) {
            Some(n) => Cell::Number(n),
            None => Cell::Text(raw.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Numeric value of the cell, if it has one.
    ///
    /// Text coerces when its trimmed content parses as a float.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Text(s) => parse_number(s.trim()),
            Cell::Empty => None,
        }
    }

    pub fn as_number_or(&self, default: f64) -> f64 {
        self.as_number().unwrap_or(default)
    }

    /// Text rendering with surrounding whitespace removed.
    ///
    /// Integral numbers render without a fractional part (`1.0` -> `"1"`).
    pub fn as_trimmed_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Number(n) => format_number(*n),
            Cell::Text(s) => s.trim().to_string(),
        }
    }

    /// True when the trimmed, lowercased text equals one of `tokens`.
    pub fn is_marker(&self, tokens: &[&str]) -> bool {
        match self {
            Cell::Text(s) => {
                let normalized = s.trim().to_lowercase();
                tokens.iter().any(|t| *t == normalized)
            }
            _ => false,
        }
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

fn parse_number(s: &str) -> Option<f64> {
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Render a number for text output, collapsing integral values.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

// =============================================================================
// Grid
// =============================================================================

/// A 2D array of cells. Rows may have different lengths; missing cells
/// read as [`Cell::Empty`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Grid {
    rows: Vec<Vec<Cell>>,
}

impl Grid {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Vec<Cell>> {
        self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[Cell]> {
        self.rows.get(index).map(|r| r.as_slice())
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    /// Cell at (row, col); [`Cell::Empty`] when out of bounds.
    pub fn get(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Length of the longest row.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.height() == 0 || self.width() == 0
    }

    /// Sub-grid of rows `>= row` and columns `>= col`.
    pub fn slice_from(&self, row: usize, col: usize) -> Grid {
        let rows = self
            .rows
            .iter()
            .skip(row)
            .map(|r| r.iter().skip(col).cloned().collect())
            .collect();
        Grid { rows }
    }

    /// Keep rows for which `keep` returns true, preserving order.
    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(&[Cell]) -> bool,
    {
        self.rows.retain(|r| keep(r.as_slice()));
    }

    /// Drop trailing rows whose cells are all empty.
    pub fn trim_trailing_rows(&mut self) {
        while self
            .rows
            .last()
            .is_some_and(|r| r.iter().all(Cell::is_empty))
        {
            self.rows.pop();
        }
    }

    /// Drop trailing columns whose cells are all empty. Interior empty
    /// columns are kept.
    pub fn trim_trailing_columns(&mut self) {
        let mut width = self.width();
        while width > 0 && self.column_is_empty(width - 1) {
            width -= 1;
        }
        for row in &mut self.rows {
            row.truncate(width);
        }
    }

    /// Drop leading columns whose cells are all empty.
    pub fn drop_leading_empty_columns(&mut self) {
        let width = self.width();
        let mut skip = 0;
        while skip < width && self.column_is_empty(skip) {
            skip += 1;
        }
        if skip == 0 {
            return;
        }
        for row in &mut self.rows {
            let n = skip.min(row.len());
            row.drain(..n);
        }
    }

    pub fn column_is_empty(&self, col: usize) -> bool {
        self.rows.iter().all(|r| r.get(col).map_or(true, Cell::is_empty))
    }

    /// Swap rows and columns. The result is rectangular.
    pub fn transposed(&self) -> Grid {
        let width = self.width();
        let rows = (0..width)
            .map(|c| (0..self.height()).map(|r| self.get(r, c).clone()).collect())
            .collect();
        Grid { rows }
    }

    /// Keep only the listed columns, in the given order.
    pub fn select_columns(&self, columns: &[usize]) -> Grid {
        let rows = self
            .rows
            .iter()
            .map(|r| {
                columns
                    .iter()
                    .map(|&c| r.get(c).cloned().unwrap_or_default())
                    .collect()
            })
            .collect();
        Grid { rows }
    }
}

impl From<Vec<Vec<Cell>>> for Grid {
    fn from(rows: Vec<Vec<Cell>>) -> Self {
        Grid::from_rows(rows)
    }
}
