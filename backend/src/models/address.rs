//! Spreadsheet addressing: column letters and anchor cells.
//!
//! Letters use bijective base-26 (`A` = 1 … `Z` = 26, `AA` = 27 …);
//! the public functions convert to and from 0-based column indices.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Convert column letters to a 0-based index (`A` -> 0, `AA` -> 26).
///
/// Non-letter characters are skipped and case is ignored. Returns `None`
/// when no letter is present.
pub fn column_letters_to_index(letters: &str) -> Option<usize> {
    let mut n: usize = 0;
    let mut seen = false;
    for c in letters.chars().filter(char::is_ascii_alphabetic) {
        let digit = (c.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        n = n.saturating_mul(26).saturating_add(digit);
        seen = true;
    }
    seen.then(|| n - 1)
}

/// Convert a 0-based column index to letters (0 -> `A`, 26 -> `AA`).
pub fn column_index_to_letters(index: usize) -> String {
    let mut n = index + 1;
    let mut out = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        out.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// A parsed cell reference such as `B8`, stored as 0-based indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRef {
    pub row: usize,
    pub col: usize,
}

impl CellRef {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Parse a reference leniently.
    ///
    /// Letters pick the column and digits pick the 1-based row; anything
    /// else is ignored. Missing digits mean row 1 (row `0` is read as 1)
    /// and missing letters mean column `A`. Row numbers too large for
    /// `usize` saturate, so they stay past the end of any grid. Never fails.
    pub fn parse(reference: &str) -> Self {
        let col = column_letters_to_index(reference).unwrap_or(0);
        let digits: String = reference.chars().filter(char::is_ascii_digit).collect();
        let row_1based = if digits.is_empty() {
            1
        } else {
            digits.parse::<usize>().unwrap_or(usize::MAX).max(1)
        };
        Self {
            row: row_1based - 1,
            col,
        }
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_index_to_letters(self.col), self.row + 1)
    }
}
