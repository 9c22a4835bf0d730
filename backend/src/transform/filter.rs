//! Well column filter.
//!
//! A filter is built from two user strings: row letters (`"A, B"`) and a
//! column number range (`"1 to 12"`, `"1-12"` or `"1:12"`). The allowed
//! labels are every letter × number combination, matched on demand so
//! that the size of the range costs nothing. A missing or malformed part
//! disables filtering entirely instead of failing.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{format_number, Cell};

static LETTER_SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[,;\s]+").expect("valid separator regex"));

/// Range forms in priority order.
static RANGE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)^\s*(\d+)\s*to\s*(\d+)\s*$",
        r"^\s*(\d+)\s*-\s*(\d+)\s*$",
        r"^\s*(\d+)\s*:\s*(\d+)\s*$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid range regex"))
    .collect()
});

/// Split a letters field on commas, semicolons and whitespace, uppercased.
pub fn parse_letters(raw: &str) -> Vec<String> {
    LETTER_SEPARATORS
        .split(raw)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_uppercase)
        .collect()
}

/// Parse an inclusive number range. Descending bounds are swapped.
pub fn parse_range(raw: &str) -> Option<(u32, u32)> {
    RANGE_PATTERNS.iter().find_map(|re| {
        let caps = re.captures(raw)?;
        let a = caps[1].parse::<u32>().ok()?;
        let b = caps[2].parse::<u32>().ok()?;
        Some(if a <= b { (a, b) } else { (b, a) })
    })
}

/// Normalize a header cell for comparison: trimmed, uppercased, numeric
/// values in integer form.
pub fn normalize_header(cell: &Cell) -> String {
    match cell {
        Cell::Number(n) => format_number(*n),
        Cell::Text(s) => {
            let trimmed = s.trim();
            match trimmed.parse::<f64>() {
                Ok(n) if n.is_finite() => format_number(n),
                _ => trimmed.to_uppercase(),
            }
        }
        Cell::Empty => String::new(),
    }
}

/// Column number of a label suffix, in canonical decimal form only
/// (`"07"` is not `7`).
fn well_number(suffix: &str) -> Option<u32> {
    let canonical = !suffix.is_empty()
        && suffix.bytes().all(|b| b.is_ascii_digit())
        && (suffix == "0" || !suffix.starts_with('0'));
    if canonical {
        suffix.parse().ok()
    } else {
        None
    }
}

/// Allowed well labels: any of `letters` followed by a number in `lo..=hi`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnFilter {
    letters: BTreeSet<String>,
    range: (u32, u32),
}

impl ColumnFilter {
    /// Build a filter from user specs.
    ///
    /// Returns `None` (no filtering) unless both parts are present and
    /// yield at least one label.
    pub fn from_specs(letters: Option<&str>, range: Option<&str>) -> Option<Self> {
        let letters: BTreeSet<String> = parse_letters(letters?).into_iter().collect();
        let range = parse_range(range?)?;

        if letters.is_empty() {
            None
        } else {
            Some(Self { letters, range })
        }
    }

    pub fn letters(&self) -> &BTreeSet<String> {
        &self.letters
    }

    pub fn range(&self) -> (u32, u32) {
        self.range
    }

    pub fn allows(&self, header: &Cell) -> bool {
        let label = normalize_header(header);
        self.letters.iter().any(|letter| {
            label
                .strip_prefix(letter.as_str())
                .and_then(well_number)
                .is_some_and(|n| (self.range.0..=self.range.1).contains(&n))
        })
    }

    /// Indices of columns to keep given a header row: column 0 always,
    /// then every column whose header is allowed.
    pub fn select(&self, headers: &[Cell], width: usize) -> Vec<usize> {
        std::iter::once(0)
            .chain((1..width).filter(|&c| headers.get(c).is_some_and(|h| self.allows(h))))
            .collect()
    }
}
