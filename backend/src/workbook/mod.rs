//! Grid persistence.
//!
//! Every stage reads and writes plain grids: no header row, no index
//! column, first worksheet only. Spreadsheet formats go through calamine
//! on the way in and rust_xlsxwriter on the way out; delimited text is
//! handled by the `csv` crate with encoding detection.

pub mod delimited;
pub mod xlsx;

use std::fs::File;
use std::io::{BufWriter, Cursor};
use std::path::Path;

use crate::error::{GridError, GridResult};
use crate::models::Grid;

/// File family of a grid on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridFormat {
    /// `.csv`, `.tsv`, `.txt`
    Delimited,
    /// `.xlsx`, `.xlsm`, `.xlsb`, `.xls`, `.ods`
    Workbook,
}

impl GridFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    pub fn from_name(file_name: &str) -> Option<Self> {
        Self::from_path(Path::new(file_name))
    }

    fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "csv" | "tsv" | "txt" => Some(Self::Delimited),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "xla" | "ods" => Some(Self::Workbook),
            _ => None,
        }
    }
}

fn unsupported(path: &Path) -> GridError {
    GridError::UnsupportedFormat(path.display().to_string())
}

/// Load the first sheet of the file at `path`.
pub fn load_grid(path: &Path) -> GridResult<Grid> {
    if !path.exists() {
        return Err(GridError::NotFound(path.to_path_buf()));
    }

    match GridFormat::from_path(path) {
        Some(GridFormat::Workbook) => {
            let mut sheets = calamine::open_workbook_auto(path)?;
            xlsx::read_first_sheet(&mut sheets)
        }
        Some(GridFormat::Delimited) => delimited::read_delimited(&std::fs::read(path)?),
        None => Err(unsupported(path)),
    }
}

/// Load a grid from uploaded bytes. Names without a known extension are
/// read as spreadsheets.
pub fn load_grid_bytes(bytes: &[u8], file_name: &str) -> GridResult<Grid> {
    match GridFormat::from_name(file_name) {
        Some(GridFormat::Delimited) => delimited::read_delimited(bytes),
        Some(GridFormat::Workbook) | None => {
            let mut sheets = calamine::open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
            xlsx::read_first_sheet(&mut sheets)
        }
    }
}

/// Save `grid` to `path`, picking the writer from the extension.
///
/// Only `.xlsx`/`.xlsm` are written as workbooks; `.tsv` is tab
/// separated and `.csv`/`.txt` comma separated.
pub fn save_grid(grid: &Grid, path: &Path) -> GridResult<()> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "xlsx" | "xlsm" => {
            xlsx::grid_to_workbook(grid)?.save(path)?;
        }
        "tsv" => delimited::write_delimited(grid, BufWriter::new(File::create(path)?), b'\t')?,
        "csv" | "txt" => delimited::write_delimited(grid, BufWriter::new(File::create(path)?), b',')?,
        _ => return Err(unsupported(path)),
    }

    tracing::debug!(path = %path.display(), rows = grid.height(), "grid saved");
    Ok(())
}

/// Serialize `grid` as an in-memory xlsx file.
pub fn grid_to_xlsx_bytes(grid: &Grid) -> GridResult<Vec<u8>> {
    Ok(xlsx::grid_to_workbook(grid)?.save_to_buffer()?)
}
