//! Spreadsheet workbooks: calamine for reading, rust_xlsxwriter for writing.

use std::io::{Read, Seek};

use calamine::{Data, Range, Reader, Sheets};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::error::{GridError, GridResult};
use crate::models::{Cell, Grid};

const MAX_ROWS: usize = 1_048_576;
const MAX_COLUMNS: usize = 16_384;

/// Read the first worksheet of an open workbook.
pub fn read_first_sheet<RS: Read + Seek>(sheets: &mut Sheets<RS>) -> GridResult<Grid> {
    let range = sheets
        .worksheet_range_at(0)
        .ok_or(GridError::EmptyWorkbook)??;
    Ok(range_to_grid(&range))
}

/// Convert a calamine range to a grid with absolute coordinates.
///
/// Ranges start at the first used cell; leading rows and columns are
/// padded back so that `B8` in the file is `B8` in the grid.
pub fn range_to_grid(range: &Range<Data>) -> Grid {
    let Some((start_row, start_col)) = range.start() else {
        return Grid::new();
    };

    let mut grid = Grid::new();
    for _ in 0..start_row {
        grid.push_row(Vec::new());
    }
    for source in range.rows() {
        let mut row = vec![Cell::Empty; start_col as usize];
        row.extend(source.iter().map(data_to_cell));
        grid.push_row(row);
    }
    grid
}

fn data_to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::Bool(b) => Cell::text(if *b { "TRUE" } else { "FALSE" }),
        Data::String(s) if s.is_empty() => Cell::Empty,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::text(s.as_str()),
        Data::Error(e) => Cell::Text(format!("#{e:?}")),
    }
}

/// Build an xlsx workbook holding `grid` on its first sheet.
pub fn grid_to_workbook(grid: &Grid) -> GridResult<Workbook> {
    if grid.height() > MAX_ROWS || grid.width() > MAX_COLUMNS {
        return Err(GridError::TooLarge {
            rows: grid.height(),
            columns: grid.width(),
        });
    }

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    fill_worksheet(worksheet, grid)?;
    Ok(workbook)
}

fn fill_worksheet(worksheet: &mut Worksheet, grid: &Grid) -> GridResult<()> {
    for (r, row) in grid.rows().iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            // Bounds checked in grid_to_workbook
            let (r, c) = (r as u32, c as u16);
            match cell {
                Cell::Empty => {}
                Cell::Number(n) if n.is_finite() => {
                    worksheet.write_number(r, c, *n)?;
                }
                Cell::Number(n) => {
                    worksheet.write_string(r, c, n.to_string())?;
                }
                Cell::Text(s) if s.is_empty() => {}
                Cell::Text(s) => {
                    worksheet.write_string(r, c, s)?;
                }
            }
        }
    }
    Ok(())
}
