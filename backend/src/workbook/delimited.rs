//! Delimited text grids with encoding and delimiter auto-detection.
//!
//! Every record becomes one grid row, blank lines included, so that cell
//! addresses match what a spreadsheet application shows for the file.

use std::io::Write;

use crate::error::{GridError, GridResult};
use crate::models::{format_number, Cell, Grid};

/// Detect the encoding of raw bytes using chardet.
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        "utf-16le" | "utf-16" => "utf-16le".to_string(),
        _ => charset,
    }
}

/// Decode bytes to a string using the specified encoding.
pub fn decode_content(bytes: &[u8], encoding: &str) -> GridResult<String> {
    let decoded = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => String::from_utf8_lossy(bytes).into_owned(),
        "iso-8859-1" | "latin-1" | "latin1" => {
            encoding_rs::ISO_8859_15.decode(bytes).0.into_owned()
        }
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        "utf-16le" => {
            let (text, _, had_errors) = encoding_rs::UTF_16LE.decode(bytes);
            if had_errors {
                return Err(GridError::Encoding("invalid UTF-16 content".to_string()));
            }
            text.into_owned()
        }
        // Fallback: try UTF-8 with lossy conversion
        _ => String::from_utf8_lossy(bytes).into_owned(),
    };
    Ok(decoded.trim_start_matches('\u{feff}').to_string())
}

/// Detect the delimiter by counting occurrences in the first non-blank line.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content
        .lines()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("");

    let separators = [';', ',', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse decoded text with an explicit delimiter.
///
/// Quoted fields may span lines. Blank lines, which the csv reader skips,
/// are put back as empty rows from the record line numbers.
pub fn parse_delimited(content: &str, delimiter: char) -> GridResult<Grid> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter as u8)
        .from_reader(content.as_bytes());

    let mut grid = Grid::new();
    let mut record = csv::StringRecord::new();
    let mut next_line = 1;

    while reader.read_record(&mut record)? {
        let line = record.position().map_or(next_line, |p| p.line());
        while next_line < line {
            grid.push_row(Vec::new());
            next_line += 1;
        }
        grid.push_row(record.iter().map(Cell::parse).collect());
        next_line = reader.position().line();
    }

    Ok(grid)
}

/// Read delimited bytes with auto-detected encoding and delimiter.
pub fn read_delimited(bytes: &[u8]) -> GridResult<Grid> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let delimiter = detect_delimiter(&content);
    tracing::debug!(%encoding, delimiter = %delimiter.escape_default(), "reading delimited grid");
    parse_delimited(&content, delimiter)
}

/// Write a grid as delimited text, without header row or index column.
pub fn write_delimited<W: Write>(grid: &Grid, writer: W, delimiter: u8) -> GridResult<()> {
    let mut out = csv::WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_writer(writer);

    for row in grid.rows() {
        let fields: Vec<String> = row
            .iter()
            .map(|cell| match cell {
                Cell::Empty => String::new(),
                Cell::Number(n) => format_number(*n),
                Cell::Text(s) => s.clone(),
            })
            .collect();
        if fields.is_empty() {
            // csv refuses empty records; a single empty field keeps the line
            out.write_record([""])?;
        } else {
            out.write_record(&fields)?;
        }
    }

    out.flush()?;
    Ok(())
}
