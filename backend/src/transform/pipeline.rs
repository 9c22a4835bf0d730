//! High-level pipeline API: run stages from file to file.
//!
//! Each stage reads its input grid, transforms it and persists the result,
//! so stages compose through files rather than shared memory.
//!
//! # Example
//!
//! ```rust,ignore
//! use wellflow::{run_all_file, PipelineConfig};
//! use std::path::Path;
//!
//! let config = PipelineConfig::default();
//! let reports = run_all_file(Path::new("plate.xlsx"), &config)?;
//! for report in &reports {
//!     println!("{} -> {}", report.stage, report.output.display());
//! }
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::normalize::{normalize_avg, normalize_time_zero, NormalizeMethod};
use super::summarize::summarize;
use super::transpose::transpose;
use crate::api::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::config::PipelineConfig;
use crate::error::{GridError, PipelineResult, TransformResult};
use crate::models::Grid;
use crate::workbook::{self, GridFormat};

/// One pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Transpose,
    Normalize,
    Summarize,
}

impl Stage {
    /// All stages in pipeline order.
    pub const ALL: [Stage; 3] = [Stage::Transpose, Stage::Normalize, Stage::Summarize];

    /// Stem suffix of the default output file.
    pub fn suffix(&self) -> &'static str {
        match self {
            Stage::Transpose => "_transposed",
            Stage::Normalize => "_normalized",
            Stage::Summarize => "_FP_AUC",
        }
    }

    /// Suffix removed from the input stem before adding [`Stage::suffix`].
    fn replaced_suffix(&self) -> Option<&'static str> {
        match self {
            Stage::Summarize => Some("_normalized"),
            _ => None,
        }
    }

    /// Apply this stage to an in-memory grid.
    pub fn apply(&self, grid: &Grid, config: &PipelineConfig) -> TransformResult<Grid> {
        match self {
            Stage::Transpose => Ok(transpose(grid, &config.start_cell)),
            Stage::Normalize => normalize(grid, config),
            Stage::Summarize => summarize(grid),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Transpose => "transpose",
            Stage::Normalize => "normalize",
            Stage::Summarize => "fp-auc",
        };
        write!(f, "{}", name)
    }
}

/// Run the configured normalizer variant.
pub fn normalize(grid: &Grid, config: &PipelineConfig) -> TransformResult<Grid> {
    match config.method {
        NormalizeMethod::TimeZero => normalize_time_zero(grid, config.max_seconds),
        NormalizeMethod::Average => normalize_avg(
            grid,
            config.first_n_reads,
            config.filter_letters.as_deref(),
            config.filter_range.as_deref(),
        ),
    }
}

/// Outcome of one stage run.
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub stage: Stage,
    pub input: PathBuf,
    pub output: PathBuf,
    pub rows: usize,
    pub columns: usize,
}

/// Default output path for `stage` given its input.
///
/// `plate.xlsx` becomes `plate_transposed.xlsx`; the summarizer turns
/// `plate_normalized.xlsx` into `plate_FP_AUC.xlsx`. Delimited inputs keep
/// their extension, everything else is written as `.xlsx`.
pub fn default_output_path(input: &Path, stage: Stage) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let stem = match stage.replaced_suffix() {
        Some(old) => stem.replace(old, ""),
        None => stem.to_string(),
    };

    let extension = match GridFormat::from_path(input) {
        Some(GridFormat::Delimited) => input
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("csv")
            .to_string(),
        _ => "xlsx".to_string(),
    };

    input.with_file_name(format!("{}{}.{}", stem, stage.suffix(), extension))
}

/// Run one stage from `input` to `output` (or the default output path).
///
/// Fails before writing anything if the input does not exist.
pub fn run_stage_file(
    stage: Stage,
    input: &Path,
    output: Option<&Path>,
    config: &PipelineConfig,
) -> PipelineResult<StageReport> {
    if !input.exists() {
        return Err(GridError::NotFound(input.to_path_buf()).into());
    }

    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output_path(input, stage));

    log_info(format!("Running {} on {}", stage, input.display()));
    let grid = workbook::load_grid(input)?;
    log_info_indent(
        format!("Loaded {} rows x {} columns", grid.height(), grid.width()),
        1,
    );

    let result = stage.apply(&grid, config)?;
    if result.is_empty() {
        log_warning(format!("{} produced an empty grid", stage));
    }
    workbook::save_grid(&result, &output)?;
    log_success(format!(
        "{} wrote {} rows x {} columns to {}",
        stage,
        result.height(),
        result.width(),
        output.display()
    ));

    Ok(StageReport {
        stage,
        input: input.to_path_buf(),
        output,
        rows: result.height(),
        columns: result.width(),
    })
}

/// Transpose `input` at the configured start cell.
pub fn transpose_file(
    input: &Path,
    output: Option<&Path>,
    config: &PipelineConfig,
) -> PipelineResult<StageReport> {
    run_stage_file(Stage::Transpose, input, output, config)
}

/// Normalize `input` with the configured variant.
pub fn normalize_file(
    input: &Path,
    output: Option<&Path>,
    config: &PipelineConfig,
) -> PipelineResult<StageReport> {
    run_stage_file(Stage::Normalize, input, output, config)
}

/// Write First Peak / AUC for a normalized `input`.
pub fn summarize_file(input: &Path, output: Option<&Path>) -> PipelineResult<StageReport> {
    run_stage_file(Stage::Summarize, input, output, &PipelineConfig::default())
}

/// Stages run by [`run_all_file`] for a normalize method.
///
/// Time-zero output keeps the `No.`/`Type` layout, which the summarizer
/// cannot read, so that chain stops after normalize.
pub fn chain_for(method: NormalizeMethod) -> &'static [Stage] {
    match method {
        NormalizeMethod::Average => &Stage::ALL,
        NormalizeMethod::TimeZero => &[Stage::Transpose, Stage::Normalize],
    }
}

/// Run transpose, normalize and (for the average method) summarize in
/// sequence, each stage persisting its output next to the input for the
/// next one to read.
pub fn run_all_file(input: &Path, config: &PipelineConfig) -> PipelineResult<Vec<StageReport>> {
    let stages = chain_for(config.method);
    if stages.len() < Stage::ALL.len() {
        log_warning(format!(
            "{} output has no summary layout, skipping {}",
            config.method,
            Stage::Summarize
        ));
    }

    let mut reports = Vec::with_capacity(stages.len());
    let mut current = input.to_path_buf();

    for &stage in stages {
        let report = run_stage_file(stage, &current, None, config)?;
        current = report.output.clone();
        reports.push(report);
    }

    Ok(reports)
}

/// Run `stages` in order on uploaded bytes and return the final grid as
/// xlsx bytes. `file_name` selects the input format.
pub fn run_stages_bytes(
    bytes: &[u8],
    file_name: &str,
    stages: &[Stage],
    config: &PipelineConfig,
) -> PipelineResult<Vec<u8>> {
    let mut grid = workbook::load_grid_bytes(bytes, file_name)?;
    log_info_indent(
        format!(
            "Loaded {} ({} rows x {} columns)",
            file_name,
            grid.height(),
            grid.width()
        ),
        1,
    );

    for stage in stages {
        grid = stage.apply(&grid, config)?;
        log_success(format!(
            "{}: {} rows x {} columns",
            stage,
            grid.height(),
            grid.width()
        ));
    }

    Ok(workbook::grid_to_xlsx_bytes(&grid)?)
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

    /// Two wells, five reads, anchor B8, a Comment row among the well rows.
    fn raw_plate() -> Grid {
        let mut rows: Vec<Vec<Cell>> = vec![
            vec![t("Application"), t("Reader")],
            vec![t("Mode"), t("Kinetic")],
            vec![],
            vec![],
            vec![t("Plate"), t("96")],
            vec![t("Temperature"), n(37.0)],
            vec![t("Start time"), t("09:00")],
        ];
        rows.push(vec![
            Cell::Empty,
            t("No."),
            n(0.0),
            n(1000.0),
            n(2000.0),
            n(3000.0),
            n(4000.0),
        ]);
        rows.push(vec![Cell::Empty, t("A1"), n(10.0), n(30.0), n(40.0), n(50.0), n(20.0)]);
        rows.push(vec![Cell::Empty, t("Comment"), t("lid on")]);
        rows.push(vec![Cell::Empty, t("A2"), n(4.0), n(6.0), n(8.0), n(5.0), n(5.0)]);
        Grid::from_rows(rows)
    }

    #[test]
    fn test_default_output_paths() {
        let input = Path::new("/data/plate.xlsx");
        assert_eq!(
            default_output_path(input, Stage::Transpose),
            PathBuf::from("/data/plate_transposed.xlsx")
        );
        assert_eq!(
            default_output_path(Path::new("/data/plate_transposed.xlsx"), Stage::Normalize),
            PathBuf::from("/data/plate_transposed_normalized.xlsx")
        );
        assert_eq!(
            default_output_path(Path::new("/data/plate_normalized.xlsx"), Stage::Summarize),
            PathBuf::from("/data/plate_FP_AUC.xlsx")
        );
        assert_eq!(
            default_output_path(Path::new("run.csv"), Stage::Transpose),
            PathBuf::from("run_transposed.csv")
        );
        assert_eq!(
            default_output_path(Path::new("legacy.xls"), Stage::Transpose),
            PathBuf::from("legacy_transposed.xlsx")
        );
    }

    #[test]
    fn test_end_to_end_in_memory() {
        let config = PipelineConfig {
            first_n_reads: 2,
            ..PipelineConfig::default()
        };

        let transposed = Stage::Transpose.apply(&raw_plate(), &config).unwrap();
        // Comment row gone: No. column + 2 wells, header + 5 reads
        assert_eq!(transposed.width(), 3);
        assert_eq!(transposed.height(), 6);
        assert_eq!(transposed.row(0).unwrap(), &[t("No."), t("A1"), t("A2")]);

        let normalized = Stage::Normalize.apply(&transposed, &config).unwrap();
        assert_eq!(normalized.get(0, 0), &t("Average first 2"));
        // Means of the first two reads per well
        assert_eq!(normalized.get(0, 1), &n(20.0));
        assert_eq!(normalized.get(0, 2), &n(5.0));
        assert_eq!(normalized.get(2, 0), &n(0.0));
        assert_eq!(normalized.get(6, 0), &n(4.0));

        let summary = Stage::Summarize.apply(&normalized, &config).unwrap();
        assert_eq!(summary.row(0).unwrap(), &[t(""), t("A1"), t("A2")]);
        // A1: -0.5, 0.5, 1.0, 1.5, 0.0
        assert_eq!(summary.get(1, 1), &n(1.5));
        assert_eq!(summary.get(2, 1), &n(2.5));
        // A2: -0.2, 0.2, 0.6, 0.0, 0.0
        let peak = summary.get(1, 2).as_number().unwrap();
        assert!((peak - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_time_zero_method_selected() {
        let config = PipelineConfig {
            method: NormalizeMethod::TimeZero,
            ..PipelineConfig::default()
        };
        let grid = Grid::from_rows(vec![
            vec![t("No."), t("A1")],
            vec![t("Type"), t("Raw")],
            vec![n(0.0), n(4.0)],
            vec![n(1000.0), n(6.0)],
        ]);
        let out = normalize(&grid, &config).unwrap();
        assert_eq!(out.get(1, 0), &t("Type"));
        assert_eq!(out.get(3, 1), &n(0.5));
    }

    #[test]
    fn test_run_all_files() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("plate.xlsx");
        workbook::save_grid(&raw_plate(), &input).unwrap();

        let config = PipelineConfig {
            first_n_reads: 2,
            ..PipelineConfig::default()
        };
        let reports = run_all_file(&input, &config).unwrap();

        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].output, dir.path().join("plate_transposed.xlsx"));
        assert_eq!(
            reports[1].output,
            dir.path().join("plate_transposed_normalized.xlsx")
        );
        assert_eq!(reports[2].output, dir.path().join("plate_transposed_FP_AUC.xlsx"));
        assert!(reports.iter().all(|r| r.output.exists()));

        let summary = workbook::load_grid(&reports[2].output).unwrap();
        assert_eq!(summary.get(1, 0), &t("First Peak"));
        assert_eq!(summary.get(1, 1), &n(1.5));
    }

    #[test]
    fn test_run_all_time_zero_stops_after_normalize() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("plate.xlsx");
        workbook::save_grid(&raw_plate(), &input).unwrap();

        let config = PipelineConfig {
            method: NormalizeMethod::TimeZero,
            ..PipelineConfig::default()
        };
        let reports = run_all_file(&input, &config).unwrap();

        let stages: Vec<Stage> = reports.iter().map(|r| r.stage).collect();
        assert_eq!(stages, vec![Stage::Transpose, Stage::Normalize]);
        assert!(!dir.path().join("plate_transposed_FP_AUC.xlsx").exists());
    }

    #[test]
    fn test_missing_input_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("missing.xlsx");

        let err = transpose_file(&input, None, &PipelineConfig::default()).unwrap_err();
        assert!(err.to_string().contains("Input file not found"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_stages_bytes_roundtrip() {
        let csv = "No.,A1,A2\n0,2,0\n1000,4,3\n";
        let config = PipelineConfig {
            first_n_reads: 1,
            ..PipelineConfig::default()
        };
        let bytes = run_stages_bytes(
            csv.as_bytes(),
            "plate_transposed.csv",
            &[Stage::Normalize, Stage::Summarize],
            &config,
        )
        .unwrap();

        let summary = workbook::load_grid_bytes(&bytes, "summary.xlsx").unwrap();
        assert_eq!(summary.get(0, 1), &t("A1"));
        assert_eq!(summary.get(1, 1), &n(1.0));
        // Zero baseline: raw values pass through
        assert_eq!(summary.get(2, 2), &n(3.0));
    }
}
