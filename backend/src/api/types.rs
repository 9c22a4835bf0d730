//! REST API types: upload form fields, error bodies and download names.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::error::{ServerError, ServerResult};
use crate::transform::normalize::NormalizeMethod;
use crate::transform::pipeline::Stage;

/// MIME type of xlsx downloads.
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Text fields of a stage upload, as sent by the web form.
///
/// Every field is optional; blank values fall back to the server
/// configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageForm {
    pub start_cell: Option<String>,
    pub method: Option<String>,
    pub max_seconds: Option<String>,
    pub first_n_reads: Option<String>,
    pub filter_letters: Option<String>,
    pub filter_range: Option<String>,
}

impl StageForm {
    /// Record a multipart text field. Unknown names are ignored.
    pub fn set(&mut self, name: &str, value: String) {
        let value = Some(value.trim().to_string()).filter(|v| !v.is_empty());
        match name {
            "startCell" => self.start_cell = value,
            "method" => self.method = value,
            "maxSeconds" => self.max_seconds = value,
            "firstNReads" => self.first_n_reads = value,
            "filterLetters" => self.filter_letters = value,
            "filterRange" => self.filter_range = value,
            _ => {}
        }
    }

    /// Overlay the form on `base`.
    ///
    /// A `maxSeconds` that does not parse or is not positive is dropped
    /// (no window). An unknown method or a non-integer `firstNReads` is a
    /// bad request.
    pub fn to_config(&self, base: &PipelineConfig) -> ServerResult<PipelineConfig> {
        let mut config = base.clone();

        if let Some(cell) = &self.start_cell {
            config.start_cell = cell.clone();
        }
        if let Some(method) = &self.method {
            config.method = method
                .parse::<NormalizeMethod>()
                .map_err(ServerError::BadRequest)?;
        }
        if let Some(raw) = &self.max_seconds {
            config.max_seconds = raw.parse::<f64>().ok().filter(|s| *s > 0.0);
        }
        if let Some(raw) = &self.first_n_reads {
            config.first_n_reads = raw.parse().map_err(|_| {
                ServerError::BadRequest(format!("firstNReads must be an integer, got '{}'", raw))
            })?;
        }
        if self.filter_letters.is_some() {
            config.filter_letters = self.filter_letters.clone();
        }
        if self.filter_range.is_some() {
            config.filter_range = self.filter_range.clone();
        }

        Ok(config)
    }
}

/// Name of the file returned by a stage endpoint.
///
/// The suffix left by the previous stage is stripped first, so
/// `plate_transposed.xlsx` normalizes to `plate_normalized.xlsx`. Characters
/// outside `[A-Za-z0-9._-]` become `_` so the name is safe in a
/// `Content-Disposition` header.
pub fn download_name(upload_name: &str, stage: Stage) -> String {
    let stem = upload_name
        .rsplit_once('.')
        .map_or(upload_name, |(stem, _)| stem);
    let previous = match stage {
        Stage::Transpose => None,
        Stage::Normalize => Some("_transposed"),
        Stage::Summarize => Some("_normalized"),
    };
    let base = previous
        .and_then(|suffix| stem.strip_suffix(suffix))
        .unwrap_or(stem);
    let base: String = base
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '_' | '-' => c,
            _ => '_',
        })
        .collect();
    let base = if base.is_empty() { "file" } else { base.as_str() };
    format!("{}{}.xlsx", base, stage.suffix())
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
    })
}
