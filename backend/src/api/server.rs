//! HTTP server for the Wellflow API.
//!
//! Each stage endpoint takes a multipart upload (`file` plus optional
//! text fields) and answers with the resulting grid as an xlsx download.
//!
//! # API Endpoints
//!
//! | Method | Path              | Description                              |
//! |--------|-------------------|------------------------------------------|
//! | GET    | `/health`         | Health check                             |
//! | POST   | `/api/transpose`  | Transpose a raw export                   |
//! | POST   | `/api/normalize`  | Normalize a transposed grid              |
//! | POST   | `/api/fp-auc`     | First Peak / AUC of a normalized grid    |
//! | POST   | `/api/run-all`    | Transpose then normalize                 |
//! | GET    | `/api/logs`       | SSE stream for real-time logs            |

use axum::{
    extract::{Multipart, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, log_info, LOG_BROADCASTER};
use super::types::{download_name, error_response, StageForm, XLSX_CONTENT_TYPE};
use crate::config::PipelineConfig;
use crate::error::{ServerError, ServerResult};
use crate::transform::pipeline::{run_stages_bytes, Stage};

type ApiError = (StatusCode, Json<Value>);

#[derive(Clone)]
struct AppState {
    config: Arc<PipelineConfig>,
}

/// Build the API router around a base configuration.
pub fn router(config: PipelineConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/transpose", post(transpose_upload))
        .route("/api/normalize", post(normalize_upload))
        .route("/api/fp-auc", post(fp_auc_upload))
        .route("/api/run-all", post(run_all_upload))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(AppState {
            config: Arc::new(config),
        })
}

/// Start the HTTP server on `config.port`.
pub async fn start_server(config: PipelineConfig) -> Result<(), Box<dyn std::error::Error>> {
    let port = config.port;
    let app = router(config);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 Wellflow server running on http://localhost:{}", port);
    println!("   POST /api/transpose - Transpose raw export");
    println!("   POST /api/normalize - Normalize transposed grid");
    println!("   POST /api/fp-auc    - First Peak / AUC summary");
    println!("   POST /api/run-all   - Transpose + normalize");
    println!("   GET  /api/logs      - SSE log stream");
    println!("   GET  /health        - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "wellflow",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "transpose": "POST /api/transpose",
            "normalize": "POST /api/normalize",
            "fpAuc": "POST /api/fp-auc",
            "runAll": "POST /api/run-all",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        // Lagged receivers skip missed entries
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

async fn transpose_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    run_upload(&state, multipart, &[Stage::Transpose], Stage::Transpose).await
}

async fn normalize_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    run_upload(&state, multipart, &[Stage::Normalize], Stage::Normalize).await
}

async fn fp_auc_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    run_upload(&state, multipart, &[Stage::Summarize], Stage::Summarize).await
}

async fn run_all_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    run_upload(
        &state,
        multipart,
        &[Stage::Transpose, Stage::Normalize],
        Stage::Normalize,
    )
    .await
}

/// A parsed multipart upload.
struct Upload {
    bytes: Vec<u8>,
    file_name: String,
    form: StageForm,
}

async fn read_upload(mut multipart: Multipart) -> ServerResult<Upload> {
    let mut file: Option<(Vec<u8>, String)> = None;
    let mut form = StageForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();

        if name == "file" {
            let file_name = field.file_name().unwrap_or("upload.xlsx").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
            file = Some((bytes.to_vec(), file_name));
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
            form.set(&name, value);
        }
    }

    let (bytes, file_name) =
        file.ok_or_else(|| ServerError::BadRequest("No file provided".to_string()))?;
    if bytes.is_empty() {
        return Err(ServerError::BadRequest("Uploaded file is empty".to_string()));
    }

    Ok(Upload {
        bytes,
        file_name,
        form,
    })
}

async fn run_upload(
    state: &AppState,
    multipart: Multipart,
    stages: &[Stage],
    named: Stage,
) -> Result<Response, ApiError> {
    let upload = read_upload(multipart).await.map_err(reject)?;
    let config = upload.form.to_config(&state.config).map_err(reject)?;

    log_info(format!(
        "📄 Upload: {} ({} bytes)",
        upload.file_name,
        upload.bytes.len()
    ));

    let file_name = upload.file_name.clone();
    let stages = stages.to_vec();
    let bytes = tokio::task::spawn_blocking(move || {
        run_stages_bytes(&upload.bytes, &upload.file_name, &stages, &config)
    })
    .await
    .map_err(|e| reject(ServerError::Internal(e.to_string())))?
    .map_err(|e| reject(e.into()))?;

    let download = download_name(&file_name, named);
    Ok((
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", download),
            ),
        ],
        bytes,
    )
        .into_response())
}

fn reject(err: ServerError) -> ApiError {
    let status = match err {
        ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
        ServerError::Pipeline(_) | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    log_error(err.to_string());
    (status, Json(error_response(&err.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Cell;
    use crate::workbook::load_grid_bytes;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    const BOUNDARY: &str = "wellflow-test-boundary";

    fn multipart_body(file: Option<(&str, &str)>, fields: &[(&str, &str)]) -> Body {
        let mut body = String::new();
        if let Some((name, content)) = file {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\nContent-Type: text/csv\r\n\r\n{content}\r\n"
            ));
        }
        for (name, value) in fields {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        Body::from(body)
    }

    fn upload(uri: &str, body: Body) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(body)
            .unwrap()
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        response
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec()
    }

    #[tokio::test]
    async fn test_health() {
        let response = router(PipelineConfig::default())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn test_transpose_upload() {
        let body = multipart_body(
            Some(("plate.csv", "No.,0,1000\nA1,10,20\n")),
            &[("startCell", "A1")],
        );
        let response = router(PipelineConfig::default())
            .oneshot(upload("/api/transpose", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.contains("plate_transposed.xlsx"));

        let grid = load_grid_bytes(&body_bytes(response).await, "out.xlsx").unwrap();
        assert_eq!(grid.row(0).unwrap(), &[Cell::text("No."), Cell::text("A1")]);
        assert_eq!(grid.get(2, 1), &Cell::Number(20.0));
    }

    #[tokio::test]
    async fn test_missing_file_is_bad_request() {
        let body = multipart_body(None, &[("startCell", "B8")]);
        let response = router(PipelineConfig::default())
            .oneshot(upload("/api/transpose", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(json["error"], "Invalid request: No file provided");
    }

    #[tokio::test]
    async fn test_stage_failure_is_server_error() {
        let body = multipart_body(Some(("plate_normalized.csv", "Average first 1,1\n")), &[]);
        let response = router(PipelineConfig::default())
            .oneshot(upload("/api/fp-auc", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert!(json["error"].as_str().unwrap().contains("summarize"));
    }

    #[tokio::test]
    async fn test_run_all_upload() {
        let body = multipart_body(
            Some(("plate.csv", "No.,0,1000,2000\nA1,10,30,20\n")),
            &[("startCell", "A1"), ("firstNReads", "2")],
        );
        let response = router(PipelineConfig::default())
            .oneshot(upload("/api/run-all", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.contains("plate_normalized.xlsx"));

        let grid = load_grid_bytes(&body_bytes(response).await, "out.xlsx").unwrap();
        assert_eq!(grid.get(0, 0), &Cell::text("Average first 2"));
        assert_eq!(grid.get(0, 1), &Cell::Number(20.0));
        assert_eq!(grid.get(2, 1), &Cell::Number(-0.5));
        assert_eq!(grid.get(4, 0), &Cell::Number(2.0));
    }
}
