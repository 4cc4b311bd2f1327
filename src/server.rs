use std::any::Any;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::{
    cloud::Connector,
    error::ExportError,
    report,
    scanner::{self, ScanOptions},
    store::ScanStore,
    types::{NetworkRecord, SkippedRegion},
};

#[derive(Clone)]
pub struct AppState {
    pub connector: Arc<dyn Connector>,
    pub options: ScanOptions,
    pub store: ScanStore,
}

impl AppState {
    pub fn new(connector: Arc<dyn Connector>, options: ScanOptions) -> Self {
        Self {
            connector,
            options,
            store: ScanStore::new(),
        }
    }
}

/// Body of a successful `POST /api/scan`.
#[derive(Debug, Serialize)]
pub struct ScanResponse {
    pub success: bool,
    pub data: Vec<NetworkRecord>,
    pub total_entries: usize,
    pub regions_scanned: usize,
    pub skipped_regions: Vec<SkippedRegion>,
}

/// Build the application router: JSON API under `/api`, static files from `ui_dir` otherwise.
pub fn router(state: AppState, ui_dir: impl AsRef<Path>) -> Router {
    let api = Router::new()
        .route("/scan", post(post_scan))
        .route("/export", get(get_export))
        .route("/health", get(get_health))
        .with_state(state);

    let static_svc = ServeDir::new(ui_dir.as_ref()).append_index_html_on_directories(true);

    Router::new()
        .nest("/api", api)
        .fallback_service(static_svc)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
}

pub async fn spawn_server(bind: &str, state: AppState, ui_dir: impl AsRef<Path>) -> Result<()> {
    let app = router(state, ui_dir);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("Serving UI on http://{}", bind);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn get_health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

async fn post_scan(State(app): State<AppState>) -> Response {
    let api = match app.connector.connect() {
        Ok(api) => api,
        Err(e) => {
            error!(error = %e, "cannot start scan");
            return failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to load AWS credentials: {e}"),
            );
        }
    };

    let result = scanner::scan_all(api, &app.options).await;
    if !result.success {
        let msg = result
            .error
            .unwrap_or_else(|| "Unknown error occurred".to_string());
        return failure(StatusCode::INTERNAL_SERVER_ERROR, msg);
    }

    app.store.apply(&result).await;
    let out = ScanResponse {
        success: true,
        total_entries: result.total_entries(),
        regions_scanned: result.regions_scanned,
        data: result.records,
        skipped_regions: result.skipped_regions,
    };
    (StatusCode::OK, Json(out)).into_response()
}

async fn get_export(State(app): State<AppState>) -> Response {
    let records = app.store.snapshot().await.unwrap_or_default();
    match report::export(&records) {
        Ok(report) => {
            let disposition = format!("attachment; filename=\"{}\"", report.filename);
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, report.content_type.to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                report.bytes,
            )
                .into_response()
        }
        Err(e @ ExportError::NoData) => failure(StatusCode::BAD_REQUEST, e.to_string()),
        Err(e) => {
            error!(error = %e, "export failed");
            failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

fn failure(status: StatusCode, error: impl Into<String>) -> Response {
    let body = json!({ "success": false, "error": error.into() });
    (status, Json(body)).into_response()
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let msg = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "internal error".to_string()
    };
    error!(error = %msg, "handler panicked");
    failure(StatusCode::INTERNAL_SERVER_ERROR, msg)
}
