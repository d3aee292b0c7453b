// Check-in Desk - REST API with Axum
//
// Thin boundary over `CheckInEngine`: decode the request, run one engine
// operation, encode the outcome. No decision logic lives here.

use crate::checkin::{CheckInEngine, CheckInOutcome, CheckInRequest};
use crate::matcher::Candidate;
use crate::record::AttendeeRecord;
use crate::roster::{read_roster_csv, write_export_csv};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::error;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<CheckInEngine>,
}

impl AppState {
    pub fn new(engine: CheckInEngine) -> Self {
        AppState {
            engine: Arc::new(engine),
        }
    }
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckedInResponse {
    success: bool,
    user: AttendeeRecord,
    is_new: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AlreadyCheckedInResponse {
    success: bool,
    error: String,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    check_in_time: Option<i64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfirmationResponse {
    success: bool,
    requires_confirmation: bool,
    candidates: Vec<Candidate>,
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
}

#[derive(Serialize)]
struct ImportResponse {
    success: bool,
    count: usize,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            success: false,
            error: message.into(),
        }),
    )
        .into_response()
}

fn internal_error(context: &str, err: anyhow::Error) -> Response {
    error!("{}: {:#}", context, err);
    error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("{}: {}", context, err))
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/stats - Desk counters
async fn get_stats(State(state): State<AppState>) -> Response {
    match state.engine.stats() {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(e) => internal_error("Failed to compute stats", e),
    }
}

/// GET /api/list - All records, latest check-in first
async fn get_list(State(state): State<AppState>) -> Response {
    match state.engine.list_records() {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(e) => internal_error("Failed to list records", e),
    }
}

/// POST /api/checkin - Resolve identity and check in
async fn post_checkin(
    State(state): State<AppState>,
    payload: Result<Json<CheckInRequest>, JsonRejection>,
) -> Response {
    // Null or mistyped fields count as missing
    let Json(req) = match payload {
        Ok(req) => req,
        Err(rejection) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("name and phone are both required ({})", rejection.body_text()),
            )
        }
    };

    let outcome = match state.engine.check_in(&req) {
        Ok(outcome) => outcome,
        Err(e) => return internal_error("Check-in failed", e),
    };
    let message = outcome.message();

    match outcome {
        CheckInOutcome::Success { record, is_new } => Json(CheckedInResponse {
            success: true,
            user: record,
            is_new,
        })
        .into_response(),
        CheckInOutcome::AlreadyCheckedIn {
            name,
            check_in_time,
        } => Json(AlreadyCheckedInResponse {
            success: false,
            error: message,
            name,
            check_in_time,
        })
        .into_response(),
        CheckInOutcome::RequiresConfirmation { candidates } => Json(ConfirmationResponse {
            success: false,
            requires_confirmation: true,
            candidates,
        })
        .into_response(),
        CheckInOutcome::ValidationError { reason } => {
            error_response(StatusCode::BAD_REQUEST, reason)
        }
    }
}

/// POST /api/import - Replace the roster with an uploaded CSV
async fn post_import(State(state): State<AppState>, body: String) -> Response {
    let rows = match read_roster_csv(body.as_bytes()) {
        Ok(rows) => rows,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, format!("{:#}", e)),
    };

    match state.engine.import_roster(rows) {
        Ok(count) => Json(ImportResponse {
            success: true,
            count,
        })
        .into_response(),
        Err(e) => internal_error("Import failed", e),
    }
}

/// GET /api/export - Check-in sheet as CSV
async fn get_export(State(state): State<AppState>) -> Response {
    let rows = match state.engine.export_roster() {
        Ok(rows) => rows,
        Err(e) => return internal_error("Export failed", e),
    };

    // BOM so spreadsheet apps pick UTF-8 for the Chinese headers
    let mut buf = "\u{feff}".as_bytes().to_vec();
    if let Err(e) = write_export_csv(&mut buf, &rows) {
        return internal_error("Export failed", e);
    }

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"checkin_export.csv\"",
            ),
        ],
        buf,
    )
        .into_response()
}

// ============================================================================
// Router
// ============================================================================

pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/stats", get(get_stats))
        .route("/list", get(get_list))
        .route("/checkin", post(post_checkin))
        .route("/import", post(post_import))
        .route("/export", get(get_export))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}
