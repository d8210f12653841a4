//! Review Analyzer - customer-review spreadsheet analysis server.
//!
//! Upload a review spreadsheet, get the automatic column-role mapping back
//! for human review, optionally override it, and request a generated
//! analysis report.

mod config;
mod error;
mod loader;
mod mapping;
mod openai;
mod report;
mod summary;
mod table;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use config::{CandidateTable, ReportConfig, Role};
use error::AnalysisError;
use loader::{Sheet, SheetSelector};
use mapping::RoleMapping;
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    candidates: Arc<CandidateTable>,
    report_config: Arc<ReportConfig>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "review_analyzer=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let report_config = ReportConfig::from_env();
    if report_config.api_key.is_none() {
        warn!("OPENAI_API_KEY not set; /report requests will be rejected");
    }
    info!("Report model: {}", report_config.model);

    let state = AppState {
        candidates: Arc::new(CandidateTable::standard()),
        report_config: Arc::new(report_config),
    };

    let app = Router::new()
        .route("/health", get(health))
        .route("/roles", get(list_roles))
        .route("/resolve", post(resolve_upload))
        .route("/summary", post(summarize_upload))
        .route("/report", post(report_upload))
        .layer(DefaultBodyLimit::max(100 * 1024 * 1024)) // 100MB
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
    info!("Server listening on http://0.0.0.0:3000");
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

#[derive(serde::Serialize)]
struct RoleInfo {
    role: Role,
    label: &'static str,
    required: bool,
    candidates: Vec<String>,
}

/// List the column roles and the header names that auto-map to each.
async fn list_roles(State(state): State<AppState>) -> Json<Vec<RoleInfo>> {
    let roles = state
        .candidates
        .entries()
        .iter()
        .map(|(role, candidates)| RoleInfo {
            role: *role,
            label: role.label(),
            required: role.is_required(),
            candidates: candidates.clone(),
        })
        .collect();
    Json(roles)
}

#[derive(serde::Deserialize)]
struct SheetQuery {
    sheet: Option<String>,
}

#[derive(serde::Serialize)]
struct ResolveResponse {
    sheet: String,
    headers: Vec<String>,
    row_count: usize,
    mapping: RoleMapping,
}

/// Upload a spreadsheet and return the automatic role mapping.
async fn resolve_upload(
    State(state): State<AppState>,
    Query(query): Query<SheetQuery>,
    multipart: Multipart,
) -> Result<Json<ResolveResponse>, (StatusCode, String)> {
    let upload = read_upload(multipart).await?;
    let sheet = load_sheet(&upload, query.sheet.as_deref())?;

    let mut mapping = mapping::resolve_columns(&sheet.table, &state.candidates);
    if let Some(overrides) = &upload.overrides {
        mapping.apply_overrides(overrides, &sheet.table);
    }

    Ok(Json(ResolveResponse {
        sheet: sheet.name,
        headers: sheet.table.headers().iter().map(|h| h.to_string()).collect(),
        row_count: sheet.table.row_count(),
        mapping,
    }))
}

#[derive(serde::Serialize)]
struct SummaryResponse {
    summary: String,
}

/// Upload a spreadsheet and return the statistical summary text that would
/// be sent to the model.
async fn summarize_upload(
    State(state): State<AppState>,
    Query(query): Query<SheetQuery>,
    multipart: Multipart,
) -> Result<Json<SummaryResponse>, (StatusCode, String)> {
    let upload = read_upload(multipart).await?;
    let sheet = load_sheet(&upload, query.sheet.as_deref())?;

    let mut mapping = mapping::resolve_columns(&sheet.table, &state.candidates);
    if let Some(overrides) = &upload.overrides {
        mapping.apply_overrides(overrides, &sheet.table);
    }

    let summary = summary::build_summary(&sheet.table, &mapping)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    Ok(Json(SummaryResponse { summary }))
}

#[derive(serde::Deserialize)]
struct ReportQuery {
    sheet: Option<String>,
    model: Option<String>,
}

#[derive(serde::Serialize)]
struct ReportResponse {
    report: String,
    error: Option<String>,
}

/// Upload a spreadsheet and generate the analysis report. Analysis failures
/// (missing credential, missing review column, endpoint errors) come back as
/// the `{report, error}` pair rather than a transport error.
async fn report_upload(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
    multipart: Multipart,
) -> Result<Json<ReportResponse>, (StatusCode, String)> {
    let upload = read_upload(multipart).await?;
    let sheet = load_sheet(&upload, query.sheet.as_deref())?;

    let mut mapping = mapping::resolve_columns(&sheet.table, &state.candidates);
    if let Some(overrides) = &upload.overrides {
        mapping.apply_overrides(overrides, &sheet.table);
    }

    let mut report_config = (*state.report_config).clone();
    if let Some(model) = query.model.as_deref() {
        if !model.trim().is_empty() {
            report_config = report_config.with_model(model.trim());
        }
    }

    info!(
        "Generating report for '{}' (sheet '{}', {} rows)",
        upload.filename,
        sheet.name,
        sheet.table.row_count()
    );

    match report::generate_report(&sheet.table, &mapping, &report_config).await {
        Ok(text) => Ok(Json(ReportResponse {
            report: text,
            error: None,
        })),
        Err(e) => {
            if let AnalysisError::Generation(ref description) = e {
                tracing::error!("Report generation failed: {}", description);
            }
            Ok(Json(ReportResponse {
                report: String::new(),
                error: Some(e.to_string()),
            }))
        }
    }
}

// ============================================================================
// Upload plumbing
// ============================================================================

struct Upload {
    filename: String,
    data: Vec<u8>,
    overrides: Option<HashMap<Role, Option<String>>>,
}

/// Read the multipart upload: a `file` part plus an optional `mapping` part
/// holding `{role: column|null}` overrides.
async fn read_upload(mut multipart: Multipart) -> Result<Upload, (StatusCode, String)> {
    let mut filename = String::new();
    let mut data = Vec::new();
    let mut overrides = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Multipart error: {}", e)))?
    {
        match field.name() {
            Some("file") => {
                filename = field.file_name().unwrap_or("upload").to_string();
                data = field
                    .bytes()
                    .await
                    .map_err(|e| (StatusCode::BAD_REQUEST, format!("Failed to read file: {}", e)))?
                    .to_vec();
            }
            Some("mapping") => {
                let text = field.text().await.map_err(|e| {
                    (StatusCode::BAD_REQUEST, format!("Failed to read mapping: {}", e))
                })?;
                let parsed: HashMap<Role, Option<String>> = serde_json::from_str(&text)
                    .map_err(|e| {
                        (StatusCode::BAD_REQUEST, format!("Invalid mapping JSON: {}", e))
                    })?;
                overrides = Some(parsed);
            }
            _ => {}
        }
    }

    if data.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "No file uploaded".to_string()));
    }

    Ok(Upload {
        filename,
        data,
        overrides,
    })
}

/// Parse the upload and pick the requested worksheet (default: first).
fn load_sheet(upload: &Upload, sheet: Option<&str>) -> Result<Sheet, (StatusCode, String)> {
    let sheets = loader::parse_file(&upload.filename, &upload.data)
        .map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;

    let selector = sheet
        .filter(|s| !s.trim().is_empty())
        .map(SheetSelector::parse)
        .unwrap_or_default();
    loader::select_sheet(sheets, &selector).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
}
