//! Inbound callbacks of the remote translation services
//!
//! Each translator variant exposes the same two routes:
//!
//! * `POST /{variant}/translations/{job_id}` applies translated field data
//! * `GET /{variant}/translations/{job_id}/items` lists the job's active items

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tmgmt_connector::{ConnectorError, JobId, JobItemId, JobStore, TranslationJob, apply_to_job};
use tracing::{info, warn};

/// Translator variants with callback routes
pub const VARIANTS: &[&str] = &["lang_connector", "xtm_connect"];

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ApplyResponse {
    pub success: bool,
    #[serde(rename = "jobId")]
    pub job_id: JobId,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct JobItemEntry {
    pub resource_id: String,
    pub resource_type: String,
    pub job_item_id: JobItemId,
    pub content: Value,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn JobStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/{variant}/translations/{job_id}", post(apply_translations))
        .route("/{variant}/translations/{job_id}/items", get(get_job_items))
        .with_state(state)
}

fn error_response(err: ConnectorError) -> ApiError {
    let status = match err {
        ConnectorError::JobNotFound(_) => StatusCode::NOT_FOUND,
        ConnectorError::Apply(_) => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

fn check_variant(variant: &str) -> Result<(), ApiError> {
    if VARIANTS.contains(&variant) {
        return Ok(());
    }
    Err((
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("Unknown translator '{}'", variant),
        }),
    ))
}

async fn load_job(state: &AppState, job_id: JobId) -> Result<TranslationJob, ApiError> {
    state.store.get(job_id).await.map_err(error_response)
}

async fn apply_translations(
    State(state): State<AppState>,
    Path((variant, job_id)): Path<(String, JobId)>,
    Json(payload): Json<Value>,
) -> Result<Json<ApplyResponse>, ApiError> {
    check_variant(&variant)?;
    let mut job = load_job(&state, job_id).await?;

    let written = apply_to_job(&mut job, &payload).map_err(|e| {
        warn!(job_id, error = %e, "rejected translation callback");
        error_response(e)
    })?;
    state.store.save(&job).await.map_err(error_response)?;

    info!(job_id, written, translator = %variant, "applied translation callback");

    Ok(Json(ApplyResponse {
        success: true,
        job_id,
    }))
}

async fn get_job_items(
    State(state): State<AppState>,
    Path((variant, job_id)): Path<(String, JobId)>,
) -> Result<Json<Vec<JobItemEntry>>, ApiError> {
    check_variant(&variant)?;
    let job = load_job(&state, job_id).await?;

    let items = job
        .active_items()
        .map(|item| JobItemEntry {
            resource_id: item.item_id.clone(),
            resource_type: item.item_type.clone(),
            job_item_id: item.id,
            content: item.data.clone(),
        })
        .collect();

    Ok(Json(items))
}
