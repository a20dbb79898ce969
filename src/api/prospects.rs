use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use outreach_core::models::{
    normalize_email, DeleteScope, FunnelFlag, FunnelMetrics, NewProspect, Prospect,
    ProspectFilter, ProspectPatch, UpdateProspectInput, UpsertOutcome,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{ApiError, AppState};
use crate::import::{export_prospects, import_prospects, ImportReport};

const DEFAULT_PAGE_SIZE: usize = 50;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub filter: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct FilterQuery {
    pub filter: Option<String>,
}

fn parse_filter(raw: Option<&str>) -> Result<ProspectFilter, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(ProspectFilter::All),
        Some(s) => ProspectFilter::from_str(s)
            .ok_or_else(|| ApiError::BadRequest(format!("Unknown filter '{}'", s))),
    }
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Prospect>>, ApiError> {
    let filter = parse_filter(query.filter.as_deref())?;
    let prospects = state.db.list_prospects(
        filter,
        Some(query.limit.unwrap_or(DEFAULT_PAGE_SIZE)),
        query.offset.unwrap_or(0),
    )?;
    Ok(Json(prospects))
}

#[derive(Debug, Serialize)]
pub struct UpsertResponse {
    pub prospect: Prospect,
    pub outcome: UpsertOutcome,
}

pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<NewProspect>,
) -> Result<(StatusCode, Json<UpsertResponse>), ApiError> {
    let (prospect, outcome) = state.db.upsert_prospect(&input)?;
    let status = match outcome {
        UpsertOutcome::Inserted => StatusCode::CREATED,
        UpsertOutcome::Merged => StatusCode::OK,
    };
    Ok((status, Json(UpsertResponse { prospect, outcome })))
}

pub async fn get(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<Prospect>, ApiError> {
    state
        .db
        .find_prospect(&email)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Prospect {} not found", normalize_email(&email))))
}

pub async fn update(
    State(state): State<AppState>,
    Path(email): Path<String>,
    Json(input): Json<UpdateProspectInput>,
) -> Result<Json<Prospect>, ApiError> {
    let patch = ProspectPatch {
        fields: input,
        ..Default::default()
    };
    state
        .db
        .patch_prospect(&email, &patch)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Prospect {} not found", normalize_email(&email))))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.db.delete_prospect(&email)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!(
            "Prospect {} not found",
            normalize_email(&email)
        )))
    }
}

#[derive(Debug, Deserialize)]
pub struct FlagToggle {
    pub flag: String,
    pub value: bool,
}

pub async fn toggle_flag(
    State(state): State<AppState>,
    Path(email): Path<String>,
    Json(input): Json<FlagToggle>,
) -> Result<Json<Prospect>, ApiError> {
    let flag = FunnelFlag::from_str(&input.flag)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown flag '{}'", input.flag)))?;
    let prospect = state.sequencer.toggle_funnel_flag(&email, flag, input.value)?;
    Ok(Json(prospect))
}

#[derive(Debug, Deserialize)]
pub struct BulkDelete {
    pub scope: String,
}

pub async fn bulk_delete(
    State(state): State<AppState>,
    Json(input): Json<BulkDelete>,
) -> Result<Json<Value>, ApiError> {
    let scope = DeleteScope::from_str(&input.scope)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown delete scope '{}'", input.scope)))?;
    let deleted = state.db.delete_prospects(scope)?;
    tracing::info!(scope = scope.as_str(), deleted, "Bulk deleted prospects");
    Ok(Json(json!({ "deleted": deleted })))
}

/// CSV upload as the raw request body.
pub async fn import(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<ImportReport>, ApiError> {
    let report = import_prospects(&state.db, body.as_bytes())?;
    Ok(Json(report))
}

pub async fn export(
    State(state): State<AppState>,
    Query(query): Query<FilterQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = parse_filter(query.filter.as_deref())?;
    let mut buf = Vec::new();
    export_prospects(&state.db, filter, &mut buf)?;
    let disposition = format!(
        "attachment; filename=\"prospects-{}-{}.csv\"",
        filter.as_str(),
        chrono::Utc::now().format("%Y-%m-%d")
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        buf,
    ))
}

pub async fn metrics(State(state): State<AppState>) -> Result<Json<FunnelMetrics>, ApiError> {
    Ok(Json(state.db.funnel_metrics()?))
}
