use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use outreach_core::models::{
    CreateOrganizationInput, CreateUserInput, Organization, OrganizationWithMembers,
    UpdateOrganizationStatusInput, User, UserWithOrganization,
};
use serde::Deserialize;
use uuid::Uuid;

use super::{ApiError, AppState};

pub async fn list_organizations(
    State(state): State<AppState>,
) -> Result<Json<Vec<OrganizationWithMembers>>, ApiError> {
    Ok(Json(state.db.list_organizations()?))
}

pub async fn create_organization(
    State(state): State<AppState>,
    Json(input): Json<CreateOrganizationInput>,
) -> Result<(StatusCode, Json<Organization>), ApiError> {
    let organization = state.db.create_organization(input)?;
    Ok((StatusCode::CREATED, Json(organization)))
}

pub async fn update_organization_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateOrganizationStatusInput>,
) -> Result<StatusCode, ApiError> {
    if state.db.update_organization_status(id, input.status)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Organization {} not found", id)))
    }
}

#[derive(Debug, Deserialize)]
pub struct UsersQuery {
    pub organization_id: Option<Uuid>,
}

pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UsersQuery>,
) -> Result<Json<Vec<UserWithOrganization>>, ApiError> {
    Ok(Json(state.db.list_users(query.organization_id)?))
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(input): Json<CreateUserInput>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = state.db.create_user(input)?;
    Ok((StatusCode::CREATED, Json(user)))
}
