use axum::{
    Extension, Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{delete, get, post},
};
use db::models::{
    conference::{Conference, ConferenceState, CreateConference},
    paper::Paper,
};
use serde::{Deserialize, Serialize};
use services::services::policy::Principal;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

/// Anyone may browse the finalized proceedings.
pub fn public_router() -> Router<AppState> {
    Router::new().route("/conferences/published", get(list_published))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/conferences", get(list_conferences))
        .route("/conferences", post(create_conference))
        .route("/conferences/search", get(search_conferences))
        .route("/conferences/{id}", get(get_conference))
        .route("/conferences/{id}", delete(delete_conference))
        .route("/conferences/{id}/transition", post(transition_conference))
        .route("/conferences/{id}/chairs", post(add_chairs))
        .route("/conferences/{id}/members", post(add_members))
}

#[derive(Debug, Serialize)]
pub struct ConferenceDetail {
    #[serde(flatten)]
    pub conference: Conference,
    pub chairs: Vec<Uuid>,
    pub members: Vec<Uuid>,
    pub papers: Vec<Paper>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub target: ConferenceState,
}

#[derive(Debug, Deserialize)]
pub struct MembershipRequest {
    pub user_ids: Vec<Uuid>,
}

/// GET /api/conferences
async fn list_conferences(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<Conference>>>, ApiError> {
    let conferences = Conference::find_all(&state.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(conferences)))
}

/// GET /api/conferences/search?name=&description=
async fn search_conferences(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Conference>>>, ApiError> {
    let conferences = Conference::search(
        &state.db().pool,
        params.name.as_deref(),
        params.description.as_deref(),
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(conferences)))
}

/// GET /api/conferences/published - conferences that have reached FINAL
async fn list_published(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<Conference>>>, ApiError> {
    let conferences = Conference::find_final(&state.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(conferences)))
}

/// GET /api/conferences/:id - conference with membership and its papers
async fn get_conference(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<ConferenceDetail>>, ApiError> {
    let pool = &state.db().pool;
    let conference = Conference::find_by_id(pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Conference not found".into()))?;
    let chairs = Conference::chair_ids(pool, id).await?;
    let members = Conference::member_ids(pool, id).await?;
    let papers = Paper::find_by_conference(pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(ConferenceDetail {
        conference,
        chairs,
        members,
        papers,
    })))
}

/// POST /api/conferences
async fn create_conference(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ResponseJson(req): ResponseJson<CreateConference>,
) -> Result<ResponseJson<ApiResponse<Conference>>, ApiError> {
    let conference = state.workflow().create_conference(&principal, req).await?;
    Ok(ResponseJson(ApiResponse::success(conference)))
}

/// POST /api/conferences/:id/transition
async fn transition_conference(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    ResponseJson(req): ResponseJson<TransitionRequest>,
) -> Result<ResponseJson<ApiResponse<Conference>>, ApiError> {
    let conference = state
        .workflow()
        .transition_conference(&principal, id, req.target)
        .await?;
    Ok(ResponseJson(ApiResponse::success(conference)))
}

/// DELETE /api/conferences/:id
async fn delete_conference(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    state.workflow().delete_conference(&principal, id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

/// POST /api/conferences/:id/chairs
async fn add_chairs(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    ResponseJson(req): ResponseJson<MembershipRequest>,
) -> Result<ResponseJson<ApiResponse<Conference>>, ApiError> {
    let conference = state
        .workflow()
        .add_chairs(&principal, id, &req.user_ids)
        .await?;
    Ok(ResponseJson(ApiResponse::success(conference)))
}

/// POST /api/conferences/:id/members
async fn add_members(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    ResponseJson(req): ResponseJson<MembershipRequest>,
) -> Result<ResponseJson<ApiResponse<Conference>>, ApiError> {
    let conference = state
        .workflow()
        .add_members(&principal, id, &req.user_ids)
        .await?;
    Ok(ResponseJson(ApiResponse::success(conference)))
}
