use axum::{
    Extension, Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{delete, get, post},
};
use base64::Engine;
use db::models::paper::{ContentType, CreatePaper, Paper, PaperReview};
use serde::{Deserialize, Serialize};
use services::services::policy::Principal;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

/// Anyone may browse the published program.
pub fn public_router() -> Router<AppState> {
    Router::new().route("/papers/published", get(list_published))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/papers/search", get(search_papers))
        .route("/papers/{id}", get(get_paper))
        .route("/papers/mine", get(list_mine))
        .route("/papers/assigned", get(list_assigned))
        .route("/papers", post(create_paper))
        .route("/papers/{id}/submit", post(submit_paper))
        .route("/papers/{id}/add-coauthor", post(add_co_author))
        .route("/papers/{id}/assign-reviewer", post(assign_reviewer))
        .route("/papers/{id}/review", post(record_review))
        .route("/papers/{id}/approve", post(approve_paper))
        .route("/papers/{id}/reject", post(reject_paper))
        .route("/papers/{id}/final-submit", post(final_submit_paper))
        .route("/papers/{id}/accept", post(accept_paper))
        .route("/papers/{id}", delete(withdraw_paper))
}

#[derive(Debug, Serialize)]
pub struct PaperDetail {
    #[serde(flatten)]
    pub paper: Paper,
    pub reviews: Vec<PaperReview>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub title: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub author: Option<String>,
}

/// Document upload: content is base64 so it travels inside JSON.
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub content: String,
    pub content_type: ContentType,
}

#[derive(Debug, Deserialize)]
pub struct FinalSubmitRequest {
    pub content: String,
    pub content_type: ContentType,
    pub addressing_comments: String,
}

#[derive(Debug, Deserialize)]
pub struct AssignReviewerRequest {
    pub reviewer: String,
}

#[derive(Debug, Deserialize)]
pub struct AddCoAuthorRequest {
    pub co_author: String,
}

/// At least one of score and comment must be present; the engine enforces it.
#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub score: Option<i64>,
    pub comment: Option<String>,
}

fn decode_content(encoded: &str) -> Result<Vec<u8>, ApiError> {
    base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|_| ApiError::BadRequest("Content must be valid base64".into()))
}

/// GET /api/papers/published - papers past the decision gate
async fn list_published(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<Paper>>>, ApiError> {
    let papers = Paper::find_published(&state.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(papers)))
}

/// GET /api/papers/search?title=&abstract=&author=
async fn search_papers(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Paper>>>, ApiError> {
    let pool = &state.db().pool;
    let papers = match params.author.as_deref() {
        Some(author) => Paper::find_by_author(pool, author).await?,
        None => {
            Paper::search(pool, params.title.as_deref(), params.abstract_text.as_deref()).await?
        }
    };
    Ok(ResponseJson(ApiResponse::success(papers)))
}

/// GET /api/papers/mine - papers where the caller is an author or co-author
async fn list_mine(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<ResponseJson<ApiResponse<Vec<Paper>>>, ApiError> {
    let papers = Paper::find_by_author(&state.db().pool, &principal.username).await?;
    Ok(ResponseJson(ApiResponse::success(papers)))
}

/// GET /api/papers/assigned - papers where the caller is an assigned reviewer
async fn list_assigned(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<ResponseJson<ApiResponse<Vec<Paper>>>, ApiError> {
    let papers = Paper::find_by_reviewer(&state.db().pool, &principal.username).await?;
    Ok(ResponseJson(ApiResponse::success(papers)))
}

/// GET /api/papers/:id - paper with its review history
async fn get_paper(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<PaperDetail>>, ApiError> {
    let pool = &state.db().pool;
    let paper = Paper::find_by_id(pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Paper not found".into()))?;
    let reviews = Paper::reviews(pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(PaperDetail {
        paper,
        reviews,
    })))
}

/// POST /api/papers
async fn create_paper(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ResponseJson(req): ResponseJson<CreatePaper>,
) -> Result<ResponseJson<ApiResponse<Paper>>, ApiError> {
    let paper = state.workflow().create_paper(&principal, req).await?;
    Ok(ResponseJson(ApiResponse::success(paper)))
}

/// POST /api/papers/:id/submit
async fn submit_paper(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    ResponseJson(req): ResponseJson<SubmitRequest>,
) -> Result<ResponseJson<ApiResponse<Paper>>, ApiError> {
    let content = decode_content(&req.content)?;
    let paper = state
        .workflow()
        .submit_paper(&principal, id, content, req.content_type)
        .await?;
    Ok(ResponseJson(ApiResponse::success(paper)))
}

/// POST /api/papers/:id/add-coauthor
async fn add_co_author(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    ResponseJson(req): ResponseJson<AddCoAuthorRequest>,
) -> Result<ResponseJson<ApiResponse<Paper>>, ApiError> {
    let paper = state
        .workflow()
        .add_co_author(&principal, id, &req.co_author)
        .await?;
    Ok(ResponseJson(ApiResponse::success(paper)))
}

/// POST /api/papers/:id/assign-reviewer
async fn assign_reviewer(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    ResponseJson(req): ResponseJson<AssignReviewerRequest>,
) -> Result<ResponseJson<ApiResponse<Paper>>, ApiError> {
    let paper = state
        .workflow()
        .assign_reviewer(&principal, id, &req.reviewer)
        .await?;
    Ok(ResponseJson(ApiResponse::success(paper)))
}

/// POST /api/papers/:id/review
async fn record_review(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    ResponseJson(req): ResponseJson<ReviewRequest>,
) -> Result<ResponseJson<ApiResponse<PaperReview>>, ApiError> {
    let review = state
        .workflow()
        .append_review(&principal, id, req.score, req.comment.as_deref())
        .await?;
    Ok(ResponseJson(ApiResponse::success(review)))
}

/// POST /api/papers/:id/approve
async fn approve_paper(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Paper>>, ApiError> {
    let paper = state.workflow().approve_paper(&principal, id).await?;
    Ok(ResponseJson(ApiResponse::success(paper)))
}

/// POST /api/papers/:id/reject
async fn reject_paper(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Paper>>, ApiError> {
    let paper = state.workflow().reject_paper(&principal, id).await?;
    Ok(ResponseJson(ApiResponse::success(paper)))
}

/// POST /api/papers/:id/final-submit
async fn final_submit_paper(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    ResponseJson(req): ResponseJson<FinalSubmitRequest>,
) -> Result<ResponseJson<ApiResponse<Paper>>, ApiError> {
    let content = decode_content(&req.content)?;
    let paper = state
        .workflow()
        .final_submit_paper(
            &principal,
            id,
            content,
            req.content_type,
            &req.addressing_comments,
        )
        .await?;
    Ok(ResponseJson(ApiResponse::success(paper)))
}

/// POST /api/papers/:id/accept
async fn accept_paper(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Paper>>, ApiError> {
    let paper = state.workflow().accept_paper(&principal, id).await?;
    Ok(ResponseJson(ApiResponse::success(paper)))
}

/// DELETE /api/papers/:id - withdrawal removes the paper entirely
async fn withdraw_paper(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    state.workflow().withdraw_paper(&principal, id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}
