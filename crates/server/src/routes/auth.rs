use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Json as ResponseJson, Response},
    routing::{get, post},
};
use db::models::{
    session::Session,
    user::{CreateUser, User},
};
use serde::{Deserialize, Serialize};
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError, middleware::get_current_user};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: User,
    pub session_id: String,
}

/// POST /api/auth/signup
async fn signup(
    State(state): State<AppState>,
    ResponseJson(req): ResponseJson<CreateUser>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    if req.username.trim().is_empty() || req.password.len() < 8 {
        return Err(ApiError::BadRequest(
            "Username is required and the password must be at least 8 characters".into(),
        ));
    }
    if req.roles.is_empty() {
        return Err(ApiError::BadRequest("At least one role is required".into()));
    }

    let user = User::create(&state.db().pool, &req).await?;
    tracing::info!(username = %user.username, "user registered");
    Ok(ResponseJson(ApiResponse::success(user)))
}

/// POST /api/auth/login - verify credentials and issue a session cookie
async fn login(
    State(state): State<AppState>,
    ResponseJson(req): ResponseJson<LoginRequest>,
) -> Result<Response, ApiError> {
    let pool = &state.db().pool;

    let user = User::find_by_username(pool, &req.username)
        .await?
        .ok_or_else(|| ApiError::BadRequest("Invalid credentials".to_string()))?;

    let is_valid = db::services::AuthService::verify_password(&req.password, &user.password_hash)
        .map_err(|e| ApiError::InternalError(format!("Password verification error: {}", e)))?;
    if !is_valid {
        return Err(ApiError::BadRequest("Invalid credentials".to_string()));
    }

    let session_id = Session::issue(pool, user.id).await?;

    let cookie = format!(
        "session_id={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        session_id,
        30 * 24 * 60 * 60
    );

    let response = LoginResponse { user, session_id };
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        ResponseJson(ApiResponse::success(response)),
    )
        .into_response())
}

/// POST /api/auth/logout - revoke the session and clear the cookie
async fn logout(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
) -> Result<Response, ApiError> {
    if let Some(cookie_header) = headers.get(header::COOKIE).and_then(|h| h.to_str().ok()) {
        if let Some(session_id) = cookie_header
            .split(';')
            .find_map(|part| part.trim().strip_prefix("session_id="))
        {
            Session::revoke(&state.db().pool, session_id).await?;
        }
    }

    let cookie = "session_id=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0";
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        ResponseJson(ApiResponse::success("Logged out")),
    )
        .into_response())
}

/// GET /api/auth/me
async fn me(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());
    let cookie_header = headers.get(header::COOKIE).and_then(|h| h.to_str().ok());

    let principal = get_current_user(&state, auth_header, cookie_header).await?;
    let user = User::find_by_id(&state.db().pool, principal.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    Ok(ResponseJson(ApiResponse::success(user)))
}
