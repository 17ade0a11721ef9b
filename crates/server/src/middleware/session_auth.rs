use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use db::models::{session::Session, user::User};
use services::services::policy::Principal;

use crate::{AppState, error::ApiError};

/// Resolve the caller from a session cookie or Bearer token. Sessions are
/// stored as SHA-256 hashes, so the raw token never touches the database.
pub async fn get_current_user(
    state: &AppState,
    auth_header: Option<&str>,
    cookie_header: Option<&str>,
) -> Result<Principal, ApiError> {
    let pool = &state.db().pool;

    let token = cookie_header
        .and_then(extract_session_from_cookies)
        .or_else(|| {
            auth_header
                .and_then(|h| h.strip_prefix("Bearer "))
                .map(str::to_string)
        })
        .ok_or_else(|| ApiError::Unauthorized("Missing or invalid authentication".into()))?;

    let session = Session::find_by_token(pool, &token)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Session expired or unknown".into()))?;

    let user = User::find_by_id(pool, session.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Session user no longer exists".into()))?;

    Ok(Principal {
        user_id: user.id,
        username: user.username.clone(),
        roles: user.roles_parsed(),
    })
}

fn extract_session_from_cookies(cookie_header: &str) -> Option<String> {
    cookie_header.split(';').find_map(|cookie| {
        cookie
            .trim()
            .strip_prefix("session_id=")
            .map(str::to_string)
    })
}

/// Middleware that requires an authenticated caller and stashes the resolved
/// principal in request extensions for the handlers.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = req
        .headers()
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .map(str::to_string);

    let cookie_header = req
        .headers()
        .get("cookie")
        .and_then(|h| h.to_str().ok())
        .map(str::to_string);

    match get_current_user(&state, auth_header.as_deref(), cookie_header.as_deref()).await {
        Ok(principal) => {
            req.extensions_mut().insert(principal);
            Ok(next.run(req).await)
        }
        Err(_) => Err(StatusCode::UNAUTHORIZED),
    }
}
