use axum::{Router, middleware, routing::get};
use tower_http::cors::CorsLayer;

use crate::{AppState, middleware as app_middleware};

pub mod auth;
pub mod conferences;
pub mod health;
pub mod papers;

pub fn router(state: AppState) -> Router {
    // Entity routes require a session. Health, the auth endpoints and the
    // published listings are reachable anonymously.
    let protected = Router::new()
        .merge(conferences::router())
        .merge(papers::router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            app_middleware::require_auth,
        ));

    let api = Router::new()
        .route("/health", get(health::health_check))
        .merge(auth::router())
        .merge(conferences::public_router())
        .merge(papers::public_router())
        .merge(protected)
        .with_state(state);

    Router::new().nest("/api", api).layer(CorsLayer::permissive())
}
