use axum::{handler::Handler, middleware, routing::post, Router};

use crate::config::AppState;
use crate::handlers::presign_handler::{method_not_allowed_handler, presign_upload_handler};
use crate::middleware::rate_limiter::rate_limit_middleware;

pub fn presign_routes(state: AppState) -> Router<AppState> {
    // only signing attempts count against the caller's quota
    let limited_presign =
        presign_upload_handler.layer(middleware::from_fn_with_state(state, rate_limit_middleware));

    Router::new().route(
        "/api/presign",
        post(limited_presign).fallback(method_not_allowed_handler),
    )
}
