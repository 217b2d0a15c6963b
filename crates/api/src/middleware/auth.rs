//! Admin API key authentication.
//!
//! Every admin route requires an `X-API-Key` header whose SHA-256 digest
//! matches `security.admin_api_key_hash`.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use shared::crypto::matches_sha256_hex;

use crate::app::AppState;

pub const API_KEY_HEADER: &str = "X-API-Key";

/// Middleware for admin-only routes.
pub async fn require_admin(State(state): State<AppState>, req: Request<Body>, next: Next) -> Response {
    let presented = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|k| !k.is_empty());

    let Some(api_key) = presented else {
        return unauthorized_response("Invalid or missing API key");
    };

    if !matches_sha256_hex(api_key, &state.config.security.admin_api_key_hash) {
        tracing::warn!(path = %req.uri().path(), "Rejected admin request with invalid API key");
        return unauthorized_response("Invalid or missing API key");
    }

    next.run(req).await
}

fn unauthorized_response(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": "unauthorized",
            "message": message
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_response() {
        let response = unauthorized_response("Invalid or missing API key");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
