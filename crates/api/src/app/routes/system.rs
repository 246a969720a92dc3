use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use rolegate_auth::{Actor, DenyReason};

use crate::authz;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// The resolved identity. Needs a valid token, no rule.
pub async fn whoami(Extension(actor): Extension<Actor>) -> axum::response::Response {
    let Some(user_id) = actor.user_id().filter(|_| actor.is_authenticated()) else {
        return authz::denial_response(DenyReason::Unauthenticated);
    };

    Json(serde_json::json!({
        "user_id": user_id.to_string(),
        "role_id": actor.role().map(|r| r.to_string()),
    }))
    .into_response()
}
