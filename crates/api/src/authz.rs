//! Per-handler access guard.
//!
//! Each handler names the business element it serves; the verb comes from the
//! request method. The guard runs before any record lookup, so a denial never
//! reveals whether the target exists.

use axum::http::{Method, StatusCode};
use axum::response::Response;

use rolegate_auth::{AccessEngine, Actor, DenyReason, Grant};
use rolegate_core::UserId;

use crate::app::errors;

/// Evaluate `method` on `resource_tag` for `actor`.
///
/// `Err` is a ready-made response: 401/403 for a denial, 500 when the rule
/// store fails.
pub async fn require_access(
    engine: &AccessEngine,
    actor: &Actor,
    resource_tag: &str,
    method: &Method,
) -> Result<Grant, Response> {
    let decision = engine
        .evaluate_method(actor, resource_tag, method.as_str())
        .await
        .map_err(errors::store_error_to_response)?;

    decision.into_result().map_err(denial_response)
}

/// Like [`require_access`], but an own-scope grant is not enough.
///
/// For elements whose records have no owner (the rule matrix itself).
pub async fn require_full_access(
    engine: &AccessEngine,
    actor: &Actor,
    resource_tag: &str,
    method: &Method,
) -> Result<Grant, Response> {
    let grant = require_access(engine, actor, resource_tag, method).await?;
    if grant.is_own_only() {
        return Err(denial_response(DenyReason::Forbidden));
    }
    Ok(grant)
}

/// Refuse a record outside the grant's reach with the ordinary 403.
pub fn ensure_covers(grant: &Grant, actor: &Actor, owner: UserId) -> Result<(), Response> {
    if grant.covers(actor.user_id(), owner) {
        Ok(())
    } else {
        Err(denial_response(DenyReason::Forbidden))
    }
}

pub fn denial_response(reason: DenyReason) -> Response {
    let status = StatusCode::from_u16(reason.status_code()).unwrap_or(StatusCode::FORBIDDEN);
    errors::json_error(status, reason.code(), reason.message())
}
