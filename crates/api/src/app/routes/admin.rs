//! Rule-matrix administration, protected by the `access_rules` element.
//!
//! The matrix has no owner, so every endpoint needs an all-scope grant.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::{delete, get, put},
};

use rolegate_auth::{Actor, PermissionFlags};
use rolegate_core::{DomainError, ElementId, RoleId, RuleId, UserId};
use rolegate_infra::seed::tags;

use crate::app::{dto, errors, services::AppServices};
use crate::authz;

pub fn router() -> Router {
    Router::new()
        .route("/roles", get(list_roles).post(create_role))
        .route("/roles/:id", delete(delete_role))
        .route("/elements", get(list_elements).post(create_element))
        .route("/elements/:id", delete(delete_element))
        .route("/rules", get(list_rules).post(grant_rule))
        .route("/rules/:id", put(update_rule).delete(revoke_rule))
        .route("/users/:id/role", put(assign_role))
}

macro_rules! guard {
    ($services:expr, $actor:expr, $method:expr) => {
        if let Err(resp) =
            authz::require_full_access(&$services.engine, &$actor, tags::ACCESS_RULES, &$method).await
        {
            return resp;
        }
    };
}

macro_rules! parse_or_return {
    ($raw:expr) => {
        match dto::parse_id($raw) {
            Ok(id) => id,
            Err(resp) => return resp,
        }
    };
}

macro_rules! body_or_return {
    ($body:expr) => {
        match dto::json_body($body) {
            Ok(body) => body,
            Err(resp) => return resp,
        }
    };
}

/// GET /admin/roles
pub async fn list_roles(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    method: Method,
) -> axum::response::Response {
    guard!(services, actor, method);
    match services.admin.list_roles().await {
        Ok(roles) => Json(serde_json::json!({ "items": roles })).into_response(),
        Err(e) => errors::admin_error_to_response(e),
    }
}

/// POST /admin/roles
pub async fn create_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    method: Method,
    body: Result<Json<dto::CreateNamedRequest>, JsonRejection>,
) -> axum::response::Response {
    guard!(services, actor, method);
    let body = body_or_return!(body);
    match services.admin.create_role(&body.name).await {
        Ok(role) => (StatusCode::CREATED, Json(role)).into_response(),
        Err(e) => errors::admin_error_to_response(e),
    }
}

/// DELETE /admin/roles/:id - cascades to the role's rules and detaches its users.
pub async fn delete_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    method: Method,
    Path(id): Path<String>,
) -> axum::response::Response {
    guard!(services, actor, method);
    let id: RoleId = parse_or_return!(&id);
    match services.delete_role(id).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::admin_error_to_response(e),
    }
}

/// GET /admin/elements
pub async fn list_elements(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    method: Method,
) -> axum::response::Response {
    guard!(services, actor, method);
    match services.admin.list_elements().await {
        Ok(elements) => Json(serde_json::json!({ "items": elements })).into_response(),
        Err(e) => errors::admin_error_to_response(e),
    }
}

/// POST /admin/elements
pub async fn create_element(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    method: Method,
    body: Result<Json<dto::CreateNamedRequest>, JsonRejection>,
) -> axum::response::Response {
    guard!(services, actor, method);
    let body = body_or_return!(body);
    match services.admin.create_element(&body.name).await {
        Ok(element) => (StatusCode::CREATED, Json(element)).into_response(),
        Err(e) => errors::admin_error_to_response(e),
    }
}

/// DELETE /admin/elements/:id
pub async fn delete_element(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    method: Method,
    Path(id): Path<String>,
) -> axum::response::Response {
    guard!(services, actor, method);
    let id: ElementId = parse_or_return!(&id);
    match services.admin.delete_element(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::admin_error_to_response(e),
    }
}

/// GET /admin/rules
pub async fn list_rules(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    method: Method,
) -> axum::response::Response {
    guard!(services, actor, method);
    match services.admin.list_rules().await {
        Ok(rules) => {
            let items: Vec<_> = rules.iter().map(dto::rule_to_json).collect();
            Json(serde_json::json!({ "items": items })).into_response()
        }
        Err(e) => errors::admin_error_to_response(e),
    }
}

/// POST /admin/rules
pub async fn grant_rule(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    method: Method,
    body: Result<Json<dto::GrantRuleRequest>, JsonRejection>,
) -> axum::response::Response {
    guard!(services, actor, method);
    let body = body_or_return!(body);
    let role: RoleId = parse_or_return!(&body.role_id);
    let element: ElementId = parse_or_return!(&body.element_id);
    match services.admin.grant(role, element, body.flags).await {
        Ok(rule) => (StatusCode::CREATED, Json(dto::rule_to_json(&rule))).into_response(),
        Err(e) => errors::admin_error_to_response(e),
    }
}

/// PUT /admin/rules/:id - replaces the whole flag set; absent flags become false.
pub async fn update_rule(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    method: Method,
    Path(id): Path<String>,
    flags: Result<Json<PermissionFlags>, JsonRejection>,
) -> axum::response::Response {
    guard!(services, actor, method);
    let flags = body_or_return!(flags);
    let id: RuleId = parse_or_return!(&id);
    match services.admin.update_rule(id, flags).await {
        Ok(rule) => Json(dto::rule_to_json(&rule)).into_response(),
        Err(e) => errors::admin_error_to_response(e),
    }
}

/// DELETE /admin/rules/:id
pub async fn revoke_rule(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    method: Method,
    Path(id): Path<String>,
) -> axum::response::Response {
    guard!(services, actor, method);
    let id: RuleId = parse_or_return!(&id);
    match services.admin.revoke(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::admin_error_to_response(e),
    }
}

/// PUT /admin/users/:id/role
pub async fn assign_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    method: Method,
    Path(id): Path<String>,
    body: Result<Json<dto::AssignRoleRequest>, JsonRejection>,
) -> axum::response::Response {
    guard!(services, actor, method);
    let body = body_or_return!(body);
    let id: UserId = parse_or_return!(&id);
    let role: Option<RoleId> = match body.role_id.as_deref() {
        Some(raw) => Some(parse_or_return!(raw)),
        None => None,
    };

    if let Some(role) = role {
        match services.admin.get_role(role).await {
            Ok(Some(_)) => {}
            Ok(None) => return errors::domain_error_to_response(DomainError::not_found("role")),
            Err(e) => return errors::admin_error_to_response(e),
        }
    }

    match services.users.assign_role(id, role).await {
        Ok(user) => Json(dto::user_to_json(&user)).into_response(),
        Err(e) => errors::admin_error_to_response(e),
    }
}
