//! User accounts, protected by the `users` element.
//!
//! An own-scope grant reaches only the caller's own record; anything else is
//! answered with the same 403 as a missing rule.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::get,
};

use rolegate_auth::{Actor, DenyReason, ProfileUpdate};
use rolegate_core::{DomainError, UserId};
use rolegate_infra::seed::tags;

use crate::app::{dto, errors, services::AppServices};
use crate::authz;

pub fn router() -> Router {
    Router::new().route("/", get(list_users)).route(
        "/:id",
        get(get_user)
            .put(update_user)
            .patch(update_user)
            .delete(deactivate_user),
    )
}

/// GET /users - everyone with an all-scope grant, only the caller otherwise.
pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    method: Method,
) -> axum::response::Response {
    let grant = match authz::require_access(&services.engine, &actor, tags::USERS, &method).await {
        Ok(g) => g,
        Err(resp) => return resp,
    };

    let users = if grant.all {
        match services.users.list().await {
            Ok(users) => users,
            Err(e) => return errors::store_error_to_response(e),
        }
    } else {
        let Some(me) = actor.user_id() else {
            return authz::denial_response(DenyReason::Forbidden);
        };
        match services.users.get(me).await {
            Ok(me) => me.into_iter().collect(),
            Err(e) => return errors::store_error_to_response(e),
        }
    };

    let items: Vec<_> = users.iter().map(dto::user_to_json).collect();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

/// GET /users/:id
pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    method: Method,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match authorize_record(&services, &actor, &method, &id).await {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.users.get(id).await {
        Ok(Some(user)) => Json(dto::user_to_json(&user)).into_response(),
        Ok(None) => errors::domain_error_to_response(DomainError::not_found("user")),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// PUT|PATCH /users/:id - PUT replaces the profile, PATCH edits the fields sent.
pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    method: Method,
    Path(id): Path<String>,
    body: Result<Json<ProfileUpdate>, JsonRejection>,
) -> axum::response::Response {
    let id = match authorize_record(&services, &actor, &method, &id).await {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let update = match dto::json_body(body) {
        Ok(update) => update,
        Err(resp) => return resp,
    };

    match services
        .users
        .update_profile(id, update, method == Method::PATCH)
        .await
    {
        Ok(user) => Json(dto::user_to_json(&user)).into_response(),
        Err(e) => errors::admin_error_to_response(e),
    }
}

/// DELETE /users/:id - soft delete; the account stops authenticating.
pub async fn deactivate_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    method: Method,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match authorize_record(&services, &actor, &method, &id).await {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.users.deactivate(id).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::admin_error_to_response(e),
    }
}

/// Access check first, then the id, then ownership.
async fn authorize_record(
    services: &AppServices,
    actor: &Actor,
    method: &Method,
    raw_id: &str,
) -> Result<UserId, axum::response::Response> {
    let grant = authz::require_access(&services.engine, actor, tags::USERS, method).await?;
    let id: UserId = dto::parse_id(raw_id)?;
    authz::ensure_covers(&grant, actor, id)?;
    Ok(id)
}
