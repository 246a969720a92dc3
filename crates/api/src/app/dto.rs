use std::str::FromStr;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use serde::Deserialize;

use rolegate_auth::{AccessRoleRule, PermissionFlags, User};
use rolegate_core::DomainError;

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateNamedRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct GrantRuleRequest {
    pub role_id: String,
    pub element_id: String,
    #[serde(flatten)]
    pub flags: PermissionFlags,
}

#[derive(Debug, Deserialize)]
pub struct AssignRoleRequest {
    /// `null` detaches the user from any role.
    pub role_id: Option<String>,
}

// -------------------------
// Parsing helpers
// -------------------------

pub fn parse_id<T>(raw: &str) -> Result<T, axum::response::Response>
where
    T: FromStr<Err = DomainError>,
{
    raw.parse().map_err(errors::domain_error_to_response)
}

/// Unwrap a body extracted as `Result<Json<T>, _>`.
///
/// Handlers call this only after the access check, so a caller without access
/// learns nothing about the expected payload.
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, axum::response::Response> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => Err(errors::json_error(
            rejection.status(),
            "invalid_body",
            rejection.body_text(),
        )),
    }
}

// -------------------------
// Response mapping
// -------------------------

pub fn user_to_json(user: &User) -> serde_json::Value {
    serde_json::json!({
        "id": user.id.to_string(),
        "email": user.email,
        "first_name": user.first_name,
        "last_name": user.last_name,
        "middle_name": user.middle_name,
        "is_active": user.is_active,
        "role_id": user.role.map(|r| r.to_string()),
        "date_joined": user.date_joined.to_rfc3339(),
    })
}

pub fn rule_to_json(rule: &AccessRoleRule) -> serde_json::Value {
    let flags = &rule.flags;
    serde_json::json!({
        "id": rule.id.to_string(),
        "role_id": rule.role_id.to_string(),
        "element_id": rule.element_id.to_string(),
        "read_own": flags.read_own,
        "read_all": flags.read_all,
        "create": flags.create,
        "update_own": flags.update_own,
        "update_all": flags.update_all,
        "delete_own": flags.delete_own,
        "delete_all": flags.delete_all,
    })
}
