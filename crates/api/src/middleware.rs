use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use rolegate_auth::{Actor, JwtValidator, StoreError, UserDirectory};

use crate::app::errors;

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
    pub users: Arc<dyn UserDirectory>,
}

/// Attach the request's [`Actor`] as an extension.
///
/// Never rejects on identity grounds: a missing or bad token, or an unknown or
/// inactive user, yields the anonymous actor and the access check answers 401.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let actor = match resolve_actor(&state, req.headers()).await {
        Ok(actor) => actor,
        Err(e) => {
            tracing::error!(error = %e, "identity resolution failed");
            return errors::store_error_to_response(e);
        }
    };

    req.extensions_mut().insert(actor);
    next.run(req).await
}

async fn resolve_actor(state: &AuthState, headers: &HeaderMap) -> Result<Actor, StoreError> {
    let Ok(token) = extract_bearer(headers) else {
        return Ok(Actor::anonymous());
    };

    let claims = match state.jwt.validate(token, Utc::now()) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(error = %e, "bearer token rejected");
            return Ok(Actor::anonymous());
        }
    };

    Ok(state
        .users
        .get(claims.sub)
        .await?
        .map(|user| user.actor())
        .unwrap_or_default())
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, StatusCode> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let header = header.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;

    let header = header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = header.trim();
    if token.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(token)
}
