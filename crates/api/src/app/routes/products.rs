use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::Method,
    response::IntoResponse,
    routing::get,
};

use rolegate_auth::Actor;
use rolegate_infra::seed::tags;

use crate::app::services::AppServices;
use crate::authz;

pub fn router() -> Router {
    Router::new().route("/", get(list_products))
}

/// GET /products - fixed catalogue, readable by anyone holding a products rule.
pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<Actor>,
    method: Method,
) -> axum::response::Response {
    if let Err(resp) = authz::require_access(&services.engine, &actor, tags::PRODUCTS, &method).await {
        return resp;
    }

    Json(serde_json::json!([
        { "id": 1, "name": "Product A" },
        { "id": 2, "name": "Product B" },
    ]))
    .into_response()
}
