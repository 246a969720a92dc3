use axum::{Router, routing::get};

pub mod admin;
pub mod products;
pub mod system;
pub mod users;

/// Router for every endpoint behind identity resolution.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/users", users::router())
        .nest("/products", products::router())
        .nest("/admin", admin::router())
}
