use axum::{routing::get, Router};

pub mod dashboard;
pub mod movements;
pub mod products;
pub mod search;
pub mod system;

/// Router for all application endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/dashboard", get(dashboard::summary))
        .route("/search", get(search::search_products))
        .nest("/products", products::router())
        .nest("/movements", movements::router())
}
