use axum::Router;

pub mod invoices;
pub mod system;

/// Router for all API endpoints except `/health`.
pub fn router() -> Router {
    Router::new().nest("/invoices", invoices::router())
}
