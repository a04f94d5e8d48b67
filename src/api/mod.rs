//! HTTP API module for health, metrics, and opportunity status endpoints.

pub mod handlers;
pub mod routes;

pub use handlers::AppState;
pub use routes::create_router;
