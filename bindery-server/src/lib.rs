//! HTTP service wiring: router, handlers, and API error mapping.

pub mod error;
pub mod routes;

pub use error::{ApiError, ApiResponse};
pub use routes::{create_router, AppState, ServerConfig};
