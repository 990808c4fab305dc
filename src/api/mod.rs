//! HTTP surface: router, handlers and the error envelope.

pub mod error;
pub mod routes;

pub use error::ApiError;
pub use routes::{AppState, api_routes};
