//! HTTP client middleware.

pub mod auth;
pub mod logging;

pub use auth::AuthMiddleware;
pub use logging::LoggingMiddleware;
