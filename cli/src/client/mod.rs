//! HTTP client for the Konnect API.

pub mod api;
pub mod middleware;

pub use api::{KonnectClient, User};
