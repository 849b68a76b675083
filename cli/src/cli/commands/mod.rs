//! Command implementations.

pub mod auth;
pub mod completions;
pub mod me;

pub use auth::{handle_login, handle_logout, handle_status, handle_token};
pub use completions::handle_completions;
pub use me::handle_get_me;
