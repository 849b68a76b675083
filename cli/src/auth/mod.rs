//! Authentication module for kongctl.
//!
//! This module provides Konnect login via the OAuth device authorization
//! grant, cookie-based token refresh, JWT-aware expiry checks and per-profile
//! credential files.

pub mod credentials;
pub mod device_flow;
pub mod error;
pub mod expiry;
pub mod refresh;
pub mod session;
pub mod tokens;

pub use credentials::CredentialStore;
pub use device_flow::DeviceGrantClient;
pub use error::{AuthError, AuthResult};
pub use expiry::resolve_expiry;
pub use refresh::{RefreshClient, TokenRefresher};
pub use session::{AuthEndpoints, SessionConfig, SessionManager};
pub use tokens::{AccessToken, DeviceCodeResponse, TokenSet};
