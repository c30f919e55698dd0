//! Data types exchanged with the backup server's authentication endpoints

pub mod auth;

pub use auth::{AuthRequest, Credential, TokenRefreshRequest, TokenResponse};
