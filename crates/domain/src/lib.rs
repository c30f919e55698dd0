//! # Veeam Domain
//!
//! Credential, configuration, and error types for the Veeam Backup &
//! Replication API access core.
//!
//! This crate contains:
//! - Token endpoint payloads and the session [`Credential`]
//! - Provider configuration structures ([`ProviderConfig`])
//! - Domain error types and Result definitions
//! - Endpoint paths, environment variable names, and defaults
//!
//! ## Architecture
//! - No dependencies on other workspace crates
//! - Only external dependencies allowed
//! - Pure data structures, no I/O

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
