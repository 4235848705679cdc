//! # admin-api-core
//!
//! Core types, settings, and error types for admin-api. This crate has no
//! dependency on the query layer and provides the foundation for the other
//! crates.
//!
//! ## Modules
//!
//! - [`error`] - Error types and result aliases
//! - [`settings`] - Client settings and per-collection endpoint configuration
//! - [`settings_loader`] - Loading settings from TOML, JSON, and the environment
//! - [`logging`] - Tracing-based logging integration

pub mod error;
pub mod logging;
pub mod settings;
pub mod settings_loader;

// Re-export the most commonly used types at the crate root.
pub use error::{ApiError, ApiResult};
pub use settings::{ApiSettings, CollectionSettings, Protocol};
