//! # admin-api
//!
//! Lazy, chainable querysets over remote HTTP collections.
//!
//! This is the meta-crate that re-exports the sub-crates for convenient
//! access. Depend on `admin-api` to get everything, or on the individual
//! crates for finer-grained control.

/// Errors, settings, and logging.
pub use admin_api_core as core;

/// Querysets, the filter codec, and the action/REST backends.
#[cfg(feature = "query")]
pub use admin_api_query as query;

/// Mock transport, request-count assertions, and fixtures.
#[cfg(feature = "testing")]
pub use admin_api_test as test;

// Third-party re-exports
pub use async_trait;
pub use serde;
pub use serde_json;
pub use tokio;
pub use tracing;
pub use tracing_subscriber;

/// Commonly used types, for glob import.
pub mod prelude {
    pub use admin_api_core::{ApiError, ApiResult, ApiSettings, CollectionSettings, Protocol};

    #[cfg(feature = "query")]
    pub use admin_api_query::prelude::*;
}
