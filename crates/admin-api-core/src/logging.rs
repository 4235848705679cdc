//! Logging integration for admin-api.
//!
//! Provides helpers for configuring [`tracing`]-based logging from
//! [`ApiSettings`](crate::settings::ApiSettings) and for creating a span per
//! remote operation.

use crate::settings::ApiSettings;

/// Sets up the global tracing subscriber based on the given settings.
///
/// The log level is read from `settings.log_level`. In debug mode a pretty,
/// human-readable format is used; otherwise a structured JSON format is used.
/// A subscriber that is already installed is left in place.
pub fn setup_logging(settings: &ApiSettings) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&settings.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    if settings.debug {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(true)
            .with_line_number(true)
            .pretty()
            .try_init()
            .ok();
    } else {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .try_init()
            .ok();
    }
}

/// Creates a tracing span for one remote operation on a collection.
///
/// # Examples
///
/// ```
/// use admin_api_core::logging::operation_span;
///
/// let span = operation_span("products", "list");
/// let _guard = span.enter();
/// tracing::info!("fetching");
/// ```
pub fn operation_span(collection: &str, action: &str) -> tracing::Span {
    tracing::info_span!("remote_op", collection, action)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_logging_is_idempotent() {
        let settings = ApiSettings::default();
        setup_logging(&settings);
        setup_logging(&settings);
    }

    #[test]
    fn test_operation_span_enters() {
        let span = operation_span("products", "count");
        let _guard = span.enter();
        tracing::debug!("inside span");
    }
}
