//! Demo configuration: one collection per protocol, both served by this binary.

use std::path::Path;

use admin_api_core::settings_loader;
use admin_api_core::{ApiResult, ApiSettings, CollectionSettings, Protocol};

use crate::server::{ACTION_PATH, REST_COUNT_PATH, REST_PATH};

/// Collection name for the action endpoint.
pub const ACTION_COLLECTION: &str = "action_products";
/// Collection name for the REST endpoints.
pub const REST_COLLECTION: &str = "rest_products";

/// Settings pointing both demo collections at `base_url`
/// (for example `http://127.0.0.1:8000`).
pub fn demo_settings(base_url: &str) -> ApiSettings {
    let base = base_url.trim_end_matches('/');
    let mut settings = ApiSettings {
        debug: true,
        log_level: "info".to_string(),
        ..ApiSettings::default()
    };
    settings.collections.insert(
        ACTION_COLLECTION.to_string(),
        CollectionSettings::new(Protocol::Action, format!("{base}{ACTION_PATH}")),
    );
    settings.collections.insert(
        REST_COLLECTION.to_string(),
        CollectionSettings::new(Protocol::Rest, format!("{base}{REST_PATH}"))
            .with_count_url(format!("{base}{REST_COUNT_PATH}")),
    );
    settings
}

/// Loads settings from `path` when it exists, falling back to
/// [`demo_settings`] for `base_url`. Environment overrides apply either way.
pub fn load(path: Option<&Path>, base_url: &str) -> ApiResult<ApiSettings> {
    match path {
        Some(path) if path.exists() => {
            tracing::info!(path = %path.display(), "loading settings file");
            settings_loader::from_toml_file_with_env(path)
        }
        _ => {
            let mut settings = demo_settings(base_url);
            settings_loader::apply_env_overrides(&mut settings);
            Ok(settings)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_settings_urls() {
        let settings = demo_settings("http://127.0.0.1:8000/");
        let action = settings.collection(ACTION_COLLECTION).unwrap();
        assert_eq!(action.protocol, Protocol::Action);
        assert_eq!(action.url, "http://127.0.0.1:8000/products/action/");

        let rest = settings.collection(REST_COLLECTION).unwrap();
        assert_eq!(rest.list_url(), "http://127.0.0.1:8000/products/rest/");
        assert_eq!(rest.count_url(), "http://127.0.0.1:8000/products/rest/count/");
        assert_eq!(rest.delete_url(), "http://127.0.0.1:8000/products/rest/");
    }

    #[test]
    fn test_load_missing_file_falls_back() {
        let settings = load(Some(Path::new("/nonexistent/products.toml")), "http://h:1").unwrap();
        assert!(settings.collection(REST_COLLECTION).is_some());
    }

    #[test]
    fn test_bundled_config_parses() {
        let settings =
            settings_loader::from_toml_str(include_str!("../products.toml")).unwrap();
        assert_eq!(
            settings.collection(ACTION_COLLECTION).unwrap().protocol,
            Protocol::Action
        );
        assert_eq!(
            settings.collection(REST_COLLECTION).unwrap().count_url(),
            "http://127.0.0.1:8000/products/rest/count/"
        );
    }
}
