//! Settings loading from configuration files.
//!
//! Loads [`ApiSettings`] from TOML or JSON and applies environment variable
//! overrides.
//!
//! ## Loading Order
//!
//! 1. Start with default settings.
//! 2. Load from a TOML or JSON file (overriding defaults).
//! 3. Apply environment variable overrides (highest priority).
//!
//! ## Environment Variable Mapping
//!
//! | Env Var | Setting |
//! |---|---|
//! | `ADMIN_API_DEBUG` | `debug` |
//! | `ADMIN_API_LOG_LEVEL` | `log_level` |
//! | `ADMIN_API_TIMEOUT_SECS` | `timeout_secs` |
//! | `ADMIN_API_USER_AGENT` | `user_agent` |
//!
//! ## Examples
//!
//! ```
//! use admin_api_core::settings::Protocol;
//! use admin_api_core::settings_loader;
//!
//! let settings = settings_loader::from_toml_str(r#"
//!     log_level = "debug"
//!
//!     [collections.products]
//!     protocol = "rest"
//!     url = "http://127.0.0.1:8000/products/rest/"
//!     count_url = "http://127.0.0.1:8000/products/rest/count/"
//! "#).unwrap();
//!
//! let products = settings.collection("products").unwrap();
//! assert_eq!(products.protocol, Protocol::Rest);
//! assert_eq!(products.count_url(), "http://127.0.0.1:8000/products/rest/count/");
//! ```

use std::path::Path;

use crate::error::ApiError;
use crate::settings::ApiSettings;

/// Loads settings from a TOML string.
///
/// Fields not present in the TOML keep their default values.
pub fn from_toml_str(toml_str: &str) -> Result<ApiSettings, ApiError> {
    let toml_value: toml::Value = toml::from_str(toml_str)
        .map_err(|e| ApiError::ConfigurationError(format!("Failed to parse TOML: {e}")))?;

    merge_over_defaults(toml_to_json(toml_value), "TOML")
}

/// Loads settings from a TOML file.
pub fn from_toml_file(path: impl AsRef<Path>) -> Result<ApiSettings, ApiError> {
    let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
        ApiError::ConfigurationError(format!(
            "Failed to read TOML file '{}': {e}",
            path.as_ref().display()
        ))
    })?;
    from_toml_str(&content)
}

/// Loads settings from a TOML file and then applies environment variable overrides.
pub fn from_toml_file_with_env(path: impl AsRef<Path>) -> Result<ApiSettings, ApiError> {
    let mut settings = from_toml_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Loads settings from a JSON string.
pub fn from_json_str(json_str: &str) -> Result<ApiSettings, ApiError> {
    let json_value: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| ApiError::ConfigurationError(format!("Failed to parse JSON: {e}")))?;

    merge_over_defaults(json_value, "JSON")
}

/// Loads settings from a JSON file.
pub fn from_json_file(path: impl AsRef<Path>) -> Result<ApiSettings, ApiError> {
    let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
        ApiError::ConfigurationError(format!(
            "Failed to read JSON file '{}': {e}",
            path.as_ref().display()
        ))
    })?;
    from_json_str(&content)
}

/// Loads settings from just environment variables (starting from defaults).
pub fn from_env() -> ApiSettings {
    let mut settings = ApiSettings::default();
    apply_env_overrides(&mut settings);
    settings
}

/// Applies environment variable overrides to a settings struct.
///
/// - `ADMIN_API_DEBUG` -> `debug` ("true"/"1"/"yes" => true, anything else => false)
/// - `ADMIN_API_LOG_LEVEL` -> `log_level`
/// - `ADMIN_API_TIMEOUT_SECS` -> `timeout_secs` (ignored if not an integer)
/// - `ADMIN_API_USER_AGENT` -> `user_agent`
pub fn apply_env_overrides(settings: &mut ApiSettings) {
    apply_overrides(settings, |key| std::env::var(key).ok());
}

fn apply_overrides(settings: &mut ApiSettings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(val) = lookup("ADMIN_API_DEBUG") {
        settings.debug = matches!(val.to_lowercase().as_str(), "true" | "1" | "yes");
    }

    if let Some(val) = lookup("ADMIN_API_LOG_LEVEL") {
        settings.log_level = val;
    }

    if let Some(val) = lookup("ADMIN_API_TIMEOUT_SECS") {
        if let Ok(secs) = val.parse::<u64>() {
            settings.timeout_secs = secs;
        }
    }

    if let Some(val) = lookup("ADMIN_API_USER_AGENT") {
        settings.user_agent = val;
    }
}

// ============================================================
// Helpers
// ============================================================

fn merge_over_defaults(value: serde_json::Value, format: &str) -> Result<ApiSettings, ApiError> {
    let default_json = serde_json::to_value(ApiSettings::default()).map_err(|e| {
        ApiError::ConfigurationError(format!("Failed to serialize default settings: {e}"))
    })?;

    let merged = merge_json(default_json, value);
    serde_json::from_value(merged).map_err(|e| {
        ApiError::ConfigurationError(format!("Failed to deserialize settings from {format}: {e}"))
    })
}

/// Converts a TOML value to a `serde_json::Value`.
fn toml_to_json(value: toml::Value) -> serde_json::Value {
    match value {
        toml::Value::String(s) => serde_json::Value::String(s),
        toml::Value::Integer(i) => serde_json::json!(i),
        toml::Value::Float(f) => serde_json::json!(f),
        toml::Value::Boolean(b) => serde_json::Value::Bool(b),
        toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        toml::Value::Array(arr) => {
            serde_json::Value::Array(arr.into_iter().map(toml_to_json).collect())
        }
        toml::Value::Table(table) => {
            let map: serde_json::Map<String, serde_json::Value> = table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect();
            serde_json::Value::Object(map)
        }
    }
}

/// Deep-merges two JSON values. The `override_val` takes precedence.
fn merge_json(base: serde_json::Value, override_val: serde_json::Value) -> serde_json::Value {
    match (base, override_val) {
        (serde_json::Value::Object(mut base_map), serde_json::Value::Object(override_map)) => {
            for (key, override_v) in override_map {
                let merged = if let Some(base_v) = base_map.remove(&key) {
                    merge_json(base_v, override_v)
                } else {
                    override_v
                };
                base_map.insert(key, merged);
            }
            serde_json::Value::Object(base_map)
        }
        (_, override_val) => override_val,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Protocol;
    use std::collections::HashMap;

    // ── TOML loading ────────────────────────────────────────────────

    #[test]
    fn test_from_toml_str_basic() {
        let toml = r#"
            debug = false
            log_level = "warn"
            timeout_secs = 5
        "#;

        let settings = from_toml_str(toml).unwrap();
        assert!(!settings.debug);
        assert_eq!(settings.log_level, "warn");
        assert_eq!(settings.timeout_secs, 5);
        // Defaults preserved
        assert!(settings.user_agent.starts_with("admin-api/"));
    }

    #[test]
    fn test_from_toml_str_collections() {
        let toml = r#"
            [collections.action_products]
            protocol = "action"
            url = "http://127.0.0.1:8000/products/action/"

            [collections.rest_products]
            url = "http://127.0.0.1:8000/products/rest/"
            count_url = "http://127.0.0.1:8000/products/rest/count/"
            forward_select_related = true
        "#;

        let settings = from_toml_str(toml).unwrap();
        assert_eq!(settings.collections.len(), 2);

        let action = settings.collection("action_products").unwrap();
        assert_eq!(action.protocol, Protocol::Action);
        assert_eq!(action.count_url(), "http://127.0.0.1:8000/products/action/");

        let rest = settings.collection("rest_products").unwrap();
        assert_eq!(rest.protocol, Protocol::Rest);
        assert_eq!(rest.count_url(), "http://127.0.0.1:8000/products/rest/count/");
        assert_eq!(rest.list_url(), "http://127.0.0.1:8000/products/rest/");
        assert!(rest.forward_select_related);
    }

    #[test]
    fn test_from_toml_str_invalid() {
        let result = from_toml_str("this is not [valid toml");
        assert!(matches!(result, Err(ApiError::ConfigurationError(_))));
    }

    #[test]
    fn test_from_toml_str_collection_without_url() {
        let toml = r#"
            [collections.broken]
            protocol = "rest"
        "#;
        let err = from_toml_str(toml).unwrap_err();
        assert!(err.to_string().contains("url"));
    }

    #[test]
    fn test_from_toml_file_missing() {
        let result = from_toml_file("/definitely/not/here/admin-api.toml");
        assert!(matches!(result, Err(ApiError::ConfigurationError(_))));
    }

    // ── JSON loading ────────────────────────────────────────────────

    #[test]
    fn test_from_json_str() {
        let json = r#"{
            "debug": false,
            "collections": {
                "products": {"protocol": "action", "url": "http://x/action/"}
            }
        }"#;
        let settings = from_json_str(json).unwrap();
        assert!(!settings.debug);
        assert_eq!(settings.log_level, "info");
        assert_eq!(
            settings.collection("products").unwrap().protocol,
            Protocol::Action
        );
    }

    #[test]
    fn test_from_json_str_invalid() {
        let result = from_json_str("{not json");
        assert!(matches!(result, Err(ApiError::ConfigurationError(_))));
    }

    // ── Environment overrides ───────────────────────────────────────

    #[test]
    fn test_apply_overrides() {
        let env: HashMap<&str, &str> = [
            ("ADMIN_API_DEBUG", "0"),
            ("ADMIN_API_LOG_LEVEL", "debug"),
            ("ADMIN_API_TIMEOUT_SECS", "12"),
            ("ADMIN_API_USER_AGENT", "inventory-sync/2"),
        ]
        .into_iter()
        .collect();

        let mut settings = ApiSettings::default();
        apply_overrides(&mut settings, |k| env.get(k).map(ToString::to_string));
        assert!(!settings.debug);
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.timeout_secs, 12);
        assert_eq!(settings.user_agent, "inventory-sync/2");
    }

    #[test]
    fn test_apply_overrides_ignores_bad_timeout() {
        let mut settings = ApiSettings::default();
        apply_overrides(&mut settings, |k| {
            (k == "ADMIN_API_TIMEOUT_SECS").then(|| "soon".to_string())
        });
        assert_eq!(settings.timeout_secs, 30);
    }

    // ── Helpers ─────────────────────────────────────────────────────

    #[test]
    fn test_merge_json_nested() {
        let base = serde_json::json!({"a": {"b": 1, "c": 2}, "d": 3});
        let over = serde_json::json!({"a": {"c": 20}});
        let merged = merge_json(base, over);
        assert_eq!(merged, serde_json::json!({"a": {"b": 1, "c": 20}, "d": 3}));
    }
}
