//! Settings for admin-api clients.
//!
//! [`ApiSettings`] holds the client-wide options (logging, HTTP timeout, user
//! agent) and one [`CollectionSettings`] per remote collection, keyed by a
//! collection name such as `"products"`. Managers are built from these with
//! `Manager::from_registry`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The wire protocol a remote collection speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// One endpoint; every request is a POST naming its action in the body.
    Action,
    /// HTTP verbs against per-action URLs.
    #[default]
    Rest,
}

/// Endpoint configuration for one remote collection.
///
/// Each per-action URL falls back to `url` when unset.
///
/// # Examples
///
/// ```
/// use admin_api_core::settings::{CollectionSettings, Protocol};
///
/// let products = CollectionSettings::new(Protocol::Rest, "http://127.0.0.1:8000/products/rest/")
///     .with_count_url("http://127.0.0.1:8000/products/rest/count/");
/// assert_eq!(products.list_url(), "http://127.0.0.1:8000/products/rest/");
/// assert_eq!(products.count_url(), "http://127.0.0.1:8000/products/rest/count/");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSettings {
    /// Which protocol the collection speaks.
    #[serde(default)]
    pub protocol: Protocol,
    /// The base URL of the collection.
    pub url: String,
    /// URL for list requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_url: Option<String>,
    /// URL for count requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count_url: Option<String>,
    /// URL for create requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_url: Option<String>,
    /// URL for update requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_url: Option<String>,
    /// URL for delete requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_url: Option<String>,
    /// Whether a REST collection understands `select_related` query parameters.
    /// Action collections always receive them.
    #[serde(default)]
    pub forward_select_related: bool,
}

impl CollectionSettings {
    /// Creates settings with every action routed to `url`.
    pub fn new(protocol: Protocol, url: impl Into<String>) -> Self {
        Self {
            protocol,
            url: url.into(),
            list_url: None,
            count_url: None,
            create_url: None,
            update_url: None,
            delete_url: None,
            forward_select_related: false,
        }
    }

    /// Sets a dedicated list URL.
    #[must_use]
    pub fn with_list_url(mut self, url: impl Into<String>) -> Self {
        self.list_url = Some(url.into());
        self
    }

    /// Sets a dedicated count URL.
    #[must_use]
    pub fn with_count_url(mut self, url: impl Into<String>) -> Self {
        self.count_url = Some(url.into());
        self
    }

    /// Sets a dedicated create URL.
    #[must_use]
    pub fn with_create_url(mut self, url: impl Into<String>) -> Self {
        self.create_url = Some(url.into());
        self
    }

    /// Sets a dedicated update URL.
    #[must_use]
    pub fn with_update_url(mut self, url: impl Into<String>) -> Self {
        self.update_url = Some(url.into());
        self
    }

    /// Sets a dedicated delete URL.
    #[must_use]
    pub fn with_delete_url(mut self, url: impl Into<String>) -> Self {
        self.delete_url = Some(url.into());
        self
    }

    /// Enables forwarding of `select_related` hints to a REST collection.
    #[must_use]
    pub const fn with_forward_select_related(mut self, forward: bool) -> Self {
        self.forward_select_related = forward;
        self
    }

    /// The resolved list URL.
    pub fn list_url(&self) -> &str {
        self.list_url.as_deref().unwrap_or(&self.url)
    }

    /// The resolved count URL.
    pub fn count_url(&self) -> &str {
        self.count_url.as_deref().unwrap_or(&self.url)
    }

    /// The resolved create URL.
    pub fn create_url(&self) -> &str {
        self.create_url.as_deref().unwrap_or(&self.url)
    }

    /// The resolved update URL.
    pub fn update_url(&self) -> &str {
        self.update_url.as_deref().unwrap_or(&self.url)
    }

    /// The resolved delete URL.
    pub fn delete_url(&self) -> &str {
        self.delete_url.as_deref().unwrap_or(&self.url)
    }
}

/// The complete set of client settings.
///
/// # Examples
///
/// ```
/// use admin_api_core::settings::ApiSettings;
///
/// let settings = ApiSettings::default();
/// assert!(settings.debug);
/// assert_eq!(settings.timeout_secs, 30);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Whether debug mode is enabled (pretty logs instead of JSON).
    pub debug: bool,
    /// The log level filter (e.g. "info", "admin_api_query=debug").
    pub log_level: String,
    /// Per-request timeout for the HTTP transport, in seconds.
    pub timeout_secs: u64,
    /// The `User-Agent` header sent by the HTTP transport.
    pub user_agent: String,
    /// Remote collections, keyed by name.
    pub collections: HashMap<String, CollectionSettings>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            debug: true,
            log_level: "info".to_string(),
            timeout_secs: 30,
            user_agent: concat!("admin-api/", env!("CARGO_PKG_VERSION")).to_string(),
            collections: HashMap::new(),
        }
    }
}

impl ApiSettings {
    /// Returns the settings for the named collection, if configured.
    pub fn collection(&self, name: &str) -> Option<&CollectionSettings> {
        self.collections.get(name)
    }
}
