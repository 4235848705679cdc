//! The REST protocol: HTTP verbs against per-action URLs.
//!
//! | Action | Request |
//! |---|---|
//! | list | `GET list_url?<filters>&order_by=..&offset=..&limit=..` |
//! | count | `GET count_url?<filters>&offset=..&limit=..` |
//! | create | `POST create_url` with the list of records as body |
//! | update | `PATCH update_url?<filters>` with the field assignments as body |
//! | delete | `DELETE delete_url?<filters>` |
//!
//! Filters travel as flat query parameters. Lists become repeated
//! parameters and booleans are written `true`/`false`. A `null` equality
//! is sent as `<field>__isnull=true` (and `ne` null as `isnull=false`); any
//! other `null` filter is rejected before sending.

use std::sync::Arc;

use admin_api_core::{ApiError, ApiResult, CollectionSettings};
use async_trait::async_trait;
use http::Method;
use serde_json::Value;

use super::{dispatch, Action, Backend};
use crate::filters::{FlatFilters, Lookup, LOOKUP_SEP};
use crate::query::Query;
use crate::transport::{HttpRequest, Transport};

/// One URL per action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    list: String,
    count: String,
    create: String,
    update: String,
    delete: String,
}

impl Endpoints {
    /// Routes every action to `url`.
    pub fn uniform(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            list: url.clone(),
            count: url.clone(),
            create: url.clone(),
            update: url.clone(),
            delete: url,
        }
    }

    /// Resolves every action's URL from collection settings.
    pub fn from_settings(settings: &CollectionSettings) -> Self {
        Self {
            list: settings.list_url().to_string(),
            count: settings.count_url().to_string(),
            create: settings.create_url().to_string(),
            update: settings.update_url().to_string(),
            delete: settings.delete_url().to_string(),
        }
    }

    /// Routes `action` to `url`.
    #[must_use]
    pub fn with(mut self, action: Action, url: impl Into<String>) -> Self {
        *self.slot(action) = url.into();
        self
    }

    /// The URL for `action`.
    pub fn get(&self, action: Action) -> &str {
        match action {
            Action::List => &self.list,
            Action::Count => &self.count,
            Action::Create => &self.create,
            Action::Update => &self.update,
            Action::Delete => &self.delete,
        }
    }

    fn slot(&mut self, action: Action) -> &mut String {
        match action {
            Action::List => &mut self.list,
            Action::Count => &mut self.count,
            Action::Create => &mut self.create,
            Action::Update => &mut self.update,
            Action::Delete => &mut self.delete,
        }
    }
}

/// A [`Backend`] speaking the REST protocol.
#[derive(Debug, Clone)]
pub struct RestBackend {
    endpoints: Endpoints,
    transport: Arc<dyn Transport>,
    forward_select_related: bool,
}

impl RestBackend {
    /// Creates a backend. `select_related` hints are not forwarded.
    pub fn new(endpoints: Endpoints, transport: Arc<dyn Transport>) -> Self {
        Self {
            endpoints,
            transport,
            forward_select_related: false,
        }
    }

    /// Creates a backend from collection settings.
    pub fn from_settings(settings: &CollectionSettings, transport: Arc<dyn Transport>) -> Self {
        Self::new(Endpoints::from_settings(settings), transport)
            .with_select_related(settings.forward_select_related)
    }

    /// Sets whether `select_related` hints become query parameters.
    #[must_use]
    pub const fn with_select_related(mut self, forward: bool) -> Self {
        self.forward_select_related = forward;
        self
    }

    /// The endpoint table.
    pub const fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Builds the HTTP request for `action`.
    pub fn build_request(&self, query: &Query, action: Action) -> ApiResult<HttpRequest> {
        let url = self.endpoints.get(action);
        let request = match action {
            Action::List => {
                HttpRequest::new(Method::GET, url).with_params(self.read_params(query, true)?)
            }
            Action::Count => {
                HttpRequest::new(Method::GET, url).with_params(self.read_params(query, false)?)
            }
            Action::Create => HttpRequest::new(Method::POST, url).with_json(Value::Array(
                query.data.iter().cloned().map(Value::Object).collect(),
            )),
            Action::Update => {
                let request = HttpRequest::new(Method::PATCH, url)
                    .with_params(filter_params(&query.filters)?);
                if query.update.is_empty() {
                    request
                } else {
                    request.with_json(Value::Object(query.update.clone()))
                }
            }
            Action::Delete => HttpRequest::new(Method::DELETE, url)
                .with_params(filter_params(&query.filters)?),
        };
        Ok(request)
    }

    /// Filters, then ordering, then relation hints, then the window.
    fn read_params(&self, query: &Query, ordered: bool) -> ApiResult<Vec<(String, String)>> {
        let mut params = filter_params(&query.filters)?;
        if ordered {
            params.extend(
                query
                    .order_by
                    .iter()
                    .map(|field| ("order_by".to_string(), field.clone())),
            );
            if self.forward_select_related {
                params.extend(
                    query
                        .select_related
                        .iter()
                        .map(|field| ("select_related".to_string(), field.clone())),
                );
            }
        }
        if let Some(offset) = query.offset {
            params.push(("offset".to_string(), offset.to_string()));
        }
        if let Some(limit) = query.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        Ok(params)
    }
}

#[async_trait]
impl Backend for RestBackend {
    async fn request(&self, query: &Query, action: Action) -> ApiResult<Value> {
        dispatch(self.transport.as_ref(), self.build_request(query, action)?).await
    }

    fn supports_select_related(&self) -> bool {
        self.forward_select_related
    }

    fn endpoint(&self, action: Action) -> &str {
        self.endpoints.get(action)
    }
}

fn filter_params(filters: &FlatFilters) -> ApiResult<Vec<(String, String)>> {
    let mut params = Vec::with_capacity(filters.len());
    for (key, value) in filters {
        match value {
            Value::Null => params.push(null_param(key)?),
            Value::Array(items) => {
                for item in items {
                    if item.is_null() {
                        return Err(ApiError::InvalidFilter(format!(
                            "{key}: null cannot be one of several alternatives"
                        )));
                    }
                    params.push((key.clone(), render(item)));
                }
            }
            other => params.push((key.clone(), render(other))),
        }
    }
    Ok(params)
}

/// Rewrites a `null` comparison as an `isnull` lookup on the same field.
fn null_param(key: &str) -> ApiResult<(String, String)> {
    let (field, lookup) = match key.rsplit_once(LOOKUP_SEP) {
        Some((field, last)) => match Lookup::parse(last) {
            Some(lookup) => (field, lookup),
            None => (key, Lookup::Exact),
        },
        None => (key, Lookup::Exact),
    };
    let isnull = match lookup {
        Lookup::Exact => "true",
        Lookup::Ne => "false",
        other => {
            return Err(ApiError::InvalidFilter(format!(
                "{key}: null cannot be compared with {other}"
            )))
        }
    };
    Ok((format!("{field}{LOOKUP_SEP}{}", Lookup::IsNull), isnull.to_string()))
}

// Bools, numbers, and objects render as their JSON text.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Recorder;
    use admin_api_core::Protocol;
    use serde_json::{json, Map};

    const URL: &str = "http://api.test/products/rest/";

    fn backend() -> RestBackend {
        RestBackend::new(
            Endpoints::uniform(URL).with(Action::Count, "http://api.test/products/rest/count/"),
            Arc::new(Recorder::default()),
        )
    }

    fn pairs(req: &HttpRequest) -> Vec<(&str, &str)> {
        req.params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }

    #[test]
    fn test_list_request_param_order() {
        let mut q = Query::new();
        q.add_filters([("name", "socks")]);
        q.set_ordering(["-price"]);
        q.set_limits(Some(0), Some(5));

        let req = backend().build_request(&q, Action::List).unwrap();
        assert_eq!(req.method, Method::GET);
        assert_eq!(
            req.full_url(),
            "http://api.test/products/rest/?name=socks&order_by=-price&offset=0&limit=5"
        );
        assert!(req.body.is_none());
    }

    #[test]
    fn test_list_repeats_order_by() {
        let mut q = Query::new();
        q.set_ordering(["category", "-price"]);
        let req = backend().build_request(&q, Action::List).unwrap();
        assert_eq!(req.param_values("order_by"), vec!["category", "-price"]);
    }

    #[test]
    fn test_select_related_forwarding() {
        let mut q = Query::new();
        q.add_select_related(["category"]);

        let quiet = backend();
        assert!(!quiet.supports_select_related());
        assert!(quiet
            .build_request(&q, Action::List)
            .unwrap()
            .param_values("select_related")
            .is_empty());

        let chatty = backend().with_select_related(true);
        assert!(chatty.supports_select_related());
        assert_eq!(
            chatty
                .build_request(&q, Action::List)
                .unwrap()
                .param_values("select_related"),
            vec!["category"]
        );
    }

    #[test]
    fn test_count_request() {
        let mut q = Query::new();
        q.add_filters([("price__gte", 10)]);
        q.set_ordering(["name"]);
        q.set_limits(Some(2), Some(4));

        let req = backend().build_request(&q, Action::Count).unwrap();
        assert_eq!(req.method, Method::GET);
        assert_eq!(req.url, "http://api.test/products/rest/count/");
        assert_eq!(
            pairs(&req),
            vec![("price__gte", "10"), ("offset", "2"), ("limit", "4")]
        );
    }

    #[test]
    fn test_update_request() {
        let mut q = Query::new();
        q.add_filters([("id", 3)]);
        q.update.insert("name".into(), json!("new"));

        let req = backend().build_request(&q, Action::Update).unwrap();
        assert_eq!(req.method, Method::PATCH);
        assert_eq!(req.full_url(), "http://api.test/products/rest/?id=3");
        assert_eq!(req.body, Some(json!({"name": "new"})));
    }

    #[test]
    fn test_create_request_sends_record_list() {
        let mut q = Query::new();
        q.add_filters([("ignored", 1)]);
        q.data.push(Map::from_iter([("name".to_string(), json!("hat"))]));
        q.data.push(Map::from_iter([("name".to_string(), json!("scarf"))]));

        let req = backend().build_request(&q, Action::Create).unwrap();
        assert_eq!(req.method, Method::POST);
        assert!(req.params.is_empty());
        assert_eq!(req.body, Some(json!([{"name": "hat"}, {"name": "scarf"}])));
    }

    #[test]
    fn test_delete_request() {
        let mut q = Query::new();
        q.add_filters([("archived", true)]);
        q.set_limits(Some(0), Some(1));

        let req = backend().build_request(&q, Action::Delete).unwrap();
        assert_eq!(req.method, Method::DELETE);
        assert_eq!(pairs(&req), vec![("archived", "true")]);
        assert!(req.body.is_none());
    }

    #[test]
    fn test_filter_value_rendering() {
        let mut q = Query::new();
        q.add_filters([
            ("b", json!(false)),
            ("c", json!(1.5)),
            ("d", json!(["x", 2])),
        ]);
        let req = backend().build_request(&q, Action::Delete).unwrap();
        assert_eq!(
            pairs(&req),
            vec![("b", "false"), ("c", "1.5"), ("d", "x"), ("d", "2")]
        );
    }

    #[test]
    fn test_null_filters_become_isnull() {
        let mut q = Query::new();
        q.add_filters([
            ("category", json!(null)),
            ("supplier__name__exact", json!(null)),
            ("tag__ne", json!(null)),
        ]);
        let req = backend().build_request(&q, Action::Delete).unwrap();
        assert_eq!(
            pairs(&req),
            vec![
                ("category__isnull", "true"),
                ("supplier__name__isnull", "true"),
                ("tag__isnull", "false"),
            ]
        );
    }

    #[tokio::test]
    async fn test_unrepresentable_null_filter_sends_nothing() {
        let recorder = Arc::new(Recorder::default());
        let b = RestBackend::new(Endpoints::uniform(URL), recorder.clone());
        for filter in [json!({"price__gte": null}), json!({"category": ["a", null]})] {
            let mut q = Query::new();
            q.add_filters(filter.as_object().unwrap().clone());
            assert!(matches!(
                b.request(&q, Action::Delete).await,
                Err(ApiError::InvalidFilter(_))
            ));
        }
        assert_eq!(recorder.calls(), 0);
    }

    #[test]
    fn test_empty_update_has_no_body() {
        let mut q = Query::new();
        q.add_filters([("id", 3)]);
        let req = backend().build_request(&q, Action::Update).unwrap();
        assert_eq!(req.method, Method::PATCH);
        assert!(req.body.is_none());
    }

    #[test]
    fn test_endpoints_from_settings() {
        let settings = CollectionSettings::new(Protocol::Rest, URL)
            .with_count_url("http://api.test/products/rest/count/")
            .with_forward_select_related(true);
        let b = RestBackend::from_settings(&settings, Arc::new(Recorder::default()));
        assert_eq!(b.endpoint(Action::List), URL);
        assert_eq!(b.endpoint(Action::Count), "http://api.test/products/rest/count/");
        assert_eq!(b.endpoint(Action::Delete), URL);
        assert!(b.supports_select_related());
    }

    #[tokio::test]
    async fn test_request_goes_through_transport() {
        let recorder = Arc::new(Recorder::replying([json!({"count": 1})]));
        let b = RestBackend::new(Endpoints::uniform(URL), recorder.clone());
        let mut q = Query::new();
        q.add_filters([("id", 3)]);
        q.update.insert("name".into(), json!("new"));

        let raw = b.request(&q, Action::Update).await.unwrap();
        assert_eq!(b.extract(raw, Action::Update).unwrap().into_count().unwrap(), 1);
        assert_eq!(recorder.calls(), 1);
        assert_eq!(recorder.requests()[0].method, Method::PATCH);
    }
}
