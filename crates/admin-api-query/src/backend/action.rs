//! The action protocol: one URL, one POST per operation.
//!
//! The body names the action and carries every non-empty part of the
//! descriptor, with filters nested by [`FilterCodec::unflatten`]:
//!
//! ```text
//! POST /products/action/
//! {"action": "list", "filters": {"price": {"gte": 10}}, "order_by": ["-price"], "limit": 5}
//! ```

use std::sync::Arc;

use admin_api_core::ApiResult;
use async_trait::async_trait;
use http::Method;
use serde_json::{json, Map, Value};

use super::{dispatch, Action, Backend};
use crate::filters::FilterCodec;
use crate::query::Query;
use crate::transport::{HttpRequest, Transport};

/// A [`Backend`] speaking the action protocol.
#[derive(Debug, Clone)]
pub struct ActionBackend {
    url: String,
    transport: Arc<dyn Transport>,
    codec: FilterCodec,
}

impl ActionBackend {
    /// Creates a backend posting to `url`.
    pub fn new(url: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            url: url.into(),
            transport,
            codec: FilterCodec::default(),
        }
    }

    /// Uses `codec` to nest filters.
    #[must_use]
    pub fn with_codec(mut self, codec: FilterCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Builds the JSON body for `action`.
    pub fn body(&self, query: &Query, action: Action) -> ApiResult<Value> {
        let mut body = Map::new();
        body.insert("action".to_string(), json!(action));

        let filters = self.codec.unflatten(&query.filters)?;
        if !filters.is_empty() {
            body.insert("filters".to_string(), Value::Object(filters));
        }
        if !query.order_by.is_empty() {
            body.insert("order_by".to_string(), json!(query.order_by));
        }
        if !query.select_related.is_empty() {
            body.insert("select_related".to_string(), json!(query.select_related));
        }
        if !query.data.is_empty() {
            body.insert("data".to_string(), json!(query.data));
        }
        if !query.update.is_empty() {
            body.insert("update".to_string(), Value::Object(query.update.clone()));
        }
        if let Some(limit) = query.limit {
            body.insert("limit".to_string(), json!(limit));
        }
        if let Some(offset) = query.offset {
            body.insert("offset".to_string(), json!(offset));
        }
        Ok(Value::Object(body))
    }
}

#[async_trait]
impl Backend for ActionBackend {
    async fn request(&self, query: &Query, action: Action) -> ApiResult<Value> {
        let body = self.body(query, action)?;
        let request = HttpRequest::new(Method::POST, &self.url).with_json(body);
        dispatch(self.transport.as_ref(), request).await
    }

    fn supports_select_related(&self) -> bool {
        true
    }

    fn endpoint(&self, _action: Action) -> &str {
        &self.url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Recorder;
    use crate::transport::HttpResponse;
    use admin_api_core::ApiError;

    const URL: &str = "http://api.test/products/action/";

    fn backend(recorder: &Arc<Recorder>) -> ActionBackend {
        ActionBackend::new(URL, recorder.clone())
    }

    #[test]
    fn test_body_omits_empty_fields() {
        let b = ActionBackend::new(URL, Arc::new(Recorder::default()));
        let body = b.body(&Query::new(), Action::List).unwrap();
        assert_eq!(body, json!({"action": "list"}));
    }

    #[test]
    fn test_body_carries_descriptor() {
        let b = ActionBackend::new(URL, Arc::new(Recorder::default()));
        let mut q = Query::new();
        q.add_filters([("price__gte", json!(10)), ("name", json!("socks"))]);
        q.set_ordering(["-price"]);
        q.add_select_related(["category"]);
        q.set_limits(Some(0), Some(5));

        let body = b.body(&q, Action::List).unwrap();
        assert_eq!(
            body,
            json!({
                "action": "list",
                "filters": {"price": {"gte": 10}, "name": {"exact": "socks"}},
                "order_by": ["-price"],
                "select_related": ["category"],
                "limit": 5,
                "offset": 0
            })
        );
    }

    #[test]
    fn test_body_update_and_data() {
        let b = ActionBackend::new(URL, Arc::new(Recorder::default()));
        let mut q = Query::new();
        q.update.insert("name".into(), json!("new"));
        q.data.push(Map::from_iter([("name".to_string(), json!("hat"))]));

        let body = b.body(&q, Action::Update).unwrap();
        assert_eq!(body["action"], "update");
        assert_eq!(body["update"], json!({"name": "new"}));
        assert_eq!(body["data"], json!([{"name": "hat"}]));
    }

    #[test]
    fn test_body_with_custom_codec() {
        let b = ActionBackend::new(URL, Arc::new(Recorder::default()))
            .with_codec(FilterCodec::new(".").unwrap());
        let mut q = Query::new();
        q.add_filters([("price.gte", 10)]);
        let body = b.body(&q, Action::Count).unwrap();
        assert_eq!(body["filters"], json!({"price": {"gte": 10}}));
    }

    #[test]
    fn test_body_malformed_key() {
        let b = ActionBackend::new(URL, Arc::new(Recorder::default()));
        let mut q = Query::new();
        q.add_filters([("price____gte", 1)]);
        assert!(matches!(
            b.body(&q, Action::List),
            Err(ApiError::MalformedKey(_))
        ));
    }

    #[tokio::test]
    async fn test_request_posts_to_single_url() {
        let recorder = Arc::new(Recorder::replying([json!({"count": 2})]));
        let b = backend(&recorder);
        let raw = b.request(&Query::new(), Action::Delete).await.unwrap();
        assert_eq!(raw, json!({"count": 2}));

        let sent = recorder.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].method, Method::POST);
        assert_eq!(sent[0].url, URL);
        assert!(sent[0].params.is_empty());
        assert_eq!(sent[0].body, Some(json!({"action": "delete"})));
    }

    #[tokio::test]
    async fn test_malformed_key_sends_nothing() {
        let recorder = Arc::new(Recorder::default());
        let b = backend(&recorder);
        let mut q = Query::new();
        q.add_filters([("", 1)]);
        assert!(b.request(&q, Action::List).await.is_err());
        assert_eq!(recorder.calls(), 0);
    }

    #[tokio::test]
    async fn test_error_status_propagates() {
        let recorder = Arc::new(Recorder::default());
        recorder.push(HttpResponse::new(500, json!("boom")));
        let b = backend(&recorder);
        match b.request(&Query::new(), Action::List).await {
            Err(ApiError::Transport { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, json!("boom"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_endpoint_and_select_related() {
        let b = ActionBackend::new(URL, Arc::new(Recorder::default()));
        assert!(b.supports_select_related());
        for action in Action::ALL {
            assert_eq!(b.endpoint(action), URL);
        }
    }
}
