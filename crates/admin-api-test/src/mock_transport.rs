//! A scripted [`Transport`] that never opens a socket.
//!
//! [`MockTransport`] answers requests from a queue of scripted replies and
//! records every request it sees, so tests can assert on exact URLs, query
//! parameters, bodies, and the number of round trips.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use admin_api_test::mock_transport::MockTransport;
//! use admin_api_query::prelude::*;
//! use serde_json::json;
//!
//! # async fn example() {
//! let mock = Arc::new(MockTransport::new());
//! mock.reply(json!({"count": 3}));
//!
//! let backend = RestBackend::new(Endpoints::uniform("http://api.test/p/"), mock.clone());
//! let raw = backend.request(&Query::new(), Action::Count).await.unwrap();
//! assert_eq!(raw, json!({"count": 3}));
//! assert_eq!(mock.request_count(), 1);
//! # }
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use admin_api_core::{ApiError, ApiResult};
use admin_api_query::transport::{HttpRequest, HttpResponse, Transport};
use async_trait::async_trait;
use serde_json::Value;

/// A transport that replays scripted responses and records requests.
///
/// Replies are consumed in order. When the queue is empty the fallback reply
/// is used if one is set; otherwise the request fails with
/// [`ApiError::ConnectionError`].
#[derive(Debug, Default)]
pub struct MockTransport {
    replies: Mutex<VecDeque<ApiResult<HttpResponse>>>,
    fallback: Mutex<Option<HttpResponse>>,
    requests: Mutex<Vec<HttpRequest>>,
    request_count: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockTransport {
    /// Creates a transport with nothing scripted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a `200 OK` reply with `body`.
    pub fn reply(&self, body: Value) -> &Self {
        self.reply_with(HttpResponse::ok(body))
    }

    /// Queues an arbitrary response.
    pub fn reply_with(&self, response: HttpResponse) -> &Self {
        lock(&self.replies).push_back(Ok(response));
        self
    }

    /// Queues a failure to complete the exchange.
    pub fn fail_with(&self, error: ApiError) -> &Self {
        lock(&self.replies).push_back(Err(error));
        self
    }

    /// Sets the reply used once the queue runs dry.
    pub fn always(&self, response: HttpResponse) -> &Self {
        *lock(&self.fallback) = Some(response);
        self
    }

    /// Every request seen so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        lock(&self.requests).clone()
    }

    /// The most recent request.
    pub fn last_request(&self) -> Option<HttpRequest> {
        lock(&self.requests).last().cloned()
    }

    /// Requests seen since the counter was last reset.
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Resets the request counter. Recorded requests are kept.
    pub fn reset_request_count(&self) {
        self.request_count.store(0, Ordering::Relaxed);
    }

    /// Number of scripted replies not yet consumed.
    pub fn pending_replies(&self) -> usize {
        lock(&self.replies).len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> ApiResult<HttpResponse> {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        let url = request.full_url();
        lock(&self.requests).push(request);

        if let Some(reply) = lock(&self.replies).pop_front() {
            return reply;
        }
        lock(&self.fallback)
            .clone()
            .ok_or_else(|| ApiError::ConnectionError(format!("no reply scripted for {url}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use serde_json::json;

    #[tokio::test]
    async fn test_replies_in_order() {
        let mock = MockTransport::new();
        mock.reply(json!({"n": 1})).reply(json!({"n": 2}));
        assert_eq!(mock.pending_replies(), 2);

        let a = mock
            .send(HttpRequest::new(Method::GET, "http://x/a"))
            .await
            .unwrap();
        let b = mock
            .send(HttpRequest::new(Method::GET, "http://x/b"))
            .await
            .unwrap();
        assert_eq!(a.body, json!({"n": 1}));
        assert_eq!(b.body, json!({"n": 2}));
        assert_eq!(mock.request_count(), 2);
        assert_eq!(mock.last_request().unwrap().url, "http://x/b");
    }

    #[tokio::test]
    async fn test_empty_queue_fails() {
        let mock = MockTransport::new();
        let err = mock
            .send(HttpRequest::new(Method::GET, "http://x/"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::ConnectionError(_)));
        assert_eq!(mock.request_count(), 1);
    }

    #[tokio::test]
    async fn test_fallback_reply() {
        let mock = MockTransport::new();
        mock.always(HttpResponse::ok(json!({"count": 0})));
        for _ in 0..3 {
            let r = mock
                .send(HttpRequest::new(Method::GET, "http://x/"))
                .await
                .unwrap();
            assert_eq!(r.body, json!({"count": 0}));
        }
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let mock = MockTransport::new();
        mock.fail_with(ApiError::ConnectionError("refused".into()));
        assert!(mock
            .send(HttpRequest::new(Method::POST, "http://x/"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_reset_keeps_history() {
        let mock = MockTransport::new();
        mock.always(HttpResponse::ok(Value::Null));
        mock.send(HttpRequest::new(Method::GET, "http://x/"))
            .await
            .unwrap();
        mock.reset_request_count();
        assert_eq!(mock.request_count(), 0);
        assert_eq!(mock.requests().len(), 1);
    }
}
