//! Request counting assertions.
//!
//! [`assert_num_requests`] counts the round trips made through a
//! [`MockTransport`] while an async closure runs. Use it to pin down
//! memoization: a realized queryset must not go back to the server.
//!
//! ## Example
//!
//! ```rust,no_run
//! use admin_api_test::assert_requests::assert_num_requests;
//! use admin_api_test::fixtures;
//! use admin_api_core::Protocol;
//!
//! async fn example() {
//!     let (mock, products) = fixtures::products_manager(Protocol::Rest);
//!     mock.reply(fixtures::list_body(&fixtures::sample_products()));
//!
//!     let qs = products.all();
//!     assert_num_requests(&mock, 1, || async {
//!         qs.fetch_all().await.unwrap();
//!         qs.fetch_all().await.unwrap();
//!     })
//!     .await;
//! }
//! ```

use std::future::Future;

use crate::mock_transport::MockTransport;

/// Asserts that exactly `expected_count` requests are sent during the async
/// closure.
///
/// # Panics
///
/// Panics if the number of requests does not match `expected_count`.
pub async fn assert_num_requests<F, Fut>(transport: &MockTransport, expected_count: usize, f: F)
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = ()>,
{
    transport.reset_request_count();
    f().await;
    let actual = transport.request_count();
    assert_eq!(
        actual, expected_count,
        "Expected {expected_count} requests, but {actual} were sent"
    );
}

/// Asserts that at most `max_count` requests are sent during the async
/// closure.
///
/// # Panics
///
/// Panics if more than `max_count` requests are sent.
pub async fn assert_max_requests<F, Fut>(transport: &MockTransport, max_count: usize, f: F)
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = ()>,
{
    transport.reset_request_count();
    f().await;
    let actual = transport.request_count();
    assert!(
        actual <= max_count,
        "Expected at most {max_count} requests, but {actual} were sent"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use admin_api_query::transport::{HttpRequest, HttpResponse, Transport};
    use http::Method;
    use serde_json::Value;

    async fn ping(mock: &MockTransport) {
        mock.send(HttpRequest::new(Method::GET, "http://x/"))
            .await
            .unwrap();
    }

    fn mock() -> MockTransport {
        let m = MockTransport::new();
        m.always(HttpResponse::ok(Value::Null));
        m
    }

    #[tokio::test]
    async fn test_assert_num_requests_passes() {
        let m = mock();
        assert_num_requests(&m, 2, || async {
            ping(&m).await;
            ping(&m).await;
        })
        .await;
    }

    #[tokio::test]
    async fn test_assert_num_requests_zero() {
        let m = mock();
        assert_num_requests(&m, 0, || async {}).await;
    }

    #[tokio::test]
    #[should_panic(expected = "Expected 1 requests, but 2 were sent")]
    async fn test_assert_num_requests_fails_too_many() {
        let m = mock();
        assert_num_requests(&m, 1, || async {
            ping(&m).await;
            ping(&m).await;
        })
        .await;
    }

    #[tokio::test]
    async fn test_assert_max_requests_passes() {
        let m = mock();
        assert_max_requests(&m, 3, || async {
            ping(&m).await;
        })
        .await;
    }

    #[tokio::test]
    #[should_panic(expected = "Expected at most 1 requests, but 2 were sent")]
    async fn test_assert_max_requests_fails() {
        let m = mock();
        assert_max_requests(&m, 1, || async {
            ping(&m).await;
            ping(&m).await;
        })
        .await;
    }

    #[tokio::test]
    async fn test_counter_resets_between_assertions() {
        let m = mock();
        ping(&m).await;
        assert_num_requests(&m, 1, || async {
            ping(&m).await;
        })
        .await;
    }
}
