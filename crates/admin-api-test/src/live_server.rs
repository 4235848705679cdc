//! A real HTTP server for end-to-end tests.
//!
//! [`LiveServer`] binds an Axum router to a random local port so that
//! querysets can be exercised through [`HttpTransport`] against a real
//! socket.
//!
//! [`HttpTransport`]: admin_api_query::transport::HttpTransport
//!
//! ## Example
//!
//! ```rust,no_run
//! use admin_api_test::live_server::LiveServer;
//! use axum::Router;
//! use axum::routing::post;
//!
//! async fn example() {
//!     let app = Router::new().route("/products/action/", post(|| async { "{}" }));
//!     let server = LiveServer::start(app).await;
//!     println!("collection at {}", server.url("/products/action/"));
//!     server.stop().await;
//! }
//! ```

use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// A test server running an Axum application on `127.0.0.1`.
///
/// Dropping the server signals shutdown; [`stop`](Self::stop) also waits for
/// the server task to finish.
pub struct LiveServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    server_handle: Option<JoinHandle<()>>,
}

impl LiveServer {
    /// Binds `app` to a random port and serves it in a background task.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn start(app: Router) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().expect("Failed to get local address");

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server_handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .ok();
        });

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
            server_handle: Some(server_handle),
        }
    }

    /// The absolute URL of `path` on this server.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// The bound address.
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Shuts the server down and waits for it to exit.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.server_handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for LiveServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use admin_api_query::transport::{HttpRequest, HttpTransport, Transport};
    use axum::routing::get;
    use http::Method;
    use serde_json::json;

    #[tokio::test]
    async fn test_url() {
        let server = LiveServer::start(Router::new()).await;
        assert!(server.url("/p/").starts_with("http://127.0.0.1:"));
        assert!(server.url("/p/").ends_with("/p/"));
        assert!(server.addr().port() > 0);
        server.stop().await;
    }

    #[tokio::test]
    async fn test_http_transport_round_trip() {
        let app = Router::new().route(
            "/echo/",
            get(|axum::extract::RawQuery(q): axum::extract::RawQuery| async move {
                axum::Json(json!({"query": q}))
            }),
        );
        let server = LiveServer::start(app).await;
        let transport = HttpTransport::new().unwrap();

        let response = transport
            .send(
                HttpRequest::new(Method::GET, server.url("/echo/"))
                    .with_params(vec![("name".into(), "socks".into())]),
            )
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, json!({"query": "name=socks"}));

        server.stop().await;
    }

    #[tokio::test]
    async fn test_http_transport_reports_error_status() {
        let server = LiveServer::start(Router::new()).await;
        let transport = HttpTransport::new().unwrap();
        let response = transport
            .send(HttpRequest::new(Method::GET, server.url("/missing/")))
            .await
            .unwrap();
        assert_eq!(response.status, 404);
        server.stop().await;
    }
}
