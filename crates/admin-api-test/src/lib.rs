//! # admin-api-test
//!
//! Testing utilities for admin-api. Provides a scripted transport that
//! records requests, assertions on the number of round trips, a product
//! fixture, and a live Axum server for end-to-end tests.
//!
//! ## Modules
//!
//! - [`mock_transport`] - Scripted, recording [`Transport`](admin_api_query::Transport)
//! - [`assert_requests`] - `assert_num_requests` / `assert_max_requests`
//! - [`fixtures`] - The `Product` model and canned response bodies
//! - [`live_server`] - A real HTTP server on a random port

pub mod assert_requests;
pub mod fixtures;
pub mod live_server;
pub mod mock_transport;

pub use assert_requests::{assert_max_requests, assert_num_requests};
pub use live_server::LiveServer;
pub use mock_transport::MockTransport;
