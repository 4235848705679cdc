//! Products demo: an Axum server exposing an in-memory product table over the
//! action and REST protocols, and a client walkthrough that drives it through
//! lazy querysets.

pub mod models;
pub mod server;
pub mod settings;
pub mod store;
pub mod walkthrough;
