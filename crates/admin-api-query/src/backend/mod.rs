//! Backends turn a [`Query`] plus an [`Action`] into one remote request.
//!
//! Two protocols are provided:
//!
//! - [`ActionBackend`] posts every action to a single endpoint with the action
//!   name and the non-empty parts of the descriptor in a JSON body.
//! - [`RestBackend`] maps actions onto HTTP verbs and per-action URLs.
//!
//! Both share the response contract: `count` for count/update/delete and
//! `data` (a list of records) for list/create.

pub mod action;
pub mod rest;

pub use action::ActionBackend;
pub use rest::{Endpoints, RestBackend};

use std::fmt;
use std::str::FromStr;

use admin_api_core::{ApiError, ApiResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::query::Query;
use crate::transport::{HttpRequest, Transport};

/// The kind of remote operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Fetch matching records.
    List,
    /// Count matching records.
    Count,
    /// Create records.
    Create,
    /// Update matching records.
    Update,
    /// Delete matching records.
    Delete,
}

impl Action {
    /// Every action.
    pub const ALL: [Self; 5] = [
        Self::List,
        Self::Count,
        Self::Create,
        Self::Update,
        Self::Delete,
    ];

    /// The action's wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Count => "count",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    /// Returns `true` if the response carries a `count` rather than `data`.
    pub const fn returns_count(self) -> bool {
        matches!(self, Self::Count | Self::Update | Self::Delete)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| ApiError::UnknownAction(s.to_string()))
    }
}

/// The payload pulled out of a raw response.
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted {
    /// The `count` of a count, update, or delete.
    Count(u64),
    /// The `data` records of a list or create.
    Records(Vec<Value>),
}

impl Extracted {
    /// Returns the count, or an error if this holds records.
    pub fn into_count(self) -> ApiResult<u64> {
        match self {
            Self::Count(n) => Ok(n),
            Self::Records(_) => Err(ApiError::InvalidResponse(
                "expected a count, got records".to_string(),
            )),
        }
    }

    /// Returns the records, or an error if this holds a count.
    pub fn into_records(self) -> ApiResult<Vec<Value>> {
        match self {
            Self::Records(records) => Ok(records),
            Self::Count(_) => Err(ApiError::InvalidResponse(
                "expected records, got a count".to_string(),
            )),
        }
    }
}

/// A remote protocol.
///
/// `request` performs exactly one round trip. `extract` is pure.
#[async_trait]
pub trait Backend: Send + Sync + fmt::Debug {
    /// Sends `query` as `action` and returns the decoded response body.
    ///
    /// A non-2xx response is an [`ApiError::Transport`] error.
    async fn request(&self, query: &Query, action: Action) -> ApiResult<Value>;

    /// Pulls the count or records out of a raw response body.
    fn extract(&self, raw: Value, action: Action) -> ApiResult<Extracted> {
        extract_response(raw, action)
    }

    /// Whether the remote end is told about `select_related` hints.
    fn supports_select_related(&self) -> bool;

    /// The URL `action` is sent to.
    fn endpoint(&self, action: Action) -> &str;
}

/// Reads `count` (count/update/delete) or `data` (list/create) from `raw`.
pub fn extract_response(raw: Value, action: Action) -> ApiResult<Extracted> {
    if action.returns_count() {
        return raw
            .get("count")
            .and_then(Value::as_u64)
            .map(Extracted::Count)
            .ok_or_else(|| {
                ApiError::InvalidResponse(format!(
                    "{action} response has no integer \"count\": {raw}"
                ))
            });
    }

    match raw {
        Value::Object(mut body) => match body.remove("data") {
            Some(Value::Array(records)) => Ok(Extracted::Records(records)),
            Some(other) => Err(ApiError::InvalidResponse(format!(
                "{action} response \"data\" is not a list: {other}"
            ))),
            None => Err(ApiError::InvalidResponse(format!(
                "{action} response has no \"data\""
            ))),
        },
        other => Err(ApiError::InvalidResponse(format!(
            "{action} response is not an object: {other}"
        ))),
    }
}

/// Sends `request` and converts a non-2xx status into an error.
pub(crate) async fn dispatch(transport: &dyn Transport, request: HttpRequest) -> ApiResult<Value> {
    tracing::debug!(
        method = %request.method,
        url = %request.full_url(),
        "sending request"
    );
    let response = transport.send(request).await?;
    if !response.is_success() {
        tracing::warn!(status = response.status, "remote collection rejected request");
    }
    response.into_result()
}
