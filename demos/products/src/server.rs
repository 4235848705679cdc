//! HTTP views serving the product store over both protocols.
//!
//! | Route | Protocol |
//! |---|---|
//! | `POST /products/action/` | action (body names the action) |
//! | `GET/POST/PATCH/DELETE /products/rest/` | REST |
//! | `GET /products/rest/count/` | REST count |

use std::sync::Arc;

use admin_api_core::ApiError;
use admin_api_query::backend::Action;
use admin_api_query::filters::{flatten, FilterTree, FlatFilters};
use admin_api_query::query::Record;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::store::{ProductStore, Selection};

/// Path of the action endpoint.
pub const ACTION_PATH: &str = "/products/action/";
/// Path of the REST endpoint.
pub const REST_PATH: &str = "/products/rest/";
/// Path of the REST count endpoint.
pub const REST_COUNT_PATH: &str = "/products/rest/count/";

/// Builds the router over `store`.
pub fn router(store: Arc<ProductStore>) -> Router {
    Router::new()
        .route(ACTION_PATH, post(action_view))
        .route(
            REST_PATH,
            get(rest_list)
                .post(rest_create)
                .patch(rest_update)
                .delete(rest_delete),
        )
        .route(REST_COUNT_PATH, get(rest_count))
        .layer(TraceLayer::new_for_http())
        .with_state(store)
}

/// An [`ApiError`] rendered as a JSON error response.
#[derive(Debug)]
pub struct ServerError(ApiError);

impl From<ApiError> for ServerError {
    fn from(err: ApiError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        tracing::warn!(%status, error = %self.0, "request failed");
        (status, Json(json!({"detail": self.0.to_string()}))).into_response()
    }
}

type ViewResult = Result<Json<Value>, ServerError>;

// ── Action protocol ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ActionRequest {
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    filters: FilterTree,
    #[serde(default)]
    order_by: Vec<String>,
    #[serde(default)]
    data: Vec<Record>,
    #[serde(default)]
    update: Record,
    limit: Option<usize>,
    offset: Option<usize>,
}

impl ActionRequest {
    fn selection(&self) -> Selection {
        Selection {
            filters: flatten(&self.filters),
            order_by: self.order_by.clone(),
            offset: self.offset,
            limit: self.limit,
        }
    }
}

async fn action_view(
    State(store): State<Arc<ProductStore>>,
    Json(request): Json<ActionRequest>,
) -> ViewResult {
    let action = match request.action.as_deref() {
        None => Action::List,
        Some(name) => name.parse::<Action>()?,
    };
    tracing::debug!(%action, "action request");

    let body = match action {
        Action::List => json!({"data": store.select(&request.selection())?}),
        Action::Count => json!({"count": store.count(&request.selection())?}),
        Action::Create => json!({"data": store.insert(request.data)}),
        Action::Update => json!({"count": store.update(&request.selection(), &request.update)?}),
        Action::Delete => json!({"count": store.delete(&request.selection())?}),
    };
    Ok(Json(body))
}

// ── REST protocol ───────────────────────────────────────────────────

/// Splits raw query parameters into a selection. Repeated filter keys
/// become a list of alternatives.
fn rest_selection(params: Vec<(String, String)>) -> Result<Selection, ServerError> {
    let mut selection = Selection::default();
    let mut filters = FlatFilters::new();
    for (key, value) in params {
        match key.as_str() {
            "order_by" => selection.order_by.push(value),
            "select_related" => {}
            "offset" => selection.offset = Some(parse_position(&key, &value)?),
            "limit" => selection.limit = Some(parse_position(&key, &value)?),
            _ => match filters.remove(&key) {
                None => {
                    filters.insert(key, Value::String(value));
                }
                Some(Value::Array(mut items)) => {
                    items.push(Value::String(value));
                    filters.insert(key, Value::Array(items));
                }
                Some(previous) => {
                    filters.insert(key, Value::Array(vec![previous, Value::String(value)]));
                }
            },
        }
    }
    selection.filters = filters;
    Ok(selection)
}

fn parse_position(key: &str, value: &str) -> Result<usize, ServerError> {
    value.parse::<usize>().map_err(|_| {
        ServerError(ApiError::InvalidSlice(format!(
            "{key} must be a non-negative integer, got {value:?}"
        )))
    })
}

async fn rest_list(
    State(store): State<Arc<ProductStore>>,
    Query(params): Query<Vec<(String, String)>>,
) -> ViewResult {
    let selection = rest_selection(params)?;
    Ok(Json(json!({"data": store.select(&selection)?})))
}

async fn rest_count(
    State(store): State<Arc<ProductStore>>,
    Query(params): Query<Vec<(String, String)>>,
) -> ViewResult {
    let selection = rest_selection(params)?;
    Ok(Json(json!({"count": store.count(&selection)?})))
}

async fn rest_create(
    State(store): State<Arc<ProductStore>>,
    Json(records): Json<Vec<Record>>,
) -> ViewResult {
    Ok(Json(json!({"data": store.insert(records)})))
}

async fn rest_update(
    State(store): State<Arc<ProductStore>>,
    Query(params): Query<Vec<(String, String)>>,
    Json(fields): Json<Record>,
) -> ViewResult {
    let selection = rest_selection(params)?;
    Ok(Json(json!({"count": store.update(&selection, &fields)?})))
}

async fn rest_delete(
    State(store): State<Arc<ProductStore>>,
    Query(params): Query<Vec<(String, String)>>,
) -> ViewResult {
    let selection = rest_selection(params)?;
    Ok(Json(json!({"count": store.delete(&selection)?})))
}
