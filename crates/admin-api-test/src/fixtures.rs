//! A product model and canned responses shared by tests.

use std::sync::Arc;

use admin_api_core::{ApiResult, CollectionSettings, Protocol};
use admin_api_query::model::ApiModel;
use admin_api_query::query::Record;
use admin_api_query::queryset::Manager;
use admin_api_query::serializer::{JsonSerializer, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::mock_transport::MockTransport;

/// Base URL for action-protocol fixtures.
pub const ACTION_URL: &str = "http://api.test/products/action/";

/// Base URL for REST-protocol fixtures.
pub const REST_URL: &str = "http://api.test/products/rest/";

/// Count URL for REST-protocol fixtures.
pub const REST_COUNT_URL: &str = "http://api.test/products/rest/count/";

/// A product in the remote catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Server-assigned primary key.
    pub id: Option<i64>,
    /// Display name.
    pub name: String,
    /// Unit price.
    pub price: f64,
    /// Category name, if any.
    #[serde(default)]
    pub category: Option<String>,
}

impl Product {
    /// An unsaved product.
    pub fn new(name: impl Into<String>, price: f64) -> Self {
        Self {
            id: None,
            name: name.into(),
            price,
            category: None,
        }
    }

    /// Sets the category.
    #[must_use]
    pub fn in_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

impl ApiModel for Product {
    fn pk(&self) -> Option<Value> {
        self.id.map(Value::from)
    }

    fn set_pk(&mut self, pk: Value) {
        self.id = pk.as_i64();
    }

    fn to_record(&self) -> ApiResult<Record> {
        JsonSerializer::<Self>::new().serialize(self)
    }
}

/// Collection settings for the fixture URLs.
pub fn collection_settings(protocol: Protocol) -> CollectionSettings {
    match protocol {
        Protocol::Action => CollectionSettings::new(Protocol::Action, ACTION_URL),
        Protocol::Rest => {
            CollectionSettings::new(Protocol::Rest, REST_URL).with_count_url(REST_COUNT_URL)
        }
    }
}

/// A mock transport and a product manager speaking `protocol` through it.
pub fn products_manager(protocol: Protocol) -> (Arc<MockTransport>, Manager<Product>) {
    let mock = Arc::new(MockTransport::new());
    let manager = Manager::from_settings(
        "products",
        &collection_settings(protocol),
        mock.clone(),
        JsonSerializer::<Product>::new(),
    );
    (mock, manager)
}

/// Five saved products as wire records.
pub fn sample_products() -> Vec<Value> {
    vec![
        json!({"id": 1, "name": "socks", "price": 4.5, "category": "clothing"}),
        json!({"id": 2, "name": "hat", "price": 12.0, "category": "clothing"}),
        json!({"id": 3, "name": "mug", "price": 8.0, "category": "kitchen"}),
        json!({"id": 4, "name": "kettle", "price": 30.0, "category": "kitchen"}),
        json!({"id": 5, "name": "lamp", "price": 22.5, "category": null}),
    ]
}

/// A list/create response body carrying `records`.
pub fn list_body(records: &[Value]) -> Value {
    json!({"data": records})
}

/// A count/update/delete response body.
pub fn count_body(count: u64) -> Value {
    json!({"count": count})
}
