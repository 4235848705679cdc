//! The `Product` model shared by the server and the client walkthrough.

use admin_api_core::ApiResult;
use admin_api_query::model::ApiModel;
use admin_api_query::query::Record;
use admin_api_query::serializer::{JsonSerializer, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A product in the catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Option<i64>,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub category: Option<String>,
}

impl Product {
    /// Creates an unsaved product.
    pub fn new(name: impl Into<String>, price: f64, category: Option<&str>) -> Self {
        Self {
            id: None,
            name: name.into(),
            price,
            category: category.map(str::to_string),
        }
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
