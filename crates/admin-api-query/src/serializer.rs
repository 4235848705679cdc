//! Conversion between wire records and domain objects.

use std::fmt;
use std::marker::PhantomData;

use admin_api_core::{ApiError, ApiResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::query::Record;

/// Converts domain objects to wire records and back.
///
/// A queryset holds one serializer and routes every record it sends or
/// receives through it.
pub trait Serializer<M>: Send + Sync {
    /// Converts a domain object into a field mapping.
    fn serialize(&self, object: &M) -> ApiResult<Record>;

    /// Builds a domain object from one element of a response's `data` list.
    fn deserialize(&self, raw: &Value) -> ApiResult<M>;
}

/// A [`Serializer`] backed by the object's serde implementation.
///
/// # Examples
///
/// ```
/// use admin_api_query::serializer::{JsonSerializer, Serializer};
/// use serde::{Deserialize, Serialize};
/// use serde_json::json;
///
/// #[derive(Debug, PartialEq, Serialize, Deserialize)]
/// struct Product { id: Option<i64>, name: String }
///
/// let s = JsonSerializer::<Product>::new();
/// let p = s.deserialize(&json!({"id": 1, "name": "socks"})).unwrap();
/// assert_eq!(p, Product { id: Some(1), name: "socks".into() });
/// assert_eq!(s.serialize(&p).unwrap()["name"], "socks");
/// ```
pub struct JsonSerializer<M> {
    _phantom: PhantomData<fn() -> M>,
}

impl<M> JsonSerializer<M> {
    /// Creates a serializer.
    pub const fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<M> Default for JsonSerializer<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> Clone for JsonSerializer<M> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<M> fmt::Debug for JsonSerializer<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonSerializer")
            .field("model", &std::any::type_name::<M>())
            .finish()
    }
}

impl<M> Serializer<M> for JsonSerializer<M>
where
    M: Serialize + DeserializeOwned,
{
    fn serialize(&self, object: &M) -> ApiResult<Record> {
        match serde_json::to_value(object) {
            Ok(Value::Object(record)) => Ok(record),
            Ok(other) => Err(ApiError::SerializationError(format!(
                "expected {} to serialize as an object, got {other}",
                std::any::type_name::<M>()
            ))),
            Err(e) => Err(ApiError::SerializationError(e.to_string())),
        }
    }

    fn deserialize(&self, raw: &Value) -> ApiResult<M> {
        M::deserialize(raw).map_err(|e| ApiError::SerializationError(e.to_string()))
    }
}
