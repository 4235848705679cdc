//! # admin-api-query
//!
//! Lazy querysets over remote collections. A [`QuerySet`](queryset::QuerySet)
//! builds up a [`Query`](query::Query) descriptor and only talks to the
//! network when a terminal operation runs. Two wire protocols are supported
//! through the [`Backend`](backend::Backend) trait: a single-endpoint action
//! protocol and a REST protocol.
//!
//! ## Modules
//!
//! - [`filters`] - Lookups and the flat ⇄ nested filter codec
//! - [`query`] - The query descriptor and result windows
//! - [`queryset`] - `QuerySet`, `Manager`, and `Slice`
//! - [`backend`] - The action and REST protocols
//! - [`transport`] - The HTTP seam and its reqwest implementation
//! - [`serializer`] - Record ⇄ object conversion
//! - [`model`] - Save/delete helpers for objects with a primary key

pub mod backend;
pub mod filters;
pub mod model;
pub mod query;
pub mod queryset;
pub mod serializer;
pub mod transport;

#[cfg(test)]
mod test_support;

#[doc(hidden)]
pub use serde_json;

pub use backend::{Action, ActionBackend, Backend, Endpoints, Extracted, RestBackend};
pub use filters::{FilterCodec, FilterTree, FlatFilters, Lookup, LOOKUP_SEP};
pub use model::{delete_model, save_model, ApiModel};
pub use query::{Query, Record};
pub use queryset::{Manager, QuerySet, Slice};
pub use serializer::{JsonSerializer, Serializer};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Transport};

/// Builds a list of `(key, value)` pairs for `filter`, `get`, `create`, and
/// `update`. Values go through `serde_json::json!`.
///
/// # Examples
///
/// ```
/// use admin_api_query::kwargs;
///
/// let lookups = kwargs!("price__gte" => 10, "name" => "socks");
/// assert_eq!(lookups.len(), 2);
/// assert_eq!(lookups[0].0, "price__gte");
/// assert_eq!(lookups[1].1, "socks");
/// ```
#[macro_export]
macro_rules! kwargs {
    () => {
        ::std::vec::Vec::<(::std::string::String, $crate::serde_json::Value)>::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {
        ::std::vec![$((
            ::std::string::String::from($key),
            $crate::serde_json::json!($value),
        )),+]
    };
}

/// Commonly used types, for glob import.
pub mod prelude {
    pub use crate::backend::{Action, ActionBackend, Backend, Endpoints, RestBackend};
    pub use crate::filters::{FilterCodec, Lookup};
    pub use crate::kwargs;
    pub use crate::model::{delete_model, save_model, ApiModel};
    pub use crate::query::{Query, Record};
    pub use crate::queryset::{Manager, QuerySet, Slice};
    pub use crate::serializer::{JsonSerializer, Serializer};
    pub use crate::transport::{HttpTransport, Transport};
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    #[test]
    fn test_kwargs_empty() {
        let empty = kwargs!();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_kwargs_values() {
        let price = 12;
        let pairs = kwargs!("price__lt" => price, "tags" => ["a", "b"], "archived__isnull" => true,);
        assert_eq!(
            pairs,
            vec![
                ("price__lt".to_string(), json!(12)),
                ("tags".to_string(), json!(["a", "b"])),
                ("archived__isnull".to_string(), Value::Bool(true)),
            ]
        );
    }
}
