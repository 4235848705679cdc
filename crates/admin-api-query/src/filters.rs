//! Lookups and the flat-key ⇄ nested-tree filter codec.
//!
//! Querysets accumulate filters as flat lookup keys such as `price__gte` or
//! `category__name`. The action protocol sends them as a nested tree keyed by
//! field-path segment, with an operator leaf at the bottom:
//!
//! ```text
//! {"price__gte": 10, "name": "socks"}
//!     ⇄
//! {"price": {"gte": 10}, "name": {"exact": "socks"}}
//! ```
//!
//! [`FilterCodec::unflatten`] builds the tree; [`FilterCodec::flatten`] walks it
//! back into flat keys. A key whose last segment is not a recognized
//! [`Lookup`] is a field path, and equality is implied.
//!
//! # Examples
//!
//! ```
//! use admin_api_query::filters::FilterCodec;
//! use serde_json::json;
//! use std::collections::BTreeMap;
//!
//! let codec = FilterCodec::new(".").unwrap();
//! let flat: BTreeMap<String, serde_json::Value> =
//!     [("price.gte".to_string(), json!(10)), ("name".to_string(), json!("socks"))]
//!         .into_iter()
//!         .collect();
//!
//! let tree = codec.unflatten(&flat).unwrap();
//! assert_eq!(
//!     serde_json::Value::Object(tree.clone()),
//!     json!({"price": {"gte": 10}, "name": {"exact": "socks"}})
//! );
//!
//! let back = codec.flatten(&tree);
//! assert_eq!(back["name.exact"], json!("socks"));
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use admin_api_core::{ApiError, ApiResult};
use serde_json::{Map, Value};

/// The separator between field-path segments and the trailing lookup.
pub const LOOKUP_SEP: &str = "__";

/// A nested filter tree as sent over the wire.
pub type FilterTree = Map<String, Value>;

/// Flat lookup keys mapped to their values.
pub type FlatFilters = BTreeMap<String, Value>;

/// A comparison operator applied to a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lookup {
    /// Equality (`exact`). Implied when a key has no recognized suffix.
    Exact,
    /// Inequality (`ne`).
    Ne,
    /// NULL test (`isnull`).
    IsNull,
    /// Greater than or equal (`gte`).
    Gte,
    /// Greater than (`gt`).
    Gt,
    /// Less than or equal (`lte`).
    Lte,
    /// Less than (`lt`).
    Lt,
}

impl Lookup {
    /// Every recognized lookup.
    pub const ALL: [Self; 7] = [
        Self::Exact,
        Self::Ne,
        Self::IsNull,
        Self::Gte,
        Self::Gt,
        Self::Lte,
        Self::Lt,
    ];

    /// The lookup's wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Ne => "ne",
            Self::IsNull => "isnull",
            Self::Gte => "gte",
            Self::Gt => "gt",
            Self::Lte => "lte",
            Self::Lt => "lt",
        }
    }

    /// Parses a wire name, returning `None` for anything unrecognized.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|lookup| lookup.as_str() == name)
    }
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Lookup {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ApiError::MalformedKey(s.to_string()))
    }
}

/// Converts between flat lookup keys and nested filter trees.
///
/// The codec is stateless apart from its separator, which is fixed per
/// instance. The default separator is [`LOOKUP_SEP`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCodec {
    separator: String,
}

impl Default for FilterCodec {
    fn default() -> Self {
        Self {
            separator: LOOKUP_SEP.to_string(),
        }
    }
}

impl FilterCodec {
    /// Creates a codec joining segments with `separator`.
    ///
    /// An empty separator is a [`ApiError::ConfigurationError`].
    pub fn new(separator: impl Into<String>) -> ApiResult<Self> {
        let separator = separator.into();
        if separator.is_empty() {
            return Err(ApiError::ConfigurationError(
                "lookup separator must not be empty".into(),
            ));
        }
        Ok(Self { separator })
    }

    /// The separator between segments.
    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Lazily walks `tree` depth-first, yielding one `(flat key, value)` per leaf.
    pub fn leaves<'a>(&'a self, tree: &'a FilterTree) -> Leaves<'a> {
        Leaves {
            separator: &self.separator,
            stack: vec![tree.iter()],
            path: Vec::new(),
        }
    }

    /// Flattens a nested tree into flat lookup keys.
    pub fn flatten(&self, tree: &FilterTree) -> FlatFilters {
        self.leaves(tree)
            .map(|(key, value)| (key, value.clone()))
            .collect()
    }

    /// Builds a nested tree from flat lookup keys.
    ///
    /// Later keys win when two keys address the same node.
    pub fn unflatten<'a, I>(&self, filters: I) -> ApiResult<FilterTree>
    where
        I: IntoIterator<Item = (&'a String, &'a Value)>,
    {
        let mut tree = FilterTree::new();
        for (key, value) in filters {
            let segments = self.split(key)?;
            let Some((last, path)) = segments.split_last() else {
                return Err(ApiError::MalformedKey(key.clone()));
            };

            let mut node = &mut tree;
            for name in path {
                node = child_node(node, name);
            }

            if Lookup::parse(last).is_some() {
                node.insert((*last).to_string(), value.clone());
            } else {
                child_node(node, last).insert(Lookup::Exact.as_str().to_string(), value.clone());
            }
        }
        Ok(tree)
    }

    /// Splits a key into segments, rejecting empty keys and empty segments.
    fn split<'k>(&self, key: &'k str) -> ApiResult<Vec<&'k str>> {
        if key.is_empty() {
            return Err(ApiError::MalformedKey(key.to_string()));
        }
        let segments: Vec<&str> = key.split(self.separator.as_str()).collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(ApiError::MalformedKey(key.to_string()));
        }
        Ok(segments)
    }
}

/// Returns the subtree under `name`, replacing a leaf value if one is there.
fn child_node<'t>(node: &'t mut FilterTree, name: &str) -> &'t mut FilterTree {
    let slot = node
        .entry(name.to_string())
        .or_insert_with(|| Value::Object(FilterTree::new()));
    if !slot.is_object() {
        *slot = Value::Object(FilterTree::new());
    }
    match slot {
        Value::Object(children) => children,
        _ => unreachable!("slot was normalized to an object"),
    }
}

/// Depth-first iterator over the leaves of a [`FilterTree`].
///
/// Created by [`FilterCodec::leaves`].
#[derive(Debug)]
pub struct Leaves<'a> {
    separator: &'a str,
    stack: Vec<serde_json::map::Iter<'a>>,
    path: Vec<&'a str>,
}

impl<'a> Iterator for Leaves<'a> {
    type Item = (String, &'a Value);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let level = self.stack.last_mut()?;
            match level.next() {
                Some((name, Value::Object(children))) => {
                    self.path.push(name);
                    self.stack.push(children.iter());
                }
                Some((name, value)) => {
                    let mut key = self.path.join(self.separator);
                    if !key.is_empty() {
                        key.push_str(self.separator);
                    }
                    key.push_str(name);
                    return Some((key, value));
                }
                None => {
                    self.stack.pop();
                    self.path.pop();
                }
            }
        }
    }
}

/// Flattens `tree` with the default codec.
pub fn flatten(tree: &FilterTree) -> FlatFilters {
    FilterCodec::default().flatten(tree)
}

/// Unflattens `filters` with the default codec.
pub fn unflatten(filters: &FlatFilters) -> ApiResult<FilterTree> {
    FilterCodec::default().unflatten(filters)
}
