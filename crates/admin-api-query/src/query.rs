//! The query descriptor carried by every [`QuerySet`](crate::queryset::QuerySet).
//!
//! A [`Query`] is plain data: filters, ordering, relation hints, pending
//! create/update payloads, and an optional result window. Backends translate
//! it into a request; nothing in here talks to the network.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::filters::FlatFilters;

/// A single wire record: field name to value.
pub type Record = Map<String, Value>;

/// Everything needed to describe one remote operation.
///
/// `offset` is the index of the first row and `limit` is the absolute
/// position one past the last row, so `[2:5]` is stored as `offset = 2`,
/// `limit = 5`. Servers are expected to slice `rows[offset:limit]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Query {
    /// Ordering terms; a leading `-` means descending.
    pub order_by: Vec<String>,
    /// Flat lookup keys, e.g. `price__gte`.
    pub filters: FlatFilters,
    /// Relation names the server may join eagerly.
    pub select_related: BTreeSet<String>,
    /// Records to create.
    pub data: Vec<Record>,
    /// Field assignments for an update.
    pub update: Record,
    /// Exclusive end of the result window.
    pub limit: Option<usize>,
    /// Start of the result window.
    pub offset: Option<usize>,
}

impl Query {
    /// Creates an empty descriptor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Narrows the result window to `[start:stop]` relative to the current one.
    ///
    /// Bounds compose: slicing `[2:8]` and then `[1:3]` yields the absolute
    /// window `[3:5]`. A stop beyond the current window is clamped to it, and
    /// a start beyond the stop collapses the window to empty.
    pub fn set_limits(&mut self, start: Option<usize>, stop: Option<usize>) {
        let base = self.offset.unwrap_or(0);
        if let Some(stop) = stop {
            let stop = base.saturating_add(stop);
            self.limit = Some(self.limit.map_or(stop, |current| current.min(stop)));
        }
        if let Some(start) = start {
            let start = base.saturating_add(start);
            self.offset = Some(self.limit.map_or(start, |limit| start.min(limit)));
        }
    }

    /// Removes the result window.
    pub fn clear_limits(&mut self) {
        self.limit = None;
        self.offset = None;
    }

    /// Returns `true` if a result window is set.
    pub const fn is_windowed(&self) -> bool {
        self.limit.is_some() || self.offset.is_some()
    }

    /// Adds filters, overwriting existing keys.
    pub fn add_filters<I, K, V>(&mut self, lookups: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.filters
            .extend(lookups.into_iter().map(|(k, v)| (k.into(), v.into())));
    }

    /// Replaces the ordering terms.
    pub fn set_ordering<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.order_by = fields.into_iter().map(Into::into).collect();
    }

    /// Adds relation hints.
    pub fn add_select_related<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select_related
            .extend(fields.into_iter().map(Into::into));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_query_is_empty() {
        let q = Query::new();
        assert!(q.filters.is_empty());
        assert!(q.order_by.is_empty());
        assert!(q.select_related.is_empty());
        assert!(q.data.is_empty());
        assert!(q.update.is_empty());
        assert!(!q.is_windowed());
    }

    #[test]
    fn test_set_limits_from_empty() {
        let mut q = Query::new();
        q.set_limits(Some(0), Some(5));
        assert_eq!(q.offset, Some(0));
        assert_eq!(q.limit, Some(5));
    }

    #[test]
    fn test_set_limits_single_index() {
        let mut q = Query::new();
        q.set_limits(Some(3), Some(4));
        assert_eq!((q.offset, q.limit), (Some(3), Some(4)));
    }

    #[test]
    fn test_set_limits_open_ended() {
        let mut q = Query::new();
        q.set_limits(Some(10), None);
        assert_eq!((q.offset, q.limit), (Some(10), None));

        let mut q = Query::new();
        q.set_limits(None, Some(7));
        assert_eq!((q.offset, q.limit), (None, Some(7)));
    }

    #[test]
    fn test_set_limits_composes() {
        let mut q = Query::new();
        q.set_limits(Some(2), Some(8));
        q.set_limits(Some(1), Some(3));
        assert_eq!((q.offset, q.limit), (Some(3), Some(5)));
    }

    #[test]
    fn test_set_limits_clamps_to_outer_window() {
        let mut q = Query::new();
        q.set_limits(Some(2), Some(4));
        q.set_limits(Some(1), Some(10));
        assert_eq!((q.offset, q.limit), (Some(3), Some(4)));

        q.set_limits(Some(5), None);
        assert_eq!((q.offset, q.limit), (Some(4), Some(4)));
    }

    #[test]
    fn test_clear_limits() {
        let mut q = Query::new();
        q.set_limits(Some(1), Some(2));
        q.clear_limits();
        assert!(!q.is_windowed());
    }

    #[test]
    fn test_add_filters_overwrites() {
        let mut q = Query::new();
        q.add_filters([("name", "socks")]);
        q.add_filters([("name", "shoes")]);
        assert_eq!(q.filters.len(), 1);
        assert_eq!(q.filters["name"], json!("shoes"));
    }

    #[test]
    fn test_set_ordering_replaces() {
        let mut q = Query::new();
        q.set_ordering(["-price", "id"]);
        q.set_ordering(["name"]);
        assert_eq!(q.order_by, vec!["name"]);
    }

    #[test]
    fn test_select_related_is_a_set() {
        let mut q = Query::new();
        q.add_select_related(["category", "supplier"]);
        q.add_select_related(["category"]);
        assert_eq!(q.select_related.len(), 2);
    }
}
