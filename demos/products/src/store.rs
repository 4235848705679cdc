//! An in-memory product table with lookup evaluation.
//!
//! The store understands the same flat lookup keys the client sends
//! (`price__gte`, `category__isnull`, ...), so both protocol views can share
//! it: the REST view passes query parameters straight through, the action
//! view flattens its filter tree first.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};
use std::sync::{PoisonError, RwLock};

use admin_api_core::{ApiError, ApiResult};
use admin_api_query::filters::{FlatFilters, Lookup, LOOKUP_SEP};
use admin_api_query::query::Record;
use serde_json::{json, Value};

/// Which rows an operation applies to, and in what order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub filters: FlatFilters,
    pub order_by: Vec<String>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

/// Rows keyed by an integer `id` assigned on insert.
#[derive(Debug)]
pub struct ProductStore {
    rows: RwLock<Vec<Record>>,
    next_id: AtomicI64,
}

impl ProductStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Creates a store holding a handful of products.
    pub fn with_sample_data() -> Self {
        let store = Self::new();
        let samples = [
            json!({"name": "socks", "price": 4.5, "category": "clothing"}),
            json!({"name": "hat", "price": 12.0, "category": "clothing"}),
            json!({"name": "mug", "price": 8.0, "category": "kitchen"}),
            json!({"name": "kettle", "price": 30.0, "category": "kitchen"}),
            json!({"name": "lamp", "price": 22.5, "category": null}),
        ];
        store.insert(
            samples
                .into_iter()
                .filter_map(|v| match v {
                    Value::Object(record) => Some(record),
                    _ => None,
                })
                .collect(),
        );
        store
    }

    /// Rows matching `selection`, ordered and windowed.
    pub fn select(&self, selection: &Selection) -> ApiResult<Vec<Record>> {
        let rows = self.rows.read().unwrap_or_else(PoisonError::into_inner);
        let picked = pick(&rows, selection)?;
        Ok(picked.into_iter().map(|i| rows[i].clone()).collect())
    }

    /// Number of rows `select` would return.
    pub fn count(&self, selection: &Selection) -> ApiResult<u64> {
        let rows = self.rows.read().unwrap_or_else(PoisonError::into_inner);
        Ok(pick(&rows, selection)?.len() as u64)
    }

    /// Appends `records`, assigning each a fresh `id`. Returns the stored rows.
    pub fn insert(&self, records: Vec<Record>) -> Vec<Record> {
        let mut rows = self.rows.write().unwrap_or_else(PoisonError::into_inner);
        let mut created = Vec::with_capacity(records.len());
        for mut record in records {
            let id = self.next_id.fetch_add(1, AtomicOrdering::Relaxed);
            record.insert("id".to_string(), json!(id));
            rows.push(record.clone());
            created.push(record);
        }
        created
    }

    /// Assigns `fields` on every selected row. The `id` field is never changed.
    pub fn update(&self, selection: &Selection, fields: &Record) -> ApiResult<u64> {
        let mut rows = self.rows.write().unwrap_or_else(PoisonError::into_inner);
        let picked = pick(&rows, selection)?;
        for &i in &picked {
            for (name, value) in fields {
                if name != "id" {
                    rows[i].insert(name.clone(), value.clone());
                }
            }
        }
        Ok(picked.len() as u64)
    }

    /// Removes every selected row.
    pub fn delete(&self, selection: &Selection) -> ApiResult<u64> {
        let mut rows = self.rows.write().unwrap_or_else(PoisonError::into_inner);
        let mut picked = pick(&rows, selection)?;
        picked.sort_unstable_by(|a, b| b.cmp(a));
        for &i in &picked {
            rows.remove(i);
        }
        Ok(picked.len() as u64)
    }
}

impl Default for ProductStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Indices of the rows selected, in result order.
fn pick(rows: &[Record], selection: &Selection) -> ApiResult<Vec<usize>> {
    let predicates = selection
        .filters
        .iter()
        .map(|(key, expected)| Predicate::parse(key, expected))
        .collect::<ApiResult<Vec<_>>>()?;

    let mut picked: Vec<usize> = (0..rows.len())
        .filter(|&i| predicates.iter().all(|p| p.test(&rows[i])))
        .collect();

    if !selection.order_by.is_empty() {
        picked.sort_by(|&a, &b| {
            selection
                .order_by
                .iter()
                .map(|term| {
                    let (field, descending) = term
                        .strip_prefix('-')
                        .map_or((term.as_str(), false), |f| (f, true));
                    let ord = compare(field_value(&rows[a], &[field]), field_value(&rows[b], &[field]))
                        .unwrap_or(Ordering::Equal);
                    if descending {
                        ord.reverse()
                    } else {
                        ord
                    }
                })
                .find(|ord| ord.is_ne())
                .unwrap_or(Ordering::Equal)
        });
    }

    let start = selection.offset.unwrap_or(0).min(picked.len());
    let stop = selection.limit.unwrap_or(picked.len()).clamp(start, picked.len());
    Ok(picked[start..stop].to_vec())
}

/// One parsed lookup: a field path, an operator, and an operand.
struct Predicate<'a> {
    path: Vec<&'a str>,
    lookup: Lookup,
    expected: &'a Value,
}

impl<'a> Predicate<'a> {
    fn parse(key: &'a str, expected: &'a Value) -> ApiResult<Self> {
        let mut path: Vec<&str> = key.split(LOOKUP_SEP).collect();
        if path.iter().any(|segment| segment.is_empty()) {
            return Err(ApiError::MalformedKey(key.to_string()));
        }
        let lookup = match path.last().and_then(|last| Lookup::parse(last)) {
            Some(lookup) if path.len() > 1 => {
                path.pop();
                lookup
            }
            _ => Lookup::Exact,
        };
        Ok(Self {
            path,
            lookup,
            expected,
        })
    }

    fn test(&self, row: &Record) -> bool {
        let actual = field_value(row, &self.path);
        // Repeated query parameters arrive as a list; any element may match.
        if let Value::Array(options) = self.expected {
            return options.iter().any(|option| self.test_one(actual, option));
        }
        self.test_one(actual, self.expected)
    }

    fn test_one(&self, actual: &Value, expected: &Value) -> bool {
        let ord = compare(actual, expected);
        match self.lookup {
            Lookup::Exact => ord == Some(Ordering::Equal),
            Lookup::Ne => ord != Some(Ordering::Equal),
            Lookup::IsNull => actual.is_null() == truthy(expected),
            Lookup::Gt => !actual.is_null() && ord == Some(Ordering::Greater),
            Lookup::Gte => !actual.is_null() && ord.is_some_and(Ordering::is_ge),
            Lookup::Lt => !actual.is_null() && ord == Some(Ordering::Less),
            Lookup::Lte => !actual.is_null() && ord.is_some_and(Ordering::is_le),
        }
    }
}

static NULL: Value = Value::Null;

fn field_value<'r>(row: &'r Record, path: &[&str]) -> &'r Value {
    let Some((first, rest)) = path.split_first() else {
        return &NULL;
    };
    let mut value = row.get(*first).unwrap_or(&NULL);
    for segment in rest {
        value = value.get(*segment).unwrap_or(&NULL);
    }
    value
}

/// Compares a stored value with an operand. Query-string operands arrive as
/// text and are read as numbers or booleans when the stored value is one.
fn compare(actual: &Value, expected: &Value) -> Option<Ordering> {
    match (actual, expected) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Null, _) => Some(Ordering::Less),
        (_, Value::Null) => Some(Ordering::Greater),
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::Number(a), Value::String(b)) => a.as_f64()?.partial_cmp(&b.parse::<f64>().ok()?),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::String(b)) => Some(a.cmp(&b.parse::<bool>().ok()?)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::String(a), other) => Some(a.as_str().cmp(other.to_string().as_str())),
        _ => None,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => matches!(s.to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Null => false,
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
