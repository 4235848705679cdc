//! Lazy, memoizing querysets over a remote collection.
//!
//! A [`QuerySet`] accumulates filters, ordering, relation hints, and a result
//! window without touching the network. Refinement methods take `&self` and
//! return a fresh queryset, so a queryset can be shared and refined without
//! surprising anyone else holding it.
//!
//! Terminal operations (`fetch_all`, `at`, `get`, `count`, `create`,
//! `update`, `delete`) each issue at most one request. The first read of the
//! full result stores it in a write-once cache; later reads on the same
//! queryset are served from it. Clones never share that cache.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use admin_api_query::prelude::*;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! struct Product { id: Option<i64>, name: String, price: f64 }
//!
//! # async fn run() -> admin_api_core::ApiResult<()> {
//! let transport = Arc::new(HttpTransport::new()?);
//! let backend = RestBackend::new(Endpoints::uniform("http://127.0.0.1:8000/products/rest/"), transport);
//! let products = Manager::new("products", JsonSerializer::<Product>::new(), backend);
//!
//! let cheap = products
//!     .filter(kwargs!("price__lt" => 10))
//!     .order_by(["-price"])
//!     .slice(Slice::range(0, 5))?;
//! for product in cheap.iter().await? {
//!     println!("{product:?}");
//! }
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::ops::{Range, RangeFrom, RangeFull, RangeTo};
use std::sync::Arc;

use admin_api_core::logging::operation_span;
use admin_api_core::{ApiError, ApiResult, ApiSettings, CollectionSettings, Protocol};
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::Instrument;

use crate::backend::{Action, ActionBackend, Backend, Extracted, RestBackend};
use crate::query::{Query, Record};
use crate::serializer::Serializer;
use crate::transport::Transport;

/// A `[start:stop:step]` window over a queryset.
///
/// Bounds are signed so that negative values can be rejected with
/// [`ApiError::InvalidSlice`] rather than wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Slice {
    /// First position, inclusive.
    pub start: Option<isize>,
    /// Last position, exclusive.
    pub stop: Option<isize>,
    /// Stride between kept positions.
    pub step: Option<isize>,
}

impl Slice {
    /// Creates a slice with the given bounds and no step.
    pub const fn new(start: Option<isize>, stop: Option<isize>) -> Self {
        Self {
            start,
            stop,
            step: None,
        }
    }

    /// `[start:stop]`.
    pub const fn range(start: isize, stop: isize) -> Self {
        Self::new(Some(start), Some(stop))
    }

    /// `[start:]`.
    pub const fn from_start(start: isize) -> Self {
        Self::new(Some(start), None)
    }

    /// `[:stop]`.
    pub const fn to(stop: isize) -> Self {
        Self::new(None, Some(stop))
    }

    /// Sets the step.
    #[must_use]
    pub const fn step(mut self, step: isize) -> Self {
        self.step = Some(step);
        self
    }

    /// Checks the bounds and converts them to positions.
    fn validate(self) -> ApiResult<(Option<usize>, Option<usize>, Option<usize>)> {
        let bound = |value: Option<isize>, what: &str| match value {
            None => Ok(None),
            Some(v) => usize::try_from(v).map(Some).map_err(|_| {
                ApiError::InvalidSlice(format!("negative {what} {v} is not supported"))
            }),
        };
        let start = bound(self.start, "start")?;
        let stop = bound(self.stop, "stop")?;
        let step = match self.step {
            None | Some(1) => None,
            Some(0) => return Err(ApiError::InvalidSlice("slice step cannot be zero".into())),
            Some(s) if s < 0 => {
                return Err(ApiError::InvalidSlice(format!(
                    "negative step {s} is not supported"
                )))
            }
            Some(s) => usize::try_from(s).ok(),
        };
        Ok((start, stop, step))
    }
}

impl From<Range<isize>> for Slice {
    fn from(r: Range<isize>) -> Self {
        Self::range(r.start, r.end)
    }
}

impl From<RangeFrom<isize>> for Slice {
    fn from(r: RangeFrom<isize>) -> Self {
        Self::new(Some(r.start), None)
    }
}

impl From<RangeTo<isize>> for Slice {
    fn from(r: RangeTo<isize>) -> Self {
        Self::to(r.end)
    }
}

impl From<RangeFull> for Slice {
    fn from(_: RangeFull) -> Self {
        Self::default()
    }
}

/// A lazy, memoizing query over a remote collection.
pub struct QuerySet<M> {
    name: Arc<str>,
    query: Query,
    step: Option<usize>,
    serializer: Arc<dyn Serializer<M>>,
    backend: Arc<dyn Backend>,
    result_cache: OnceCell<Vec<M>>,
}

impl<M> Clone for QuerySet<M> {
    /// Copies the descriptor. The result cache is not shared.
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            query: self.query.clone(),
            step: self.step,
            serializer: Arc::clone(&self.serializer),
            backend: Arc::clone(&self.backend),
            result_cache: OnceCell::new(),
        }
    }
}

impl<M> fmt::Debug for QuerySet<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySet")
            .field("name", &self.name)
            .field("query", &self.query)
            .field("step", &self.step)
            .field("backend", &self.backend)
            .field("realized", &self.result_cache.initialized())
            .finish_non_exhaustive()
    }
}

impl<M: Send + Sync + 'static> QuerySet<M> {
    /// Creates an unfiltered queryset over the collection `name`.
    pub fn new(
        name: impl Into<Arc<str>>,
        serializer: Arc<dyn Serializer<M>>,
        backend: Arc<dyn Backend>,
    ) -> Self {
        Self {
            name: name.into(),
            query: Query::new(),
            step: None,
            serializer,
            backend,
            result_cache: OnceCell::new(),
        }
    }

    /// The collection name used in logs and error messages.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The accumulated descriptor.
    pub const fn query(&self) -> &Query {
        &self.query
    }

    /// The backend requests are sent through.
    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    /// Returns `true` once the full result has been fetched.
    pub fn is_realized(&self) -> bool {
        self.result_cache.initialized()
    }

    // ── Refinement ──────────────────────────────────────────────────

    /// Returns an unrealized copy.
    #[must_use]
    pub fn all(&self) -> Self {
        self.clone()
    }

    /// Returns a copy with `lookups` merged into the filters.
    ///
    /// Keys are flat lookup keys such as `price__gte`; a repeated key
    /// replaces the earlier value.
    #[must_use]
    pub fn filter<I, K, V>(&self, lookups: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut qs = self.clone();
        qs.query.add_filters(lookups);
        qs
    }

    /// Returns a copy ordered by `fields`, replacing any earlier ordering.
    ///
    /// A leading `-` sorts descending.
    #[must_use]
    pub fn order_by<I, S>(&self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut qs = self.clone();
        qs.query.set_ordering(fields);
        qs
    }

    /// Returns a copy with `fields` added to the relation hints.
    #[must_use]
    pub fn select_related<I, S>(&self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut qs = self.clone();
        qs.query.add_select_related(fields);
        qs
    }

    /// Returns an unrealized copy windowed to `slice`.
    ///
    /// Windows compose with any window already set. A step other than 1 is
    /// applied locally to the fetched rows; steps compose by multiplication,
    /// so `[::2]` then `[::3]` keeps every sixth row.
    pub fn slice(&self, slice: impl Into<Slice>) -> ApiResult<Self> {
        let (start, stop, step) = slice.into().validate()?;
        let mut qs = self.clone();
        if qs.step.is_some() && (start.is_some() || stop.is_some()) {
            return Err(ApiError::InvalidSlice(
                "cannot re-slice a queryset that already has a step".into(),
            ));
        }
        qs.query.set_limits(start, stop);
        qs.step = match (qs.step, step) {
            (Some(outer), Some(inner)) => Some(outer.checked_mul(inner).ok_or_else(|| {
                ApiError::InvalidSlice(format!("combined step {outer} * {inner} overflows"))
            })?),
            (outer, inner) => inner.or(outer),
        };
        Ok(qs)
    }

    // ── Reads ───────────────────────────────────────────────────────

    /// Fetches the full result once and returns it. Later calls reuse it.
    pub async fn fetch_all(&self) -> ApiResult<&[M]> {
        if let Some(cached) = self.result_cache.get() {
            tracing::trace!(collection = %self.name, "serving results from cache");
            return Ok(cached.as_slice());
        }
        let rows = self.result_cache.get_or_try_init(|| self.realize()).await?;
        Ok(rows.as_slice())
    }

    /// Iterates over the result, fetching it first if needed.
    pub async fn iter(&self) -> ApiResult<std::slice::Iter<'_, M>> {
        Ok(self.fetch_all().await?.iter())
    }

    /// The number of rows in the result, fetching it first if needed.
    ///
    /// Unlike [`count`](Self::count), this reads the realized rows.
    pub async fn len(&self) -> ApiResult<usize> {
        Ok(self.fetch_all().await?.len())
    }

    /// Returns `true` if the result has no rows, fetching it first if needed.
    pub async fn is_empty(&self) -> ApiResult<bool> {
        Ok(self.fetch_all().await?.is_empty())
    }

    /// Returns `true` if `object` is in the result.
    pub async fn contains(&self, object: &M) -> ApiResult<bool>
    where
        M: PartialEq,
    {
        Ok(self.fetch_all().await?.contains(object))
    }

    /// Consumes the queryset and returns its rows.
    pub async fn into_vec(mut self) -> ApiResult<Vec<M>> {
        match self.result_cache.take() {
            Some(rows) => Ok(rows),
            None => self.realize().await,
        }
    }

    /// Returns the row at `index`.
    ///
    /// On a realized queryset this reads the cache. Otherwise it fetches the
    /// single-row window `[index:index+1]` without realizing this queryset.
    pub async fn at(&self, index: usize) -> ApiResult<M>
    where
        M: Clone,
    {
        if let Some(rows) = self.result_cache.get() {
            return rows.get(index).cloned().ok_or(ApiError::IndexOutOfRange(index));
        }
        if self.step.is_some() {
            return self
                .fetch_all()
                .await?
                .get(index)
                .cloned()
                .ok_or(ApiError::IndexOutOfRange(index));
        }

        let mut qs = self.clone();
        qs.query.set_limits(Some(index), Some(index.saturating_add(1)));
        qs.into_vec()
            .await?
            .into_iter()
            .next()
            .ok_or(ApiError::IndexOutOfRange(index))
    }

    /// Returns the first row, or `None` if there are none.
    pub async fn first(&self) -> ApiResult<Option<M>>
    where
        M: Clone,
    {
        match self.at(0).await {
            Ok(row) => Ok(Some(row)),
            Err(ApiError::IndexOutOfRange(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Returns `true` if at least one row matches.
    pub async fn exists(&self) -> ApiResult<bool>
    where
        M: Clone,
    {
        Ok(self.first().await?.is_some())
    }

    /// Returns the single row matching `lookups`.
    ///
    /// At most two rows are requested. No rows is [`ApiError::DoesNotExist`];
    /// two is [`ApiError::MultipleObjectsReturned`].
    pub async fn get<I, K, V>(&self, lookups: I) -> ApiResult<M>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut qs = self.filter(lookups);
        qs.step = None;
        qs.query.set_limits(None, Some(2));

        let mut rows = qs.into_vec().await?;
        match rows.len() {
            0 => Err(ApiError::DoesNotExist(format!(
                "{} matching query does not exist.",
                self.name
            ))),
            1 => Ok(rows.remove(0)),
            n => Err(ApiError::MultipleObjectsReturned(format!(
                "get() returned more than one {} -- it returned {n}!",
                self.name
            ))),
        }
    }

    /// Asks the server how many rows match. Never served from the cache.
    pub async fn count(&self) -> ApiResult<u64> {
        self.perform(&self.query, Action::Count)
            .await?
            .into_count()
    }

    // ── Writes ──────────────────────────────────────────────────────

    /// Creates one record from `fields` and returns the created object.
    pub async fn create<I, K, V>(&self, fields: I) -> ApiResult<M>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let record: Record = fields
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.send_create(vec![record])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                ApiError::InvalidResponse(format!(
                    "create on {} acknowledged no records",
                    self.name
                ))
            })
    }

    /// Creates every object in one request and returns what the server
    /// created. An empty input sends nothing.
    pub async fn bulk_create(&self, objects: &[M]) -> ApiResult<Vec<M>> {
        if objects.is_empty() {
            return Ok(Vec::new());
        }
        let records = objects
            .iter()
            .map(|object| self.serializer.serialize(object))
            .collect::<ApiResult<Vec<_>>>()?;
        self.send_create(records).await
    }

    /// Applies `fields` to every matching row and returns how many changed.
    ///
    /// No fields means nothing to change: `0` is returned without a request.
    pub async fn update<I, K, V>(&self, fields: I) -> ApiResult<u64>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.ensure_unsliced("update")?;
        let mut query = self.query.clone();
        query
            .update
            .extend(fields.into_iter().map(|(k, v)| (k.into(), v.into())));
        if query.update.is_empty() {
            return Ok(0);
        }
        self.perform(&query, Action::Update).await?.into_count()
    }

    /// Deletes every matching row and returns how many were removed.
    pub async fn delete(&self) -> ApiResult<u64> {
        self.ensure_unsliced("delete")?;
        self.perform(&self.query, Action::Delete)
            .await?
            .into_count()
    }

    // ── Internals ───────────────────────────────────────────────────

    /// Writes apply to every matching row, so a window cannot scope them.
    fn ensure_unsliced(&self, operation: &str) -> ApiResult<()> {
        if self.query.is_windowed() || self.step.is_some() {
            return Err(ApiError::InvalidSlice(format!(
                "Cannot {operation} a query once a slice has been taken."
            )));
        }
        Ok(())
    }

    async fn send_create(&self, records: Vec<Record>) -> ApiResult<Vec<M>> {
        let mut query = self.query.clone();
        query.data.extend(records);
        let rows = self.perform(&query, Action::Create).await?.into_records()?;
        self.deserialize_all(&rows)
    }

    async fn realize(&self) -> ApiResult<Vec<M>> {
        let rows = self.perform(&self.query, Action::List).await?.into_records()?;
        let objects = self.deserialize_all(&rows)?;
        Ok(match self.step {
            Some(step) => objects.into_iter().step_by(step).collect(),
            None => objects,
        })
    }

    fn deserialize_all(&self, rows: &[Value]) -> ApiResult<Vec<M>> {
        rows.iter()
            .map(|row| self.serializer.deserialize(row))
            .collect()
    }

    /// One round trip: request, then extract.
    async fn perform(&self, query: &Query, action: Action) -> ApiResult<Extracted> {
        let span = operation_span(&self.name, action.as_str());
        async {
            let raw = self.backend.request(query, action).await?;
            let extracted = self.backend.extract(raw, action)?;
            match &extracted {
                Extracted::Records(rows) => tracing::debug!(rows = rows.len(), "received records"),
                Extracted::Count(n) => tracing::debug!(count = n, "received count"),
            }
            Ok::<_, ApiError>(extracted)
        }
        .instrument(span)
        .await
    }
}

/// The entry point for querying one remote collection.
///
/// A manager holds no query state; every method starts from a fresh
/// [`QuerySet`].
pub struct Manager<M> {
    name: Arc<str>,
    serializer: Arc<dyn Serializer<M>>,
    backend: Arc<dyn Backend>,
}

impl<M> Clone for Manager<M> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            serializer: Arc::clone(&self.serializer),
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<M> fmt::Debug for Manager<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Manager")
            .field("name", &self.name)
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

impl<M: Send + Sync + 'static> Manager<M> {
    /// Creates a manager for the collection `name`.
    pub fn new(
        name: impl Into<Arc<str>>,
        serializer: impl Serializer<M> + 'static,
        backend: impl Backend + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            serializer: Arc::new(serializer),
            backend: Arc::new(backend),
        }
    }

    /// Creates a manager whose backend is chosen by `settings.protocol`.
    pub fn from_settings(
        name: impl Into<Arc<str>>,
        settings: &CollectionSettings,
        transport: Arc<dyn Transport>,
        serializer: impl Serializer<M> + 'static,
    ) -> Self {
        let backend: Arc<dyn Backend> = match settings.protocol {
            Protocol::Action => Arc::new(ActionBackend::new(settings.url.clone(), transport)),
            Protocol::Rest => Arc::new(RestBackend::from_settings(settings, transport)),
        };
        Self {
            name: name.into(),
            serializer: Arc::new(serializer),
            backend,
        }
    }

    /// Creates a manager for a collection configured in `settings`.
    pub fn from_registry(
        name: &str,
        settings: &ApiSettings,
        transport: Arc<dyn Transport>,
        serializer: impl Serializer<M> + 'static,
    ) -> ApiResult<Self> {
        let collection = settings.collection(name).ok_or_else(|| {
            ApiError::ConfigurationError(format!("no collection named {name:?} is configured"))
        })?;
        Ok(Self::from_settings(name, collection, transport, serializer))
    }

    /// The collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a fresh, unfiltered queryset.
    pub fn all(&self) -> QuerySet<M> {
        QuerySet::new(
            Arc::clone(&self.name),
            Arc::clone(&self.serializer),
            Arc::clone(&self.backend),
        )
    }

    /// Shortcut for `all().filter(lookups)`.
    pub fn filter<I, K, V>(&self, lookups: I) -> QuerySet<M>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.all().filter(lookups)
    }

    /// Shortcut for `all().order_by(fields)`.
    pub fn order_by<I, S>(&self, fields: I) -> QuerySet<M>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.all().order_by(fields)
    }

    /// Shortcut for `all().get(lookups)`.
    pub async fn get<I, K, V>(&self, lookups: I) -> ApiResult<M>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.all().get(lookups).await
    }

    /// Shortcut for `all().create(fields)`.
    pub async fn create<I, K, V>(&self, fields: I) -> ApiResult<M>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.all().create(fields).await
    }

    /// Shortcut for `all().bulk_create(objects)`.
    pub async fn bulk_create(&self, objects: &[M]) -> ApiResult<Vec<M>> {
        self.all().bulk_create(objects).await
    }

    /// Shortcut for `all().count()`.
    pub async fn count(&self) -> ApiResult<u64> {
        self.all().count().await
    }
}
