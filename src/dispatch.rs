//! Handler chain dispatch.
//!
//! Each persistence operation is backed by an ordered, append-only chain of
//! handlers. Read operations (`find`, `findAll`, `count`) walk the chain until
//! one handler produces a definitive result; write operations (`save`,
//! `remove`) run every registered handler in order, because each persistence
//! handler is expected to perform its own durability action. The first
//! handler error aborts the rest of the chain in either mode.
//!
//! A handler resolves exactly once by returning: `Ok(Some(_))` is a result,
//! `Ok(None)` defers to the next handler, `Err(_)` aborts the chain and
//! reaches the caller verbatim.

use std::future::Future;
use std::ops::Index;

use async_trait::async_trait;
use tracing::trace;

use crate::core::{Attrs, HandlerResult, ModelError, Result, Value};
use crate::record::Record;

/// Default page size attached to a collection when the query names none.
pub const DEFAULT_LIMIT: u64 = 50;

/// Relation context a query can carry. Relation-aware handlers use it to
/// scope results; the core passes it through untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    pub name: String,
    pub foreign_key: Option<String>,
}

impl Relation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            foreign_key: None,
        }
    }

    pub fn foreign_key(mut self, key: impl Into<String>) -> Self {
        self.foreign_key = Some(key.into());
        self
    }
}

/// Open-ended query passed to read handlers.
///
/// A bare value (`Query::from(42)`) is shorthand for "match the primary key"
/// and is normalized to a criteria entry under the primary-key attribute name
/// before any handler sees it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    id: Option<Value>,
    pub criteria: Attrs,
    pub relation: Option<Relation>,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Primary-key shorthand; resolved against the model's primary attribute
    /// at dispatch time.
    pub fn by_id(id: impl Into<Value>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.criteria.insert(key.into(), value.into());
        self
    }

    pub fn related(mut self, relation: Relation) -> Self {
        self.relation = Some(relation);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.criteria.get(key)
    }

    /// Fold the primary-key shorthand into the criteria map.
    pub(crate) fn normalize(mut self, primary_key: Option<&str>) -> Result<Self> {
        if let Some(id) = self.id.take() {
            let key = primary_key.ok_or(ModelError::NoPrimaryKey)?;
            self.criteria.insert(key.to_string(), id);
        }
        Ok(self)
    }
}

impl From<i64> for Query {
    fn from(id: i64) -> Self {
        Self::by_id(id)
    }
}

impl From<&str> for Query {
    fn from(id: &str) -> Self {
        Self::by_id(id)
    }
}

impl From<Attrs> for Query {
    fn from(criteria: Attrs) -> Self {
        Self {
            criteria,
            ..Self::default()
        }
    }
}

// ============================================================================
// Handler protocol
// ============================================================================

/// Resolves a single-record lookup. `Ok(None)` defers to the next handler.
#[async_trait]
pub trait FindHandler: Send + Sync {
    async fn find(&self, query: &Query) -> HandlerResult<Option<Attrs>>;
}

/// Resolves a collection lookup. An empty collection defers to the next
/// handler; only a non-empty one is definitive.
#[async_trait]
pub trait FindAllHandler: Send + Sync {
    async fn find_all(&self, query: &Query) -> HandlerResult<Option<Vec<Attrs>>>;
}

/// Resolves a count. Any returned count is definitive.
#[async_trait]
pub trait CountHandler: Send + Sync {
    async fn count(&self, query: &Query) -> HandlerResult<Option<u64>>;
}

/// Persists the changed-attribute snapshot of a record. Every registered
/// save handler runs on every save. A handler may return attributes (such as
/// a server-assigned key) to merge into the record without dirtying it.
#[async_trait]
pub trait SaveHandler: Send + Sync {
    async fn save(&self, changed: &Attrs) -> HandlerResult<Option<Attrs>>;
}

/// Deletes the record from one store. Every registered remove handler runs
/// on every remove.
#[async_trait]
pub trait RemoveHandler: Send + Sync {
    async fn remove(&self) -> HandlerResult<()>;
}

// Closure adapters, so plain async closures can register as handlers.

pub struct FindFn<F>(pub F);

#[async_trait]
impl<F, Fut> FindHandler for FindFn<F>
where
    F: Fn(Query) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult<Option<Attrs>>> + Send + 'static,
{
    async fn find(&self, query: &Query) -> HandlerResult<Option<Attrs>> {
        (self.0)(query.clone()).await
    }
}

pub struct FindAllFn<F>(pub F);

#[async_trait]
impl<F, Fut> FindAllHandler for FindAllFn<F>
where
    F: Fn(Query) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult<Option<Vec<Attrs>>>> + Send + 'static,
{
    async fn find_all(&self, query: &Query) -> HandlerResult<Option<Vec<Attrs>>> {
        (self.0)(query.clone()).await
    }
}

pub struct CountFn<F>(pub F);

#[async_trait]
impl<F, Fut> CountHandler for CountFn<F>
where
    F: Fn(Query) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult<Option<u64>>> + Send + 'static,
{
    async fn count(&self, query: &Query) -> HandlerResult<Option<u64>> {
        (self.0)(query.clone()).await
    }
}

pub struct SaveFn<F>(pub F);

#[async_trait]
impl<F, Fut> SaveHandler for SaveFn<F>
where
    F: Fn(Attrs) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult<Option<Attrs>>> + Send + 'static,
{
    async fn save(&self, changed: &Attrs) -> HandlerResult<Option<Attrs>> {
        (self.0)(changed.clone()).await
    }
}

pub struct RemoveFn<F>(pub F);

#[async_trait]
impl<F, Fut> RemoveHandler for RemoveFn<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult<()>> + Send + 'static,
{
    async fn remove(&self) -> HandlerResult<()> {
        (self.0)().await
    }
}

// ============================================================================
// Chains
// ============================================================================

/// Per-operation handler chains owned by a model type. Append-only during
/// setup, read-only afterwards. Each walk owns its own iteration state, so
/// concurrent dispatches never share anything mutable.
pub(crate) struct HandlerChains {
    pub(crate) find: Vec<Box<dyn FindHandler>>,
    pub(crate) find_all: Vec<Box<dyn FindAllHandler>>,
    pub(crate) count: Vec<Box<dyn CountHandler>>,
    pub(crate) save: Vec<Box<dyn SaveHandler>>,
    pub(crate) remove: Vec<Box<dyn RemoveHandler>>,
}

impl HandlerChains {
    pub(crate) fn new() -> Self {
        Self {
            find: Vec::new(),
            find_all: Vec::new(),
            count: Vec::new(),
            save: Vec::new(),
            remove: Vec::new(),
        }
    }

    /// Walk the find chain; the first non-null result is definitive.
    pub(crate) async fn run_find(&self, query: &Query) -> Result<Option<Attrs>> {
        for (i, handler) in self.find.iter().enumerate() {
            trace!("find handler {} of {}", i + 1, self.find.len());
            if let Some(attrs) = handler.find(query).await? {
                return Ok(Some(attrs));
            }
        }
        Ok(None)
    }

    /// Walk the findAll chain; the first non-empty collection is definitive.
    /// An absent final result coerces to an empty collection.
    pub(crate) async fn run_find_all(&self, query: &Query) -> Result<Vec<Attrs>> {
        let mut last: Option<Vec<Attrs>> = None;
        for (i, handler) in self.find_all.iter().enumerate() {
            trace!("findAll handler {} of {}", i + 1, self.find_all.len());
            let result = handler.find_all(query).await?;
            if result.as_ref().is_some_and(|rows| !rows.is_empty()) {
                return Ok(result.unwrap_or_default());
            }
            last = result;
        }
        Ok(last.unwrap_or_default())
    }

    /// Walk the count chain; any returned count is definitive. An absent
    /// final result coerces to zero.
    pub(crate) async fn run_count(&self, query: &Query) -> Result<u64> {
        for (i, handler) in self.count.iter().enumerate() {
            trace!("count handler {} of {}", i + 1, self.count.len());
            if let Some(count) = handler.count(query).await? {
                return Ok(count);
            }
        }
        Ok(0)
    }

    /// Run every save handler in order, halting on the first error.
    /// Collects any attribute maps the handlers returned for merging.
    pub(crate) async fn run_save(&self, changed: &Attrs) -> Result<Vec<Attrs>> {
        let mut merges = Vec::new();
        for (i, handler) in self.save.iter().enumerate() {
            trace!("save handler {} of {}", i + 1, self.save.len());
            if let Some(attrs) = handler.save(changed).await? {
                merges.push(attrs);
            }
        }
        Ok(merges)
    }

    /// Run every remove handler in order, halting on the first error.
    pub(crate) async fn run_remove(&self) -> Result<()> {
        for (i, handler) in self.remove.iter().enumerate() {
            trace!("remove handler {} of {}", i + 1, self.remove.len());
            handler.remove().await?;
        }
        Ok(())
    }
}

// ============================================================================
// Collection
// ============================================================================

/// Result of `findAll`: hydrated records plus the pagination context the
/// query ran under.
#[derive(Debug)]
pub struct Collection {
    records: Vec<Record>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

impl Collection {
    pub(crate) fn new(records: Vec<Record>, query: &Query) -> Self {
        let total = records.len() as u64;
        Self {
            records,
            total,
            offset: query.offset.unwrap_or(0),
            limit: query.limit.unwrap_or(DEFAULT_LIMIT),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}

impl Index<usize> for Collection {
    type Output = Record;

    fn index(&self, index: usize) -> &Record {
        &self.records[index]
    }
}

impl IntoIterator for Collection {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs;

    #[test]
    fn id_shorthand_normalizes_to_primary_criteria() {
        let query = Query::by_id(7).normalize(Some("id")).unwrap();
        assert_eq!(query.get("id"), Some(&Value::Integer(7)));
    }

    #[test]
    fn id_shorthand_without_primary_key_fails() {
        let err = Query::by_id(7).normalize(None).unwrap_err();
        assert!(matches!(err, ModelError::NoPrimaryKey));
    }

    #[test]
    fn criteria_queries_pass_through_normalization() {
        let query = Query::from(attrs! { "name" => "alex" })
            .normalize(Some("id"))
            .unwrap();
        assert_eq!(query.get("name"), Some(&Value::Text("alex".into())));
        assert_eq!(query.get("id"), None);
    }

    #[tokio::test]
    async fn empty_chains_resolve_to_absent_results() {
        let chains = HandlerChains::new();
        let query = Query::new();
        assert_eq!(chains.run_find(&query).await.unwrap(), None);
        assert!(chains.run_find_all(&query).await.unwrap().is_empty());
        assert_eq!(chains.run_count(&query).await.unwrap(), 0);
        chains.run_save(&Attrs::new()).await.unwrap();
        chains.run_remove().await.unwrap();
    }
}
