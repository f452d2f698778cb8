use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::adapt::CallStyle;
use crate::core::{Attrs, Result};
use crate::dispatch::{Collection, HandlerChains, Query};
use crate::events::{Event, EventBus, Observable};
use crate::record::Record;
use crate::schema::attr::AttrDef;
use crate::validate::ValidatorFn;

/// Immutable descriptor of a declared record type: attribute schema, primary
/// key, per-operation handler chains, validator list, and the type-level
/// event bus. Built once by [`ModelBuilder`](crate::schema::ModelBuilder) and
/// shared read-only behind an `Arc`; every record holds a reference to it.
///
/// The read operations (`find`, `find_all`, `count`) live here because they
/// are class-level in nature: they take a query, not an instance.
pub struct ModelType {
    handle: String,
    display_name: String,
    attrs: Vec<(String, AttrDef)>,
    index: HashMap<String, usize>,
    primary: Option<String>,
    validators: Vec<ValidatorFn>,
    chains: HandlerChains,
    call_style: CallStyle,
    bus: EventBus,
}

impl ModelType {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        handle: String,
        attrs: Vec<(String, AttrDef)>,
        index: HashMap<String, usize>,
        primary: Option<String>,
        validators: Vec<ValidatorFn>,
        chains: HandlerChains,
        call_style: CallStyle,
        bus: EventBus,
    ) -> Self {
        let display_name = capitalize(&handle);
        Self {
            handle,
            display_name,
            attrs,
            index,
            primary,
            validators,
            chains,
            call_style,
            bus,
        }
    }

    /// The lowercase handle the type was declared with.
    pub fn handle(&self) -> &str {
        &self.handle
    }

    /// Capitalized display name, e.g. `"user"` becomes `"User"`.
    pub fn name(&self) -> &str {
        &self.display_name
    }

    /// Name of the attribute flagged primary, if one was declared.
    pub fn primary_key(&self) -> Option<&str> {
        self.primary.as_deref()
    }

    pub fn attr(&self, name: &str) -> Option<&AttrDef> {
        self.index.get(name).map(|&i| &self.attrs[i].1)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Declared attributes in declaration order.
    pub fn attrs(&self) -> impl Iterator<Item = (&str, &AttrDef)> {
        self.attrs.iter().map(|(name, def)| (name.as_str(), def))
    }

    pub fn attr_names(&self) -> impl Iterator<Item = &str> {
        self.attrs.iter().map(|(name, _)| name.as_str())
    }

    pub(crate) fn validators(&self) -> &[ValidatorFn] {
        &self.validators
    }

    pub(crate) fn chains(&self) -> &HandlerChains {
        &self.chains
    }

    /// The calling convention declared at build time.
    pub fn call_style(&self) -> CallStyle {
        self.call_style
    }

    /// Construct a new record of this type. Initial values are written raw:
    /// they represent given state, not tracked changes.
    pub fn create(self: &Arc<Self>, attrs: Attrs) -> Record {
        Record::new(self.clone(), attrs)
    }

    /// Construct a record from already-persisted attributes. The dirty set
    /// is cleared, since the values mirror the store.
    pub fn hydrate(self: &Arc<Self>, attrs: Attrs) -> Record {
        let mut record = Record::new(self.clone(), attrs);
        record.mark_clean();
        record
    }

    /// Look up a single record. The query walks the find chain in
    /// registration order; the first handler to return attributes settles
    /// the call, a handler error aborts it, and exhaustion resolves to
    /// `None` without error.
    pub async fn find(self: &Arc<Self>, query: impl Into<Query>) -> Result<Option<Record>> {
        let query = query.into().normalize(self.primary_key())?;
        debug!("{}: find", self.display_name);
        self.emit(
            "before find",
            &Event::BeforeFind {
                query: query.clone(),
            },
        );
        let found = self.chains.run_find(&query).await?;
        self.emit(
            "after find",
            &Event::AfterFind {
                result: found.clone(),
            },
        );
        Ok(found.map(|attrs| self.hydrate(attrs)))
    }

    /// Look up a collection. The first handler to return a non-empty
    /// collection settles the call; an absent result hydrates to an empty
    /// collection carrying the query's pagination context.
    pub async fn find_all(self: &Arc<Self>, query: impl Into<Query>) -> Result<Collection> {
        let query = query.into().normalize(self.primary_key())?;
        debug!("{}: findAll", self.display_name);
        self.emit(
            "before findAll",
            &Event::BeforeFindAll {
                query: query.clone(),
            },
        );
        let rows = self.chains.run_find_all(&query).await?;
        self.emit(
            "after findAll",
            &Event::AfterFindAll {
                results: rows.clone(),
            },
        );
        let records = rows.into_iter().map(|attrs| self.hydrate(attrs)).collect();
        Ok(Collection::new(records, &query))
    }

    /// Count records matching the query. Any count a handler returns is
    /// definitive; an absent result coerces to zero.
    pub async fn count(self: &Arc<Self>, query: impl Into<Query>) -> Result<u64> {
        let query = query.into().normalize(self.primary_key())?;
        debug!("{}: count", self.display_name);
        self.emit(
            "before count",
            &Event::BeforeCount {
                query: query.clone(),
            },
        );
        let count = self.chains.run_count(&query).await?;
        self.emit("after count", &Event::AfterCount { count });
        Ok(count)
    }
}

impl Observable for ModelType {
    fn bus(&self) -> &EventBus {
        &self.bus
    }
}

impl fmt::Debug for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelType")
            .field("name", &self.display_name)
            .field("primary", &self.primary)
            .field("attrs", &self.attrs.iter().map(|(n, _)| n).collect::<Vec<_>>())
            .field("call_style", &self.call_style)
            .finish()
    }
}

fn capitalize(handle: &str) -> String {
    let mut chars = handle.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
