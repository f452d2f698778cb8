//! Lifecycle event publication.
//!
//! Both a [`ModelType`](crate::schema::ModelType) and every
//! [`Record`](crate::record::Record) carry their own [`EventBus`]. Event names
//! are plain literal strings; per-attribute change events use the
//! concatenated form `change:<name>` and are published separately right after
//! the bare `change`. The full set of names:
//!
//! `initializing`, `initialized`, `attribute`, `change`, `change:<name>`,
//! `setting`, `before find`, `after find`, `before findAll`, `after findAll`,
//! `before count`, `after count`, `before save`, `after save`,
//! `before remove`, `after remove`, `error`.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::core::{Attrs, Issue, Value};
use crate::dispatch::Query;
use crate::schema::AttrDef;

/// Payload published on a bus. Events carry owned data so listeners never
/// borrow from the record being mutated. Instance-scoped events that also
/// reach the type-level bus (`Change`, `BeforeSave`) carry the record's
/// primary-key value so a type-level listener can tell which record fired;
/// it is `Null` for records without a persisted identity.
#[derive(Debug, Clone)]
pub enum Event {
    Initializing { attrs: Attrs },
    Initialized,
    Attribute { name: String, def: AttrDef },
    Change { name: String, value: Value, previous: Value, primary: Value },
    Setting { attrs: Attrs },
    BeforeFind { query: Query },
    AfterFind { result: Option<Attrs> },
    BeforeFindAll { query: Query },
    AfterFindAll { results: Vec<Attrs> },
    BeforeCount { query: Query },
    AfterCount { count: u64 },
    BeforeSave { changed: Attrs, primary: Value },
    AfterSave,
    BeforeRemove,
    AfterRemove,
    Error { issue: Issue },
}

impl Event {
    /// The base literal name this event is published under. `Change` is
    /// additionally published under `change:<name>`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Initializing { .. } => "initializing",
            Self::Initialized => "initialized",
            Self::Attribute { .. } => "attribute",
            Self::Change { .. } => "change",
            Self::Setting { .. } => "setting",
            Self::BeforeFind { .. } => "before find",
            Self::AfterFind { .. } => "after find",
            Self::BeforeFindAll { .. } => "before findAll",
            Self::AfterFindAll { .. } => "after findAll",
            Self::BeforeCount { .. } => "before count",
            Self::AfterCount { .. } => "after count",
            Self::BeforeSave { .. } => "before save",
            Self::AfterSave => "after save",
            Self::BeforeRemove => "before remove",
            Self::AfterRemove => "after remove",
            Self::Error { .. } => "error",
        }
    }
}

pub type Listener = Arc<dyn Fn(&Event) + Send + Sync>;

/// Listener registry for one emitter. Emission is synchronous and in
/// subscription order; a panicking listener propagates to the emitter's
/// caller. Listener registration takes `&self` so a shared descriptor can
/// accept subscriptions after setup.
#[derive(Default)]
pub struct EventBus {
    listeners: RwLock<HashMap<String, Vec<Listener>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, name: &str, listener: impl Fn(&Event) + Send + Sync + 'static) {
        let mut listeners = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        listeners
            .entry(name.to_string())
            .or_default()
            .push(Arc::new(listener));
    }

    pub fn emit(&self, name: &str, event: &Event) {
        // Snapshot so a listener may subscribe without deadlocking.
        let snapshot: Vec<Listener> = {
            let listeners = self.listeners.read().unwrap_or_else(|e| e.into_inner());
            listeners.get(name).cloned().unwrap_or_default()
        };
        for listener in snapshot {
            listener(event);
        }
    }

    pub fn listener_count(&self, name: &str) -> usize {
        let listeners = self.listeners.read().unwrap_or_else(|e| e.into_inner());
        listeners.get(name).map_or(0, Vec::len)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners.read().unwrap_or_else(|e| e.into_inner());
        let mut counts: Vec<(&str, usize)> = listeners
            .iter()
            .map(|(name, subs)| (name.as_str(), subs.len()))
            .collect();
        counts.sort_unstable();
        f.debug_struct("EventBus").field("listeners", &counts).finish()
    }
}

/// Subscribe/publish surface shared by the type descriptor and each record.
/// Implemented independently by both; no shared emitter base.
pub trait Observable {
    fn bus(&self) -> &EventBus;

    fn on(&self, name: &str, listener: impl Fn(&Event) + Send + Sync + 'static)
    where
        Self: Sized,
    {
        self.bus().on(name, listener);
    }

    fn emit(&self, name: &str, event: &Event) {
        self.bus().emit(name, event);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn listeners_fire_in_subscription_order() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let seen = seen.clone();
            bus.on("initialized", move |_| seen.lock().unwrap().push(i));
        }
        bus.emit("initialized", &Event::Initialized);
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn names_are_distinct_literals() {
        let bus = EventBus::new();
        let hits = Arc::new(Mutex::new(0));
        {
            let hits = hits.clone();
            bus.on("change:name", move |_| *hits.lock().unwrap() += 1);
        }
        let event = Event::Change {
            name: "name".into(),
            value: Value::Text("a".into()),
            previous: Value::Null,
            primary: Value::Null,
        };
        bus.emit("change", &event);
        assert_eq!(*hits.lock().unwrap(), 0);
        bus.emit("change:name", &event);
        assert_eq!(*hits.lock().unwrap(), 1);
    }

    #[test]
    fn listener_may_subscribe_during_emit() {
        let bus = Arc::new(EventBus::new());
        let inner = bus.clone();
        bus.on("initialized", move |_| {
            inner.on("initialized", |_| {});
        });
        bus.emit("initialized", &Event::Initialized);
        assert_eq!(bus.listener_count("initialized"), 2);
    }
}
