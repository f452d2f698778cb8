//! Record instances.
//!
//! A [`Record`] owns its attribute values, the ordered set of attribute names
//! changed since the last successful save, a transient validation issue list,
//! and a free-form extras bag. The values map is fixed to the declared
//! attribute set at construction; mutation goes through [`Record::set`],
//! which tracks dirtiness and publishes change events on both the type and
//! instance buses.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde::ser::SerializeMap;
use tracing::debug;

use crate::core::{Attrs, Issue, ModelError, Result, Value};
use crate::events::{Event, EventBus, Observable};
use crate::schema::ModelType;

pub struct Record {
    model: Arc<ModelType>,
    values: Attrs,
    dirty: Vec<String>,
    issues: Vec<Issue>,
    extras: Attrs,
    bus: EventBus,
}

impl Record {
    /// Construct a record. Emits `initializing` on the type bus before any
    /// storage is allocated and `initialized` once construction completes.
    ///
    /// Defaults apply only when the attribute is absent from `initial` and
    /// still null; initial values are then written raw. Raw writes mark
    /// nothing dirty and publish no change events: supplied state is taken
    /// as given, not as a tracked mutation. Undeclared keys are ignored.
    pub(crate) fn new(model: Arc<ModelType>, initial: Attrs) -> Self {
        model.emit(
            "initializing",
            &Event::Initializing {
                attrs: initial.clone(),
            },
        );

        let mut values = Attrs::new();
        for (name, def) in model.attrs() {
            let value = match def.default() {
                Some(default) if !initial.contains_key(name) => default.produce(),
                _ => Value::Null,
            };
            values.insert(name.to_string(), value);
        }
        for (name, value) in initial {
            if model.has_attr(&name) {
                values.insert(name, value);
            }
        }

        let record = Self {
            model: model.clone(),
            values,
            dirty: Vec::new(),
            issues: Vec::new(),
            extras: Attrs::new(),
            bus: EventBus::new(),
        };
        model.emit("initialized", &Event::Initialized);
        record
    }

    pub fn model(&self) -> &Arc<ModelType> {
        &self.model
    }

    /// Current value of an attribute. A custom getter declared on the
    /// attribute replaces the raw read. `None` only for undeclared names.
    pub fn get(&self, name: &str) -> Option<Value> {
        let def = self.model.attr(name)?;
        if let Some(getter) = def.getter() {
            return Some(getter(self));
        }
        self.values.get(name).cloned()
    }

    /// Raw stored value, bypassing any custom getter.
    pub fn raw(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(|v| v.as_i64())
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(|v| v.as_f64())
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(|v| v.as_bool())
    }

    pub fn get_text(&self, name: &str) -> Option<String> {
        self.get(name).and_then(|v| match v {
            Value::Text(s) => Some(s),
            _ => None,
        })
    }

    /// Set one attribute. Setting the current value is a no-op: nothing is
    /// marked dirty and no event fires. Otherwise the raw value is updated,
    /// the name joins the dirty set (once), and `change` then
    /// `change:<name>` are published type-level first, instance-level
    /// second.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        if !self.model.has_attr(name) {
            return Err(ModelError::UnknownAttribute {
                model: self.model.name().to_string(),
                attribute: name.to_string(),
            });
        }
        let value = value.into();
        let previous = self.values.get(name).cloned().unwrap_or(Value::Null);
        if previous == value {
            return Ok(());
        }

        self.values.insert(name.to_string(), value.clone());
        if !self.dirty.iter().any(|dirty| dirty == name) {
            self.dirty.push(name.to_string());
        }

        let event = Event::Change {
            name: name.to_string(),
            value,
            previous,
            primary: self.primary().unwrap_or(Value::Null),
        };
        let scoped = format!("change:{name}");
        self.model.emit("change", &event);
        self.model.emit(&scoped, &event);
        self.bus.emit("change", &event);
        self.bus.emit(&scoped, &event);
        Ok(())
    }

    /// Bulk set. Publishes `setting` on the type then instance bus with the
    /// full payload, then applies each declared key through [`set`](Self::set).
    /// Undeclared keys are skipped.
    pub fn set_all(&mut self, attrs: Attrs) -> Result<&mut Self> {
        let event = Event::Setting {
            attrs: attrs.clone(),
        };
        self.model.emit("setting", &event);
        self.bus.emit("setting", &event);
        for (name, value) in attrs {
            if self.model.has_attr(&name) {
                self.set(&name, value)?;
            }
        }
        Ok(self)
    }

    pub fn has(&self, name: &str) -> bool {
        self.model.has_attr(name)
    }

    /// Attribute names changed since the last successful save, in the order
    /// they were first changed.
    pub fn dirty_attrs(&self) -> &[String] {
        &self.dirty
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Snapshot of the current values of every dirty attribute.
    pub fn changed(&self) -> Attrs {
        self.dirty
            .iter()
            .filter_map(|name| self.get(name).map(|value| (name.clone(), value)))
            .collect()
    }

    /// Value of the primary-key attribute. Errors when the model declared
    /// no primary key.
    pub fn primary(&self) -> Result<Value> {
        let key = self.model.primary_key().ok_or(ModelError::NoPrimaryKey)?;
        Ok(self.get(key).unwrap_or(Value::Null))
    }

    /// Whether this record has no persisted identity yet (primary key null
    /// or empty text).
    pub fn is_new(&self) -> Result<bool> {
        Ok(self.primary()?.is_absent())
    }

    /// Record a problem against this instance and publish `error` on the
    /// type then instance bus. Returns the recorded issue.
    pub fn error(&mut self, message: impl Into<String>, extra: Attrs) -> Issue {
        let issue = Issue {
            message: message.into(),
            extra,
        };
        self.issues.push(issue.clone());
        let event = Event::Error {
            issue: issue.clone(),
        };
        self.model.emit("error", &event);
        self.bus.emit("error", &event);
        issue
    }

    /// Issues recorded by the most recent validation run.
    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    /// Run every registered validator in order, collecting issues. The list
    /// is cleared first and no validator short-circuits, so each call
    /// reflects a complete pass. Returns true when no issues were recorded.
    pub fn validate(&mut self) -> bool {
        self.issues.clear();
        let model = self.model.clone();
        for validator in model.validators() {
            validator(self);
        }
        self.issues.is_empty()
    }

    /// Persist this record through the save chain.
    ///
    /// Emits `before save` with the changed snapshot, then: a record with a
    /// present primary key and nothing dirty completes immediately without
    /// touching validators or handlers; otherwise a failed validation
    /// completes with [`ModelError::Validation`] before any handler runs;
    /// otherwise every save handler runs in order with the snapshot, and
    /// attributes a handler returns are merged raw. On success the dirty
    /// set is cleared and `after save` fires on both buses.
    pub async fn save(&mut self) -> Result<()> {
        let changed = self.changed();
        debug!(
            "{}: save ({} dirty attributes)",
            self.model.name(),
            changed.len()
        );
        let event = Event::BeforeSave {
            changed: changed.clone(),
            primary: self.primary().unwrap_or(Value::Null),
        };
        self.model.emit("before save", &event);
        self.bus.emit("before save", &event);

        let persisted = matches!(self.primary(), Ok(ref key) if !key.is_absent());
        if !(persisted && !self.is_dirty()) {
            if !self.validate() {
                return Err(ModelError::Validation(self.issues.clone()));
            }
            let merges = self.model.chains().run_save(&changed).await?;
            for attrs in merges {
                for (name, value) in attrs {
                    if self.model.has_attr(&name) {
                        self.values.insert(name, value);
                    }
                }
            }
        }

        self.dirty.clear();
        self.model.emit("after save", &Event::AfterSave);
        self.bus.emit("after save", &Event::AfterSave);
        Ok(())
    }

    /// Remove this record through the remove chain.
    ///
    /// Emits `before remove`, runs every remove handler in order, then sets
    /// the primary-key attribute's raw value to null directly — a terminal
    /// state transition that bypasses dirty tracking and change events —
    /// and fires `after remove` on both buses.
    pub async fn remove(&mut self) -> Result<()> {
        debug!("{}: remove", self.model.name());
        self.model.emit("before remove", &Event::BeforeRemove);
        self.bus.emit("before remove", &Event::BeforeRemove);

        let key = self
            .model
            .primary_key()
            .ok_or(ModelError::NoPrimaryKey)?
            .to_string();
        self.model.chains().run_remove().await?;

        self.values.insert(key, Value::Null);
        self.model.emit("after remove", &Event::AfterRemove);
        self.bus.emit("after remove", &Event::AfterRemove);
        Ok(())
    }

    /// Free-form bag for caller bookkeeping. Never enumerated, never
    /// serialized, never touched by the core.
    pub fn extras(&self) -> &Attrs {
        &self.extras
    }

    pub fn extras_mut(&mut self) -> &mut Attrs {
        &mut self.extras
    }

    /// All raw values, including filtered attributes.
    pub fn attrs(&self) -> &Attrs {
        &self.values
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty.clear();
    }
}

impl Observable for Record {
    fn bus(&self) -> &EventBus {
        &self.bus
    }
}

/// Serializes enumerable attributes only; filtered attributes and the
/// extras bag are excluded.
impl Serialize for Record {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        for (name, def) in self.model.attrs() {
            if !def.is_enumerable() {
                continue;
            }
            let value = self.get(name).unwrap_or(Value::Null);
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("model", &self.model.name())
            .field("values", &self.values)
            .field("dirty", &self.dirty)
            .finish()
    }
}
