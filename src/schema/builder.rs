use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tracing::debug;

use crate::adapt::CallStyle;
use crate::core::{Attrs, HandlerResult, ModelError, Result};
use crate::dispatch::{
    CountFn, CountHandler, FindAllFn, FindAllHandler, FindFn, FindHandler, HandlerChains, Query,
    RemoveFn, RemoveHandler, SaveFn, SaveHandler,
};
use crate::events::{Event, EventBus};
use crate::record::Record;
use crate::schema::attr::AttrDef;
use crate::schema::model::ModelType;
use crate::validate::{self, ValidatorFn};

/// Builds an immutable [`ModelType`] descriptor.
///
/// All registration is additive: attributes, handlers, and validators are
/// appended in call order and never removed. Duplicate attribute names are
/// idempotent; a second `primary` attribute is a configuration error raised
/// from the `attr` call itself.
///
/// ```
/// use modelkit::{AttrDef, ModelBuilder, ValueType};
///
/// # fn main() -> modelkit::Result<()> {
/// let user = ModelBuilder::new("user")
///     .attr("id", AttrDef::new().primary().of_type(ValueType::Number))?
///     .attr("name", AttrDef::new().required().of_type(ValueType::Text))?
///     .build();
/// assert_eq!(user.name(), "User");
/// assert_eq!(user.primary_key(), Some("id"));
/// # Ok(())
/// # }
/// ```
pub struct ModelBuilder {
    handle: String,
    attrs: Vec<(String, AttrDef)>,
    index: HashMap<String, usize>,
    primary: Option<String>,
    validators: Vec<ValidatorFn>,
    chains: HandlerChains,
    call_style: CallStyle,
    bus: EventBus,
}

impl std::fmt::Debug for ModelBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelBuilder")
            .field("handle", &self.handle)
            .field("primary", &self.primary)
            .finish_non_exhaustive()
    }
}

impl ModelBuilder {
    /// Start a model from its lowercase handle. The display name is the
    /// capitalized handle. The two built-in validators (type, required) are
    /// pre-registered; custom validators run after them.
    pub fn new(handle: &str) -> Self {
        let validators: Vec<ValidatorFn> = vec![
            Box::new(validate::type_validator),
            Box::new(validate::required_validator),
        ];
        Self {
            handle: handle.to_string(),
            attrs: Vec::new(),
            index: HashMap::new(),
            primary: None,
            validators,
            chains: HandlerChains::new(),
            call_style: CallStyle::default(),
            bus: EventBus::new(),
        }
    }

    /// Declare an attribute. Idempotent on an already-registered name.
    /// Fails with [`ModelError::PrimaryExists`] when a second attribute
    /// claims the primary flag; this is a programmer error caught at setup.
    pub fn attr(mut self, name: &str, def: AttrDef) -> Result<Self> {
        if self.index.contains_key(name) {
            return Ok(self);
        }
        if def.primary {
            if let Some(existing) = &self.primary {
                return Err(ModelError::PrimaryExists(existing.clone()));
            }
            self.primary = Some(name.to_string());
        }
        debug!("model '{}': registered attribute '{}'", self.handle, name);
        self.index.insert(name.to_string(), self.attrs.len());
        self.attrs.push((name.to_string(), def.clone()));
        self.bus.emit(
            "attribute",
            &Event::Attribute {
                name: name.to_string(),
                def,
            },
        );
        Ok(self)
    }

    /// Subscribe a type-level listener during setup. Events emitted by later
    /// builder calls (such as `attribute`) reach it.
    pub fn on(self, name: &str, listener: impl Fn(&Event) + Send + Sync + 'static) -> Self {
        self.bus.on(name, listener);
        self
    }

    /// Append a custom validator, run after the built-ins in registration
    /// order. Validators report problems through
    /// [`Record::error`](crate::record::Record::error).
    pub fn validator(mut self, validator: impl Fn(&mut Record) + Send + Sync + 'static) -> Self {
        self.validators.push(Box::new(validator));
        self
    }

    /// Select how the public operations are surfaced; see
    /// [`CallStyle`](crate::adapt::CallStyle).
    pub fn call_style(mut self, style: CallStyle) -> Self {
        self.call_style = style;
        self
    }

    /// Apply an extension function to the builder, for packaged plugins that
    /// register several attributes, handlers, or listeners at once.
    pub fn plugin(self, extend: impl FnOnce(Self) -> Self) -> Self {
        extend(self)
    }

    // ------------------------------------------------------------------
    // Handler registration, one chain per operation, append-only.
    // ------------------------------------------------------------------

    pub fn handle_find(mut self, handler: impl FindHandler + 'static) -> Self {
        self.chains.find.push(Box::new(handler));
        self
    }

    pub fn handle_find_all(mut self, handler: impl FindAllHandler + 'static) -> Self {
        self.chains.find_all.push(Box::new(handler));
        self
    }

    pub fn handle_count(mut self, handler: impl CountHandler + 'static) -> Self {
        self.chains.count.push(Box::new(handler));
        self
    }

    pub fn handle_save(mut self, handler: impl SaveHandler + 'static) -> Self {
        self.chains.save.push(Box::new(handler));
        self
    }

    pub fn handle_remove(mut self, handler: impl RemoveHandler + 'static) -> Self {
        self.chains.remove.push(Box::new(handler));
        self
    }

    /// Register a find handler from an async closure.
    pub fn find_with<F, Fut>(self, handler: F) -> Self
    where
        F: Fn(Query) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<Option<Attrs>>> + Send + 'static,
    {
        self.handle_find(FindFn(handler))
    }

    /// Register a findAll handler from an async closure.
    pub fn find_all_with<F, Fut>(self, handler: F) -> Self
    where
        F: Fn(Query) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<Option<Vec<Attrs>>>> + Send + 'static,
    {
        self.handle_find_all(FindAllFn(handler))
    }

    /// Register a count handler from an async closure.
    pub fn count_with<F, Fut>(self, handler: F) -> Self
    where
        F: Fn(Query) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<Option<u64>>> + Send + 'static,
    {
        self.handle_count(CountFn(handler))
    }

    /// Register a save handler from an async closure receiving the
    /// changed-attributes snapshot.
    pub fn save_with<F, Fut>(self, handler: F) -> Self
    where
        F: Fn(Attrs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<Option<Attrs>>> + Send + 'static,
    {
        self.handle_save(SaveFn(handler))
    }

    /// Register a remove handler from an async closure.
    pub fn remove_with<F, Fut>(self, handler: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<()>> + Send + 'static,
    {
        self.handle_remove(RemoveFn(handler))
    }

    /// Freeze the descriptor. The returned model is shared read-only; its
    /// event bus keeps accepting subscriptions.
    pub fn build(self) -> Arc<ModelType> {
        debug!(
            "model '{}': built with {} attributes, {} validators",
            self.handle,
            self.attrs.len(),
            self.validators.len()
        );
        Arc::new(ModelType::from_parts(
            self.handle,
            self.attrs,
            self.index,
            self.primary,
            self.validators,
            self.chains,
            self.call_style,
            self.bus,
        ))
    }
}
