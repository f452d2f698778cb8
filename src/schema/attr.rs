use std::fmt;
use std::sync::Arc;

use crate::core::{Value, ValueType};
use crate::record::Record;

/// Zero-argument default producer, invoked once per construction when the
/// attribute was not supplied.
pub type DefaultFn = Arc<dyn Fn() -> Value + Send + Sync>;

/// Custom getter override; receives the record and replaces the raw read.
pub type GetFn = Arc<dyn Fn(&Record) -> Value + Send + Sync>;

#[derive(Clone)]
pub enum DefaultValue {
    Fixed(Value),
    Computed(DefaultFn),
}

impl DefaultValue {
    pub fn produce(&self) -> Value {
        match self {
            Self::Fixed(value) => value.clone(),
            Self::Computed(producer) => producer(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(value) => f.debug_tuple("Fixed").field(value).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Declaration of a single attribute: identity, typing, defaulting, and
/// visibility. Built fluently and handed to
/// [`ModelBuilder::attr`](crate::schema::ModelBuilder::attr).
///
/// ```
/// use modelkit::{AttrDef, ValueType};
///
/// let def = AttrDef::new().primary().of_type(ValueType::Number);
/// assert!(def.is_primary());
/// ```
#[derive(Clone)]
pub struct AttrDef {
    pub(crate) primary: bool,
    pub(crate) required: bool,
    pub(crate) enumerable: bool,
    pub(crate) value_type: Option<ValueType>,
    pub(crate) default: Option<DefaultValue>,
    pub(crate) get: Option<GetFn>,
}

impl AttrDef {
    pub fn new() -> Self {
        Self {
            primary: false,
            required: false,
            enumerable: true,
            value_type: None,
            default: None,
            get: None,
        }
    }

    /// Designate this attribute as the primary key. At most one per model.
    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Hide this attribute from enumeration and serialization.
    pub fn filtered(mut self) -> Self {
        self.enumerable = false;
        self
    }

    pub fn of_type(mut self, value_type: ValueType) -> Self {
        self.value_type = Some(value_type);
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Fixed(value.into()));
        self
    }

    pub fn default_with(mut self, producer: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        self.default = Some(DefaultValue::Computed(Arc::new(producer)));
        self
    }

    /// Replace the raw read with a computed accessor.
    pub fn get_with(mut self, getter: impl Fn(&Record) -> Value + Send + Sync + 'static) -> Self {
        self.get = Some(Arc::new(getter));
        self
    }

    pub fn is_primary(&self) -> bool {
        self.primary
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_enumerable(&self) -> bool {
        self.enumerable
    }

    pub fn value_type(&self) -> Option<ValueType> {
        self.value_type
    }

    pub fn default(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }

    pub(crate) fn getter(&self) -> Option<&GetFn> {
        self.get.as_ref()
    }
}

impl Default for AttrDef {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AttrDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttrDef")
            .field("primary", &self.primary)
            .field("required", &self.required)
            .field("enumerable", &self.enumerable)
            .field("value_type", &self.value_type)
            .field("default", &self.default)
            .field("get", &self.get.as_ref().map(|_| "custom"))
            .finish()
    }
}
