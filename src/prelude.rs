//! Convenience re-exports of the domain vocabulary.

pub use crate::adapt::{CallStyle, CallbackModel, Thunk};
pub use crate::attrs;
pub use crate::core::{Attrs, HandlerResult, Issue, ModelError, Result, Value, ValueType};
pub use crate::dispatch::{Collection, Query, Relation};
pub use crate::events::{Event, Observable};
pub use crate::record::Record;
pub use crate::schema::{AttrDef, DefaultValue, ModelBuilder, ModelType};
