pub mod error;
pub mod types;
pub mod value;

pub use error::{HandlerResult, Issue, ModelError, Result};
pub use types::ValueType;
pub use value::{Attrs, Value};
