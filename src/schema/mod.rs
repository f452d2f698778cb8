pub mod attr;
pub mod builder;
pub mod model;

pub use attr::{AttrDef, DefaultValue};
pub use builder::ModelBuilder;
pub use model::ModelType;
