// ============================================================================
// modelkit — storage-agnostic, event-driven entity modeling
// ============================================================================
//
//! Declare a record type with typed, validated attributes; track which
//! attributes changed since the record was last persisted; and dispatch
//! persistence operations through an ordered chain of pluggable storage
//! handlers until one produces a definitive result.
//!
//! The crate defines the *protocol* a storage handler must satisfy, not any
//! concrete backend: handlers are arbitrary async callables registered per
//! operation (`find`, `findAll`, `count`, `save`, `remove`). Read operations
//! stop at the first handler with a definitive result; write operations run
//! every handler, so several stores can each perform their own durability
//! action.
//!
//! # Examples
//!
//! ```
//! use modelkit::{attrs, AttrDef, ModelBuilder, ValueType};
//!
//! # fn main() -> modelkit::Result<()> {
//! # tokio_test::block_on(async {
//! let user = ModelBuilder::new("user")
//!     .attr("id", AttrDef::new().primary().of_type(ValueType::Number))?
//!     .attr("name", AttrDef::new().required().of_type(ValueType::Text))?
//!     .save_with(|_changed| async move { Ok(None) })
//!     .build();
//!
//! let mut alice = user.create(attrs! { "id" => 1 });
//! alice.set("name", "Alice")?;
//! assert_eq!(alice.changed(), attrs! { "name" => "Alice" });
//!
//! alice.save().await?;
//! assert!(!alice.is_dirty());
//! # Ok(())
//! # })
//! # }
//! ```
//!
//! Reads fall through the handler chain until one resolves:
//!
//! ```
//! use modelkit::{attrs, AttrDef, ModelBuilder};
//!
//! # fn main() -> modelkit::Result<()> {
//! # tokio_test::block_on(async {
//! let user = ModelBuilder::new("user")
//!     .attr("id", AttrDef::new().primary())?
//!     .attr("name", AttrDef::new())?
//!     // A cache that never hits...
//!     .find_with(|_query| async move { Ok(None) })
//!     // ...defers to the store behind it.
//!     .find_with(|query| async move {
//!         let id = query.get("id").cloned();
//!         Ok(id.map(|id| attrs! { "id" => id, "name" => "Alice" }))
//!     })
//!     .build();
//!
//! let alice = user.find(1).await?.expect("second handler resolves");
//! assert_eq!(alice.get_text("name").as_deref(), Some("Alice"));
//! assert!(!alice.is_dirty());
//! # Ok(())
//! # })
//! # }
//! ```

pub mod adapt;
pub mod core;
pub mod dispatch;
pub mod events;
pub mod prelude;
pub mod record;
pub mod schema;
pub mod validate;

// Re-export main types for convenience
pub use adapt::{CallStyle, CallbackModel, Thunk};
pub use self::core::{Attrs, HandlerResult, Issue, ModelError, Result, Value, ValueType};
pub use dispatch::{
    Collection, CountHandler, FindAllHandler, FindHandler, Query, Relation, RemoveHandler,
    SaveHandler,
};
pub use events::{Event, EventBus, Observable};
pub use record::Record;
pub use schema::{AttrDef, DefaultValue, ModelBuilder, ModelType};
