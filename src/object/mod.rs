//! Object module - Resource instances as seen by the engine.
//!
//! A [`ManagedObject`] is one remote resource: its identity and its raw
//! document. [`TypeInfo`] is what the collaborator knows about the object's
//! kind, and decides which patch strategy applies.

mod managed;
mod serialize;
mod type_info;

pub use managed::*;
pub use serialize::*;
pub use type_info::*;
