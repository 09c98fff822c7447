//! Schema module defines the field-merge metadata used by structural patches.
//!
//! The schema language names types built from scalars, maps and lists. Lists
//! carry an element relationship and, for associative lists, the key fields
//! that identify an element. A [`PatchMeta`] pairs a schema with the root type
//! of one kind of object.

mod elements;
mod meta;
mod parser;

pub use elements::*;
pub use meta::*;
pub use parser::*;
