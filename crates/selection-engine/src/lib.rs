//! Cell addressing over raster blocks.
//!
//! A [`SelectionEngine`] builds sets of cell addresses from spatial or
//! value predicates and scopes bulk edits to them. It never owns the
//! raster it queries: every operation borrows the block for exactly one
//! call.

pub mod engine;
pub mod predicate;
pub mod selection;

pub use engine::{ApplyOp, SelectionEngine, Stash};
pub use predicate::Condition;
pub use selection::{Cell, CellSet, Selection};
