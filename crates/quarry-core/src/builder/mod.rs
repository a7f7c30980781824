//! Statement builders.
//!
//! Each builder accumulates clauses fluently and freezes them into a
//! statement with `build()`; compilation happens in [`crate::compiler`].

mod delete;
mod expr;
mod insert;
mod join;
mod select;
mod selection;
mod set_op;
mod update;

pub use delete::{Delete, DeleteStatement};
pub use expr::{and, excluded, or};
pub use insert::{ConflictUpdate, Insert, InsertStatement, InsertValue, OnConflict, Row};
pub use join::{Join, JoinPlanner, JoinType, Nullability, Source};
pub use select::{
    Cte, Distinct, LockStrength, LockWait, Locking, Select, SelectStatement, SelectionMode,
};
pub use selection::{order_fields, Field, FieldMap, FieldNode, SelectedField};
pub use set_op::{SetOperation, SetOperator};
pub use update::{Update, UpdateStatement};
pub(crate) use set_op::{compose, CompoundTail};
