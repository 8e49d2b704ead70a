//! Plan domain model.
//!
//! # Responsibility
//! - Define canonical data structures used by the planning engine.
//! - Keep todo kind and plan cadence as tagged enums, not optional fields.
//!
//! # Invariants
//! - Every entity is identified by a stable UUID that never changes on
//!   reorder or move.
//! - Plan deletion is represented by soft-delete tombstones, not hard delete.

pub mod plan;
pub mod todo;
