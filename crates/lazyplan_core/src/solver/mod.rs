//! Numeric feasibility for plan structure.
//!
//! Pure functions only; nothing here touches storage.

pub mod time_constraints;
