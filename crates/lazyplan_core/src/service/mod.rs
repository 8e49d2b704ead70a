//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep FFI and CLI layers decoupled from storage details.

pub mod export_service;
pub mod generation_service;
pub mod hierarchy_service;
pub mod plan_service;
