//! Dinner use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Enforce dinner rules and host/attendee permissions above the repository.

pub mod dinner_service;
pub mod pagination;
