//! Dinner/RSVP domain model.
//!
//! # Responsibility
//! - Define the records persisted by the dinner repository.
//! - Own the business rules checked before a dinner is written.
//!
//! # Invariants
//! - A dinner id of `0` means "not saved yet"; the store assigns real ids.
//! - Every RSVP belongs to exactly one dinner.

pub mod dinner;
pub mod phone;
