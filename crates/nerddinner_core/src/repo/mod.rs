//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the dinner data access contract.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repositories do not validate records; they forward them to the store.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod dinner_repo;
