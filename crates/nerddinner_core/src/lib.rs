//! Data access core for NerdDinner.
//! Dinner/RSVP persistence, text and location queries, and the use-case
//! service that validates writes.

pub mod db;
pub mod geo;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use geo::{distance_between, GeoPoint, NEARBY_RADIUS_MILES};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::dinner::{
    Dinner, DinnerId, DinnerValidationError, JsonDinner, Rsvp, RsvpId, RuleViolation,
};
pub use repo::dinner_repo::{
    DinnerRepository, RepoError, RepoResult, SaveSummary, SqliteDinnerRepository,
};
pub use service::dinner_service::{DinnerService, DinnerServiceError, DinnerServiceResult};
pub use service::pagination::PaginatedList;

/// Minimal health-check API for smoke probes.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
