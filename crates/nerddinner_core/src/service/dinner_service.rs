//! Dinner use-case service.
//!
//! # Responsibility
//! - Validate dinners before they reach the repository.
//! - Gate edits and deletes on the host, RSVPs on the attendee.
//! - Shape query results for list, search and map callers.
//!
//! # Invariants
//! - Every mutating call ends with exactly one `save`.
//! - A failed save leaves no staged changes behind in the repository.
//! - One attendee holds at most one RSVP per dinner (case-insensitive).

use crate::model::dinner::{Dinner, DinnerId, DinnerValidationError, JsonDinner, RuleViolation};
use crate::repo::dinner_repo::{DinnerRepository, RepoError, RepoResult, SaveSummary};
use crate::service::pagination::PaginatedList;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for dinner use-cases.
#[derive(Debug)]
pub enum DinnerServiceError {
    /// Dinner breaks one or more business rules.
    Validation(Vec<RuleViolation>),
    /// Target dinner does not exist.
    DinnerNotFound(DinnerId),
    /// Caller is not the host of the target dinner.
    NotHost {
        dinner_id: DinnerId,
        user_name: String,
    },
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for DinnerServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(violations) => {
                write!(f, "dinner has {} rule violation(s)", violations.len())
            }
            Self::DinnerNotFound(id) => write!(f, "dinner not found: {id}"),
            Self::NotHost {
                dinner_id,
                user_name,
            } => write!(f, "user `{user_name}` does not host dinner {dinner_id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent dinner state: {details}"),
        }
    }
}

impl Error for DinnerServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for DinnerServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::DinnerNotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<DinnerValidationError> for DinnerServiceError {
    fn from(value: DinnerValidationError) -> Self {
        Self::Validation(value.violations)
    }
}

pub type DinnerServiceResult<T> = Result<T, DinnerServiceError>;

/// Dinner service facade over repository implementations.
pub struct DinnerService<R: DinnerRepository> {
    repo: R,
}

impl<R: DinnerRepository> DinnerService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Validates and persists a new dinner, returning its assigned id.
    pub fn create_dinner(&mut self, dinner: Dinner) -> DinnerServiceResult<DinnerId> {
        dinner.validate()?;
        self.repo.add(dinner);
        let summary = self.commit()?;
        let dinner_id = summary
            .inserted_dinners
            .first()
            .copied()
            .ok_or(DinnerServiceError::InconsistentState(
                "save reported no inserted dinner",
            ))?;
        info!("event=dinner_create module=service status=ok dinner_id={dinner_id}");
        Ok(dinner_id)
    }

    /// Replaces a dinner's fields; only its current host may do this.
    pub fn edit_dinner(
        &mut self,
        user_name: &str,
        dinner: &Dinner,
    ) -> DinnerServiceResult<Dinner> {
        if !dinner.is_saved() {
            return Err(DinnerServiceError::DinnerNotFound(dinner.dinner_id));
        }
        let existing = self.require_dinner(dinner.dinner_id)?;
        ensure_host(&existing, user_name)?;
        dinner.validate()?;

        self.repo.update(dinner);
        self.commit()?;
        self.read_back(dinner.dinner_id, "edited dinner not found in read-back")
    }

    /// Deletes a dinner and its RSVPs; only its host may do this.
    pub fn delete_dinner(
        &mut self,
        user_name: &str,
        dinner_id: DinnerId,
    ) -> DinnerServiceResult<()> {
        let existing = self.require_dinner(dinner_id)?;
        ensure_host(&existing, user_name)?;

        self.repo.delete(&existing);
        self.commit()?;
        info!(
            "event=dinner_delete module=service status=ok dinner_id={dinner_id} rsvps={}",
            existing.rsvps.len()
        );
        Ok(())
    }

    /// Registers `user_name` for a dinner. Already-registered users are a no-op.
    pub fn register_rsvp(
        &mut self,
        user_name: &str,
        dinner_id: DinnerId,
    ) -> DinnerServiceResult<Dinner> {
        let dinner = self.require_dinner(dinner_id)?;
        if dinner.is_user_registered(user_name) {
            return Ok(dinner);
        }

        self.repo.add_rsvp(dinner_id, user_name.trim());
        self.commit()?;
        self.read_back(dinner_id, "dinner missing after rsvp registration")
    }

    /// Removes the RSVP held by `user_name`, when there is one.
    pub fn cancel_rsvp(
        &mut self,
        user_name: &str,
        dinner_id: DinnerId,
    ) -> DinnerServiceResult<Dinner> {
        let dinner = self.require_dinner(dinner_id)?;
        let Some(rsvp) = dinner.rsvp_for(user_name).cloned() else {
            return Ok(dinner);
        };

        self.repo.delete_rsvp(&rsvp);
        self.commit()?;
        self.read_back(dinner_id, "dinner missing after rsvp cancellation")
    }

    /// Gets one dinner or fails with `DinnerNotFound`.
    pub fn dinner_details(&self, dinner_id: DinnerId) -> DinnerServiceResult<Dinner> {
        self.require_dinner(dinner_id)
    }

    /// Pages through upcoming dinners, earliest first.
    pub fn upcoming_dinners(
        &self,
        page_index: u32,
        page_size: Option<u32>,
    ) -> RepoResult<PaginatedList<Dinner>> {
        let upcoming = self.repo.find_upcoming_dinners()?;
        Ok(PaginatedList::new(upcoming, page_index, page_size))
    }

    /// Map projection of upcoming dinners near a point.
    pub fn search_by_location(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> RepoResult<Vec<JsonDinner>> {
        Ok(self
            .repo
            .find_by_location(latitude, longitude)?
            .iter()
            .map(Dinner::to_json_dinner)
            .collect())
    }

    /// Text search over title, description and host.
    pub fn search(&self, q: &str) -> RepoResult<Vec<Dinner>> {
        self.repo.find_dinners_by_text(q)
    }

    fn require_dinner(&self, dinner_id: DinnerId) -> DinnerServiceResult<Dinner> {
        self.repo
            .get_dinner(dinner_id)?
            .ok_or(DinnerServiceError::DinnerNotFound(dinner_id))
    }

    fn read_back(
        &self,
        dinner_id: DinnerId,
        details: &'static str,
    ) -> DinnerServiceResult<Dinner> {
        self.repo
            .get_dinner(dinner_id)?
            .ok_or(DinnerServiceError::InconsistentState(details))
    }

    fn commit(&mut self) -> DinnerServiceResult<SaveSummary> {
        match self.repo.save() {
            Ok(summary) => Ok(summary),
            Err(err) => {
                let dropped = self.repo.discard_changes();
                warn!(
                    "event=dinner_commit module=service status=error dropped={dropped} error={err}"
                );
                Err(err.into())
            }
        }
    }
}

fn ensure_host(dinner: &Dinner, user_name: &str) -> DinnerServiceResult<()> {
    if dinner.is_hosted_by(user_name) {
        Ok(())
    } else {
        Err(DinnerServiceError::NotHost {
            dinner_id: dinner.dinner_id,
            user_name: user_name.to_string(),
        })
    }
}
