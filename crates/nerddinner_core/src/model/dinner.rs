//! Dinner and RSVP records.
//!
//! # Responsibility
//! - Define the canonical dinner record with its loaded RSVPs.
//! - Collect business rule violations before a dinner is persisted.
//! - Provide the compact JSON projection used by map searches.
//!
//! # Invariants
//! - `event_date` is Unix epoch milliseconds.
//! - `rsvps` belong to this dinner (`rsvp.dinner_id == dinner.dinner_id`
//!   once both are saved).

use crate::geo::GeoPoint;
use crate::model::phone;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-assigned dinner identifier.
pub type DinnerId = i64;

/// Store-assigned RSVP identifier.
pub type RsvpId = i64;

/// Id carried by records that were never saved.
pub const UNSAVED_ID: i64 = 0;

const TITLE_MAX_CHARS: usize = 50;
const DESCRIPTION_MAX_CHARS: usize = 256;
const HOSTED_BY_MAX_CHARS: usize = 20;
const ADDRESS_MAX_CHARS: usize = 50;
const COUNTRY_MAX_CHARS: usize = 30;
const CONTACT_PHONE_MAX_CHARS: usize = 20;

/// One attendee registration for a dinner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rsvp {
    pub rsvp_id: RsvpId,
    pub dinner_id: DinnerId,
    pub attendee_name: String,
}

impl Rsvp {
    /// Creates an unsaved RSVP for `dinner_id`.
    pub fn new(dinner_id: DinnerId, attendee_name: impl Into<String>) -> Self {
        Self {
            rsvp_id: UNSAVED_ID,
            dinner_id,
            attendee_name: attendee_name.into(),
        }
    }
}

/// Dinner event record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dinner {
    pub dinner_id: DinnerId,
    pub title: String,
    /// Unix epoch milliseconds.
    pub event_date: i64,
    pub description: String,
    pub hosted_by: String,
    pub contact_phone: String,
    pub address: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Ordered by `rsvp_id` when loaded from the store.
    pub rsvps: Vec<Rsvp>,
}

impl Dinner {
    /// Creates an unsaved dinner with empty optional fields at `(0, 0)`.
    pub fn new(title: impl Into<String>, event_date: i64, hosted_by: impl Into<String>) -> Self {
        Self {
            dinner_id: UNSAVED_ID,
            title: title.into(),
            event_date,
            description: String::new(),
            hosted_by: hosted_by.into(),
            contact_phone: String::new(),
            address: String::new(),
            country: String::new(),
            latitude: 0.0,
            longitude: 0.0,
            rsvps: Vec::new(),
        }
    }

    pub fn is_saved(&self) -> bool {
        self.dinner_id != UNSAVED_ID
    }

    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    /// Case-insensitive host check.
    pub fn is_hosted_by(&self, user_name: &str) -> bool {
        same_user_name(&self.hosted_by, user_name)
    }

    /// RSVP held by `user_name`, compared case-insensitively.
    pub fn rsvp_for(&self, user_name: &str) -> Option<&Rsvp> {
        self.rsvps
            .iter()
            .find(|rsvp| same_user_name(&rsvp.attendee_name, user_name))
    }

    /// Case-insensitive attendee check.
    pub fn is_user_registered(&self, user_name: &str) -> bool {
        self.rsvp_for(user_name).is_some()
    }

    /// Returns every rule the dinner currently breaks, in field order.
    pub fn rule_violations(&self) -> Vec<RuleViolation> {
        let mut violations = Vec::new();

        check_text(&mut violations, "title", &self.title, TITLE_MAX_CHARS);
        check_text(
            &mut violations,
            "description",
            &self.description,
            DESCRIPTION_MAX_CHARS,
        );
        check_text(
            &mut violations,
            "hosted_by",
            &self.hosted_by,
            HOSTED_BY_MAX_CHARS,
        );
        check_text(&mut violations, "address", &self.address, ADDRESS_MAX_CHARS);
        check_text(&mut violations, "country", &self.country, COUNTRY_MAX_CHARS);
        check_text(
            &mut violations,
            "contact_phone",
            &self.contact_phone,
            CONTACT_PHONE_MAX_CHARS,
        );

        if !self.contact_phone.trim().is_empty()
            && !phone::is_valid_number(&self.contact_phone, &self.country)
        {
            violations.push(RuleViolation::new(
                "contact_phone",
                format!("phone number does not match {} format", self.country.trim()),
            ));
        }

        if !(-90.0..=90.0).contains(&self.latitude) {
            violations.push(RuleViolation::new(
                "latitude",
                format!("latitude {} is outside [-90, 90]", self.latitude),
            ));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            violations.push(RuleViolation::new(
                "longitude",
                format!("longitude {} is outside [-180, 180]", self.longitude),
            ));
        }

        violations
    }

    /// Fails with the full violation list when any rule is broken.
    pub fn validate(&self) -> Result<(), DinnerValidationError> {
        let violations = self.rule_violations();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(DinnerValidationError { violations })
        }
    }

    /// Builds the compact projection returned by location searches.
    pub fn to_json_dinner(&self) -> JsonDinner {
        JsonDinner {
            dinner_id: self.dinner_id,
            title: self.title.clone(),
            latitude: self.latitude,
            longitude: self.longitude,
            description: self.description.clone(),
            rsvp_count: self.rsvps.len(),
        }
    }
}

/// Map-friendly dinner projection.
///
/// Key names follow the public JSON contract consumed by map clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonDinner {
    #[serde(rename = "DinnerID")]
    pub dinner_id: DinnerId,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Latitude")]
    pub latitude: f64,
    #[serde(rename = "Longitude")]
    pub longitude: f64,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "RSVPCount")]
    pub rsvp_count: usize,
}

/// One broken business rule on a dinner field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleViolation {
    pub property: &'static str,
    pub message: String,
}

impl RuleViolation {
    fn new(property: &'static str, message: impl Into<String>) -> Self {
        Self {
            property,
            message: message.into(),
        }
    }
}

impl Display for RuleViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.property, self.message)
    }
}

/// Validation failure carrying every violated rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DinnerValidationError {
    pub violations: Vec<RuleViolation>,
}

impl Display for DinnerValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid dinner:")?;
        for (index, violation) in self.violations.iter().enumerate() {
            let sep = if index == 0 { " " } else { "; " };
            write!(f, "{sep}{violation}")?;
        }
        Ok(())
    }
}

impl Error for DinnerValidationError {}

/// Compares user names ignoring surrounding whitespace and letter case,
/// including non-ASCII letters.
pub fn same_user_name(left: &str, right: &str) -> bool {
    left.trim().to_lowercase() == right.trim().to_lowercase()
}

fn check_text(
    violations: &mut Vec<RuleViolation>,
    property: &'static str,
    value: &str,
    max_chars: usize,
) {
    if value.trim().is_empty() {
        violations.push(RuleViolation::new(property, format!("{property} is required")));
    } else if value.chars().count() > max_chars {
        violations.push(RuleViolation::new(
            property,
            format!("{property} must be at most {max_chars} characters"),
        ));
    }
}
