//! Dinner repository contract and SQLite unit-of-work implementation.
//!
//! # Responsibility
//! - Query dinners (all, by id, by text, upcoming, by location).
//! - Stage add/update/delete operations and apply them on `save`.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Reads only observe committed rows; staged changes are invisible until
//!   `save` succeeds.
//! - `save` applies staged changes in staging order inside one transaction.
//! - Deleting a dinner deletes its RSVPs first.
//! - Text and location filters are linear in-memory scans over loaded rows.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::geo::{self, GeoPoint};
use crate::model::dinner::{Dinner, DinnerId, Rsvp, RsvpId};
use log::{debug, error, info};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

const DINNER_SELECT_SQL: &str = "SELECT
    dinner_id,
    title,
    event_date,
    description,
    hosted_by,
    contact_phone,
    address,
    country,
    latitude,
    longitude
FROM dinners";

const DINNER_COLUMNS: &[&str] = &[
    "dinner_id",
    "title",
    "event_date",
    "description",
    "hosted_by",
    "contact_phone",
    "address",
    "country",
    "latitude",
    "longitude",
];

const RSVP_COLUMNS: &[&str] = &["rsvp_id", "dinner_id", "attendee_name"];

pub type RepoResult<T> = Result<T, RepoError>;

/// Clock returning the current time in Unix epoch milliseconds.
pub type Clock = fn() -> i64;

/// Errors from dinner persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Target dinner does not exist.
    NotFound(DinnerId),
    /// Target RSVP does not exist.
    RsvpNotFound(RsvpId),
    /// Persisted data cannot be converted to a valid record.
    InvalidData(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "dinner not found: {id}"),
            Self::RsvpNotFound(id) => write!(f, "rsvp not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted dinner data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "dinner repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "dinner repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "dinner repository requires column `{column}` in table `{table}`"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Outcome of one successful `save`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveSummary {
    /// Ids assigned to added dinners, in staging order.
    pub inserted_dinners: Vec<DinnerId>,
    /// Ids assigned to added RSVPs, in staging order.
    pub inserted_rsvps: Vec<RsvpId>,
    pub updated_dinners: usize,
    pub deleted_dinners: usize,
    pub deleted_rsvps: usize,
}

impl SaveSummary {
    /// Total number of rows written.
    pub fn affected_rows(&self) -> usize {
        self.inserted_dinners.len()
            + self.inserted_rsvps.len()
            + self.updated_dinners
            + self.deleted_dinners
            + self.deleted_rsvps
    }
}

/// Repository interface for dinner/RSVP data access.
pub trait DinnerRepository {
    /// Dinners whose title, description or host contains `q` (case-sensitive).
    fn find_dinners_by_text(&self, q: &str) -> RepoResult<Vec<Dinner>>;
    /// Every dinner ordered by id.
    fn find_all_dinners(&self) -> RepoResult<Vec<Dinner>>;
    /// Dinners at or after the repository clock, earliest first.
    fn find_upcoming_dinners(&self) -> RepoResult<Vec<Dinner>>;
    /// Upcoming dinners within the nearby radius of the given point.
    fn find_by_location(&self, latitude: f64, longitude: f64) -> RepoResult<Vec<Dinner>>;
    /// Any dinner within the nearby radius of the given point.
    fn nearest_dinners(&self, latitude: f64, longitude: f64) -> RepoResult<Vec<Dinner>>;
    fn get_dinner(&self, id: DinnerId) -> RepoResult<Option<Dinner>>;
    /// Stages an insert of `dinner` together with its RSVPs.
    fn add(&mut self, dinner: Dinner);
    /// Stages a column update of an existing dinner.
    fn update(&mut self, dinner: &Dinner);
    /// Stages a new RSVP on an existing dinner.
    fn add_rsvp(&mut self, dinner_id: DinnerId, attendee_name: &str);
    /// Stages deletion of one RSVP.
    ///
    /// Saving fails with `RsvpNotFound` when the RSVP is missing, unless its
    /// dinner was deleted earlier in the same save.
    fn delete_rsvp(&mut self, rsvp: &Rsvp);
    /// Stages deletion of a dinner and all of its RSVPs.
    fn delete(&mut self, dinner: &Dinner);
    /// Applies every staged change in one transaction.
    ///
    /// On failure nothing is written and the staged changes are kept.
    fn save(&mut self) -> RepoResult<SaveSummary>;
    fn pending_changes(&self) -> usize;
    /// Drops every staged change and returns how many were dropped.
    fn discard_changes(&mut self) -> usize;
}

#[derive(Debug, Clone)]
enum PendingChange {
    InsertDinner(Dinner),
    UpdateDinner(Dinner),
    InsertRsvp {
        dinner_id: DinnerId,
        attendee_name: String,
    },
    DeleteRsvp {
        rsvp_id: RsvpId,
        dinner_id: DinnerId,
    },
    DeleteDinner(DinnerId),
}

/// SQLite-backed dinner repository.
pub struct SqliteDinnerRepository<'conn> {
    conn: &'conn mut Connection,
    pending: Vec<PendingChange>,
    clock: Clock,
}

impl<'conn> SqliteDinnerRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_dinner_connection_ready(conn)?;
        Ok(Self {
            conn,
            pending: Vec::new(),
            clock: system_now_ms,
        })
    }

    /// Replaces the clock used by upcoming/location queries.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Great-circle distance in miles between two coordinate pairs.
    pub fn distance_between(lat1: f64, long1: f64, lat2: f64, long2: f64) -> f64 {
        geo::distance_between(lat1, long1, lat2, long2)
    }

    fn load_dinners(&self) -> RepoResult<Vec<Dinner>> {
        let mut rsvps_by_dinner = load_rsvps_by_dinner(self.conn)?;
        let mut stmt = self
            .conn
            .prepare(&format!("{DINNER_SELECT_SQL} ORDER BY dinner_id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut dinners = Vec::new();
        while let Some(row) = rows.next()? {
            let mut dinner = parse_dinner_row(row)?;
            dinner.rsvps = rsvps_by_dinner
                .remove(&dinner.dinner_id)
                .unwrap_or_default();
            dinners.push(dinner);
        }
        Ok(dinners)
    }

    fn upcoming(&self) -> RepoResult<Vec<Dinner>> {
        let now = (self.clock)();
        let mut upcoming: Vec<Dinner> = self
            .load_dinners()?
            .into_iter()
            .filter(|dinner| dinner.event_date >= now)
            .collect();
        // Stable sort keeps id order for dinners on the same date.
        upcoming.sort_by_key(|dinner| dinner.event_date);
        Ok(upcoming)
    }
}

impl DinnerRepository for SqliteDinnerRepository<'_> {
    fn find_dinners_by_text(&self, q: &str) -> RepoResult<Vec<Dinner>> {
        let dinners = self.load_dinners()?;
        let scanned = dinners.len();
        let matches: Vec<Dinner> = dinners
            .into_iter()
            .filter(|dinner| {
                dinner.title.contains(q)
                    || dinner.description.contains(q)
                    || dinner.hosted_by.contains(q)
            })
            .collect();
        debug!(
            "event=dinner_scan module=repo kind=text scanned={scanned} matched={}",
            matches.len()
        );
        Ok(matches)
    }

    fn find_all_dinners(&self) -> RepoResult<Vec<Dinner>> {
        self.load_dinners()
    }

    fn find_upcoming_dinners(&self) -> RepoResult<Vec<Dinner>> {
        self.upcoming()
    }

    fn find_by_location(&self, latitude: f64, longitude: f64) -> RepoResult<Vec<Dinner>> {
        let origin = GeoPoint::new(latitude, longitude);
        let upcoming = self.upcoming()?;
        let scanned = upcoming.len();
        let local = within_radius(origin, upcoming);
        debug!(
            "event=dinner_scan module=repo kind=location scanned={scanned} matched={}",
            local.len()
        );
        Ok(local)
    }

    fn nearest_dinners(&self, latitude: f64, longitude: f64) -> RepoResult<Vec<Dinner>> {
        let origin = GeoPoint::new(latitude, longitude);
        let dinners = self.load_dinners()?;
        let scanned = dinners.len();
        let nearest = within_radius(origin, dinners);
        debug!(
            "event=dinner_scan module=repo kind=nearest scanned={scanned} matched={}",
            nearest.len()
        );
        Ok(nearest)
    }

    fn get_dinner(&self, id: DinnerId) -> RepoResult<Option<Dinner>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{DINNER_SELECT_SQL} WHERE dinner_id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };

        let mut dinner = parse_dinner_row(row)?;
        dinner.rsvps = load_rsvps_for_dinner(self.conn, id)?;
        Ok(Some(dinner))
    }

    fn add(&mut self, dinner: Dinner) {
        self.pending.push(PendingChange::InsertDinner(dinner));
    }

    fn update(&mut self, dinner: &Dinner) {
        self.pending.push(PendingChange::UpdateDinner(dinner.clone()));
    }

    fn add_rsvp(&mut self, dinner_id: DinnerId, attendee_name: &str) {
        self.pending.push(PendingChange::InsertRsvp {
            dinner_id,
            attendee_name: attendee_name.to_string(),
        });
    }

    fn delete_rsvp(&mut self, rsvp: &Rsvp) {
        self.pending.push(PendingChange::DeleteRsvp {
            rsvp_id: rsvp.rsvp_id,
            dinner_id: rsvp.dinner_id,
        });
    }

    fn delete(&mut self, dinner: &Dinner) {
        self.pending.push(PendingChange::DeleteDinner(dinner.dinner_id));
    }

    fn save(&mut self) -> RepoResult<SaveSummary> {
        if self.pending.is_empty() {
            return Ok(SaveSummary::default());
        }

        let started_at = Instant::now();
        let change_count = self.pending.len();

        match apply_pending(self.conn, &self.pending) {
            Ok(summary) => {
                self.pending.clear();
                info!(
                    "event=dinner_save module=repo status=ok changes={change_count} rows={} duration_ms={}",
                    summary.affected_rows(),
                    started_at.elapsed().as_millis()
                );
                Ok(summary)
            }
            Err(err) => {
                error!(
                    "event=dinner_save module=repo status=error changes={change_count} duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    fn pending_changes(&self) -> usize {
        self.pending.len()
    }

    fn discard_changes(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        if dropped > 0 {
            debug!("event=dinner_discard module=repo dropped={dropped}");
        }
        dropped
    }
}

fn within_radius(origin: GeoPoint, dinners: Vec<Dinner>) -> Vec<Dinner> {
    dinners
        .into_iter()
        .filter(|dinner| geo::is_nearby(geo::distance_between_points(origin, dinner.location())))
        .collect()
}

fn apply_pending(conn: &mut Connection, pending: &[PendingChange]) -> RepoResult<SaveSummary> {
    let mut summary = SaveSummary::default();
    let mut removed_dinners = HashSet::new();
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    for change in pending {
        apply_change(&tx, change, &mut summary, &mut removed_dinners)?;
    }
    tx.commit()?;
    Ok(summary)
}

fn apply_change(
    tx: &Transaction<'_>,
    change: &PendingChange,
    summary: &mut SaveSummary,
    removed_dinners: &mut HashSet<DinnerId>,
) -> RepoResult<()> {
    match change {
        PendingChange::InsertDinner(dinner) => {
            tx.execute(
                "INSERT INTO dinners (
                    title,
                    event_date,
                    description,
                    hosted_by,
                    contact_phone,
                    address,
                    country,
                    latitude,
                    longitude
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
                params![
                    dinner.title.as_str(),
                    dinner.event_date,
                    dinner.description.as_str(),
                    dinner.hosted_by.as_str(),
                    dinner.contact_phone.as_str(),
                    dinner.address.as_str(),
                    dinner.country.as_str(),
                    dinner.latitude,
                    dinner.longitude,
                ],
            )?;
            let dinner_id = tx.last_insert_rowid();
            summary.inserted_dinners.push(dinner_id);

            for rsvp in &dinner.rsvps {
                let rsvp_id = insert_rsvp(tx, dinner_id, &rsvp.attendee_name)?;
                summary.inserted_rsvps.push(rsvp_id);
            }
        }
        PendingChange::UpdateDinner(dinner) => {
            let changed = tx.execute(
                "UPDATE dinners
                 SET
                    title = ?1,
                    event_date = ?2,
                    description = ?3,
                    hosted_by = ?4,
                    contact_phone = ?5,
                    address = ?6,
                    country = ?7,
                    latitude = ?8,
                    longitude = ?9
                 WHERE dinner_id = ?10;",
                params![
                    dinner.title.as_str(),
                    dinner.event_date,
                    dinner.description.as_str(),
                    dinner.hosted_by.as_str(),
                    dinner.contact_phone.as_str(),
                    dinner.address.as_str(),
                    dinner.country.as_str(),
                    dinner.latitude,
                    dinner.longitude,
                    dinner.dinner_id,
                ],
            )?;
            if changed == 0 {
                return Err(RepoError::NotFound(dinner.dinner_id));
            }
            summary.updated_dinners += 1;
        }
        PendingChange::InsertRsvp {
            dinner_id,
            attendee_name,
        } => {
            if !dinner_exists_in_tx(tx, *dinner_id)? {
                return Err(RepoError::NotFound(*dinner_id));
            }
            let rsvp_id = insert_rsvp(tx, *dinner_id, attendee_name)?;
            summary.inserted_rsvps.push(rsvp_id);
        }
        PendingChange::DeleteRsvp { rsvp_id, dinner_id } => {
            let changed = tx.execute("DELETE FROM rsvps WHERE rsvp_id = ?1;", [*rsvp_id])?;
            // RSVPs of a dinner deleted earlier in this save are already gone.
            if changed == 0 && !removed_dinners.contains(dinner_id) {
                return Err(RepoError::RsvpNotFound(*rsvp_id));
            }
            summary.deleted_rsvps += changed;
        }
        PendingChange::DeleteDinner(dinner_id) => {
            if !dinner_exists_in_tx(tx, *dinner_id)? {
                return Err(RepoError::NotFound(*dinner_id));
            }
            summary.deleted_rsvps +=
                tx.execute("DELETE FROM rsvps WHERE dinner_id = ?1;", [*dinner_id])?;
            tx.execute("DELETE FROM dinners WHERE dinner_id = ?1;", [*dinner_id])?;
            summary.deleted_dinners += 1;
            removed_dinners.insert(*dinner_id);
        }
    }

    Ok(())
}

fn insert_rsvp(
    tx: &Transaction<'_>,
    dinner_id: DinnerId,
    attendee_name: &str,
) -> RepoResult<RsvpId> {
    tx.execute(
        "INSERT INTO rsvps (dinner_id, attendee_name) VALUES (?1, ?2);",
        params![dinner_id, attendee_name],
    )?;
    Ok(tx.last_insert_rowid())
}

fn dinner_exists_in_tx(tx: &Transaction<'_>, dinner_id: DinnerId) -> RepoResult<bool> {
    let exists: i64 = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM dinners WHERE dinner_id = ?1);",
        [dinner_id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn parse_dinner_row(row: &Row<'_>) -> RepoResult<Dinner> {
    let dinner_id: DinnerId = row.get("dinner_id")?;
    let latitude: f64 = row.get("latitude")?;
    let longitude: f64 = row.get("longitude")?;
    if !latitude.is_finite() || !longitude.is_finite() {
        return Err(RepoError::InvalidData(format!(
            "non-finite coordinates for dinner {dinner_id}"
        )));
    }

    Ok(Dinner {
        dinner_id,
        title: row.get("title")?,
        event_date: row.get("event_date")?,
        description: row.get("description")?,
        hosted_by: row.get("hosted_by")?,
        contact_phone: row.get("contact_phone")?,
        address: row.get("address")?,
        country: row.get("country")?,
        latitude,
        longitude,
        rsvps: Vec::new(),
    })
}

fn parse_rsvp_row(row: &Row<'_>) -> RepoResult<Rsvp> {
    Ok(Rsvp {
        rsvp_id: row.get("rsvp_id")?,
        dinner_id: row.get("dinner_id")?,
        attendee_name: row.get("attendee_name")?,
    })
}

fn load_rsvps_for_dinner(conn: &Connection, dinner_id: DinnerId) -> RepoResult<Vec<Rsvp>> {
    let mut stmt = conn.prepare(
        "SELECT rsvp_id, dinner_id, attendee_name
         FROM rsvps
         WHERE dinner_id = ?1
         ORDER BY rsvp_id ASC;",
    )?;
    let mut rows = stmt.query([dinner_id])?;
    let mut rsvps = Vec::new();
    while let Some(row) = rows.next()? {
        rsvps.push(parse_rsvp_row(row)?);
    }
    Ok(rsvps)
}

fn load_rsvps_by_dinner(conn: &Connection) -> RepoResult<HashMap<DinnerId, Vec<Rsvp>>> {
    let mut stmt = conn.prepare(
        "SELECT rsvp_id, dinner_id, attendee_name
         FROM rsvps
         ORDER BY rsvp_id ASC;",
    )?;
    let mut rows = stmt.query([])?;
    let mut grouped: HashMap<DinnerId, Vec<Rsvp>> = HashMap::new();
    while let Some(row) = rows.next()? {
        let rsvp = parse_rsvp_row(row)?;
        grouped.entry(rsvp.dinner_id).or_default().push(rsvp);
    }
    Ok(grouped)
}

fn system_now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX)
        })
}

fn ensure_dinner_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for (table, columns) in [("dinners", DINNER_COLUMNS), ("rsvps", RSVP_COLUMNS)] {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(RepoError::MissingRequiredColumn { table, column });
            }
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
