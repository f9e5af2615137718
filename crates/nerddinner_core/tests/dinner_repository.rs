use nerddinner_core::db::migrations::latest_version;
use nerddinner_core::db::open_db_in_memory;
use nerddinner_core::{Dinner, DinnerRepository, RepoError, Rsvp, SqliteDinnerRepository};
use rusqlite::Connection;

const NOW: i64 = 1_700_000_000_000;
const HOUR_MS: i64 = 60 * 60 * 1000;

const SEATTLE: (f64, f64) = (47.6062, -122.3321);
const BELLEVUE: (f64, f64) = (47.6101, -122.2015);
const PORTLAND: (f64, f64) = (45.5152, -122.6784);

fn fixed_clock() -> i64 {
    NOW
}

fn dinner_at(title: &str, event_date: i64, (latitude, longitude): (f64, f64)) -> Dinner {
    let mut dinner = Dinner::new(title, event_date, "host");
    dinner.description = format!("{title} description");
    dinner.latitude = latitude;
    dinner.longitude = longitude;
    dinner
}

fn seed(conn: &mut Connection, dinners: Vec<Dinner>) -> Vec<i64> {
    let mut repo = SqliteDinnerRepository::try_new(conn).unwrap();
    for dinner in dinners {
        repo.add(dinner);
    }
    repo.save().unwrap().inserted_dinners
}

fn titles(dinners: &[Dinner]) -> Vec<&str> {
    dinners.iter().map(|dinner| dinner.title.as_str()).collect()
}

#[test]
fn add_then_save_assigns_id_and_get_roundtrips() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteDinnerRepository::try_new(&mut conn).unwrap();

    let mut dinner = dinner_at("Pho night", NOW + HOUR_MS, SEATTLE);
    dinner.contact_phone = "425-555-1212".to_string();
    dinner.country = "USA".to_string();
    repo.add(dinner.clone());
    let summary = repo.save().unwrap();

    assert_eq!(summary.inserted_dinners.len(), 1);
    let id = summary.inserted_dinners[0];
    assert!(id > 0);

    let loaded = repo.get_dinner(id).unwrap().unwrap();
    assert_eq!(loaded.dinner_id, id);
    assert_eq!(loaded.title, "Pho night");
    assert_eq!(loaded.contact_phone, "425-555-1212");
    assert_eq!(loaded.latitude, SEATTLE.0);
    assert!(loaded.rsvps.is_empty());
}

#[test]
fn get_missing_dinner_returns_none() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteDinnerRepository::try_new(&mut conn).unwrap();
    assert!(repo.get_dinner(404).unwrap().is_none());
}

#[test]
fn staged_changes_are_invisible_until_save() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteDinnerRepository::try_new(&mut conn).unwrap();

    repo.add(dinner_at("staged", NOW, SEATTLE));
    assert_eq!(repo.pending_changes(), 1);
    assert!(repo.find_all_dinners().unwrap().is_empty());

    repo.save().unwrap();
    assert_eq!(repo.pending_changes(), 0);
    assert_eq!(repo.find_all_dinners().unwrap().len(), 1);
}

#[test]
fn save_without_changes_is_a_noop() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteDinnerRepository::try_new(&mut conn).unwrap();
    let summary = repo.save().unwrap();
    assert_eq!(summary.affected_rows(), 0);
}

#[test]
fn find_all_orders_by_id() {
    let mut conn = open_db_in_memory().unwrap();
    let ids = seed(
        &mut conn,
        vec![
            dinner_at("b", NOW + 2 * HOUR_MS, SEATTLE),
            dinner_at("a", NOW - HOUR_MS, PORTLAND),
            dinner_at("c", NOW, BELLEVUE),
        ],
    );

    let repo = SqliteDinnerRepository::try_new(&mut conn).unwrap();
    let all = repo.find_all_dinners().unwrap();
    let loaded_ids: Vec<_> = all.iter().map(|dinner| dinner.dinner_id).collect();
    assert_eq!(loaded_ids, ids);
    assert_eq!(titles(&all), vec!["b", "a", "c"]);
}

#[test]
fn text_search_matches_title_description_or_host() {
    let mut conn = open_db_in_memory().unwrap();
    let mut by_title = dinner_at("Rust supper", NOW, SEATTLE);
    by_title.description = "plain".to_string();
    let mut by_description = dinner_at("Brunch", NOW, SEATTLE);
    by_description.description = "talking Rust over eggs".to_string();
    let mut by_host = dinner_at("Tacos", NOW, SEATTLE);
    by_host.description = "plain".to_string();
    by_host.hosted_by = "RustFan".to_string();
    let mut unrelated = dinner_at("Sushi", NOW, SEATTLE);
    unrelated.description = "plain".to_string();
    seed(
        &mut conn,
        vec![by_title, by_description, by_host, unrelated],
    );

    let repo = SqliteDinnerRepository::try_new(&mut conn).unwrap();
    let found = repo.find_dinners_by_text("Rust").unwrap();
    assert_eq!(titles(&found), vec!["Rust supper", "Brunch", "Tacos"]);
}

#[test]
fn text_search_is_case_sensitive_and_empty_matches_all() {
    let mut conn = open_db_in_memory().unwrap();
    seed(
        &mut conn,
        vec![
            dinner_at("Rust supper", NOW, SEATTLE),
            dinner_at("Sushi", NOW, SEATTLE),
        ],
    );

    let repo = SqliteDinnerRepository::try_new(&mut conn).unwrap();
    assert!(repo.find_dinners_by_text("rust supper").unwrap().is_empty());
    assert_eq!(repo.find_dinners_by_text("").unwrap().len(), 2);
}

#[test]
fn upcoming_excludes_past_and_sorts_by_date() {
    let mut conn = open_db_in_memory().unwrap();
    seed(
        &mut conn,
        vec![
            dinner_at("later", NOW + 2 * HOUR_MS, SEATTLE),
            dinner_at("past", NOW - 1, SEATTLE),
            dinner_at("now", NOW, SEATTLE),
            dinner_at("soon", NOW + HOUR_MS, SEATTLE),
        ],
    );

    let repo = SqliteDinnerRepository::try_new(&mut conn)
        .unwrap()
        .with_clock(fixed_clock);
    let upcoming = repo.find_upcoming_dinners().unwrap();
    assert_eq!(titles(&upcoming), vec!["now", "soon", "later"]);
}

#[test]
fn upcoming_keeps_id_order_for_same_date() {
    let mut conn = open_db_in_memory().unwrap();
    seed(
        &mut conn,
        vec![
            dinner_at("first", NOW + HOUR_MS, SEATTLE),
            dinner_at("second", NOW + HOUR_MS, SEATTLE),
        ],
    );

    let repo = SqliteDinnerRepository::try_new(&mut conn)
        .unwrap()
        .with_clock(fixed_clock);
    let upcoming = repo.find_upcoming_dinners().unwrap();
    assert_eq!(titles(&upcoming), vec!["first", "second"]);
}

#[test]
fn nearest_dinners_includes_past_events_within_radius() {
    let mut conn = open_db_in_memory().unwrap();
    seed(
        &mut conn,
        vec![
            dinner_at("seattle past", NOW - HOUR_MS, SEATTLE),
            dinner_at("bellevue", NOW + HOUR_MS, BELLEVUE),
            dinner_at("portland", NOW + HOUR_MS, PORTLAND),
        ],
    );

    let repo = SqliteDinnerRepository::try_new(&mut conn)
        .unwrap()
        .with_clock(fixed_clock);
    let nearest = repo.nearest_dinners(SEATTLE.0, SEATTLE.1).unwrap();
    assert_eq!(titles(&nearest), vec!["seattle past", "bellevue"]);
}

#[test]
fn nearest_dinners_radius_is_strict_at_one_hundred_miles() {
    let mut conn = open_db_in_memory().unwrap();
    seed(
        &mut conn,
        vec![
            dinner_at("inside", NOW, (0.0, 1.445)),
            dinner_at("outside", NOW, (0.0, 1.447)),
        ],
    );

    let repo = SqliteDinnerRepository::try_new(&mut conn).unwrap();
    let nearest = repo.nearest_dinners(0.0, 0.0).unwrap();
    assert_eq!(titles(&nearest), vec!["inside"]);
}

#[test]
fn find_by_location_returns_upcoming_nearby_dinners_only() {
    let mut conn = open_db_in_memory().unwrap();
    seed(
        &mut conn,
        vec![
            dinner_at("bellevue later", NOW + 2 * HOUR_MS, BELLEVUE),
            dinner_at("seattle past", NOW - HOUR_MS, SEATTLE),
            dinner_at("portland", NOW + HOUR_MS, PORTLAND),
            dinner_at("seattle soon", NOW + HOUR_MS, SEATTLE),
        ],
    );

    let repo = SqliteDinnerRepository::try_new(&mut conn)
        .unwrap()
        .with_clock(fixed_clock);
    let local = repo.find_by_location(SEATTLE.0, SEATTLE.1).unwrap();
    assert_eq!(titles(&local), vec!["seattle soon", "bellevue later"]);

    let from_portland = repo.find_by_location(PORTLAND.0, PORTLAND.1).unwrap();
    assert_eq!(titles(&from_portland), vec!["portland"]);
}

#[test]
fn added_dinner_carries_its_rsvps() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteDinnerRepository::try_new(&mut conn).unwrap();

    let mut dinner = dinner_at("potluck", NOW, SEATTLE);
    dinner.rsvps.push(Rsvp::new(0, "alice"));
    dinner.rsvps.push(Rsvp::new(0, "bob"));
    repo.add(dinner);
    let summary = repo.save().unwrap();
    assert_eq!(summary.inserted_rsvps.len(), 2);

    let loaded = repo.get_dinner(summary.inserted_dinners[0]).unwrap().unwrap();
    let names: Vec<_> = loaded
        .rsvps
        .iter()
        .map(|rsvp| rsvp.attendee_name.as_str())
        .collect();
    assert_eq!(names, vec!["alice", "bob"]);
    assert!(loaded
        .rsvps
        .iter()
        .all(|rsvp| rsvp.dinner_id == loaded.dinner_id));
}

#[test]
fn add_and_delete_rsvp() {
    let mut conn = open_db_in_memory().unwrap();
    let ids = seed(&mut conn, vec![dinner_at("potluck", NOW, SEATTLE)]);
    let mut repo = SqliteDinnerRepository::try_new(&mut conn).unwrap();

    repo.add_rsvp(ids[0], "carol");
    repo.save().unwrap();
    let dinner = repo.get_dinner(ids[0]).unwrap().unwrap();
    assert!(dinner.is_user_registered("Carol"));

    repo.delete_rsvp(&dinner.rsvps[0]);
    let summary = repo.save().unwrap();
    assert_eq!(summary.deleted_rsvps, 1);
    assert!(repo.get_dinner(ids[0]).unwrap().unwrap().rsvps.is_empty());
}

#[test]
fn add_rsvp_to_missing_dinner_is_not_found() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteDinnerRepository::try_new(&mut conn).unwrap();

    repo.add_rsvp(77, "nobody");
    let err = repo.save().unwrap_err();
    assert!(matches!(err, RepoError::NotFound(77)));
}

#[test]
fn delete_removes_dinner_and_rsvps_together() {
    let mut conn = open_db_in_memory().unwrap();
    let mut dinner = dinner_at("farewell", NOW, SEATTLE);
    dinner.rsvps.push(Rsvp::new(0, "alice"));
    dinner.rsvps.push(Rsvp::new(0, "bob"));
    let ids = seed(&mut conn, vec![dinner, dinner_at("other", NOW, SEATTLE)]);

    {
        let mut repo = SqliteDinnerRepository::try_new(&mut conn).unwrap();
        let target = repo.get_dinner(ids[0]).unwrap().unwrap();
        repo.delete(&target);
        let summary = repo.save().unwrap();
        assert_eq!(summary.deleted_dinners, 1);
        assert_eq!(summary.deleted_rsvps, 2);
        assert!(repo.get_dinner(ids[0]).unwrap().is_none());
        assert!(repo.get_dinner(ids[1]).unwrap().is_some());
    }

    let remaining_rsvps: i64 = conn
        .query_row("SELECT COUNT(*) FROM rsvps;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(remaining_rsvps, 0);
}

#[test]
fn update_changes_columns_of_existing_dinner() {
    let mut conn = open_db_in_memory().unwrap();
    let ids = seed(&mut conn, vec![dinner_at("draft", NOW, SEATTLE)]);
    let mut repo = SqliteDinnerRepository::try_new(&mut conn).unwrap();

    let mut dinner = repo.get_dinner(ids[0]).unwrap().unwrap();
    dinner.title = "final".to_string();
    dinner.latitude = PORTLAND.0;
    dinner.longitude = PORTLAND.1;
    repo.update(&dinner);
    assert_eq!(repo.save().unwrap().updated_dinners, 1);

    let loaded = repo.get_dinner(ids[0]).unwrap().unwrap();
    assert_eq!(loaded.title, "final");
    assert_eq!(loaded.latitude, PORTLAND.0);
}

#[test]
fn failed_save_rolls_back_and_keeps_staged_changes() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteDinnerRepository::try_new(&mut conn).unwrap();

    let mut ghost = dinner_at("ghost", NOW, SEATTLE);
    ghost.dinner_id = 999;
    repo.add(dinner_at("fresh", NOW, SEATTLE));
    repo.update(&ghost);

    let err = repo.save().unwrap_err();
    assert!(matches!(err, RepoError::NotFound(999)));
    assert!(repo.find_all_dinners().unwrap().is_empty());
    assert_eq!(repo.pending_changes(), 2);

    assert_eq!(repo.discard_changes(), 2);
    assert_eq!(repo.pending_changes(), 0);
}

#[test]
fn delete_missing_dinner_is_not_found() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteDinnerRepository::try_new(&mut conn).unwrap();

    let mut ghost = dinner_at("ghost", NOW, SEATTLE);
    ghost.dinner_id = 5;
    repo.delete(&ghost);
    assert!(matches!(repo.save().unwrap_err(), RepoError::NotFound(5)));
}

#[test]
fn delete_missing_rsvp_is_rsvp_not_found() {
    let mut conn = open_db_in_memory().unwrap();
    let ids = seed(&mut conn, vec![dinner_at("quiet", NOW, SEATTLE)]);
    let mut repo = SqliteDinnerRepository::try_new(&mut conn).unwrap();

    let ghost = Rsvp {
        rsvp_id: 42,
        dinner_id: ids[0],
        attendee_name: "nobody".to_string(),
    };
    repo.delete_rsvp(&ghost);
    assert!(matches!(repo.save().unwrap_err(), RepoError::RsvpNotFound(42)));
    assert_eq!(repo.pending_changes(), 1);
}

#[test]
fn rsvp_delete_after_its_dinner_delete_in_same_save_succeeds() {
    let mut conn = open_db_in_memory().unwrap();
    let mut dinner = dinner_at("cancelled", NOW, SEATTLE);
    dinner.rsvps.push(Rsvp::new(0, "alice"));
    let ids = seed(&mut conn, vec![dinner]);
    let mut repo = SqliteDinnerRepository::try_new(&mut conn).unwrap();

    let target = repo.get_dinner(ids[0]).unwrap().unwrap();
    repo.delete(&target);
    repo.delete_rsvp(&target.rsvps[0]);
    let summary = repo.save().unwrap();
    assert_eq!(summary.deleted_dinners, 1);
    assert_eq!(summary.deleted_rsvps, 1);
    assert_eq!(repo.pending_changes(), 0);
    assert!(repo.get_dinner(ids[0]).unwrap().is_none());
}

#[test]
fn non_finite_coordinates_are_invalid_data() {
    let mut conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO dinners (title, event_date, latitude, longitude)
         VALUES ('broken', 0, 9e999, 0);",
        [],
    )
    .unwrap();
    let repo = SqliteDinnerRepository::try_new(&mut conn).unwrap();

    assert!(matches!(
        repo.find_all_dinners().unwrap_err(),
        RepoError::InvalidData(_)
    ));
    assert!(matches!(
        repo.get_dinner(1).unwrap_err(),
        RepoError::InvalidData(_)
    ));
}

#[test]
fn distance_helper_matches_geo_module() {
    let via_repo = SqliteDinnerRepository::distance_between(
        SEATTLE.0, SEATTLE.1, PORTLAND.0, PORTLAND.1,
    );
    let via_geo = nerddinner_core::distance_between(SEATTLE.0, SEATTLE.1, PORTLAND.0, PORTLAND.1);
    assert_eq!(via_repo, via_geo);
    assert!(via_repo > nerddinner_core::NEARBY_RADIUS_MILES);
}

#[test]
fn repository_rejects_uninitialized_connection() {
    let mut conn = Connection::open_in_memory().unwrap();

    match SqliteDinnerRepository::try_new(&mut conn) {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert_eq!(expected_version, latest_version()),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

#[test]
fn repository_rejects_connection_without_rsvps_table() {
    let mut conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!(
        "CREATE TABLE dinners (
            dinner_id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            event_date INTEGER NOT NULL,
            description TEXT NOT NULL,
            hosted_by TEXT NOT NULL,
            contact_phone TEXT NOT NULL,
            address TEXT NOT NULL,
            country TEXT NOT NULL,
            latitude REAL NOT NULL,
            longitude REAL NOT NULL
        );
        PRAGMA user_version = {};",
        latest_version()
    ))
    .unwrap();

    assert!(matches!(
        SqliteDinnerRepository::try_new(&mut conn),
        Err(RepoError::MissingRequiredTable("rsvps"))
    ));
}

#[test]
fn repository_rejects_dinners_table_missing_column() {
    let mut conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!(
        "CREATE TABLE dinners (
            dinner_id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            event_date INTEGER NOT NULL
        );
        PRAGMA user_version = {};",
        latest_version()
    ))
    .unwrap();

    assert!(matches!(
        SqliteDinnerRepository::try_new(&mut conn),
        Err(RepoError::MissingRequiredColumn {
            table: "dinners",
            column: "description"
        })
    ));
}
