//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `nerddinner_core` linkage without any web host.
//! - Optionally open a dinner database and report what it holds.
//!
//! Usage: `nerddinner_cli [DB_PATH [SEARCH_TEXT]]`

use nerddinner_core::db::open_db;
use nerddinner_core::{DinnerRepository, SqliteDinnerRepository};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("nerddinner_core ping={}", nerddinner_core::ping());
    println!("nerddinner_core version={}", nerddinner_core::core_version());

    let mut args = std::env::args().skip(1);
    let Some(db_path) = args.next() else {
        return ExitCode::SUCCESS;
    };
    let search_text = args.next();

    match report(&db_path, search_text.as_deref()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("nerddinner_cli error={err}");
            ExitCode::FAILURE
        }
    }
}

fn report(db_path: &str, search_text: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let mut conn = open_db(db_path)?;
    let repo = SqliteDinnerRepository::try_new(&mut conn)?;

    println!("dinners total={}", repo.find_all_dinners()?.len());
    println!("dinners upcoming={}", repo.find_upcoming_dinners()?.len());

    if let Some(q) = search_text {
        for dinner in repo.find_dinners_by_text(q)? {
            println!(
                "match id={} date_ms={} title={}",
                dinner.dinner_id, dinner.event_date, dinner.title
            );
        }
    }

    Ok(())
}
