//! Store-side SQL scalar functions.
//!
//! `distance_between(lat1, long1, lat2, long2)` returns the great-circle
//! distance in miles so SQL filters can use the same radius rule as the
//! in-memory scans in the repository.

use super::DbResult;
use crate::geo;
use log::debug;
use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;

/// SQL name of the distance function.
pub const DISTANCE_BETWEEN_FN: &str = "distance_between";

/// Registers all store functions on `conn`.
///
/// Registration is per connection, so it runs as part of connection
/// bootstrap before any migration or query.
pub fn register_store_functions(conn: &Connection) -> DbResult<()> {
    conn.create_scalar_function(
        DISTANCE_BETWEEN_FN,
        4,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let lat1 = ctx.get::<f64>(0)?;
            let long1 = ctx.get::<f64>(1)?;
            let lat2 = ctx.get::<f64>(2)?;
            let long2 = ctx.get::<f64>(3)?;
            Ok(geo::distance_between(lat1, long1, lat2, long2))
        },
    )?;
    debug!("event=store_fn_register module=db status=ok name={DISTANCE_BETWEEN_FN}");
    Ok(())
}
