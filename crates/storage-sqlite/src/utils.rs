//! Helpers shared by the repositories.

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};

/// Maximum number of bound parameters per `IN (...)` list.
///
/// SQLite caps the number of parameters in a statement (`SQLITE_MAX_VARIABLE_NUMBER`,
/// 999 on older builds). Lookups keyed by message ids stay below that.
pub const SQLITE_MAX_PARAMS_CHUNK: usize = 500;

/// Splits `items` into slices small enough for one `IN (...)` query.
pub fn chunk_for_sqlite<T>(items: &[T]) -> impl Iterator<Item = &[T]> {
    items.chunks(SQLITE_MAX_PARAMS_CHUNK)
}

/// Current time at the millisecond precision stored in `TIMESTAMP` columns.
pub fn now_naive() -> NaiveDateTime {
    Utc::now().trunc_subsecs(3).naive_utc()
}

pub fn to_utc(value: NaiveDateTime) -> DateTime<Utc> {
    DateTime::from_naive_utc_and_offset(value, Utc)
}
