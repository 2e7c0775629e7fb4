use chrono::{DateTime, Days, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::sql_types::{Bool, Integer, Uuid as SqlUuid};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Generations allowed per user per UTC day.
pub const DAILY_LIMIT: i32 = 100;

#[derive(QueryableByName)]
struct AllowedRow {
    #[diesel(sql_type = Bool)]
    allowed: bool,
}

#[derive(QueryableByName)]
struct RemainingRow {
    #[diesel(sql_type = Integer)]
    remaining: i32,
}

/// Atomically reserves `count` generations against today's quota.
///
/// The stored procedure performs the daily reset, the limit check and the
/// counter bump in one conditional UPDATE, so concurrent requests cannot
/// overshoot the limit. Returns `false` when the reservation would exceed it.
pub fn reserve_generations(conn: &mut PgConnection, user_id: Uuid, count: i32) -> AppResult<bool> {
    let row = diesel::sql_query("SELECT check_and_update_daily_limit($1, $2, $3) AS allowed")
        .bind::<SqlUuid, _>(user_id)
        .bind::<Integer, _>(count)
        .bind::<Integer, _>(DAILY_LIMIT)
        .get_result::<AllowedRow>(conn)?;
    Ok(row.allowed)
}

/// How many generations the user has left today, accounting for the daily
/// reset without writing anything.
pub fn remaining_generations(conn: &mut PgConnection, user_id: Uuid) -> AppResult<i32> {
    let row = diesel::sql_query("SELECT get_remaining_generations($1, $2) AS remaining")
        .bind::<SqlUuid, _>(user_id)
        .bind::<Integer, _>(DAILY_LIMIT)
        .get_result::<RemainingRow>(conn)?;
    Ok(row.remaining)
}

/// Returns reserved generations after a failed batch. Only same-day refunds
/// apply and the counter never drops below zero.
pub fn refund_generations(conn: &mut PgConnection, user_id: Uuid, count: i32) -> AppResult<()> {
    diesel::sql_query("SELECT refund_daily_limit($1, $2)")
        .bind::<SqlUuid, _>(user_id)
        .bind::<Integer, _>(count)
        .execute(conn)?;
    Ok(())
}

/// The next UTC midnight, when quotas reset.
pub fn next_reset_time() -> AppResult<DateTime<Utc>> {
    let tomorrow = Utc::now()
        .date_naive()
        .checked_add_days(Days::new(1))
        .ok_or_else(|| AppError::internal("date overflow computing quota reset"))?;
    let midnight = tomorrow
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| AppError::internal("invalid midnight timestamp"))?;
    Ok(midnight.and_utc())
}
