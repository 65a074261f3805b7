use anyhow::Result;
use pickup_models::{AttendanceStatus, GameAttendee, SeasonAttendee};
use sqlx::SqliteExecutor;

const GAME_ATTENDEE_COLUMNS: &str = "id, game_id, player_id, payment_status, attendance_status, \
    amount_paid, stripe_session_id, created_at";

const SEASON_ATTENDEE_COLUMNS: &str = "id, season_id, player_id, payment_status, amount_paid, \
    stripe_session_id, created_at";

pub async fn get_game_attendee<'e>(
    db: impl SqliteExecutor<'e>,
    game_id: i64,
    player_id: i64,
) -> Result<Option<GameAttendee>> {
    let sql = format!(
        "SELECT {GAME_ATTENDEE_COLUMNS} FROM game_attendees WHERE game_id = ? AND player_id = ?"
    );
    let row = sqlx::query_as::<_, GameAttendee>(&sql)
        .bind(game_id)
        .bind(player_id)
        .fetch_optional(db)
        .await?;
    Ok(row)
}

pub async fn get_season_attendee<'e>(
    db: impl SqliteExecutor<'e>,
    season_id: i64,
    player_id: i64,
) -> Result<Option<SeasonAttendee>> {
    let sql = format!(
        "SELECT {SEASON_ATTENDEE_COLUMNS} FROM season_attendees WHERE season_id = ? AND player_id = ?"
    );
    let row = sqlx::query_as::<_, SeasonAttendee>(&sql)
        .bind(season_id)
        .bind(player_id)
        .fetch_optional(db)
        .await?;
    Ok(row)
}

/// Inserts a raw attendee row. Bookings made through checkout go through
/// [`upsert_game_booking`]; this is for imports and fixtures.
pub async fn insert_game_attendee<'e>(
    db: impl SqliteExecutor<'e>,
    game_id: i64,
    player_id: i64,
    payment_status: &str,
    attendance_status: Option<AttendanceStatus>,
) -> Result<GameAttendee> {
    let sql = format!(
        "INSERT INTO game_attendees (game_id, player_id, payment_status, attendance_status) \
         VALUES (?, ?, ?, ?) RETURNING {GAME_ATTENDEE_COLUMNS}"
    );
    let row = sqlx::query_as::<_, GameAttendee>(&sql)
        .bind(game_id)
        .bind(player_id)
        .bind(payment_status)
        .bind(attendance_status.map(|s| s.as_str()))
        .fetch_one(db)
        .await?;
    Ok(row)
}

/// Records a confirmed, attending booking. Keyed on `(game_id, player_id)` so
/// an earlier pending row is promoted instead of duplicated.
pub async fn upsert_game_booking<'e>(
    db: impl SqliteExecutor<'e>,
    game_id: i64,
    player_id: i64,
    amount_paid: i64,
    stripe_session_id: Option<&str>,
) -> Result<GameAttendee> {
    let sql = format!(
        "INSERT INTO game_attendees \
            (game_id, player_id, payment_status, attendance_status, amount_paid, stripe_session_id) \
         VALUES (?, ?, 'completed', 'attending', ?, ?) \
         ON CONFLICT(game_id, player_id) DO UPDATE SET \
            payment_status = 'completed', \
            attendance_status = 'attending', \
            amount_paid = excluded.amount_paid, \
            stripe_session_id = excluded.stripe_session_id \
         RETURNING {GAME_ATTENDEE_COLUMNS}"
    );
    let row = sqlx::query_as::<_, GameAttendee>(&sql)
        .bind(game_id)
        .bind(player_id)
        .bind(amount_paid)
        .bind(stripe_session_id)
        .fetch_one(db)
        .await?;
    Ok(row)
}

pub async fn set_game_attendance_status<'e>(
    db: impl SqliteExecutor<'e>,
    game_id: i64,
    player_id: i64,
    status: AttendanceStatus,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE game_attendees SET attendance_status = ? WHERE game_id = ? AND player_id = ?",
    )
    .bind(status.as_str())
    .bind(game_id)
    .bind(player_id)
    .execute(db)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Raw season pass insert, mirroring [`insert_game_attendee`].
pub async fn insert_season_attendee<'e>(
    db: impl SqliteExecutor<'e>,
    season_id: i64,
    player_id: i64,
    payment_status: &str,
) -> Result<SeasonAttendee> {
    let sql = format!(
        "INSERT INTO season_attendees (season_id, player_id, payment_status) \
         VALUES (?, ?, ?) RETURNING {SEASON_ATTENDEE_COLUMNS}"
    );
    let row = sqlx::query_as::<_, SeasonAttendee>(&sql)
        .bind(season_id)
        .bind(player_id)
        .bind(payment_status)
        .fetch_one(db)
        .await?;
    Ok(row)
}

pub async fn upsert_season_pass<'e>(
    db: impl SqliteExecutor<'e>,
    season_id: i64,
    player_id: i64,
    amount_paid: i64,
    stripe_session_id: Option<&str>,
) -> Result<SeasonAttendee> {
    let sql = format!(
        "INSERT INTO season_attendees (season_id, player_id, payment_status, amount_paid, stripe_session_id) \
         VALUES (?, ?, 'completed', ?, ?) \
         ON CONFLICT(season_id, player_id) DO UPDATE SET \
            payment_status = 'completed', \
            amount_paid = excluded.amount_paid, \
            stripe_session_id = excluded.stripe_session_id \
         RETURNING {SEASON_ATTENDEE_COLUMNS}"
    );
    let row = sqlx::query_as::<_, SeasonAttendee>(&sql)
        .bind(season_id)
        .bind(player_id)
        .bind(amount_paid)
        .bind(stripe_session_id)
        .fetch_one(db)
        .await?;
    Ok(row)
}

pub async fn count_confirmed_passes<'e>(db: impl SqliteExecutor<'e>, season_id: i64) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM season_attendees WHERE season_id = ? AND payment_status = 'completed'",
    )
    .bind(season_id)
    .fetch_one(db)
    .await?;
    Ok(count)
}

/// Sets a pass holder's choice for one game; replaying the same status
/// rewrites the same row.
pub async fn upsert_season_game_attendance<'e>(
    db: impl SqliteExecutor<'e>,
    season_attendee_id: i64,
    game_id: i64,
    status: AttendanceStatus,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO season_game_attendance (season_attendee_id, game_id, attendance_status) \
         VALUES (?, ?, ?) \
         ON CONFLICT(season_attendee_id, game_id) DO UPDATE SET \
            attendance_status = excluded.attendance_status, \
            updated_at = datetime('now')",
    )
    .bind(season_attendee_id)
    .bind(game_id)
    .bind(status.as_str())
    .execute(db)
    .await?;
    Ok(())
}

/// Opts a new pass holder into a game without touching an existing choice.
pub async fn seed_season_game_attendance<'e>(
    db: impl SqliteExecutor<'e>,
    season_attendee_id: i64,
    game_id: i64,
) -> Result<bool> {
    let result = sqlx::query(
        "INSERT INTO season_game_attendance (season_attendee_id, game_id, attendance_status) \
         VALUES (?, ?, 'attending') \
         ON CONFLICT(season_attendee_id, game_id) DO NOTHING",
    )
    .bind(season_attendee_id)
    .bind(game_id)
    .execute(db)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count_game_attendee_rows<'e>(
    db: impl SqliteExecutor<'e>,
    game_id: i64,
    player_id: i64,
) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM game_attendees WHERE game_id = ? AND player_id = ?",
    )
    .bind(game_id)
    .bind(player_id)
    .fetch_one(db)
    .await?;
    Ok(count)
}

pub async fn count_season_game_attendance_rows<'e>(
    db: impl SqliteExecutor<'e>,
    season_attendee_id: i64,
    game_id: i64,
) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM season_game_attendance WHERE season_attendee_id = ? AND game_id = ?",
    )
    .bind(season_attendee_id)
    .bind(game_id)
    .fetch_one(db)
    .await?;
    Ok(count)
}
