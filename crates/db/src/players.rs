use anyhow::Result;
use pickup_models::{Player, PlayerGame};
use sqlx::SqliteExecutor;

const PLAYER_COLUMNS: &str = "id, email, name, phone, created_at";

pub async fn get_player<'e>(db: impl SqliteExecutor<'e>, id: i64) -> Result<Option<Player>> {
    let sql = format!("SELECT {PLAYER_COLUMNS} FROM players WHERE id = ?");
    let player = sqlx::query_as::<_, Player>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(player)
}

/// Find or create the player for `email`. Known fields are kept when the
/// new values are missing.
pub async fn upsert_player_by_email<'e>(
    db: impl SqliteExecutor<'e>,
    email: &str,
    name: Option<&str>,
    phone: Option<&str>,
) -> Result<Player> {
    let sql = format!(
        "INSERT INTO players (email, name, phone) VALUES (?, ?, ?) \
         ON CONFLICT(email) DO UPDATE SET \
            name = COALESCE(excluded.name, players.name), \
            phone = COALESCE(excluded.phone, players.phone) \
         RETURNING {PLAYER_COLUMNS}"
    );
    let player = sqlx::query_as::<_, Player>(&sql)
        .bind(email.trim().to_lowercase())
        .bind(name)
        .bind(phone)
        .fetch_one(db)
        .await?;
    Ok(player)
}

/// Every game the player holds a confirmed booking for, individually or
/// through a season pass. A season pass hides an individual booking for the
/// same game.
pub async fn list_player_games<'e>(db: impl SqliteExecutor<'e>, player_id: i64) -> Result<Vec<PlayerGame>> {
    let games = sqlx::query_as::<_, PlayerGame>(
        "SELECT g.id AS game_id, g.name, g.date, g.time, g.location, g.season_id, \
                0 AS via_season, ga.attendance_status \
         FROM game_attendees ga JOIN games g ON g.id = ga.game_id \
         WHERE ga.player_id = ? AND ga.payment_status = 'completed' \
           AND NOT EXISTS ( \
               SELECT 1 FROM season_attendees sa2 \
               WHERE sa2.season_id = g.season_id AND sa2.player_id = ga.player_id \
                 AND sa2.payment_status = 'completed') \
         UNION ALL \
         SELECT g.id AS game_id, g.name, g.date, g.time, g.location, g.season_id, \
                1 AS via_season, sga.attendance_status \
         FROM season_attendees sa JOIN games g ON g.season_id = sa.season_id \
         LEFT JOIN season_game_attendance sga \
                ON sga.season_attendee_id = sa.id AND sga.game_id = g.id \
         WHERE sa.player_id = ? AND sa.payment_status = 'completed' \
         ORDER BY date, time",
    )
    .bind(player_id)
    .bind(player_id)
    .fetch_all(db)
    .await?;
    Ok(games)
}
