use anyhow::Result;
use pickup_models::Game;
use sqlx::{SqliteConnection, SqliteExecutor};

pub(crate) const GAME_COLUMNS: &str = "id, group_id, season_id, name, date, time, location, \
    price, total_tickets, organizer_id, created_at";

#[derive(Debug, Clone)]
pub struct NewGame {
    pub group_id: Option<i64>,
    pub season_id: Option<i64>,
    pub name: String,
    pub date: String,
    pub time: String,
    pub location: String,
    pub price: i64,
    pub total_tickets: i64,
    pub organizer_id: Option<i64>,
}

/// Games ordered by date, optionally only those on or after `from_date`
/// (`YYYY-MM-DD`).
pub async fn list_games<'e>(db: impl SqliteExecutor<'e>, from_date: Option<&str>) -> Result<Vec<Game>> {
    let games = match from_date {
        Some(d) => {
            let sql = format!("SELECT {GAME_COLUMNS} FROM games WHERE date >= ? ORDER BY date, time");
            sqlx::query_as::<_, Game>(&sql)
                .bind(d)
                .fetch_all(db)
                .await?
        }
        None => {
            let sql = format!("SELECT {GAME_COLUMNS} FROM games ORDER BY date, time");
            sqlx::query_as::<_, Game>(&sql)
                .fetch_all(db)
                .await?
        }
    };
    Ok(games)
}

pub async fn list_games_for_season<'e>(db: impl SqliteExecutor<'e>, season_id: i64) -> Result<Vec<Game>> {
    let sql = format!("SELECT {GAME_COLUMNS} FROM games WHERE season_id = ? ORDER BY date, time");
    let games = sqlx::query_as::<_, Game>(&sql)
        .bind(season_id)
        .fetch_all(db)
        .await?;
    Ok(games)
}

pub async fn list_games_for_group<'e>(db: impl SqliteExecutor<'e>, group_id: i64) -> Result<Vec<Game>> {
    let sql = format!("SELECT {GAME_COLUMNS} FROM games WHERE group_id = ? ORDER BY date, time");
    let games = sqlx::query_as::<_, Game>(&sql)
        .bind(group_id)
        .fetch_all(db)
        .await?;
    Ok(games)
}

pub async fn get_game<'e>(db: impl SqliteExecutor<'e>, id: i64) -> Result<Option<Game>> {
    let sql = format!("SELECT {GAME_COLUMNS} FROM games WHERE id = ?");
    let game = sqlx::query_as::<_, Game>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(game)
}

pub async fn insert_game<'e>(db: impl SqliteExecutor<'e>, game: &NewGame) -> Result<Game> {
    let sql = format!(
        "INSERT INTO games (group_id, season_id, name, date, time, location, price, \
            total_tickets, organizer_id) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
         RETURNING {GAME_COLUMNS}"
    );
    let row = sqlx::query_as::<_, Game>(&sql)
        .bind(game.group_id)
        .bind(game.season_id)
        .bind(&game.name)
        .bind(&game.date)
        .bind(&game.time)
        .bind(&game.location)
        .bind(game.price)
        .bind(game.total_tickets)
        .bind(game.organizer_id)
        .fetch_one(db)
        .await?;
    Ok(row)
}

/// Takes the database write lock inside the caller's transaction by touching
/// the game row. Returns false when the game does not exist.
pub async fn lock_game(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
    let result = sqlx::query("UPDATE games SET id = id WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}
