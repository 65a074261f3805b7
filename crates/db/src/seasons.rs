use anyhow::Result;
use pickup_models::Season;
use sqlx::{SqliteConnection, SqliteExecutor};

const SEASON_COLUMNS: &str = "id, group_id, name, description, location, season_price, \
    individual_game_price, season_spots, game_spots, first_game_date, first_game_time, \
    repeat_type, repeat_count, include_organizer_in_count, organizer_id, created_at";

#[derive(Debug, Clone)]
pub struct NewSeason {
    pub group_id: Option<i64>,
    pub name: String,
    pub description: Option<String>,
    pub location: String,
    pub season_price: i64,
    pub individual_game_price: i64,
    pub season_spots: i64,
    pub game_spots: i64,
    pub first_game_date: String,
    pub first_game_time: String,
    pub repeat_type: String,
    pub repeat_count: i64,
    pub include_organizer_in_count: bool,
    pub organizer_id: Option<i64>,
}

pub async fn get_season<'e>(db: impl SqliteExecutor<'e>, id: i64) -> Result<Option<Season>> {
    let sql = format!("SELECT {SEASON_COLUMNS} FROM seasons WHERE id = ?");
    let season = sqlx::query_as::<_, Season>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(season)
}

pub async fn list_seasons_for_group<'e>(db: impl SqliteExecutor<'e>, group_id: i64) -> Result<Vec<Season>> {
    let sql = format!("SELECT {SEASON_COLUMNS} FROM seasons WHERE group_id = ? ORDER BY first_game_date");
    let seasons = sqlx::query_as::<_, Season>(&sql)
        .bind(group_id)
        .fetch_all(db)
        .await?;
    Ok(seasons)
}

pub async fn insert_season<'e>(db: impl SqliteExecutor<'e>, season: &NewSeason) -> Result<Season> {
    let sql = format!(
        "INSERT INTO seasons (group_id, name, description, location, season_price, \
            individual_game_price, season_spots, game_spots, first_game_date, first_game_time, \
            repeat_type, repeat_count, include_organizer_in_count, organizer_id) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
         RETURNING {SEASON_COLUMNS}"
    );
    let row = sqlx::query_as::<_, Season>(&sql)
        .bind(season.group_id)
        .bind(&season.name)
        .bind(&season.description)
        .bind(&season.location)
        .bind(season.season_price)
        .bind(season.individual_game_price)
        .bind(season.season_spots)
        .bind(season.game_spots)
        .bind(&season.first_game_date)
        .bind(&season.first_game_time)
        .bind(&season.repeat_type)
        .bind(season.repeat_count)
        .bind(season.include_organizer_in_count)
        .bind(season.organizer_id)
        .fetch_one(db)
        .await?;
    Ok(row)
}

/// Season counterpart of [`crate::games::lock_game`].
pub async fn lock_season(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
    let result = sqlx::query("UPDATE seasons SET id = id WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}
