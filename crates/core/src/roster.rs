use pickup_db::{games, roster};
use pickup_models::{Attendee, Game};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::cache::RosterCache;
use crate::capacity::Occupancy;
use crate::error::{Error, Result};
use crate::resolver::resolve_attendees;

/// A game with its resolved attendees, as shown on a game page.
#[derive(Debug, Clone, Serialize)]
pub struct GameRoster {
    pub game: Game,
    pub attendees: Vec<Attendee>,
    pub occupancy: Occupancy,
}

/// Resolves the roster for `game_id`, serving from `cache` when fresh.
pub async fn game_roster(pool: &SqlitePool, cache: &RosterCache, game_id: i64) -> Result<GameRoster> {
    if let Some(hit) = cache.get(&game_id).await {
        return Ok(hit);
    }
    let seen = cache.version().await;

    let mut conn = pool.acquire().await?;
    let game = games::get_game(&mut *conn, game_id)
        .await?
        .ok_or_else(|| Error::not_found("Game", game_id))?;
    let input = roster::load(&mut conn, game_id)
        .await?
        .ok_or_else(|| Error::not_found("Game", game_id))?;

    let resolved = GameRoster {
        game,
        attendees: resolve_attendees(&input),
        occupancy: Occupancy::of(&input),
    };
    cache.insert_if_current(game_id, resolved.clone(), seen).await;
    Ok(resolved)
}
