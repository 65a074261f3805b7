//! Fixtures shared by the database-backed tests.

use std::time::Duration;

use pickup_db::{attendees, connect_in_memory, players, NewGame, NewSeason};
use pickup_models::AttendanceStatus;
use sqlx::SqlitePool;

use crate::cache::RosterCache;
use crate::catalog;

pub async fn pool() -> SqlitePool {
    connect_in_memory().await.unwrap()
}

pub fn cache() -> RosterCache {
    RosterCache::new(Duration::from_secs(60))
}

pub async fn player(pool: &SqlitePool, n: i64) -> i64 {
    players::upsert_player_by_email(pool, &format!("player{n}@example.com"), Some(&format!("Player {n}")), None)
        .await
        .unwrap()
        .id
}

pub async fn standalone_game(pool: &SqlitePool, total_tickets: i64) -> i64 {
    let game = NewGame {
        group_id: None,
        season_id: None,
        name: "Thursday Pickup".to_string(),
        date: "2026-11-05".to_string(),
        time: "18:30".to_string(),
        location: "Dolores Park".to_string(),
        price: 1200,
        total_tickets,
        organizer_id: None,
    };
    catalog::create_game(pool, game).await.unwrap().id
}

/// A weekly season of `games` games, each with `game_spots` tickets.
pub async fn season(pool: &SqlitePool, games: i64, game_spots: i64, season_spots: i64) -> (i64, Vec<i64>) {
    let season = NewSeason {
        group_id: None,
        name: "Fall Futsal".to_string(),
        description: None,
        location: "Mission Rec Center".to_string(),
        season_price: 9000,
        individual_game_price: 1200,
        season_spots,
        game_spots,
        first_game_date: "2026-11-03".to_string(),
        first_game_time: "19:00".to_string(),
        repeat_type: "weekly".to_string(),
        repeat_count: games,
        include_organizer_in_count: false,
        organizer_id: None,
    };
    let (season, games) = catalog::create_season(pool, season).await.unwrap();
    (season.id, games.into_iter().map(|g| g.id).collect())
}

pub async fn ticket(pool: &SqlitePool, game_id: i64, player_id: i64, status: Option<AttendanceStatus>) {
    attendees::insert_game_attendee(pool, game_id, player_id, "completed", status)
        .await
        .unwrap();
}

pub async fn season_pass(pool: &SqlitePool, season_id: i64, player_id: i64) -> i64 {
    attendees::insert_season_attendee(pool, season_id, player_id, "completed")
        .await
        .unwrap()
        .id
}
