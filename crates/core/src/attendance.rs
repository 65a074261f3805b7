//! Attendance toggles for players who already hold a booking.
//!
//! Every change runs in one transaction that first takes the database write
//! lock through the game row, so the capacity check and the write cannot
//! interleave with another booking for the same spot.

use std::collections::{BTreeMap, HashSet};

use pickup_db::{attendees, games, roster, seasons};
use pickup_models::{AttendanceStatus, AttendeeSource, PaymentStatus, RosterInput};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use crate::cache::RosterCache;
use crate::capacity::{check_capacity, Occupancy};
use crate::error::{Error, Result};
use crate::resolver::{confirmed_pass, confirmed_ticket, effective_status};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetAttendance {
    pub game_id: i64,
    pub player_id: i64,
    /// Optional cross-check against the game's own season.
    pub season_id: Option<i64>,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttendanceChange {
    pub game_id: i64,
    pub player_id: i64,
    pub status: AttendanceStatus,
    pub source: AttendeeSource,
    /// Spots left after the change.
    pub available: i64,
}

pub async fn set_attendance(pool: &SqlitePool, cache: &RosterCache, req: SetAttendance) -> Result<AttendanceChange> {
    let mut tx = pool.begin().await?;
    if !games::lock_game(&mut tx, req.game_id).await? {
        return Err(Error::not_found("Game", req.game_id));
    }
    let input = load_roster(&mut tx, req.game_id).await?;
    if let Some(season_id) = req.season_id {
        if input.game.season_id != Some(season_id) {
            return Err(Error::validation(format!(
                "game {} is not part of season {season_id}",
                req.game_id
            )));
        }
    }

    let source = apply(&mut tx, &input, req.player_id, req.status).await?;
    let available = Occupancy::of(&load_roster(&mut tx, req.game_id).await?).available();
    tx.commit().await?;
    cache.invalidate(&req.game_id).await;

    info!(
        "Player {} marked {} for game {} ({} spots left)",
        req.player_id, req.status, req.game_id, available
    );
    Ok(AttendanceChange {
        game_id: req.game_id,
        player_id: req.player_id,
        status: req.status,
        source,
        available,
    })
}

/// Applies a pass holder's choices for several games of one season.
///
/// All capacity checks run before the first write, so a full game rejects
/// the whole batch.
pub async fn set_season_attendance(
    pool: &SqlitePool,
    cache: &RosterCache,
    season_id: i64,
    player_id: i64,
    choices: &BTreeMap<i64, AttendanceStatus>,
) -> Result<Vec<AttendanceChange>> {
    if choices.is_empty() {
        return Err(Error::validation("gameAttendance must name at least one game"));
    }
    seasons::get_season(pool, season_id)
        .await?
        .ok_or_else(|| Error::not_found("Season", season_id))?;
    let season_games: HashSet<i64> = games::list_games_for_season(pool, season_id)
        .await?
        .into_iter()
        .map(|g| g.id)
        .collect();
    if let Some(stray) = choices.keys().find(|id| !season_games.contains(id)) {
        return Err(Error::validation(format!("game {stray} is not part of season {season_id}")));
    }

    let mut tx = pool.begin().await?;
    let mut inputs = Vec::with_capacity(choices.len());
    for (&game_id, &status) in choices {
        games::lock_game(&mut tx, game_id).await?;
        let input = load_roster(&mut tx, game_id).await?;
        if confirmed_pass(&input, player_id).is_none() {
            return Err(Error::NotPaid { player_id, game_id });
        }
        if status.is_attending() && effective_status(&input, player_id) != Some(AttendanceStatus::Attending) {
            check_capacity(&input)?;
        }
        inputs.push((input, status));
    }

    let mut changes = Vec::with_capacity(inputs.len());
    for (input, status) in &inputs {
        let game_id = input.game.id;
        let source = apply(&mut tx, input, player_id, *status).await?;
        let available = Occupancy::of(&load_roster(&mut tx, game_id).await?).available();
        changes.push(AttendanceChange { game_id, player_id, status: *status, source, available });
    }
    tx.commit().await?;

    for change in &changes {
        cache.invalidate(&change.game_id).await;
    }
    info!("Player {} updated {} games of season {}", player_id, changes.len(), season_id);
    Ok(changes)
}

async fn load_roster(conn: &mut SqliteConnection, game_id: i64) -> Result<RosterInput> {
    roster::load(conn, game_id)
        .await?
        .ok_or_else(|| Error::not_found("Game", game_id))
}

/// Checks payment and capacity, then writes the status to whichever record
/// the player holds. Season passes take precedence over individual tickets.
async fn apply(
    conn: &mut SqliteConnection,
    input: &RosterInput,
    player_id: i64,
    status: AttendanceStatus,
) -> Result<AttendeeSource> {
    let game_id = input.game.id;
    let pass = confirmed_pass(input, player_id);
    let ticket = confirmed_ticket(input, player_id);
    if pass.is_none() && ticket.is_none() {
        return Err(Error::NotPaid { player_id, game_id });
    }

    // Players already counted can re-confirm without a free spot.
    if status.is_attending() && effective_status(input, player_id) != Some(AttendanceStatus::Attending) {
        check_capacity(input)?;
    }

    match pass {
        Some(pass) => {
            attendees::upsert_season_game_attendance(&mut *conn, pass.season_attendee_id, game_id, status).await?;
            Ok(AttendeeSource::Season)
        }
        None => {
            attendees::set_game_attendance_status(&mut *conn, game_id, player_id, status).await?;
            Ok(AttendeeSource::Individual)
        }
    }
}

/// Whether the player holds a confirmed booking for the game or its season.
pub async fn has_paid(pool: &SqlitePool, game_id: i64, player_id: i64) -> Result<bool> {
    let game = games::get_game(pool, game_id)
        .await?
        .ok_or_else(|| Error::not_found("Game", game_id))?;
    if let Some(row) = attendees::get_game_attendee(pool, game_id, player_id).await? {
        if PaymentStatus::from_db(&row.payment_status).is_confirmed() {
            return Ok(true);
        }
    }
    if let Some(season_id) = game.season_id {
        if let Some(row) = attendees::get_season_attendee(pool, season_id, player_id).await? {
            return Ok(PaymentStatus::from_db(&row.payment_status).is_confirmed());
        }
    }
    Ok(false)
}
