//! Paid bookings: starting a hosted checkout and turning a paid session into
//! game tickets or season passes.

use std::collections::BTreeMap;

use pickup_db::{attendees, discounts, games, players, roster, seasons};
use pickup_models::{AttendanceStatus, Game, PaymentStatus, Season};
use pickup_providers::{is_session_id, CheckoutGateway, CheckoutSessionRequest, EmailMessage, Mailer};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::cache::RosterCache;
use crate::capacity::{check_capacity, Occupancy};
use crate::discount::{resolve_target, validate_code};
use crate::error::{Error, Result};
use crate::money::to_display;
use crate::resolver::effective_status;

#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    /// Public base URL the provider redirects back to.
    pub site_url: String,
}

#[derive(Debug, Clone, Default)]
pub struct CheckoutRequest {
    pub game_id: Option<i64>,
    pub season_id: Option<i64>,
    /// Price the buyer saw, in minor units. Must match the catalog.
    pub price: Option<i64>,
    pub customer_email: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub discount_code: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutStarted {
    pub session_id: String,
    pub url: Option<String>,
    /// Minor units actually charged.
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Confirmation {
    pub player_id: i64,
    pub game_id: Option<i64>,
    pub season_id: Option<i64>,
    /// Minor units.
    pub amount_paid: i64,
    /// False when the session had already been confirmed.
    pub newly_confirmed: bool,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub async fn create_checkout_session<G: CheckoutGateway>(
    pool: &SqlitePool,
    gateway: &G,
    settings: &CheckoutSettings,
    req: CheckoutRequest,
) -> Result<CheckoutStarted> {
    let email = non_empty(&req.customer_email).ok_or_else(|| Error::validation("customerEmail is required"))?;

    let (name, catalog_price, cancel_path) = match (req.game_id, req.season_id) {
        (Some(game_id), None) => {
            let mut conn = pool.acquire().await?;
            let game = games::get_game(&mut *conn, game_id)
                .await?
                .ok_or_else(|| Error::not_found("Game", game_id))?;
            let input = roster::load(&mut conn, game_id)
                .await?
                .ok_or_else(|| Error::not_found("Game", game_id))?;
            check_capacity(&input)?;
            (game.name, game.price, format!("/games/{game_id}"))
        }
        (None, Some(season_id)) => {
            let season = seasons::get_season(pool, season_id)
                .await?
                .ok_or_else(|| Error::not_found("Season", season_id))?;
            if attendees::count_confirmed_passes(pool, season_id).await? >= season.season_spots {
                return Err(Error::season_full(season_id));
            }
            (season.name, season.season_price, format!("/seasons/{season_id}"))
        }
        _ => return Err(Error::validation("exactly one of gameId or seasonId is required")),
    };

    if let Some(price) = req.price {
        if price != catalog_price {
            return Err(Error::validation("price does not match the current price"));
        }
    }

    let mut amount = catalog_price;
    let mut applied_code = None;
    if let Some(code) = non_empty(&req.discount_code) {
        let target = resolve_target(pool, req.game_id, req.season_id).await?;
        let applied = validate_code(pool, code, &target, catalog_price).await?;
        amount = applied.final_price;
        applied_code = Some(applied.code);
    }
    if amount <= 0 {
        return Err(Error::validation("nothing to pay for this booking"));
    }

    let mut metadata = BTreeMap::new();
    metadata.insert("customerEmail".to_string(), email.to_string());
    if let Some(id) = req.game_id {
        metadata.insert("gameId".to_string(), id.to_string());
    }
    if let Some(id) = req.season_id {
        metadata.insert("seasonId".to_string(), id.to_string());
    }
    if let Some(v) = non_empty(&req.customer_name) {
        metadata.insert("customerName".to_string(), v.to_string());
    }
    if let Some(v) = non_empty(&req.customer_phone) {
        metadata.insert("customerPhone".to_string(), v.to_string());
    }
    if let Some(code) = &applied_code {
        metadata.insert("discountCode".to_string(), code.clone());
    }

    let site = settings.site_url.trim_end_matches('/');
    let request = CheckoutSessionRequest {
        name,
        unit_amount: amount,
        success_url: format!("{site}/payment-success?session_id={{CHECKOUT_SESSION_ID}}"),
        cancel_url: format!("{site}{cancel_path}"),
        customer_email: Some(email.to_string()),
        metadata,
    };
    let session = gateway.create_session(&request).await?;

    Ok(CheckoutStarted { session_id: session.id, url: session.url, amount })
}

fn parse_id(raw: Option<&str>, key: &str) -> Result<Option<i64>> {
    raw.map(|v| v.parse::<i64>().map_err(|_| Error::validation(format!("session metadata {key} is not an id"))))
        .transpose()
}

/// Books whatever a paid checkout session was for. Safe to call repeatedly
/// for the same session.
pub async fn confirm_payment<G: CheckoutGateway, M: Mailer>(
    pool: &SqlitePool,
    cache: &RosterCache,
    gateway: &G,
    mailer: &M,
    session_id: &str,
) -> Result<Confirmation> {
    let session_id = session_id.trim();
    if session_id.is_empty() {
        return Err(Error::validation("sessionId is required"));
    }
    if !is_session_id(session_id) {
        return Err(Error::validation("sessionId is not a checkout session id"));
    }
    let session = gateway.retrieve_session(session_id).await?;
    if !session.is_paid() {
        return Err(Error::validation("payment not completed"));
    }
    let email = session.email().ok_or_else(|| Error::validation("checkout session has no customer email"))?;
    let game_id = parse_id(session.meta("gameId"), "gameId")?;
    let season_id = parse_id(session.meta("seasonId"), "seasonId")?;
    let amount = session.amount_total.unwrap_or(0);

    let player = players::upsert_player_by_email(pool, email, session.meta("customerName"), session.meta("customerPhone")).await?;

    let (confirmation, message) = match (game_id, season_id) {
        (Some(game_id), _) => {
            let (newly, game) = book_game(pool, game_id, player.id, amount, Some(session_id)).await?;
            cache.invalidate(&game_id).await;
            let confirmation = Confirmation {
                player_id: player.id,
                game_id: Some(game_id),
                season_id: game.season_id,
                amount_paid: amount,
                newly_confirmed: newly,
            };
            (confirmation, game_email(email, &game, amount))
        }
        (None, Some(season_id)) => {
            let (newly, season, season_games) = book_season(pool, season_id, player.id, amount, Some(session_id)).await?;
            for game in &season_games {
                cache.invalidate(&game.id).await;
            }
            let confirmation = Confirmation {
                player_id: player.id,
                game_id: None,
                season_id: Some(season_id),
                amount_paid: amount,
                newly_confirmed: newly,
            };
            (confirmation, season_email(email, &season, &season_games, amount))
        }
        (None, None) => return Err(Error::validation("checkout session names no game or season")),
    };

    if confirmation.newly_confirmed {
        info!("Payment {} confirmed for player {}", session_id, player.id);
        if let Some(code) = session.meta("discountCode") {
            record_discount_use(pool, code).await;
        }
        if let Err(e) = mailer.send(&message).await {
            warn!("Confirmation email to {email} failed: {e}");
        }
    } else {
        info!("Payment {} already confirmed, nothing to do", session_id);
    }

    Ok(confirmation)
}

/// Books a game for a player without payment (organizer comps).
pub async fn comp_booking(
    pool: &SqlitePool,
    cache: &RosterCache,
    game_id: i64,
    email: &str,
    name: Option<&str>,
) -> Result<Confirmation> {
    if email.trim().is_empty() {
        return Err(Error::validation("email is required"));
    }
    let player = players::upsert_player_by_email(pool, email, name, None).await?;
    let (newly, game) = book_game(pool, game_id, player.id, 0, None).await?;
    cache.invalidate(&game_id).await;
    Ok(Confirmation {
        player_id: player.id,
        game_id: Some(game_id),
        season_id: game.season_id,
        amount_paid: 0,
        newly_confirmed: newly,
    })
}

/// Records a confirmed ticket. Returns false when one already existed.
async fn book_game(
    pool: &SqlitePool,
    game_id: i64,
    player_id: i64,
    amount: i64,
    session_id: Option<&str>,
) -> Result<(bool, Game)> {
    let mut tx = pool.begin().await?;
    if !games::lock_game(&mut tx, game_id).await? {
        return Err(Error::not_found("Game", game_id));
    }
    let game = games::get_game(&mut *tx, game_id)
        .await?
        .ok_or_else(|| Error::not_found("Game", game_id))?;

    if let Some(existing) = attendees::get_game_attendee(&mut *tx, game_id, player_id).await? {
        if PaymentStatus::from_db(&existing.payment_status).is_confirmed() {
            return Ok((false, game));
        }
    }

    let input = roster::load(&mut tx, game_id)
        .await?
        .ok_or_else(|| Error::not_found("Game", game_id))?;
    if effective_status(&input, player_id) != Some(AttendanceStatus::Attending) {
        if let Err(e) = check_capacity(&input) {
            warn!("Player {player_id} paid for game {game_id} but it is full");
            return Err(e);
        }
    }
    attendees::upsert_game_booking(&mut *tx, game_id, player_id, amount, session_id).await?;
    let available = Occupancy::of(&roster::load(&mut tx, game_id).await?.unwrap_or(input)).available();
    tx.commit().await?;

    info!("Player {player_id} booked game {game_id} ({available} spots left)");
    Ok((true, game))
}

/// Records a confirmed season pass and opts the holder into every game of
/// the season they have not already decided on.
async fn book_season(
    pool: &SqlitePool,
    season_id: i64,
    player_id: i64,
    amount: i64,
    session_id: Option<&str>,
) -> Result<(bool, Season, Vec<Game>)> {
    let season = seasons::get_season(pool, season_id)
        .await?
        .ok_or_else(|| Error::not_found("Season", season_id))?;
    let season_games = games::list_games_for_season(pool, season_id).await?;

    let mut tx = pool.begin().await?;
    if !seasons::lock_season(&mut tx, season_id).await? {
        return Err(Error::not_found("Season", season_id));
    }
    let existing = attendees::get_season_attendee(&mut *tx, season_id, player_id).await?;
    let already = existing
        .as_ref()
        .is_some_and(|row| PaymentStatus::from_db(&row.payment_status).is_confirmed());

    let pass = match existing {
        Some(row) if already => row,
        _ => {
            if attendees::count_confirmed_passes(&mut *tx, season_id).await? >= season.season_spots {
                warn!("Player {player_id} paid for season {season_id} but it is full");
                return Err(Error::season_full(season_id));
            }
            attendees::upsert_season_pass(&mut *tx, season_id, player_id, amount, session_id).await?
        }
    };

    let mut seeded = 0;
    for game in &season_games {
        if attendees::seed_season_game_attendance(&mut *tx, pass.id, game.id).await? {
            seeded += 1;
        }
    }
    tx.commit().await?;

    if !already {
        info!("Player {player_id} bought a pass for season {season_id} ({seeded} games)");
    }
    Ok((!already, season, season_games))
}

async fn record_discount_use(pool: &SqlitePool, code: &str) {
    let result = async {
        if let Some(row) = discounts::find_discount_code(pool, code).await? {
            discounts::increment_discount_uses(pool, row.id).await?;
        }
        anyhow::Ok(())
    }
    .await;
    if let Err(e) = result {
        warn!("Could not record use of discount code {code}: {e}");
    }
}

fn game_email(to: &str, game: &Game, amount: i64) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: format!("You're in: {}", game.name),
        html: format!(
            "<h2>You're booked for {}</h2>\
             <p>{} at {}, {}.</p>\
             <p>Amount paid: ${:.2}</p>",
            game.name,
            game.date,
            game.time,
            game.location,
            to_display(amount)
        ),
    }
}

fn season_email(to: &str, season: &Season, games: &[Game], amount: i64) -> EmailMessage {
    let schedule: String = games
        .iter()
        .map(|g| format!("<li>{} {}</li>", g.date, g.time))
        .collect();
    EmailMessage {
        to: to.to_string(),
        subject: format!("Season pass: {}", season.name),
        html: format!(
            "<h2>Your pass for {} is confirmed</h2>\
             <p>{}</p><ul>{}</ul>\
             <p>Amount paid: ${:.2}</p>",
            season.name,
            season.location,
            schedule,
            to_display(amount)
        ),
    }
}
