use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use pickup_core::attendance::{self, SetAttendance};
use pickup_core::checkout::{self, CheckoutRequest, CheckoutSettings};
use pickup_core::discount::{resolve_target, validate_code};
use pickup_core::money::{to_display, to_minor};
use pickup_core::{catalog, game_roster, Error, RosterCache};
use pickup_db::{games, groups, players, seasons, NewGame, NewGroup, NewSeason};
use pickup_models::{AttendanceStatus, Game, Group, Player, PlayerGame, Season};
use pickup_providers::{EmailSender, StripeClient};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::extract::{JsonBody, PathParam, QueryParams};
use crate::version_string;

/// Everything a handler needs, built once at startup.
pub struct AppState {
    pub pool: SqlitePool,
    pub cache: RosterCache,
    pub gateway: StripeClient,
    pub mailer: EmailSender,
    pub checkout: CheckoutSettings,
    /// Upper bound on the player lookup that precedes attendance changes.
    pub request_timeout: Duration,
}

type AppStateRef = State<Arc<AppState>>;

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health))
        .route("/games", get(list_games).post(create_game))
        .route("/games/{id}", get(get_game))
        .route("/games/{id}/attendees", get(game_attendees))
        .route("/seasons", post(create_season))
        .route("/seasons/{id}", get(get_season))
        .route("/groups", get(list_groups).post(create_group))
        .route("/groups/{slug}", get(get_group))
        .route("/players/{id}/games", get(player_games))
        .route("/create-checkout-session", post(create_checkout_session))
        .route("/confirm-payment", post(confirm_payment))
        .route("/update-attendance", post(update_attendance))
        .route("/update-season-attendance", post(update_season_attendance))
        .route("/discount-codes/validate", post(validate_discount));

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

// --- JSON views ---

fn game_json(game: &Game) -> Value {
    json!({
        "id": game.id,
        "groupId": game.group_id,
        "seasonId": game.season_id,
        "name": game.name,
        "date": game.date,
        "time": game.time,
        "location": game.location,
        "price": to_display(game.price),
        "totalTickets": game.total_tickets,
        "organizerId": game.organizer_id,
    })
}

fn season_json(season: &Season) -> Value {
    json!({
        "id": season.id,
        "groupId": season.group_id,
        "name": season.name,
        "description": season.description,
        "location": season.location,
        "seasonPrice": to_display(season.season_price),
        "individualGamePrice": to_display(season.individual_game_price),
        "seasonSpots": season.season_spots,
        "gameSpots": season.game_spots,
        "firstGameDate": season.first_game_date,
        "firstGameTime": season.first_game_time,
        "repeatType": season.repeat_type,
        "repeatCount": season.repeat_count,
        "includeOrganizerInCount": season.include_organizer_in_count,
        "organizerId": season.organizer_id,
    })
}

fn group_json(group: &Group) -> Value {
    json!({
        "id": group.id,
        "name": group.name,
        "slug": group.slug,
        "description": group.description,
        "createdAt": group.created_at,
    })
}

fn player_json(player: &Player) -> Value {
    json!({
        "id": player.id,
        "email": player.email,
        "name": player.name,
        "phone": player.phone,
        "createdAt": player.created_at,
    })
}

fn player_game_json(game: &PlayerGame) -> Value {
    json!({
        "gameId": game.game_id,
        "name": game.name,
        "date": game.date,
        "time": game.time,
        "location": game.location,
        "seasonId": game.season_id,
        "viaSeason": game.via_season,
        "attendanceStatus": game.attendance_status,
    })
}

/// Looks the player up, giving up after the configured request timeout.
async fn lookup_player(state: &AppState, player_id: i64) -> ApiResult<Player> {
    match tokio::time::timeout(state.request_timeout, players::get_player(&state.pool, player_id)).await {
        Ok(found) => found?.ok_or_else(|| Error::not_found("Player", player_id).into()),
        Err(_) => Err(ApiError::from(anyhow!(
            "player lookup timed out after {}s",
            state.request_timeout.as_secs()
        ))),
    }
}

// --- Catalog ---

async fn health() -> Json<Value> {
    Json(json!({
        "success": true,
        "status": "ok",
        "version": version_string()
    }))
}

#[derive(Deserialize)]
struct GamesQuery {
    from: Option<String>,
}

async fn list_games(State(state): AppStateRef, QueryParams(params): QueryParams<GamesQuery>) -> ApiResult<Json<Value>> {
    let games = games::list_games(&state.pool, params.from.as_deref()).await?;
    let games: Vec<Value> = games.iter().map(game_json).collect();
    Ok(Json(json!({ "success": true, "games": games })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GameQuery {
    player_id: Option<i64>,
}

async fn get_game(
    State(state): AppStateRef,
    PathParam(game_id): PathParam<i64>,
    QueryParams(params): QueryParams<GameQuery>,
) -> ApiResult<Json<Value>> {
    let roster = game_roster(&state.pool, &state.cache, game_id).await?;
    let mut body = json!({
        "success": true,
        "game": game_json(&roster.game),
        "attendees": roster.attendees,
        "attendeeCount": roster.attendees.len(),
        "available": roster.occupancy.available(),
    });
    if let Some(player_id) = params.player_id {
        body["hasPaid"] = json!(attendance::has_paid(&state.pool, game_id, player_id).await?);
    }
    Ok(Json(body))
}

async fn game_attendees(State(state): AppStateRef, PathParam(game_id): PathParam<i64>) -> ApiResult<Json<Value>> {
    let roster = game_roster(&state.pool, &state.cache, game_id).await?;
    Ok(Json(json!({
        "success": true,
        "attendees": roster.attendees,
        "available": roster.occupancy.available(),
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateGameRequest {
    group_id: Option<i64>,
    season_id: Option<i64>,
    name: String,
    date: String,
    time: String,
    location: String,
    #[serde(default)]
    price: f64,
    total_tickets: i64,
    organizer_id: Option<i64>,
}

async fn create_game(State(state): AppStateRef, JsonBody(body): JsonBody<CreateGameRequest>) -> ApiResult<Json<Value>> {
    let game = catalog::create_game(
        &state.pool,
        NewGame {
            group_id: body.group_id,
            season_id: body.season_id,
            name: body.name,
            date: body.date,
            time: body.time,
            location: body.location,
            price: to_minor(body.price),
            total_tickets: body.total_tickets,
            organizer_id: body.organizer_id,
        },
    )
    .await?;
    Ok(Json(json!({ "success": true, "game": game_json(&game) })))
}

async fn get_season(State(state): AppStateRef, PathParam(season_id): PathParam<i64>) -> ApiResult<Json<Value>> {
    let season = seasons::get_season(&state.pool, season_id)
        .await?
        .ok_or_else(|| Error::not_found("Season", season_id))?;
    let games = games::list_games_for_season(&state.pool, season_id).await?;
    let games: Vec<Value> = games.iter().map(game_json).collect();
    Ok(Json(json!({ "success": true, "season": season_json(&season), "games": games })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSeasonRequest {
    group_id: Option<i64>,
    name: String,
    description: Option<String>,
    location: String,
    season_price: f64,
    individual_game_price: f64,
    season_spots: i64,
    game_spots: i64,
    first_game_date: String,
    first_game_time: String,
    repeat_type: String,
    repeat_count: i64,
    #[serde(default)]
    include_organizer_in_count: bool,
    organizer_id: Option<i64>,
}

async fn create_season(State(state): AppStateRef, JsonBody(body): JsonBody<CreateSeasonRequest>) -> ApiResult<Json<Value>> {
    let (season, games) = catalog::create_season(
        &state.pool,
        NewSeason {
            group_id: body.group_id,
            name: body.name,
            description: body.description,
            location: body.location,
            season_price: to_minor(body.season_price),
            individual_game_price: to_minor(body.individual_game_price),
            season_spots: body.season_spots,
            game_spots: body.game_spots,
            first_game_date: body.first_game_date,
            first_game_time: body.first_game_time,
            repeat_type: body.repeat_type,
            repeat_count: body.repeat_count,
            include_organizer_in_count: body.include_organizer_in_count,
            organizer_id: body.organizer_id,
        },
    )
    .await?;
    let games: Vec<Value> = games.iter().map(game_json).collect();
    Ok(Json(json!({ "success": true, "season": season_json(&season), "games": games })))
}

async fn list_groups(State(state): AppStateRef) -> ApiResult<Json<Value>> {
    let groups = groups::list_groups(&state.pool).await?;
    let groups: Vec<Value> = groups.iter().map(group_json).collect();
    Ok(Json(json!({ "success": true, "groups": groups })))
}

#[derive(Deserialize)]
struct CreateGroupRequest {
    name: String,
    slug: String,
    description: Option<String>,
}

async fn create_group(State(state): AppStateRef, JsonBody(body): JsonBody<CreateGroupRequest>) -> ApiResult<Json<Value>> {
    let group = catalog::create_group(
        &state.pool,
        NewGroup { name: body.name, slug: body.slug, description: body.description },
    )
    .await?;
    Ok(Json(json!({ "success": true, "group": group_json(&group) })))
}

async fn get_group(State(state): AppStateRef, PathParam(slug): PathParam<String>) -> ApiResult<Json<Value>> {
    let group = groups::get_group_by_slug(&state.pool, &slug)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Group {slug}")))?;
    let games = games::list_games_for_group(&state.pool, group.id).await?;
    let seasons = seasons::list_seasons_for_group(&state.pool, group.id).await?;
    Ok(Json(json!({
        "success": true,
        "group": group_json(&group),
        "games": games.iter().map(game_json).collect::<Vec<_>>(),
        "seasons": seasons.iter().map(season_json).collect::<Vec<_>>(),
    })))
}

async fn player_games(State(state): AppStateRef, PathParam(player_id): PathParam<i64>) -> ApiResult<Json<Value>> {
    let player = lookup_player(&state, player_id).await?;
    let games = players::list_player_games(&state.pool, player.id).await?;
    let games: Vec<Value> = games.iter().map(player_game_json).collect();
    Ok(Json(json!({ "success": true, "player": player_json(&player), "games": games })))
}

// --- Payments ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutBody {
    game_id: Option<i64>,
    season_id: Option<i64>,
    price: Option<f64>,
    customer_email: Option<String>,
    customer_name: Option<String>,
    customer_phone: Option<String>,
    discount_code: Option<String>,
}

async fn create_checkout_session(State(state): AppStateRef, JsonBody(body): JsonBody<CheckoutBody>) -> ApiResult<Json<Value>> {
    let started = checkout::create_checkout_session(
        &state.pool,
        &state.gateway,
        &state.checkout,
        CheckoutRequest {
            game_id: body.game_id,
            season_id: body.season_id,
            price: body.price.map(to_minor),
            customer_email: body.customer_email,
            customer_name: body.customer_name,
            customer_phone: body.customer_phone,
            discount_code: body.discount_code,
        },
    )
    .await?;
    info!("Checkout session {} started", started.session_id);
    Ok(Json(json!({
        "success": true,
        "sessionId": started.session_id,
        "url": started.url,
        "amount": to_display(started.amount),
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfirmPaymentBody {
    #[serde(default)]
    session_id: String,
}

async fn confirm_payment(State(state): AppStateRef, JsonBody(body): JsonBody<ConfirmPaymentBody>) -> ApiResult<Json<Value>> {
    let confirmation =
        checkout::confirm_payment(&state.pool, &state.cache, &state.gateway, &state.mailer, &body.session_id).await?;
    Ok(Json(json!({
        "success": true,
        "playerId": confirmation.player_id,
        "gameId": confirmation.game_id,
        "seasonId": confirmation.season_id,
        "amountPaid": to_display(confirmation.amount_paid),
        "newlyConfirmed": confirmation.newly_confirmed,
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidateDiscountBody {
    code: String,
    game_id: Option<i64>,
    season_id: Option<i64>,
    original_price: f64,
}

async fn validate_discount(State(state): AppStateRef, JsonBody(body): JsonBody<ValidateDiscountBody>) -> ApiResult<Json<Value>> {
    let target = resolve_target(&state.pool, body.game_id, body.season_id).await?;
    let applied = validate_code(&state.pool, &body.code, &target, to_minor(body.original_price)).await?;
    Ok(Json(json!({
        "success": true,
        "code": applied.code,
        "discountAmount": to_display(applied.discount_amount),
        "finalPrice": to_display(applied.final_price),
    })))
}

// --- Attendance ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateAttendanceBody {
    game_id: i64,
    season_id: Option<i64>,
    player_id: i64,
    attendance_status: AttendanceStatus,
}

async fn update_attendance(State(state): AppStateRef, JsonBody(body): JsonBody<UpdateAttendanceBody>) -> ApiResult<Json<Value>> {
    let player = lookup_player(&state, body.player_id).await?;
    let change = attendance::set_attendance(
        &state.pool,
        &state.cache,
        SetAttendance {
            game_id: body.game_id,
            player_id: player.id,
            season_id: body.season_id,
            status: body.attendance_status,
        },
    )
    .await?;
    Ok(Json(json!({
        "success": true,
        "gameId": change.game_id,
        "playerId": change.player_id,
        "attendanceStatus": change.status,
        "source": change.source,
        "available": change.available,
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateSeasonAttendanceBody {
    season_id: i64,
    player_id: i64,
    game_attendance: BTreeMap<i64, AttendanceStatus>,
}

async fn update_season_attendance(
    State(state): AppStateRef,
    JsonBody(body): JsonBody<UpdateSeasonAttendanceBody>,
) -> ApiResult<Json<Value>> {
    let player = lookup_player(&state, body.player_id).await?;
    let changes = attendance::set_season_attendance(
        &state.pool,
        &state.cache,
        body.season_id,
        player.id,
        &body.game_attendance,
    )
    .await?;
    Ok(Json(json!({ "success": true, "updated": changes })))
}
