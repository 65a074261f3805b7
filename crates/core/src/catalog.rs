//! Creating groups, games, seasons and discount codes.

use chrono::NaiveTime;
use pickup_db::{
    discounts, games, groups, seasons, NewDiscountCode, NewGame, NewGroup, NewSeason,
};
use pickup_models::{DiscountCode, DiscountType, Game, Group, RepeatType, Season};
use sqlx::SqlitePool;
use tracing::info;

use crate::error::{Error, Result};
use crate::schedule::{parse_date, season_game_dates, DATE_FORMAT};

fn require(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(format!("{field} is required")));
    }
    Ok(())
}

fn check_time(raw: &str) -> Result<()> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map(|_| ())
        .map_err(|_| Error::validation(format!("invalid time '{raw}', expected HH:MM")))
}

pub async fn create_group(pool: &SqlitePool, group: NewGroup) -> Result<Group> {
    require(&group.name, "name")?;
    let valid_slug = !group.slug.is_empty()
        && group.slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !valid_slug {
        return Err(Error::validation("slug must be lowercase letters, digits and dashes"));
    }
    let row = groups::insert_group(pool, &group).await?;
    info!("Group {} created ({})", row.id, row.slug);
    Ok(row)
}

pub async fn create_game(pool: &SqlitePool, game: NewGame) -> Result<Game> {
    require(&game.name, "name")?;
    require(&game.location, "location")?;
    parse_date(&game.date)?;
    check_time(&game.time)?;
    if game.total_tickets <= 0 {
        return Err(Error::validation("totalTickets must be positive"));
    }
    if game.price < 0 {
        return Err(Error::validation("price cannot be negative"));
    }
    if let Some(season_id) = game.season_id {
        seasons::get_season(pool, season_id)
            .await?
            .ok_or_else(|| Error::not_found("Season", season_id))?;
    }
    let row = games::insert_game(pool, &game).await?;
    info!("Game {} created: {} on {} {}", row.id, row.name, row.date, row.time);
    Ok(row)
}

/// Creates the season and every game of its schedule in one transaction.
pub async fn create_season(pool: &SqlitePool, season: NewSeason) -> Result<(Season, Vec<Game>)> {
    require(&season.name, "name")?;
    require(&season.location, "location")?;
    check_time(&season.first_game_time)?;
    let repeat: RepeatType = season.repeat_type.parse().map_err(Error::Validation)?;
    let count = u32::try_from(season.repeat_count)
        .map_err(|_| Error::validation("repeatCount must be positive"))?;
    let dates = season_game_dates(parse_date(&season.first_game_date)?, repeat, count)?;
    if season.season_spots <= 0 || season.game_spots <= 0 {
        return Err(Error::validation("seasonSpots and gameSpots must be positive"));
    }
    if season.season_price < 0 || season.individual_game_price < 0 {
        return Err(Error::validation("prices cannot be negative"));
    }

    let mut tx = pool.begin().await?;
    let row = seasons::insert_season(&mut *tx, &season).await?;
    let mut created = Vec::with_capacity(dates.len());
    for (n, date) in dates.iter().enumerate() {
        let game = NewGame {
            group_id: row.group_id,
            season_id: Some(row.id),
            name: format!("{} - Game {}", row.name, n + 1),
            date: date.format(DATE_FORMAT).to_string(),
            time: row.first_game_time.clone(),
            location: row.location.clone(),
            price: row.individual_game_price,
            total_tickets: row.game_spots,
            organizer_id: row.organizer_id,
        };
        created.push(games::insert_game(&mut *tx, &game).await?);
    }
    tx.commit().await?;

    info!("Season {} created with {} games", row.id, created.len());
    Ok((row, created))
}

pub async fn create_discount_code(pool: &SqlitePool, code: NewDiscountCode) -> Result<DiscountCode> {
    require(&code.code, "code")?;
    let kind: DiscountType = code.discount_type.parse().map_err(Error::Validation)?;
    if kind == DiscountType::Percentage && !(1..=100).contains(&code.discount_value) {
        return Err(Error::validation("percentage discounts must be between 1 and 100"));
    }
    if code.discount_value <= 0 {
        return Err(Error::validation("discountValue must be positive"));
    }
    let row = discounts::insert_discount_code(pool, &code).await?;
    info!("Discount code {} created", row.code);
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pickup_db::connect_in_memory;

    fn fall_season() -> NewSeason {
        NewSeason {
            group_id: None,
            name: "Fall Futsal".to_string(),
            description: None,
            location: "Mission Rec Center".to_string(),
            season_price: 9000,
            individual_game_price: 1200,
            season_spots: 8,
            game_spots: 10,
            first_game_date: "2026-11-03".to_string(),
            first_game_time: "19:00".to_string(),
            repeat_type: "weekly".to_string(),
            repeat_count: 4,
            include_organizer_in_count: false,
            organizer_id: None,
        }
    }

    #[tokio::test]
    async fn season_creates_its_schedule() {
        let pool = connect_in_memory().await.unwrap();
        let (season, games) = create_season(&pool, fall_season()).await.unwrap();

        assert_eq!(games.len(), 4);
        assert!(games.iter().all(|g| g.season_id == Some(season.id)));
        assert_eq!(games[3].date, "2026-11-24");
        assert_eq!(games[0].total_tickets, 10);
        assert_eq!(games[0].price, 1200);
        assert_eq!(games[1].name, "Fall Futsal - Game 2");
    }

    #[tokio::test]
    async fn bad_season_writes_nothing() {
        let pool = connect_in_memory().await.unwrap();
        let mut season = fall_season();
        season.repeat_type = "daily".to_string();

        assert!(matches!(create_season(&pool, season).await, Err(Error::Validation(_))));
        assert!(games::list_games(&pool, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn game_in_unknown_season_is_not_found() {
        let pool = connect_in_memory().await.unwrap();
        let game = NewGame {
            group_id: None,
            season_id: Some(99),
            name: "Pickup".to_string(),
            date: "2026-11-03".to_string(),
            time: "19:00".to_string(),
            location: "Dolores Park".to_string(),
            price: 0,
            total_tickets: 12,
            organizer_id: None,
        };
        assert!(matches!(create_game(&pool, game).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn slugs_are_validated() {
        let pool = connect_in_memory().await.unwrap();
        let bad = NewGroup { name: "Mission FC".to_string(), slug: "Mission FC".to_string(), description: None };
        assert!(matches!(create_group(&pool, bad).await, Err(Error::Validation(_))));

        let good = NewGroup { name: "Mission FC".to_string(), slug: "mission-fc".to_string(), description: None };
        assert_eq!(create_group(&pool, good).await.unwrap().slug, "mission-fc");
    }
}
