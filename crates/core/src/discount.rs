//! Discount code validation.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use pickup_db::{discounts, games, seasons};
use pickup_models::{DiscountCode, DiscountType};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::{Error, Result};

/// What a price is being paid for. A game inside a season also carries the
/// season and group ids, so codes scoped to either apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscountTarget {
    pub game_id: Option<i64>,
    pub season_id: Option<i64>,
    pub group_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedDiscount {
    pub code: String,
    /// Minor currency units.
    pub discount_amount: i64,
    pub final_price: i64,
}

/// Builds the target for exactly one of `game_id` / `season_id`.
pub async fn resolve_target(
    pool: &SqlitePool,
    game_id: Option<i64>,
    season_id: Option<i64>,
) -> Result<DiscountTarget> {
    match (game_id, season_id) {
        (Some(id), _) => {
            let game = games::get_game(pool, id)
                .await?
                .ok_or_else(|| Error::not_found("Game", id))?;
            Ok(DiscountTarget {
                game_id: Some(game.id),
                season_id: game.season_id,
                group_id: game.group_id,
            })
        }
        (None, Some(id)) => {
            let season = seasons::get_season(pool, id)
                .await?
                .ok_or_else(|| Error::not_found("Season", id))?;
            Ok(DiscountTarget {
                game_id: None,
                season_id: Some(season.id),
                group_id: season.group_id,
            })
        }
        (None, None) => Err(Error::validation("gameId or seasonId is required")),
    }
}

/// Looks up `code` and applies it to `original_price` (minor units).
pub async fn validate_code(
    pool: &SqlitePool,
    code: &str,
    target: &DiscountTarget,
    original_price: i64,
) -> Result<AppliedDiscount> {
    if code.trim().is_empty() {
        return Err(Error::validation("code is required"));
    }
    let row = discounts::find_discount_code(pool, code).await?;
    apply_discount(row.as_ref(), target, original_price, Utc::now().naive_utc())
}

pub fn apply_discount(
    code: Option<&DiscountCode>,
    target: &DiscountTarget,
    original_price: i64,
    now: NaiveDateTime,
) -> Result<AppliedDiscount> {
    let code = code
        .filter(|c| c.is_active)
        .ok_or_else(|| Error::validation("Invalid discount code"))?;

    if let Some(from) = &code.valid_from {
        if now < parse_bound(from, NaiveTime::MIN)? {
            return Err(Error::validation("Discount code is not active yet"));
        }
    }
    if let Some(until) = &code.valid_until {
        let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
        if now > parse_bound(until, end_of_day)? {
            return Err(Error::validation("Discount code has expired"));
        }
    }
    if let Some(max) = code.max_uses {
        if code.current_uses >= max {
            return Err(Error::validation("Discount code has reached its usage limit"));
        }
    }
    let out_of_scope = mismatch(code.game_id, target.game_id)
        || mismatch(code.season_id, target.season_id)
        || mismatch(code.group_id, target.group_id);
    if out_of_scope {
        return Err(Error::validation("Discount code does not apply to this purchase"));
    }

    let kind: DiscountType = code.discount_type.parse().map_err(Error::Validation)?;
    let original_price = original_price.max(0);
    let discount_amount = match kind {
        DiscountType::Percentage => original_price * code.discount_value.clamp(0, 100) / 100,
        DiscountType::Fixed => code.discount_value.max(0),
    }
    .min(original_price);

    Ok(AppliedDiscount {
        code: code.code.clone(),
        discount_amount,
        final_price: original_price - discount_amount,
    })
}

fn mismatch(scope: Option<i64>, actual: Option<i64>) -> bool {
    matches!(scope, Some(id) if actual != Some(id))
}

/// Validity bounds are stored as a datetime or a bare date; a bare date
/// covers the whole day.
fn parse_bound(raw: &str, time_for_date: NaiveTime) -> Result<NaiveDateTime> {
    let raw = raw.trim();
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|d| d.and_time(time_for_date))
        .map_err(|_| Error::validation("Discount code has an invalid validity window"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(kind: &str, value: i64) -> DiscountCode {
        DiscountCode {
            id: 1,
            code: "FALL20".to_string(),
            description: None,
            discount_type: kind.to_string(),
            discount_value: value,
            max_uses: None,
            current_uses: 0,
            valid_from: None,
            valid_until: None,
            is_active: true,
            game_id: None,
            season_id: None,
            group_id: None,
        }
    }

    fn now() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2026-10-18 12:00:00", "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn game_target() -> DiscountTarget {
        DiscountTarget { game_id: Some(7), season_id: Some(3), group_id: Some(1) }
    }

    fn reason(result: Result<AppliedDiscount>) -> String {
        match result {
            Err(Error::Validation(msg)) => msg,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn percentage_rounds_down() {
        let applied = apply_discount(Some(&code("percentage", 20)), &game_target(), 1299, now()).unwrap();
        assert_eq!(applied.discount_amount, 259);
        assert_eq!(applied.final_price, 1040);
    }

    #[test]
    fn fixed_discount_never_exceeds_price() {
        let applied = apply_discount(Some(&code("fixed", 5000)), &game_target(), 1200, now()).unwrap();
        assert_eq!(applied.discount_amount, 1200);
        assert_eq!(applied.final_price, 0);
    }

    #[test]
    fn unknown_and_inactive_codes_are_invalid() {
        let mut inactive = code("fixed", 100);
        inactive.is_active = false;

        assert_eq!(reason(apply_discount(None, &game_target(), 1200, now())), "Invalid discount code");
        assert_eq!(reason(apply_discount(Some(&inactive), &game_target(), 1200, now())), "Invalid discount code");
    }

    #[test]
    fn validity_window_is_inclusive_of_whole_days() {
        let mut c = code("fixed", 100);
        c.valid_until = Some("2026-10-18".to_string());
        assert!(apply_discount(Some(&c), &game_target(), 1200, now()).is_ok());

        c.valid_until = Some("2026-10-17".to_string());
        assert!(reason(apply_discount(Some(&c), &game_target(), 1200, now())).contains("expired"));

        c.valid_until = None;
        c.valid_from = Some("2026-10-19 00:00:00".to_string());
        assert!(reason(apply_discount(Some(&c), &game_target(), 1200, now())).contains("not active yet"));
    }

    #[test]
    fn exhausted_codes_are_rejected() {
        let mut c = code("percentage", 10);
        c.max_uses = Some(3);
        c.current_uses = 3;
        assert!(reason(apply_discount(Some(&c), &game_target(), 1200, now())).contains("usage limit"));
    }

    #[test]
    fn scope_must_match_target() {
        let mut season_code = code("percentage", 10);
        season_code.season_id = Some(3);
        assert!(apply_discount(Some(&season_code), &game_target(), 1200, now()).is_ok());

        season_code.season_id = Some(4);
        assert!(reason(apply_discount(Some(&season_code), &game_target(), 1200, now())).contains("does not apply"));

        let mut game_code = code("fixed", 100);
        game_code.game_id = Some(7);
        let season_target = DiscountTarget { game_id: None, season_id: Some(3), group_id: Some(1) };
        assert!(apply_discount(Some(&game_code), &season_target, 9000, now()).is_err());
    }
}
