//! Expansion of a season's first date and cadence into game dates.

use chrono::{Days, Months, NaiveDate};
use pickup_models::RepeatType;

use crate::error::{Error, Result};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| Error::validation(format!("invalid date '{raw}', expected YYYY-MM-DD")))
}

/// `count` dates starting at `first`. Monthly dates keep the day of month,
/// clamped to the end of shorter months.
pub fn season_game_dates(first: NaiveDate, repeat: RepeatType, count: u32) -> Result<Vec<NaiveDate>> {
    if count == 0 {
        return Err(Error::validation("a season needs at least one game"));
    }

    (0..count)
        .map(|i| {
            let date = match repeat {
                RepeatType::Weekly => first.checked_add_days(Days::new(7 * u64::from(i))),
                RepeatType::Biweekly => first.checked_add_days(Days::new(14 * u64::from(i))),
                RepeatType::Monthly => first.checked_add_months(Months::new(i)),
            };
            date.ok_or_else(|| Error::validation("season schedule runs past the supported calendar"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(raw: &str) -> NaiveDate {
        parse_date(raw).unwrap()
    }

    #[test]
    fn weekly_and_biweekly_step_by_days() {
        let weekly = season_game_dates(d("2026-11-03"), RepeatType::Weekly, 3).unwrap();
        assert_eq!(weekly, vec![d("2026-11-03"), d("2026-11-10"), d("2026-11-17")]);

        let biweekly = season_game_dates(d("2026-12-22"), RepeatType::Biweekly, 2).unwrap();
        assert_eq!(biweekly, vec![d("2026-12-22"), d("2027-01-05")]);
    }

    #[test]
    fn monthly_clamps_to_month_end() {
        let dates = season_game_dates(d("2027-01-31"), RepeatType::Monthly, 3).unwrap();
        assert_eq!(dates, vec![d("2027-01-31"), d("2027-02-28"), d("2027-03-31")]);
    }

    #[test]
    fn zero_games_is_rejected() {
        assert!(matches!(
            season_game_dates(d("2026-11-03"), RepeatType::Weekly, 0),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn bad_dates_are_validation_errors() {
        assert!(matches!(parse_date("11/03/2026"), Err(Error::Validation(_))));
    }
}
