use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub mod roster;
pub mod status;

pub use roster::{Attendee, AttendeeSource, IndividualRecord, RosterGame, RosterInput, SeasonPassRecord};
pub use status::{AttendanceStatus, DiscountType, PaymentStatus, RepeatType};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub created_at: String,
}

/// A player may exist before they ever sign in: guest checkout creates
/// the row from the email given at payment time.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Player {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub created_at: String,
}

/// A recurring series of games sold as a pass or per game.
///
/// Prices are minor currency units.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Season {
    pub id: i64,
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
    pub created_at: String,
}

impl Season {
    /// Spots held back from every game for the organizer.
    pub fn reserved_spots(&self) -> i64 {
        if self.include_organizer_in_count && self.organizer_id.is_some() {
            1
        } else {
            0
        }
    }
}

/// One scheduled occurrence. `season_id` is `None` for a standalone game.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Game {
    pub id: i64,
    pub group_id: Option<i64>,
    pub season_id: Option<i64>,
    pub name: String,
    pub date: String,
    pub time: String,
    pub location: String,
    pub price: i64,
    pub total_tickets: i64,
    pub organizer_id: Option<i64>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GameAttendee {
    pub id: i64,
    pub game_id: i64,
    pub player_id: i64,
    pub payment_status: String,
    pub attendance_status: Option<String>,
    pub amount_paid: i64,
    pub stripe_session_id: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SeasonAttendee {
    pub id: i64,
    pub season_id: i64,
    pub player_id: i64,
    pub payment_status: String,
    pub amount_paid: i64,
    pub stripe_session_id: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SeasonGameAttendance {
    pub id: i64,
    pub season_attendee_id: i64,
    pub game_id: i64,
    pub attendance_status: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DiscountCode {
    pub id: i64,
    pub code: String,
    pub description: Option<String>,
    pub discount_type: String,
    pub discount_value: i64,
    pub max_uses: Option<i64>,
    pub current_uses: i64,
    pub valid_from: Option<String>,
    pub valid_until: Option<String>,
    pub is_active: bool,
    pub game_id: Option<i64>,
    pub season_id: Option<i64>,
    pub group_id: Option<i64>,
}

/// A game joined with the caller's own booking, for "my games" listings.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PlayerGame {
    pub game_id: i64,
    pub name: String,
    pub date: String,
    pub time: String,
    pub location: String,
    pub season_id: Option<i64>,
    pub via_season: bool,
    pub attendance_status: Option<String>,
}
