//! Normalized attendance records for a single game.
//!
//! Raw query rows are turned into these types in one place (the db crate's
//! roster loader), so roster resolution only ever sees one shape.

use serde::{Deserialize, Serialize};

use crate::status::{AttendanceStatus, PaymentStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterGame {
    pub id: i64,
    pub season_id: Option<i64>,
    pub total_tickets: i64,
    /// Spots held for the organizer when their season counts them.
    pub reserved_spots: i64,
}

/// An individual ticket purchase for the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndividualRecord {
    pub player_id: i64,
    pub name: Option<String>,
    pub email: String,
    pub payment_status: PaymentStatus,
    /// `None` when the row has no attendance status yet.
    pub status: Option<AttendanceStatus>,
}

/// A season pass for the game's season, with the holder's choice for this game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonPassRecord {
    pub season_attendee_id: i64,
    pub player_id: i64,
    pub name: Option<String>,
    pub email: String,
    pub payment_status: PaymentStatus,
    /// `None` when the holder never opted in or out of this game.
    pub game_status: Option<AttendanceStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterInput {
    pub game: RosterGame,
    pub individual: Vec<IndividualRecord>,
    /// Always empty for standalone games.
    pub season: Vec<SeasonPassRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendeeSource {
    Individual,
    Season,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    pub player_id: i64,
    pub name: Option<String>,
    pub email: String,
    pub source: AttendeeSource,
}
