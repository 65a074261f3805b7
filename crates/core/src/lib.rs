//! Booking rules for pickup games: who is on a roster, whether a spot is
//! free, and how payments and attendance changes land in the database.

pub mod attendance;
pub mod cache;
pub mod capacity;
pub mod catalog;
pub mod checkout;
pub mod discount;
pub mod error;
pub mod money;
pub mod resolver;
pub mod roster;
pub mod schedule;

#[cfg(test)]
mod testing;

pub use cache::{QueryCache, RosterCache};
pub use error::{Error, Result};
pub use roster::{game_roster, GameRoster};
