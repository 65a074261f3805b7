//! Capacity checks against a game's fixed ticket count.

use pickup_models::RosterInput;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::resolver::resolve_attendees;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupancy {
    pub total_tickets: i64,
    pub attending: i64,
    /// Spots held for the organizer.
    pub reserved: i64,
}

impl Occupancy {
    pub fn of(input: &RosterInput) -> Self {
        Self {
            total_tickets: input.game.total_tickets,
            attending: resolve_attendees(input).len() as i64,
            reserved: input.game.reserved_spots,
        }
    }

    pub fn can_mark_attending(&self) -> bool {
        self.attending + self.reserved < self.total_tickets
    }

    /// Derived, never stored.
    pub fn available(&self) -> i64 {
        (self.total_tickets - self.attending - self.reserved).max(0)
    }
}

pub fn can_mark_attending(input: &RosterInput) -> bool {
    Occupancy::of(input).can_mark_attending()
}

/// Fails with [`Error::GameFull`] when no spot is left for one more attendee.
pub fn check_capacity(input: &RosterInput) -> Result<()> {
    if can_mark_attending(input) {
        Ok(())
    } else {
        Err(Error::game_full(input.game.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::tests::{game, pass, ticket};
    use pickup_models::AttendanceStatus;

    fn with_attending(n: i64, total: i64) -> RosterInput {
        let mut input = game(None, total);
        input.individual = (1..=n).map(|id| ticket(id, "completed", None)).collect();
        input
    }

    #[test]
    fn full_at_total_tickets_open_one_below() {
        assert!(can_mark_attending(&with_attending(9, 10)));
        assert!(!can_mark_attending(&with_attending(10, 10)));
        assert!(check_capacity(&with_attending(9, 10)).is_ok());
        assert!(matches!(check_capacity(&with_attending(10, 10)), Err(Error::GameFull(_))));
    }

    #[test]
    fn occupancy_counts_each_player_once() {
        let mut input = game(Some(3), 2);
        input.individual = vec![ticket(1, "completed", None)];
        input.season = vec![pass(1, "completed", None)];

        let occupancy = Occupancy::of(&input);
        assert_eq!(occupancy.attending, 1);
        assert_eq!(occupancy.available(), 1);
        assert!(occupancy.can_mark_attending());
    }

    #[test]
    fn organizer_spot_reduces_capacity() {
        let mut input = with_attending(9, 10);
        input.game.reserved_spots = 1;

        let occupancy = Occupancy::of(&input);
        assert_eq!(occupancy.available(), 0);
        assert!(!occupancy.can_mark_attending());
    }

    #[test]
    fn available_never_goes_negative() {
        let mut input = with_attending(12, 10);
        input.individual.push(ticket(99, "completed", Some(AttendanceStatus::NotAttending)));

        let occupancy = Occupancy::of(&input);
        assert_eq!(occupancy.attending, 12);
        assert_eq!(occupancy.available(), 0);
    }
}
