//! Attendee resolution: one deduplicated roster per game from individual
//! ticket purchases and season passes.

use std::collections::HashSet;

use pickup_models::{
    AttendanceStatus, Attendee, AttendeeSource, IndividualRecord, RosterInput, SeasonPassRecord,
};

/// Confirmed, attending players for the game.
///
/// Season attendees come first. A player present through both a pass and an
/// individual ticket appears once, as a season attendee.
pub fn resolve_attendees(input: &RosterInput) -> Vec<Attendee> {
    let mut seen = HashSet::new();
    let mut roster = Vec::new();

    for pass in season_attendees(input) {
        if seen.insert(pass.player_id) {
            roster.push(Attendee {
                player_id: pass.player_id,
                name: pass.name.clone(),
                email: pass.email.clone(),
                source: AttendeeSource::Season,
            });
        }
    }

    for record in individual_attendees(input) {
        if seen.insert(record.player_id) {
            roster.push(Attendee {
                player_id: record.player_id,
                name: record.name.clone(),
                email: record.email.clone(),
                source: AttendeeSource::Individual,
            });
        }
    }

    roster
}

fn individual_attendees(input: &RosterInput) -> impl Iterator<Item = &IndividualRecord> {
    input.individual.iter().filter(|r| {
        r.payment_status.is_confirmed() && r.status.unwrap_or(AttendanceStatus::Attending).is_attending()
    })
}

fn season_attendees(input: &RosterInput) -> impl Iterator<Item = &SeasonPassRecord> {
    let in_season = input.game.season_id.is_some();
    input.season.iter().filter(move |p| {
        in_season
            && p.payment_status.is_confirmed()
            && p.game_status.unwrap_or(AttendanceStatus::Attending).is_attending()
    })
}

/// The player's confirmed season pass for this game's season.
pub fn confirmed_pass(input: &RosterInput, player_id: i64) -> Option<&SeasonPassRecord> {
    if input.game.season_id.is_none() {
        return None;
    }
    input
        .season
        .iter()
        .find(|p| p.player_id == player_id && p.payment_status.is_confirmed())
}

pub fn confirmed_ticket(input: &RosterInput, player_id: i64) -> Option<&IndividualRecord> {
    input
        .individual
        .iter()
        .find(|r| r.player_id == player_id && r.payment_status.is_confirmed())
}

pub fn has_paid(input: &RosterInput, player_id: i64) -> bool {
    confirmed_pass(input, player_id).is_some() || confirmed_ticket(input, player_id).is_some()
}

/// The player's resolved status, or `None` without a confirmed booking.
pub fn effective_status(input: &RosterInput, player_id: i64) -> Option<AttendanceStatus> {
    if !has_paid(input, player_id) {
        return None;
    }
    let attending = season_attendees(input).any(|p| p.player_id == player_id)
        || individual_attendees(input).any(|r| r.player_id == player_id);
    Some(if attending { AttendanceStatus::Attending } else { AttendanceStatus::NotAttending })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pickup_models::{PaymentStatus, RosterGame};

    pub(crate) fn game(season_id: Option<i64>, total_tickets: i64) -> RosterInput {
        RosterInput {
            game: RosterGame { id: 1, season_id, total_tickets, reserved_spots: 0 },
            individual: Vec::new(),
            season: Vec::new(),
        }
    }

    pub(crate) fn ticket(player_id: i64, payment: &str, status: Option<AttendanceStatus>) -> IndividualRecord {
        IndividualRecord {
            player_id,
            name: None,
            email: format!("p{player_id}@example.com"),
            payment_status: PaymentStatus::from_db(payment),
            status,
        }
    }

    pub(crate) fn pass(player_id: i64, payment: &str, game_status: Option<AttendanceStatus>) -> SeasonPassRecord {
        SeasonPassRecord {
            season_attendee_id: 100 + player_id,
            player_id,
            name: None,
            email: format!("p{player_id}@example.com"),
            payment_status: PaymentStatus::from_db(payment),
            game_status,
        }
    }

    fn ids(roster: &[Attendee]) -> Vec<i64> {
        roster.iter().map(|a| a.player_id).collect()
    }

    #[test]
    fn only_confirmed_attending_tickets_count() {
        let mut input = game(None, 10);
        input.individual = vec![
            ticket(1, "completed", Some(AttendanceStatus::Attending)),
            ticket(2, "completed", None),
            ticket(3, "completed", Some(AttendanceStatus::NotAttending)),
            ticket(4, "pending", Some(AttendanceStatus::Attending)),
            ticket(5, "failed", None),
        ];

        assert_eq!(ids(&resolve_attendees(&input)), vec![1, 2]);
    }

    #[test]
    fn pass_without_a_choice_defaults_to_attending() {
        let mut input = game(Some(9), 10);
        input.season = vec![
            pass(1, "completed", None),
            pass(2, "completed", Some(AttendanceStatus::NotAttending)),
            pass(3, "pending", None),
        ];

        let roster = resolve_attendees(&input);
        assert_eq!(ids(&roster), vec![1]);
        assert_eq!(roster[0].source, AttendeeSource::Season);
    }

    #[test]
    fn season_record_wins_over_an_opted_out_ticket() {
        let mut input = game(Some(9), 10);
        input.individual = vec![ticket(1, "completed", Some(AttendanceStatus::NotAttending))];
        input.season = vec![pass(1, "completed", None)];

        let roster = resolve_attendees(&input);
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].source, AttendeeSource::Season);
        assert_eq!(effective_status(&input, 1), Some(AttendanceStatus::Attending));
    }

    #[test]
    fn player_in_both_sources_appears_once() {
        let mut input = game(Some(9), 10);
        input.individual = vec![ticket(1, "completed", None), ticket(2, "completed", None)];
        input.season = vec![pass(2, "completed", None), pass(3, "completed", None)];

        let roster = resolve_attendees(&input);
        assert_eq!(ids(&roster), vec![2, 3, 1]);
        let unique: HashSet<_> = roster.iter().map(|a| a.player_id).collect();
        assert_eq!(unique.len(), roster.len());
    }

    #[test]
    fn passes_are_ignored_for_standalone_games() {
        let mut input = game(None, 10);
        input.season = vec![pass(1, "completed", None)];

        assert!(resolve_attendees(&input).is_empty());
        assert!(!has_paid(&input, 1));
    }

    #[test]
    fn unpaid_players_have_no_effective_status() {
        let mut input = game(Some(9), 10);
        input.individual = vec![ticket(1, "pending", None)];
        input.season = vec![pass(2, "completed", Some(AttendanceStatus::NotAttending))];

        assert_eq!(effective_status(&input, 1), None);
        assert_eq!(effective_status(&input, 2), Some(AttendanceStatus::NotAttending));
        assert_eq!(effective_status(&input, 3), None);
    }
}
