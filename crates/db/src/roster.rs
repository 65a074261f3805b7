//! The one place raw attendance rows become a [`RosterInput`].

use anyhow::Result;
use pickup_models::{
    AttendanceStatus, IndividualRecord, PaymentStatus, RosterGame, RosterInput, SeasonPassRecord,
};
use sqlx::{FromRow, SqliteConnection};

use crate::{games, seasons};

#[derive(FromRow)]
struct IndividualRow {
    player_id: i64,
    name: Option<String>,
    email: String,
    payment_status: String,
    attendance_status: Option<String>,
}

#[derive(FromRow)]
struct SeasonPassRow {
    season_attendee_id: i64,
    player_id: i64,
    name: Option<String>,
    email: String,
    payment_status: String,
    game_status: Option<String>,
}

impl From<IndividualRow> for IndividualRecord {
    fn from(r: IndividualRow) -> Self {
        IndividualRecord {
            player_id: r.player_id,
            name: r.name,
            email: r.email,
            payment_status: PaymentStatus::from_db(&r.payment_status),
            status: r.attendance_status.as_deref().map(|s| AttendanceStatus::from_db(Some(s))),
        }
    }
}

impl From<SeasonPassRow> for SeasonPassRecord {
    fn from(r: SeasonPassRow) -> Self {
        SeasonPassRecord {
            season_attendee_id: r.season_attendee_id,
            player_id: r.player_id,
            name: r.name,
            email: r.email,
            payment_status: PaymentStatus::from_db(&r.payment_status),
            game_status: r.game_status.as_deref().map(|s| AttendanceStatus::from_db(Some(s))),
        }
    }
}

/// Loads every attendance record that bears on `game_id`. Returns `None` when
/// the game does not exist.
pub async fn load(conn: &mut SqliteConnection, game_id: i64) -> Result<Option<RosterInput>> {
    let Some(game) = games::get_game(&mut *conn, game_id).await? else {
        return Ok(None);
    };

    let individual: Vec<IndividualRecord> = sqlx::query_as::<_, IndividualRow>(
        "SELECT ga.player_id, p.name, p.email, ga.payment_status, ga.attendance_status \
         FROM game_attendees ga JOIN players p ON p.id = ga.player_id \
         WHERE ga.game_id = ? ORDER BY ga.id",
    )
    .bind(game_id)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(IndividualRecord::from)
    .collect();

    let mut reserved_spots = 0;
    let mut season = Vec::new();
    if let Some(season_id) = game.season_id {
        if let Some(s) = seasons::get_season(&mut *conn, season_id).await? {
            reserved_spots = s.reserved_spots();
        }
        season = sqlx::query_as::<_, SeasonPassRow>(
            "SELECT sa.id AS season_attendee_id, sa.player_id, p.name, p.email, \
                    sa.payment_status, sga.attendance_status AS game_status \
             FROM season_attendees sa JOIN players p ON p.id = sa.player_id \
             LEFT JOIN season_game_attendance sga \
                    ON sga.season_attendee_id = sa.id AND sga.game_id = ? \
             WHERE sa.season_id = ? ORDER BY sa.id",
        )
        .bind(game_id)
        .bind(season_id)
        .fetch_all(&mut *conn)
        .await?
        .into_iter()
        .map(SeasonPassRecord::from)
        .collect();
    }

    Ok(Some(RosterInput {
        game: RosterGame {
            id: game.id,
            season_id: game.season_id,
            total_tickets: game.total_tickets,
            reserved_spots,
        },
        individual,
        season,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{attendees, connect_in_memory, players, NewGame, NewSeason};

    fn new_game(season_id: Option<i64>) -> NewGame {
        NewGame {
            group_id: None,
            season_id,
            name: "Tuesday Futsal".to_string(),
            date: "2026-11-03".to_string(),
            time: "19:00".to_string(),
            location: "Mission Rec Center".to_string(),
            price: 1200,
            total_tickets: 10,
            organizer_id: None,
        }
    }

    fn new_season(organizer_id: Option<i64>, include_organizer: bool) -> NewSeason {
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
            include_organizer_in_count: include_organizer,
            organizer_id,
        }
    }

    #[tokio::test]
    async fn missing_game_loads_as_none() {
        let pool = connect_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        assert!(load(&mut conn, 42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn standalone_game_has_no_season_records() {
        let pool = connect_in_memory().await.unwrap();
        let game = games::insert_game(&pool, &new_game(None)).await.unwrap();
        let p1 = players::upsert_player_by_email(&pool, "Ana@Example.com", Some("Ana"), None).await.unwrap();
        let p2 = players::upsert_player_by_email(&pool, "ben@example.com", None, None).await.unwrap();
        attendees::insert_game_attendee(&pool, game.id, p1.id, "completed", None).await.unwrap();
        attendees::insert_game_attendee(&pool, game.id, p2.id, "pending", Some(AttendanceStatus::NotAttending))
            .await
            .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let input = load(&mut conn, game.id).await.unwrap().unwrap();

        assert_eq!(input.game.total_tickets, 10);
        assert_eq!(input.game.reserved_spots, 0);
        assert!(input.season.is_empty());
        assert_eq!(input.individual.len(), 2);
        assert_eq!(input.individual[0].email, "ana@example.com");
        assert_eq!(input.individual[0].payment_status, PaymentStatus::Completed);
        assert_eq!(input.individual[0].status, None);
        assert_eq!(input.individual[1].payment_status, PaymentStatus::Pending);
        assert_eq!(input.individual[1].status, Some(AttendanceStatus::NotAttending));
    }

    #[tokio::test]
    async fn season_game_carries_per_game_choices() {
        let pool = connect_in_memory().await.unwrap();
        let organizer = players::upsert_player_by_email(&pool, "org@example.com", None, None).await.unwrap();
        let season = seasons::insert_season(&pool, &new_season(Some(organizer.id), true)).await.unwrap();
        let game = games::insert_game(&pool, &new_game(Some(season.id))).await.unwrap();
        let other = games::insert_game(&pool, &new_game(Some(season.id))).await.unwrap();

        let p1 = players::upsert_player_by_email(&pool, "ana@example.com", None, None).await.unwrap();
        let p2 = players::upsert_player_by_email(&pool, "ben@example.com", None, None).await.unwrap();
        let pass1 = attendees::insert_season_attendee(&pool, season.id, p1.id, "completed").await.unwrap();
        let pass2 = attendees::insert_season_attendee(&pool, season.id, p2.id, "completed").await.unwrap();
        attendees::upsert_season_game_attendance(&pool, pass1.id, game.id, AttendanceStatus::NotAttending)
            .await
            .unwrap();
        // A choice for a different game must not leak into this roster.
        attendees::upsert_season_game_attendance(&pool, pass2.id, other.id, AttendanceStatus::NotAttending)
            .await
            .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let input = load(&mut conn, game.id).await.unwrap().unwrap();

        assert_eq!(input.game.reserved_spots, 1);
        assert_eq!(input.season.len(), 2);
        assert_eq!(input.season[0].season_attendee_id, pass1.id);
        assert_eq!(input.season[0].game_status, Some(AttendanceStatus::NotAttending));
        assert_eq!(input.season[1].game_status, None);
    }

    #[tokio::test]
    async fn booking_upsert_never_duplicates() {
        let pool = connect_in_memory().await.unwrap();
        let game = games::insert_game(&pool, &new_game(None)).await.unwrap();
        let p = players::upsert_player_by_email(&pool, "ana@example.com", None, None).await.unwrap();
        attendees::insert_game_attendee(&pool, game.id, p.id, "pending", None).await.unwrap();

        attendees::upsert_game_booking(&pool, game.id, p.id, 1200, Some("cs_1")).await.unwrap();
        let row = attendees::upsert_game_booking(&pool, game.id, p.id, 1200, Some("cs_1")).await.unwrap();

        assert_eq!(row.payment_status, "completed");
        assert_eq!(row.attendance_status.as_deref(), Some("attending"));
        assert_eq!(attendees::count_game_attendee_rows(&pool, game.id, p.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn seeding_keeps_an_existing_opt_out() {
        let pool = connect_in_memory().await.unwrap();
        let season = seasons::insert_season(&pool, &new_season(None, false)).await.unwrap();
        let game = games::insert_game(&pool, &new_game(Some(season.id))).await.unwrap();
        let p = players::upsert_player_by_email(&pool, "ana@example.com", None, None).await.unwrap();
        let pass = attendees::insert_season_attendee(&pool, season.id, p.id, "completed").await.unwrap();

        attendees::upsert_season_game_attendance(&pool, pass.id, game.id, AttendanceStatus::NotAttending)
            .await
            .unwrap();
        let inserted = attendees::seed_season_game_attendance(&pool, pass.id, game.id).await.unwrap();

        assert!(!inserted);
        let mut conn = pool.acquire().await.unwrap();
        let input = load(&mut conn, game.id).await.unwrap().unwrap();
        assert_eq!(input.season[0].game_status, Some(AttendanceStatus::NotAttending));
    }
}
