use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures of booking and attendance operations. Each maps to one HTTP
/// status at the API edge.
#[derive(Debug, Error)]
pub enum Error {
    /// A required field is missing or malformed.
    #[error("{0}")]
    Validation(String),

    /// The player holds no confirmed booking for the game or its season.
    #[error("player {player_id} has not paid for game {game_id}")]
    NotPaid { player_id: i64, game_id: i64 },

    /// Occupancy already reached capacity.
    #[error("{0} is full")]
    GameFull(String),

    #[error("{0} not found")]
    NotFound(String),

    /// The database or a hosted provider failed.
    #[error("upstream failure: {0}")]
    Upstream(#[from] anyhow::Error),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    pub fn not_found(what: impl std::fmt::Display, id: i64) -> Self {
        Error::NotFound(format!("{what} {id}"))
    }

    pub fn game_full(game_id: i64) -> Self {
        Error::GameFull(format!("Game {game_id}"))
    }

    pub fn season_full(season_id: i64) -> Self {
        Error::GameFull(format!("Season {season_id}"))
    }
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        Error::Upstream(e.into())
    }
}
