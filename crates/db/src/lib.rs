use anyhow::Result;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use tracing::info;

pub mod attendees;
pub mod discounts;
pub mod games;
pub mod groups;
pub mod players;
pub mod roster;
pub mod seasons;

pub use games::NewGame;
pub use discounts::NewDiscountCode;
pub use groups::NewGroup;
pub use seasons::NewSeason;

pub async fn connect(database_url: &str) -> Result<SqlitePool> {
    let pool = SqlitePool::connect(database_url).await?;
    info!("Connected to database: {database_url}");
    Ok(pool)
}

/// A private in-memory database with migrations applied.
///
/// Limited to one connection: every `sqlite::memory:` connection is its own
/// database.
pub async fn connect_in_memory() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    migrate(&pool).await?;
    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    info!("Migrations applied");
    Ok(())
}
