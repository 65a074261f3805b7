mod api;
mod error;
mod extract;

use std::time::Duration;

use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use pickup_config::Config;
use pickup_core::attendance::{self, SetAttendance};
use pickup_core::checkout::{self, CheckoutSettings};
use pickup_core::money::{to_display, to_minor};
use pickup_core::{catalog, game_roster, RosterCache};
use pickup_db::{games, NewDiscountCode, NewGame, NewGroup, NewSeason};
use pickup_models::AttendanceStatus;
use pickup_providers::{EmailSender, StripeClient};
use sqlx::SqlitePool;
use tower_http::services::{ServeDir, ServeFile};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::OffsetTime;

use crate::api::AppState;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const GIT_HASH: &str = env!("PICKUP_GIT_HASH");

fn version_string() -> String {
    format!("{VERSION} ({GIT_HASH})")
}

// --- CLI definition ---

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

#[derive(Parser)]
#[command(name = "pickup")]
#[command(about = "Pickup game bookings, season passes and attendance")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("PICKUP_GIT_HASH"), ")"))]
struct Cli {
    /// Log level (overrides config)
    #[arg(short, long, global = true)]
    log_level: Option<LogLevel>,

    /// Display log timestamps in UTC (default: local time)
    #[arg(long, global = true)]
    utc: bool,

    /// Database URL (overrides config)
    #[arg(long, global = true)]
    db_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// List games, optionally from a date on
    ListGames {
        /// First date to include (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,
    },
    /// Show who is playing in a game
    Roster {
        game_id: i64,
    },
    /// Create a group
    AddGroup {
        #[arg(long)]
        name: String,
        /// URL slug (lowercase letters, digits and dashes)
        #[arg(long)]
        slug: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Create a standalone game, or one inside an existing season
    AddGame {
        #[arg(long)]
        name: String,
        /// YYYY-MM-DD
        #[arg(long)]
        date: String,
        /// HH:MM
        #[arg(long)]
        time: String,
        #[arg(long)]
        location: String,
        /// Price in display units (e.g. 12.50)
        #[arg(long, default_value_t = 0.0)]
        price: f64,
        #[arg(long)]
        tickets: i64,
        #[arg(long)]
        group_id: Option<i64>,
        #[arg(long)]
        season_id: Option<i64>,
    },
    /// Create a season and its schedule of games
    AddSeason {
        #[arg(long)]
        name: String,
        #[arg(long)]
        location: String,
        /// Price of a pass for every game
        #[arg(long)]
        season_price: f64,
        /// Price of a single game
        #[arg(long)]
        game_price: f64,
        /// Passes on sale
        #[arg(long)]
        season_spots: i64,
        /// Players per game
        #[arg(long)]
        game_spots: i64,
        /// YYYY-MM-DD
        #[arg(long)]
        first_date: String,
        /// HH:MM
        #[arg(long)]
        time: String,
        /// weekly, biweekly or monthly
        #[arg(long, default_value = "weekly")]
        repeat: String,
        /// Number of games
        #[arg(long)]
        games: i64,
        #[arg(long)]
        group_id: Option<i64>,
        #[arg(long)]
        organizer_id: Option<i64>,
        /// Hold one spot per game for the organizer
        #[arg(long)]
        count_organizer: bool,
    },
    /// Create a discount code
    AddDiscountCode {
        #[arg(long)]
        code: String,
        /// percentage or fixed
        #[arg(long = "type")]
        discount_type: String,
        /// Percent off, or an amount in display units for fixed codes
        #[arg(long)]
        value: f64,
        #[arg(long)]
        max_uses: Option<i64>,
        #[arg(long)]
        valid_until: Option<String>,
        #[arg(long)]
        game_id: Option<i64>,
        #[arg(long)]
        season_id: Option<i64>,
        #[arg(long)]
        group_id: Option<i64>,
    },
    /// Book a player into a game without payment
    AddBooking {
        #[arg(long)]
        game_id: i64,
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: Option<String>,
    },
    /// Mark a player in or out of a game
    SetAttendance {
        #[arg(long)]
        game_id: i64,
        #[arg(long)]
        player_id: i64,
        /// attending or not_attending
        #[arg(long)]
        status: AttendanceStatus,
    },
}

// --- Logging ---

fn init_logging(config: &Config) {
    let filter = EnvFilter::new(&config.log_level);

    if config.utc {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_timer(OffsetTime::new(
                time::UtcOffset::UTC,
                time::macros::format_description!(
                    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
                ),
            ))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_timer(LocalTimer)
            .init();
    }
}

struct LocalTimer;

impl tracing_subscriber::fmt::time::FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        let now = Local::now();
        write!(w, "{}", now.format("%Y-%m-%dT%H:%M:%S%.3f%:z"))
    }
}

// --- Server ---

async fn run_server(config: &Config, pool: SqlitePool, cache: RosterCache) -> anyhow::Result<()> {
    info!("Pickup v{}", version_string());
    if !config.stripe_enabled() {
        warn!("No Stripe secret key configured; checkout is disabled");
    }
    if !config.email_enabled() {
        info!("No Resend API key configured; confirmation emails are logged only");
    }

    let state = AppState {
        pool,
        cache: cache.clone(),
        gateway: StripeClient::new(&config.stripe_api_base, &config.stripe_secret_key, &config.currency),
        mailer: EmailSender::from_key(&config.resend_api_base, &config.resend_api_key, &config.email_from),
        checkout: CheckoutSettings { site_url: config.site_url.clone() },
        request_timeout: Duration::from_secs(config.request_timeout_secs),
    };

    // Expired rosters would otherwise linger until their key is read again.
    let sweep_every = Duration::from_secs(config.cache_ttl_secs.max(1) * 4);
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(sweep_every);
        loop {
            tick.tick().await;
            cache.cleanup_expired().await;
        }
    });

    let app = api::router(state)
        .fallback_service(ServeDir::new("frontend/dist").fallback(ServeFile::new("frontend/dist/index.html")));

    let addr = format!("0.0.0.0:{}", config.port);
    info!("Listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Main ---

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Layer 4: CLI flags
    let mut config = Config::load();
    if let Some(level) = &cli.log_level {
        config.log_level = level.to_string();
    }
    if cli.utc {
        config.utc = true;
    }
    if let Some(url) = &cli.db_url {
        config.db_url = url.clone();
    }
    if let Commands::Serve { port: Some(port) } = &cli.command {
        config.port = *port;
    }
    init_logging(&config);

    let pool = pickup_db::connect(&config.db_url).await?;
    pickup_db::migrate(&pool).await?;
    let cache = RosterCache::new(Duration::from_secs(config.cache_ttl_secs));

    match cli.command {
        Commands::Serve { .. } => {
            run_server(&config, pool, cache).await?;
        }
        Commands::ListGames { from } => {
            let games = games::list_games(&pool, from.as_deref()).await?;
            if games.is_empty() {
                println!("No games found.");
            } else {
                println!(
                    "{:<6} {:<12} {:<6} {:<30} {:<25} {:>8} {:>10}",
                    "ID", "Date", "Time", "Name", "Location", "Price", "Spots"
                );
                println!("{}", "-".repeat(104));
                for g in &games {
                    let roster = game_roster(&pool, &cache, g.id).await?;
                    println!(
                        "{:<6} {:<12} {:<6} {:<30} {:<25} {:>8.2} {:>4}/{:<5}",
                        g.id,
                        g.date,
                        g.time,
                        g.name,
                        g.location,
                        to_display(g.price),
                        roster.occupancy.available(),
                        g.total_tickets,
                    );
                }
                println!("\n{} game(s) total", games.len());
            }
        }
        Commands::Roster { game_id } => {
            let roster = game_roster(&pool, &cache, game_id).await?;
            println!("{} on {} {} at {}", roster.game.name, roster.game.date, roster.game.time, roster.game.location);
            println!("{:<6} {:<25} {:<30} {}", "ID", "Name", "Email", "Via");
            println!("{}", "-".repeat(72));
            for a in &roster.attendees {
                let via = match a.source {
                    pickup_models::AttendeeSource::Individual => "ticket",
                    pickup_models::AttendeeSource::Season => "season pass",
                };
                println!("{:<6} {:<25} {:<30} {}", a.player_id, a.name.as_deref().unwrap_or(""), a.email, via);
            }
            println!(
                "\n{} attending, {} of {} spots left",
                roster.attendees.len(),
                roster.occupancy.available(),
                roster.occupancy.total_tickets
            );
        }
        Commands::AddGroup { name, slug, description } => {
            let group = catalog::create_group(&pool, NewGroup { name, slug, description }).await?;
            println!("Added group {} ({}) id={}", group.name, group.slug, group.id);
        }
        Commands::AddGame { name, date, time, location, price, tickets, group_id, season_id } => {
            let game = catalog::create_game(
                &pool,
                NewGame {
                    group_id,
                    season_id,
                    name,
                    date,
                    time,
                    location,
                    price: to_minor(price),
                    total_tickets: tickets,
                    organizer_id: None,
                },
            )
            .await?;
            println!("Added game {} on {} {} id={}", game.name, game.date, game.time, game.id);
        }
        Commands::AddSeason {
            name,
            location,
            season_price,
            game_price,
            season_spots,
            game_spots,
            first_date,
            time,
            repeat,
            games,
            group_id,
            organizer_id,
            count_organizer,
        } => {
            let (season, games) = catalog::create_season(
                &pool,
                NewSeason {
                    group_id,
                    name,
                    description: None,
                    location,
                    season_price: to_minor(season_price),
                    individual_game_price: to_minor(game_price),
                    season_spots,
                    game_spots,
                    first_game_date: first_date,
                    first_game_time: time,
                    repeat_type: repeat,
                    repeat_count: games,
                    include_organizer_in_count: count_organizer,
                    organizer_id,
                },
            )
            .await?;
            println!("Added season {} id={} with {} games:", season.name, season.id, games.len());
            for g in &games {
                println!("  {:<6} {} {}", g.id, g.date, g.time);
            }
        }
        Commands::AddDiscountCode {
            code,
            discount_type,
            value,
            max_uses,
            valid_until,
            game_id,
            season_id,
            group_id,
        } => {
            let discount_value = if discount_type == "fixed" { to_minor(value) } else { value.round() as i64 };
            let row = catalog::create_discount_code(
                &pool,
                NewDiscountCode {
                    code,
                    description: None,
                    discount_type,
                    discount_value,
                    max_uses,
                    valid_from: None,
                    valid_until,
                    game_id,
                    season_id,
                    group_id,
                },
            )
            .await?;
            println!("Added discount code {} id={}", row.code, row.id);
        }
        Commands::AddBooking { game_id, email, name } => {
            let booked = checkout::comp_booking(&pool, &cache, game_id, &email, name.as_deref()).await?;
            if booked.newly_confirmed {
                println!("Booked player {} into game {}", booked.player_id, game_id);
            } else {
                println!("Player {} already holds a ticket for game {}", booked.player_id, game_id);
            }
        }
        Commands::SetAttendance { game_id, player_id, status } => {
            let change = attendance::set_attendance(
                &pool,
                &cache,
                SetAttendance { game_id, player_id, season_id: None, status },
            )
            .await?;
            println!(
                "Player {} is now {} for game {} ({} spots left)",
                change.player_id, change.status, change.game_id, change.available
            );
        }
    }

    Ok(())
}
