use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use sports_tracker::{should_monitor, MonitorHandle, Tracker, TrackingRequest};

/// Live sports game tracker
#[derive(Parser, Debug)]
#[command(name = "sports-tracker", about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the games a request would track
    Games(RequestArgs),
    /// Monitor every upcoming game until it finishes (Ctrl-C to stop)
    Track(RequestArgs),
}

#[derive(Args, Debug)]
struct RequestArgs {
    /// Sport, e.g. football
    #[arg(long)]
    sport: String,

    /// League within the sport, e.g. college-football
    #[arg(long)]
    league: String,

    /// Conference group id (repeatable)
    #[arg(long = "conference")]
    conferences: Vec<String>,

    /// Team id (repeatable)
    #[arg(long = "team")]
    teams: Vec<String>,
}

impl From<RequestArgs> for TrackingRequest {
    fn from(args: RequestArgs) -> Self {
        TrackingRequest::new(args.sport, args.league)
            .with_conferences(args.conferences)
            .with_teams(args.teams)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let tracker = Tracker::from_env().context("Invalid tracker configuration")?;

    match cli.command {
        Commands::Games(args) => list_games(&tracker, args.into()).await,
        Commands::Track(args) => track(&tracker, args.into()).await,
    }
}

async fn list_games(tracker: &Tracker, request: TrackingRequest) -> Result<()> {
    let games = tracker
        .scheduler
        .discover(&request)
        .await
        .context("Failed to discover games")?;

    if games.is_empty() {
        println!("No games found for {} {}.", request.sport, request.league);
        return Ok(());
    }

    let now = chrono::Utc::now();
    println!("{} games:\n", games.len());
    for game in &games {
        let marker = if should_monitor(game, now) { "*" } else { " " };
        println!(
            "{} {:<10} {} at {}  {}  [{}]",
            marker,
            game.id,
            game.away.display_name,
            game.home.display_name,
            game.start_time.format("%Y-%m-%d %H:%M UTC"),
            game.status
        );
    }
    println!("\n* = would be monitored");

    Ok(())
}

async fn track(tracker: &Tracker, request: TrackingRequest) -> Result<()> {
    let report = tracker
        .scheduler
        .collect(&request)
        .await
        .context("Failed to schedule games")?;

    println!(
        "Discovered {} games, monitoring {}",
        report.discovered.len(),
        report.scheduled.len()
    );
    if report.scheduled.is_empty() {
        return Ok(());
    }

    let registry = tracker.registry.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\nStopping all monitors...");
            registry.shutdown().await;
        }
    });

    for handle in &report.scheduled {
        report_outcome(handle).await;
    }

    Ok(())
}

async fn report_outcome(handle: &MonitorHandle) {
    let outcome = handle.wait().await;
    let game = handle.game();
    println!(
        "{} ({} at {}): {}",
        handle.identity(),
        game.away.display_name,
        game.home.display_name,
        outcome
    );
}
