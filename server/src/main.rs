use clap::Parser;
use log::{error, info};
use server::app::Application;
use server::config;
use server::records::RecordStore;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;

// Command line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Path to the world configuration file
    #[clap(short, long)]
    config: PathBuf,

    /// Tick rate (simulation updates per second)
    #[clap(short, long, default_value = "20")]
    tick_rate: u32,

    /// Spawn joining dogs at random road positions instead of the map default
    #[clap(long)]
    randomize_spawn_points: bool,

    /// File backing the retired-player records store
    #[clap(long, default_value = "records/retired_players.jsonl")]
    records_file: PathBuf,

    /// Number of pooled records connections
    #[clap(long, default_value = "2")]
    records_pool: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::init();

    // Print a message about setting RUST_LOG if not set
    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Warning: RUST_LOG environment variable not set. Set it to display logs!");
        eprintln!("Recommended: RUST_LOG=info cargo run");
    }

    let args = Args::parse();
    let tick_interval = Duration::from_secs_f64(1.0 / args.tick_rate as f64);

    let loaded = config::load_game(&args.config)?;
    info!(
        "loaded {} maps, retiring idle players after {}s",
        loaded.world.maps().len(),
        loaded.retirement_seconds
    );

    let app = Arc::new(Application::new(
        loaded.world,
        args.randomize_spawn_points,
        loaded.retirement_seconds,
    ));

    let store = Arc::new(RecordStore::open(&args.records_file, args.records_pool)?);
    info!("records store at {}", args.records_file.display());
    {
        let store = Arc::clone(&store);
        app.set_retirement_callback(Box::new(move |name, score, play_time_seconds| {
            if let Err(err) = store.add(name, score, play_time_seconds) {
                error!("failed to persist record for {name}: {err}");
            }
        }));
    }

    info!(
        "simulation running: {} Hz ({:?} per tick)",
        args.tick_rate, tick_interval
    );

    let mut last_tick = Instant::now();
    let mut tick_count = 0u64;
    loop {
        sleep(tick_interval).await;

        let now = Instant::now();
        app.tick(now.duration_since(last_tick));
        last_tick = now;

        // Log status periodically
        tick_count += 1;
        if tick_count % 300 == 0 {
            info!("server status: {} players", app.player_count());
        }
    }
}
