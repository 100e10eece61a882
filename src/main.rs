use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::sync::Arc;
use std::time::Duration;

use signal_sim::{
    config::SimulatorConfig,
    engine::Engine,
    optimizer::OptimizerClient,
    scheduler::{DriverHandle, ManualScheduler},
    simulation::{IntersectionSnapshot, VehicleKind},
};

#[derive(Parser)]
#[command(name = "signal-sim")]
#[command(about = "Single-intersection traffic signal simulation")]
struct Args {
    /// Simulator configuration file (defaults are used when omitted)
    #[arg(short, long)]
    config: Option<String>,

    /// Random seed for reproducible simulations
    #[arg(short, long)]
    seed: Option<u64>,

    /// How long to run, in seconds of scheduler time
    #[arg(short, long, default_value_t = 60.0)]
    duration: f64,

    /// Simulation speed multiplier
    #[arg(long, default_value_t = 1)]
    speed: u32,

    /// Override the optimizer base URL from the configuration
    #[arg(long)]
    optimizer_url: Option<String>,

    /// Ask the optimizer for a new plan every N seconds (realtime mode only)
    #[arg(long)]
    optimize_every: Option<u64>,

    /// Run on virtual time as fast as possible instead of real timers
    #[arg(long = "virtual")]
    virtual_time: bool,

    /// Print a JSON snapshot after every simulation tick
    #[arg(long)]
    json: bool,

    /// Enable verbose logging for detailed simulation progress
    #[arg(short, long)]
    verbose: bool,
}

fn log_status(snapshot: &IntersectionSnapshot) {
    info!(
        "{} | {} {}s | queues N{} S{} E{} W{} | {} vehicles | commute {:.1} wait {:.1} thr {:.0} eff {:.0}%",
        snapshot.intersection,
        snapshot.phase.as_str(),
        snapshot.seconds_remaining,
        snapshot.queues.north,
        snapshot.queues.south,
        snapshot.queues.east,
        snapshot.queues.west,
        snapshot.vehicles.len(),
        snapshot.metrics.avg_commute_time,
        snapshot.metrics.avg_wait_time,
        snapshot.metrics.throughput,
        snapshot.metrics.efficiency_percent,
    );
}

fn log_vehicle_mix(engine: &Engine) {
    let counts = engine.state().vehicle_counts();
    for kind in [VehicleKind::Car, VehicleKind::Truck, VehicleKind::Bus] {
        info!("  {}: {}", kind.as_str(), counts.get(&kind).copied().unwrap_or(0));
    }
}

fn print_json(snapshot: &IntersectionSnapshot) {
    match serde_json::to_string(snapshot) {
        Ok(line) => println!("{}", line),
        Err(e) => log::error!("Failed to serialize snapshot: {}", e),
    }
}

fn run_virtual(engine: Engine, args: &Args) -> Result<()> {
    let mut scheduler = ManualScheduler::new(engine);
    scheduler.set_speed(args.speed)?;

    if args.json {
        scheduler.subscribe(print_json);
    }

    info!("Running {:.0}s of virtual time...", args.duration);
    let mut elapsed = 0.0;
    while elapsed < args.duration {
        let step = (args.duration - elapsed).min(10.0);
        scheduler.advance_by_seconds(step)?;
        elapsed += step;
        log_status(&scheduler.snapshot());
    }

    let snapshot = scheduler.snapshot();
    info!("Simulation completed!");
    info!(
        "Final vehicle count: {} active, {} total spawned, {} departed over {} ticks",
        snapshot.vehicles.len(),
        snapshot.total_spawned,
        snapshot.total_despawned,
        snapshot.ticks
    );
    log_vehicle_mix(scheduler.engine());
    Ok(())
}

async fn run_realtime(engine: Engine, args: &Args, run_for: Duration, optimizer: OptimizerClient) -> Result<()> {
    let driver = DriverHandle::spawn(engine);
    driver.apply(signal_sim::Command::SetSpeed(args.speed)).await?;

    let optimizer = Arc::new(optimizer);
    let mut snapshots = driver.snapshots();
    let mut status = tokio::time::interval(Duration::from_secs(1));
    let mut optimize = args
        .optimize_every
        .filter(|&secs| secs > 0)
        .map(|secs| tokio::time::interval(Duration::from_secs(secs)));
    let deadline = tokio::time::sleep(run_for);
    tokio::pin!(deadline);

    info!("Running {:.0}s in real time...", args.duration);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                if args.json {
                    print_json(&snapshots.borrow_and_update());
                }
            }
            _ = status.tick() => {
                log_status(&driver.snapshot().await);
            }
            _ = async {
                match optimize.as_mut() {
                    Some(interval) => interval.tick().await,
                    None => std::future::pending().await,
                }
            } => {
                driver.spawn_optimize(Arc::clone(&optimizer));
            }
        }
    }

    let snapshot = driver.snapshot().await;
    log_vehicle_mix(&*driver.engine().lock().await);
    driver.shutdown().await;

    info!("Simulation completed!");
    info!(
        "Final vehicle count: {} active, {} total spawned over {} ticks",
        snapshot.vehicles.len(),
        snapshot.total_spawned,
        snapshot.ticks
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(if args.verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info })
        .init();
    info!("Starting Signal Simulator");

    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {}", path);
            SimulatorConfig::load_from_file(path)?
        }
        None => SimulatorConfig::default(),
    };
    if let Some(url) = &args.optimizer_url {
        config.optimizer.base_url = url.clone();
    }

    if args.verbose {
        info!(
            "Signal timing: green {}s, yellow {}s, red {}s",
            config.signal.green_seconds, config.signal.yellow_seconds, config.signal.red_seconds
        );
        info!("Vehicle types loaded: {}", config.traffic.vehicle_types.len());
        info!("Optimizer endpoint: {}/optimize", config.optimizer.base_url);
    }

    let seed = args.seed.or(config.random.seed);
    if let Some(seed) = seed {
        info!("Random Seed: {}", seed);
    }

    let run_for = Duration::try_from_secs_f64(args.duration)
        .with_context(|| format!("Invalid --duration {}", args.duration))?;

    let optimizer = OptimizerClient::new(&config.optimizer)?;
    let engine = Engine::new(config, seed)?;

    if args.virtual_time {
        run_virtual(engine, &args)
    } else {
        run_realtime(engine, &args, run_for, optimizer).await
    }
}
