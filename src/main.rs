//! Camzone Agent CLI
//!
//! Inspect restricted zones and replay recorded signal sequences through the
//! alert coordinator.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use camzone_agent::{
    activity::create_shared_log_with_persistence,
    config::{Config, LocationPolicy},
    coordinator::SignalCoordinator,
    geo::{GeoPoint, ZoneRegistry, ZoneStore},
    presenter::ConsolePresenter,
    watchers::{LocationTracker, SignalEvent, SignalPump, SignalRouter},
    VERSION,
};

#[derive(Parser)]
#[command(name = "camzone")]
#[command(version = VERSION)]
#[command(about = "Restricted-zone camera guard", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List loaded zones and any rejected descriptors
    Zones {
        /// Zone descriptor file (defaults to the configured path)
        #[arg(long, short)]
        file: Option<PathBuf>,
    },

    /// Show which zones contain a point
    Check {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lng: f64,

        #[arg(long, short)]
        file: Option<PathBuf>,
    },

    /// Feed a JSON-lines signal script through the coordinator
    Replay {
        /// Script path, or "-" for stdin
        script: String,

        #[arg(long, short)]
        file: Option<PathBuf>,

        /// Override the debounce window
        #[arg(long)]
        debounce_ms: Option<u64>,

        /// Present as a notification instead of a full-screen overlay
        #[arg(long)]
        no_fullscreen: bool,
    },

    /// Show configuration and cumulative activity
    Status,

    /// Show configuration, optionally updating and saving it
    Config {
        /// Set the zone descriptor file
        #[arg(long)]
        zones_file: Option<PathBuf>,

        /// Set the debounce window
        #[arg(long)]
        debounce_ms: Option<u64>,

        /// Set whether a full-screen overlay can be shown from the background
        #[arg(long)]
        fullscreen: Option<bool>,

        /// Set the policy for missing location (outside or inside)
        #[arg(long)]
        location_unavailable: Option<String>,
    },
}

/// One line of a replay script.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScriptStep {
    Wait { wait_ms: u64 },
    Signal(SignalEvent),
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Zones { file } => cmd_zones(file),
        Commands::Check { lat, lng, file } => cmd_check(lat, lng, file),
        Commands::Replay {
            script,
            file,
            debounce_ms,
            no_fullscreen,
        } => cmd_replay(&script, file, debounce_ms, no_fullscreen),
        Commands::Status => {
            cmd_status();
            Ok(())
        }
        Commands::Config {
            zones_file,
            debounce_ms,
            fullscreen,
            location_unavailable,
        } => cmd_config(zones_file, debounce_ms, fullscreen, location_unavailable),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("camzone_agent=info,camzone=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_registry(config: &Config, file: Option<PathBuf>) -> Result<ZoneRegistry> {
    let path = file.unwrap_or_else(|| config.zones_path.clone());
    ZoneRegistry::load_file(&path).with_context(|| format!("loading zones from {path:?}"))
}

fn cmd_zones(file: Option<PathBuf>) -> Result<()> {
    let config = Config::load().unwrap_or_default();
    let registry = load_registry(&config, file)?;

    println!("Restricted Zones ({})", registry.len());
    println!("=====================");
    for summary in registry.summaries() {
        println!(
            "  {} {:<24} {:>3} pts  center ({:.6}, {:.6})  {:.3} km²",
            summary.id,
            summary.name,
            summary.points,
            summary.center.latitude,
            summary.center.longitude,
            summary.area_km2
        );
    }

    if !registry.rejected().is_empty() {
        println!();
        println!("Rejected ({}):", registry.rejected().len());
        for rejected in registry.rejected() {
            println!(
                "  #{} {} ({}): {}",
                rejected.index,
                rejected.id.as_deref().unwrap_or("-"),
                rejected.name.as_deref().unwrap_or("unnamed"),
                rejected.cause
            );
        }
    }
    Ok(())
}

fn cmd_check(lat: f64, lng: f64, file: Option<PathBuf>) -> Result<()> {
    let config = Config::load().unwrap_or_default();
    let registry = load_registry(&config, file)?;
    let point = GeoPoint::new(lat, lng);

    let matches = registry.zones_containing(&point);
    if matches.is_empty() {
        println!("({lat}, {lng}) is outside every restricted zone");
    } else {
        println!("({lat}, {lng}) is inside:");
        for zone in matches {
            println!("  {} {}", zone.id(), zone.name());
        }
    }
    Ok(())
}

fn cmd_replay(
    script: &str,
    file: Option<PathBuf>,
    debounce_ms: Option<u64>,
    no_fullscreen: bool,
) -> Result<()> {
    let mut config = Config::load().unwrap_or_default();
    if let Some(ms) = debounce_ms {
        config.debounce_window = Duration::from_millis(ms);
    }
    if no_fullscreen {
        config.fullscreen_supported = false;
    }
    if let Err(e) = config.ensure_directories() {
        warn!("Could not create data directory: {e}");
    }

    let steps = read_script(script)?;
    let registry = load_registry(&config, file)?;

    println!("Camzone Agent v{VERSION}");
    println!("  Zones loaded: {}", registry.len());
    println!("  Debounce window: {}ms", config.debounce_window.as_millis());
    println!("  Full-screen overlay: {}", config.fullscreen_supported);
    println!("  Script steps: {}", steps.len());
    println!();

    let activity = create_shared_log_with_persistence(config.activity_path());
    activity.record_zones_rejected(registry.rejected().len() as u64);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_time()
        .build()
        .context("starting timer runtime")?;

    let coordinator = SignalCoordinator::with_activity_log(
        config.coordinator_config(),
        ConsolePresenter::new(),
        runtime.handle().clone(),
        Arc::clone(&activity),
    );
    coordinator.reset_presentation();

    let store = Arc::new(ZoneStore::new(registry));
    let tracker = LocationTracker::new(store, coordinator.clone(), config.location_unavailable);
    let router = SignalRouter::new(coordinator.clone(), tracker);

    let (pump, sender) = SignalPump::new();
    let interrupted = Arc::new(AtomicBool::new(false));
    ctrlc_handler(pump.running_flag(), interrupted.clone())?;

    let feeder_stop = interrupted.clone();
    let feeder = thread::spawn(move || {
        for step in steps {
            if feeder_stop.load(Ordering::SeqCst) {
                break;
            }
            match step {
                ScriptStep::Wait { wait_ms } => {
                    interruptible_sleep(Duration::from_millis(wait_ms), &feeder_stop)
                }
                ScriptStep::Signal(event) => {
                    if sender.send(event).is_err() {
                        break;
                    }
                }
            }
        }
    });

    let stats = pump.run(&router)?;
    if feeder.join().is_err() {
        warn!("Script feeder thread panicked");
    }
    info!(processed = stats.processed, failed = stats.failed, "Replay finished");

    if !interrupted.load(Ordering::SeqCst) {
        wait_for_pending_start(&coordinator, config.debounce_window);
    }

    println!();
    let status = coordinator.status();
    println!("Final decision: {}", status.decision.presentation_mode);
    println!("  Alert showing: {}", status.presenting);
    println!("  Screen on: {}", status.screen_on);
    if let Err(e) = coordinator.shutdown() {
        warn!("Could not take down alert: {e}");
    }

    println!();
    println!("{}", activity.summary());
    if let Err(e) = activity.save() {
        eprintln!("Warning: Could not save activity stats: {e}");
    }

    runtime.shutdown_timeout(Duration::from_millis(100));
    Ok(())
}

fn interruptible_sleep(total: Duration, stop: &AtomicBool) {
    let deadline = Instant::now() + total;
    while !stop.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep((deadline - now).min(Duration::from_millis(50)));
    }
}

/// Give a deferred start the chance to fire before tearing down.
fn wait_for_pending_start(coordinator: &SignalCoordinator, window: Duration) {
    let deadline = Instant::now() + window * 2 + Duration::from_millis(100);
    while coordinator.has_pending_start() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(20));
    }
}

fn read_script(source: &str) -> Result<Vec<ScriptStep>> {
    let reader: Box<dyn BufRead> = if source == "-" {
        Box::new(BufReader::new(std::io::stdin()))
    } else {
        let file = std::fs::File::open(Path::new(source))
            .with_context(|| format!("opening script {source}"))?;
        Box::new(BufReader::new(file))
    };

    let mut steps = Vec::new();
    for (number, line) in reader.lines().enumerate() {
        let line = line.context("reading script")?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        match serde_json::from_str::<ScriptStep>(trimmed) {
            Ok(step) => steps.push(step),
            Err(e) => warn!(line = number + 1, error = %e, "Skipping unreadable script line"),
        }
    }

    if steps.is_empty() {
        bail!("script {source} contains no signals");
    }
    Ok(steps)
}

fn cmd_status() {
    let config = Config::load().unwrap_or_default();

    println!("Camzone Agent Status");
    println!("====================");
    println!();

    println!("Configuration:");
    println!("  Zones file: {:?}", config.zones_path);
    match ZoneRegistry::load_file(&config.zones_path) {
        Ok(registry) => println!(
            "  Zones: {} loaded, {} rejected",
            registry.len(),
            registry.rejected().len()
        ),
        Err(e) => println!("  Zones: unavailable ({e})"),
    }
    println!("  Debounce window: {}ms", config.debounce_window.as_millis());
    println!("  Full-screen overlay: {}", config.fullscreen_supported);
    println!("  Location unavailable: {:?}", config.location_unavailable);
    println!();

    let stats_path = config.activity_path();
    if stats_path.exists() {
        if let Ok(content) = std::fs::read_to_string(&stats_path) {
            if let Ok(stats) = serde_json::from_str::<serde_json::Value>(&content) {
                println!("Cumulative Statistics:");
                for key in [
                    "signal_updates",
                    "location_fixes",
                    "zone_entries",
                    "zone_exits",
                    "alerts_started",
                    "alerts_stopped",
                    "deferred_cancelled",
                    "presentation_failures",
                ] {
                    if let Some(value) = stats.get(key) {
                        println!("  {}: {value}", key.replace('_', " "));
                    }
                }
            }
        }
    } else {
        println!("No previous session data found.");
    }
}

fn cmd_config(
    zones_file: Option<PathBuf>,
    debounce_ms: Option<u64>,
    fullscreen: Option<bool>,
    location_unavailable: Option<String>,
) -> Result<()> {
    let mut config = Config::load().context("loading configuration")?;
    let mut changed = false;

    if let Some(path) = zones_file {
        config.zones_path = path;
        changed = true;
    }
    if let Some(ms) = debounce_ms {
        config.debounce_window = Duration::from_millis(ms);
        changed = true;
    }
    if let Some(supported) = fullscreen {
        config.fullscreen_supported = supported;
        changed = true;
    }
    if let Some(policy) = location_unavailable {
        config.location_unavailable = match policy.as_str() {
            "outside" => LocationPolicy::Outside,
            "inside" => LocationPolicy::Inside,
            other => bail!("unknown location policy {other:?} (expected outside or inside)"),
        };
        changed = true;
    }

    if changed {
        config.save().context("saving configuration")?;
        println!("Configuration saved.");
        println!();
    }

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
    Ok(())
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>, interrupted: Arc<AtomicBool>) -> Result<()> {
    ctrlc::set_handler(move || {
        interrupted.store(true, Ordering::SeqCst);
        running.store(false, Ordering::SeqCst);
    })
    .context("setting Ctrl+C handler")
}
