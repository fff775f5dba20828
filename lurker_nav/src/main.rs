// Headless driver for the navigation core.
//
// Loads a waypoint graph and an optional JSON config, then runs a scripted
// player around the graph for a fixed number of ticks. The player circles
// the graph's centroid and makes a noise every few seconds; the creature's
// events are logged through `tracing` as they happen and the final
// `NavSnapshot` is printed to stdout as JSON. Useful for tuning configs and
// eyeballing behavior without the game.
//
// Usage:
//   lurker_sim --graph <PATH> [OPTIONS]
//     --config <PATH>   JSON NavConfig (default: built-in defaults)
//     --ticks <N>       Ticks to run (default: 3000)
//     --dt <SECONDS>    Seconds per tick (default: 0.05)
//     --seed <N>        Override the config's wander seed
//
// Log verbosity follows `RUST_LOG` (default: info).

use std::path::PathBuf;

use lurker_nav::graph_io::load_graph;
use lurker_nav::{NavConfig, NavResult, Navigator, PlayerPose, Vec3};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Seconds between scripted player noises.
const NOISE_INTERVAL: f32 = 4.0;
const NOISE_INTENSITY: f32 = 6.0;
/// Radians per second the scripted player circles at.
const ORBIT_SPEED: f32 = 0.05;

struct Args {
    graph: PathBuf,
    config: Option<PathBuf>,
    ticks: u32,
    dt: f32,
    seed: Option<u64>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args();
    if let Err(e) = run(&args) {
        eprintln!("lurker_sim: {e}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> NavResult<()> {
    let graph = load_graph(&args.graph)?;
    let mut config = match &args.config {
        Some(path) => NavConfig::load(path)?,
        None => NavConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    let (center, radius) = orbit_of(graph.nodes().iter().map(|n| n.position));
    let mut nav = Navigator::new(graph, config)?;
    let mut next_noise = NOISE_INTERVAL;

    for tick in 1..=args.ticks {
        let now = tick as f32 * args.dt;
        let angle = now * ORBIT_SPEED;
        let position = center + Vec3::new(radius * angle.cos(), 0.0, radius * angle.sin());
        // Facing along the orbit.
        let forward = Vec3::new(-angle.sin(), 0.0, angle.cos());
        let player = PlayerPose { position, forward };

        if now >= next_noise {
            nav.add_sound(position, NOISE_INTENSITY);
            next_noise += NOISE_INTERVAL;
        }

        let result = nav.tick(now, args.dt, player);
        for event in &result.events {
            info!(time = event.time, kind = ?event.kind, "event");
        }
        if nav.agent().halted {
            info!(tick, "player caught, stopping");
            break;
        }
    }

    let stats = nav.stats();
    info!(
        path_searches = stats.path_searches,
        wanders = stats.wanders,
        sounds = stats.sounds,
        menace_checks = stats.menace_checks,
        "run finished"
    );
    let snapshot = serde_json::to_string_pretty(&nav.snapshot())?;
    println!("{snapshot}");
    Ok(())
}

/// Centroid of the graph and half the largest horizontal extent around it.
fn orbit_of(positions: impl Iterator<Item = Vec3>) -> (Vec3, f32) {
    let points: Vec<Vec3> = positions.collect();
    if points.is_empty() {
        return (Vec3::ZERO, 0.0);
    }
    let mut sum = Vec3::ZERO;
    for &p in &points {
        sum += p;
    }
    let center = sum * (1.0 / points.len() as f32);
    let reach = points
        .iter()
        .map(|&p| {
            let d = p - center;
            (d.x * d.x + d.z * d.z).sqrt()
        })
        .fold(0.0_f32, f32::max);
    (center, reach * 0.5)
}

/// Parse command-line arguments. Uses simple `std::env::args()` matching.
fn parse_args() -> Args {
    let mut graph = None;
    let mut parsed = Args {
        graph: PathBuf::new(),
        config: None,
        ticks: 3000,
        dt: 0.05,
        seed: None,
    };
    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--graph" => {
                i += 1;
                graph = Some(PathBuf::from(value_of(&args, i, "--graph")));
            }
            "--config" => {
                i += 1;
                parsed.config = Some(PathBuf::from(value_of(&args, i, "--config")));
            }
            "--ticks" => {
                i += 1;
                parsed.ticks = parse_value(&args, i, "--ticks");
            }
            "--dt" => {
                i += 1;
                parsed.dt = parse_value(&args, i, "--dt");
                if !parsed.dt.is_finite() || parsed.dt <= 0.0 {
                    eprintln!("--dt must be a positive number of seconds");
                    std::process::exit(1);
                }
            }
            "--seed" => {
                i += 1;
                parsed.seed = Some(parse_value(&args, i, "--seed"));
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    match graph {
        Some(path) => parsed.graph = path,
        None => {
            eprintln!("--graph is required");
            print_usage();
            std::process::exit(1);
        }
    }
    parsed
}

fn value_of<'a>(args: &'a [String], i: usize, flag: &str) -> &'a str {
    args.get(i).map(String::as_str).unwrap_or_else(|| {
        eprintln!("{flag} requires a value");
        std::process::exit(1);
    })
}

fn parse_value<T: std::str::FromStr>(args: &[String], i: usize, flag: &str) -> T {
    value_of(args, i, flag).parse().unwrap_or_else(|_| {
        eprintln!("{flag} requires a valid number");
        std::process::exit(1);
    })
}

fn print_usage() {
    println!("Usage: lurker_sim --graph <PATH> [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --graph <PATH>     Waypoint graph file (required)");
    println!("  --config <PATH>    JSON config (default: built-in defaults)");
    println!("  --ticks <N>        Ticks to run (default: 3000)");
    println!("  --dt <SECONDS>     Seconds per tick (default: 0.05)");
    println!("  --seed <N>         Override the wander seed");
    println!("  --help, -h         Show this help");
}
