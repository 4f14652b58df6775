//! FlightPath scenario CLI
//!
//! Flies the demo scenes headless and checks every frame.

use clap::Parser;
use flightpath_core::{AxisConvention, EndPolicy, SceneConfig};
use flightpath_sim::scenarios::ScenarioId;
use flightpath_sim::{ScenarioResult, ScenarioRunner};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// FlightPath headless scenario runner
#[derive(Parser, Debug)]
#[command(name = "flightpath-sim")]
#[command(about = "Fly path-follower scenarios headless and check every frame", long_about = None)]
struct Args {
    /// Scenario to run (straight, weave, intercept, replay, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Frame budget per scenario
    #[arg(short, long, default_value = "1000")]
    frames: u64,

    /// Clock speed (overrides the config file; clamped to the speed range)
    #[arg(long)]
    speed: Option<f64>,

    /// Scene configuration JSON
    #[arg(short, long)]
    config: Option<String>,

    /// Body axis convention (z-up, ned); overrides the config file
    #[arg(long)]
    convention: Option<String>,

    /// Hold at t=1 instead of stopping the clock
    #[arg(long)]
    hold_at_end: bool,

    /// Write the replay scenario's trajectory table here
    #[arg(long)]
    table: Option<String>,

    /// Export frames to a JSON file (single scenario only)
    #[arg(long)]
    export: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,
}

fn load_config(args: &Args) -> Result<SceneConfig, String> {
    let mut config = match &args.config {
        Some(path) => SceneConfig::from_file(path).map_err(|e| e.to_string())?,
        None => SceneConfig::default(),
    };
    if let Some(convention) = &args.convention {
        config.orientation.convention = match convention.to_lowercase().as_str() {
            "z-up" | "z_up" | "zup" => AxisConvention::ZUp,
            "ned" => AxisConvention::Ned,
            other => return Err(format!("Unknown convention: {}", other)),
        };
    }
    if args.hold_at_end {
        config.clock.end_policy = EndPolicy::HoldAtEnd;
    }
    if let Some(speed) = args.speed {
        config.clock.speed = speed;
    }
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn main() {
    let args = Args::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if !args.json {
        info!("FlightPath scenario runner v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        vec![args.scenario.parse().unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            eprintln!("Available scenarios: straight, weave, intercept, replay, all");
            std::process::exit(1);
        })]
    };

    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    let mut runner = ScenarioRunner::new(config).with_frames(args.frames);
    if let Some(table) = &args.table {
        runner = runner.with_table_path(table);
    }

    // Handle --export mode for external viewers
    if let Some(export_path) = &args.export {
        if scenarios.len() > 1 {
            eprintln!("Error: --export only supports a single scenario, not 'all'");
            std::process::exit(1);
        }

        let (result, export) = runner.run_recorded(scenarios[0]);
        if let Err(e) = export.write_to_file(export_path) {
            error!("Failed to write export: {:?}", e);
            std::process::exit(1);
        }
        info!("Exported {} frames to {}", export.frames.len(), export_path);

        if result.passed {
            info!("✓ {} PASSED - exported to {}", scenarios[0].name(), export_path);
        } else {
            error!(
                "✗ {} FAILED: {}",
                scenarios[0].name(),
                result.failure_reason.as_deref().unwrap_or("unknown")
            );
            std::process::exit(1);
        }
        return;
    }

    let mut all_results: Vec<ScenarioResult> = Vec::new();
    let mut failed_count = 0;

    for scenario in &scenarios {
        let result = runner.run(*scenario);

        if !args.json {
            if result.passed {
                info!(
                    "✓ {} PASSED ({} ticks, t={:.3})",
                    scenario.name(),
                    result.total_ticks,
                    result.final_t
                );
                for (body, points) in &result.trail_points {
                    info!("    {} trail: {} points", body, points);
                }
                if let Some(event) = &result.proximity {
                    info!(
                        "    proximity at t={:.3}, separation {:.3}",
                        event.t, event.distance
                    );
                }
            } else {
                error!(
                    "✗ {} FAILED: {}",
                    scenario.name(),
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }

        if !result.passed {
            failed_count += 1;
        }
        all_results.push(result);
    }

    let total = all_results.len();
    let passed = total - failed_count;

    if args.json {
        let summary = serde_json::json!({
            "total": total,
            "passed": passed,
            "failed": failed_count,
            "results": all_results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario.name(),
                    "passed": r.passed,
                    "ticks": r.total_ticks,
                    "final_t": r.final_t,
                    "state": r.final_state,
                    "trails": r.trail_points,
                    "proximity": r.proximity,
                    "failure_reason": r.failure_reason,
                })
            }).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => error!("Failed to encode summary: {}", e),
        }
    } else {
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if failed_count == 0 {
            info!("✅ All {} scenario runs passed!", total);
        } else {
            error!("❌ {}/{} scenario runs failed!", failed_count, total);
            for result in &all_results {
                if !result.passed {
                    error!(
                        "  - {}: {}",
                        result.scenario.name(),
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }
        }
    }

    // Exit with proper code for CI
    if failed_count > 0 {
        std::process::exit(1);
    }
}
