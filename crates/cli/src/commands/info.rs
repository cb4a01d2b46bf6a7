//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::AppConfig;
use serde::Serialize;
use sensor_sim::{HORIZONTAL_FOV, VERTICAL_FOV};
use tracing::info;

use super::load_config;
use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    depth: DepthInfo,
    trail_capacity: usize,
    gestures: GestureInfo,
    render: RenderInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    simulation: Option<SimulationInfo>,
}

#[derive(Serialize)]
struct DepthInfo {
    x_res: u32,
    y_res: u32,
    fps: u32,
    max_depth_mm: u16,
    horizontal_fov_rad: f64,
    vertical_fov_rad: f64,
}

#[derive(Serialize)]
struct GestureInfo {
    focus: String,
    enabled: Vec<String>,
}

#[derive(Serialize)]
struct RenderInfo {
    consume_timeout_ms: u64,
    exit_after_secs: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    snapshot_every: Option<u64>,
}

#[derive(Serialize)]
struct SimulationInfo {
    seed: u64,
    hand_lifetime_frames: u64,
    gesture_interval_frames: u64,
    max_hands: usize,
    realtime: bool,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    let app = load_config(&args.config)?;

    if args.json {
        let info = build_config_info(&app, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&app, args);
    }

    Ok(())
}

fn build_config_info(app: &AppConfig, args: &InfoArgs) -> ConfigInfo {
    let simulation = args.simulation.then(|| SimulationInfo {
        seed: app.simulation.seed,
        hand_lifetime_frames: app.simulation.hand_lifetime_frames,
        gesture_interval_frames: app.simulation.gesture_interval_frames,
        max_hands: app.simulation.max_hands,
        realtime: app.simulation.realtime,
    });

    ConfigInfo {
        version: format!("{:?}", app.version),
        depth: DepthInfo {
            x_res: app.depth.x_res,
            y_res: app.depth.y_res,
            fps: app.depth.fps,
            max_depth_mm: app.depth.max_depth_mm,
            horizontal_fov_rad: HORIZONTAL_FOV,
            vertical_fov_rad: VERTICAL_FOV,
        },
        trail_capacity: app.trail.capacity,
        gestures: GestureInfo {
            focus: app.gestures.focus.clone(),
            enabled: app.gestures.enabled.clone(),
        },
        render: RenderInfo {
            consume_timeout_ms: app.render.consume_timeout_ms,
            exit_after_secs: app.render.exit_after_secs,
            snapshot_every: (app.render.snapshot_every > 0).then_some(app.render.snapshot_every),
        },
        simulation,
    }
}

fn print_config_info(app: &AppConfig, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                 handtrail Configuration                      ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📷 Depth");
    println!("   ├─ Version: {:?}", app.version);
    println!(
        "   ├─ Output mode: {}x{} @ {} fps",
        app.depth.x_res, app.depth.y_res, app.depth.fps
    );
    println!(
        "   ├─ Field of view: {:.4} x {:.4} rad",
        HORIZONTAL_FOV, VERTICAL_FOV
    );
    println!("   └─ Max depth: {} mm", app.depth.max_depth_mm);

    println!("\n✋ Trails & Gestures");
    println!("   ├─ Trail capacity: {}", app.trail.capacity);
    println!("   ├─ Focus gesture: {}", app.gestures.focus);
    let count = app.gestures.enabled.len();
    println!("   └─ Enabled ({})", count);
    for (i, gesture) in app.gestures.enabled.iter().enumerate() {
        let prefix = if i == count - 1 { "└─" } else { "├─" };
        println!("      {} {}", prefix, gesture);
    }

    println!("\n🖼  Render");
    println!("   ├─ Consume timeout: {} ms", app.render.consume_timeout_ms);
    if app.render.exit_after_secs > 0.0 {
        println!("   ├─ FOV edge exit: {:.1}s", app.render.exit_after_secs);
    } else {
        println!("   ├─ FOV edge exit: disabled");
    }
    if app.render.snapshot_every > 0 {
        println!("   └─ Snapshot every: {} frames", app.render.snapshot_every);
    } else {
        println!("   └─ Snapshot every frame (when --snapshot-dir is set)");
    }

    if args.simulation {
        let sim = &app.simulation;
        println!("\n⚙️  Simulation");
        println!("   ├─ Seed: {}", sim.seed);
        println!("   ├─ Hand lifetime: {} frames", sim.hand_lifetime_frames);
        println!("   ├─ Gesture interval: {} frames", sim.gesture_interval_frames);
        println!("   ├─ Max hands: {}", sim.max_hands);
        println!("   └─ Realtime: {}", sim.realtime);
    }

    println!();
}
