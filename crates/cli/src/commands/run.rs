//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::AppConfig;
use std::time::Duration;
use tracing::info;

use handtrail_cli::pipeline::{Pipeline, PipelineConfig};

use super::load_config;
use crate::cli::RunArgs;

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    let mut app = load_config(&args.config)?;

    if let Some(seed) = args.seed {
        info!(seed, "Overriding simulation seed from CLI");
        app.simulation.seed = seed;
    }

    info!(
        x_res = app.depth.x_res,
        y_res = app.depth.y_res,
        fps = app.depth.fps,
        trail_capacity = app.trail.capacity,
        focus = %app.gestures.focus,
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&app);
        return Ok(());
    }

    let pipeline_config = build_pipeline_config(app, args);

    info!("Starting pipeline...");
    let stats = Pipeline::new(pipeline_config)
        .run()
        .await
        .context("Pipeline execution failed")?;

    info!(
        frames_rendered = stats.frames_rendered,
        frames_published = stats.frames_published,
        duration_secs = stats.duration.as_secs_f64(),
        fps = format!("{:.2}", stats.fps()),
        stop_reason = %stats.stop_reason,
        "Pipeline completed successfully"
    );
    stats.print_summary();

    info!("handtrail finished");
    Ok(())
}

/// Map CLI arguments onto the pipeline config; 0 means "not set"
fn build_pipeline_config(app: AppConfig, args: &RunArgs) -> PipelineConfig {
    let mut config = PipelineConfig::new(app);
    config.max_frames = (args.max_frames > 0).then_some(args.max_frames);
    config.timeout = (args.timeout > 0).then(|| Duration::from_secs(args.timeout));
    config.metrics_port = (args.metrics_port > 0).then_some(args.metrics_port);
    config.snapshot_dir = args.snapshot_dir.clone();
    config
}

/// Print configuration summary for dry-run mode
fn print_config_summary(app: &AppConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!("Depth:");
    println!(
        "  Output mode: {}x{} @ {} fps",
        app.depth.x_res, app.depth.y_res, app.depth.fps
    );
    println!("  Max depth: {} mm", app.depth.max_depth_mm);
    println!("\nTrails:");
    println!("  Capacity: {} positions per hand", app.trail.capacity);
    println!("\nGestures:");
    println!("  Focus: {}", app.gestures.focus);
    println!("  Enabled: {}", app.gestures.enabled.join(", "));
    println!("\nRender:");
    println!("  Consume timeout: {} ms", app.render.consume_timeout_ms);
    if app.render.exit_after_secs > 0.0 {
        println!("  Exit after {:.1}s on FOV edge", app.render.exit_after_secs);
    } else {
        println!("  FOV edge exit disabled");
    }
    println!();
}
