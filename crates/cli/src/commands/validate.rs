//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::AppConfig;
use serde::Serialize;
use sensor_sim::KNOWN_GESTURES;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    resolution: String,
    fps: u32,
    trail_capacity: usize,
    focus_gesture: String,
    enabled_gestures: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(app) => {
            let warnings = collect_warnings(&app);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(ConfigSummary {
                    version: format!("{:?}", app.version),
                    resolution: format!("{}x{}", app.depth.x_res, app.depth.y_res),
                    fps: app.depth.fps,
                    trail_capacity: app.trail.capacity,
                    focus_gesture: app.gestures.focus.clone(),
                    enabled_gestures: app.gestures.enabled.len(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(app: &AppConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    for name in &app.gestures.enabled {
        if !KNOWN_GESTURES.contains(&name.as_str()) {
            warnings.push(format!(
                "Gesture '{}' is not provided by the simulated device (known: {})",
                name,
                KNOWN_GESTURES.join(", ")
            ));
        }
    }

    if app.render.exit_after_secs == 0.0 {
        warnings.push("render.exit_after_secs is 0 - FOV edge exit disabled".to_string());
    }

    if !app.simulation.realtime {
        warnings.push(
            "simulation.realtime is false - frames are produced as fast as possible".to_string(),
        );
    }

    if app.trail.capacity == 1 {
        warnings.push("trail.capacity is 1 - trails are drawn as single points".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Resolution: {} @ {} fps", summary.resolution, summary.fps);
            println!("  Trail capacity: {}", summary.trail_capacity);
            println!(
                "  Gestures: {} enabled, focus '{}'",
                summary.enabled_gestures, summary.focus_gesture
            );
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
