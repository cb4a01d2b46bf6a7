//! Config validation
//!
//! Rules:
//! - depth resolution and fps are non-zero, resolution at most 4096 per axis
//! - trail capacity > 0
//! - focus gesture is non-empty and enabled; enabled gestures are unique
//! - consume timeout > 0, exit delay finite and >= 0
//! - at least one simulated hand

use std::collections::HashSet;

use contracts::{AppConfig, ContractError};

const MAX_RESOLUTION: u32 = 4096;

/// Validate an `AppConfig`
///
/// Returns the first error encountered.
pub fn validate(config: &AppConfig) -> Result<(), ContractError> {
    validate_depth(config)?;
    validate_trail(config)?;
    validate_gestures(config)?;
    validate_render(config)?;
    validate_simulation(config)?;
    Ok(())
}

fn validate_depth(config: &AppConfig) -> Result<(), ContractError> {
    let depth = &config.depth;
    for (field, value) in [("depth.x_res", depth.x_res), ("depth.y_res", depth.y_res)] {
        if value == 0 || value > MAX_RESOLUTION {
            return Err(ContractError::config_validation(
                field,
                format!("resolution must be in 1..={MAX_RESOLUTION}, got {value}"),
            ));
        }
    }
    if depth.fps == 0 {
        return Err(ContractError::config_validation(
            "depth.fps",
            "fps must be > 0",
        ));
    }
    if depth.max_depth_mm == 0 {
        return Err(ContractError::config_validation(
            "depth.max_depth_mm",
            "max_depth_mm must be > 0",
        ));
    }
    Ok(())
}

fn validate_trail(config: &AppConfig) -> Result<(), ContractError> {
    if config.trail.capacity == 0 {
        return Err(ContractError::config_validation(
            "trail.capacity",
            "capacity must be > 0",
        ));
    }
    Ok(())
}

fn validate_gestures(config: &AppConfig) -> Result<(), ContractError> {
    let gestures = &config.gestures;
    if gestures.focus.trim().is_empty() {
        return Err(ContractError::config_validation(
            "gestures.focus",
            "focus gesture cannot be empty",
        ));
    }

    let mut seen = HashSet::new();
    for (idx, name) in gestures.enabled.iter().enumerate() {
        if name.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("gestures.enabled[{idx}]"),
                "gesture name cannot be empty",
            ));
        }
        if !seen.insert(name.as_str()) {
            return Err(ContractError::config_validation(
                format!("gestures.enabled[{idx}]"),
                format!("duplicate gesture '{name}'"),
            ));
        }
    }

    if !seen.contains(gestures.focus.as_str()) {
        return Err(ContractError::config_validation(
            "gestures.focus",
            format!("focus gesture '{}' is not in gestures.enabled", gestures.focus),
        ));
    }
    Ok(())
}

fn validate_render(config: &AppConfig) -> Result<(), ContractError> {
    let render = &config.render;
    if render.consume_timeout_ms == 0 {
        return Err(ContractError::config_validation(
            "render.consume_timeout_ms",
            "consume_timeout_ms must be > 0",
        ));
    }
    if !render.exit_after_secs.is_finite() || render.exit_after_secs < 0.0 {
        return Err(ContractError::config_validation(
            "render.exit_after_secs",
            format!(
                "exit_after_secs must be a finite value >= 0, got {}",
                render.exit_after_secs
            ),
        ));
    }
    Ok(())
}

fn validate_simulation(config: &AppConfig) -> Result<(), ContractError> {
    if config.simulation.max_hands == 0 {
        return Err(ContractError::config_validation(
            "simulation.max_hands",
            "max_hands must be >= 1",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_zero_resolution() {
        let mut config = AppConfig::default();
        config.depth.y_res = 0;
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("depth.y_res"), "got: {err}");
    }

    #[test]
    fn test_oversized_resolution() {
        let mut config = AppConfig::default();
        config.depth.x_res = 10_000;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_fps() {
        let mut config = AppConfig::default();
        config.depth.fps = 0;
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("fps must be > 0"), "got: {err}");
    }

    #[test]
    fn test_zero_trail_capacity() {
        let mut config = AppConfig::default();
        config.trail.capacity = 0;
        let err = validate(&config).unwrap_err();
        assert!(
            matches!(&err, ContractError::ConfigValidation { field, .. } if field == "trail.capacity")
        );
    }

    #[test]
    fn test_focus_not_enabled() {
        let mut config = AppConfig::default();
        config.gestures.enabled = vec!["Wave".into()];
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("not in gestures.enabled"), "got: {err}");
    }

    #[test]
    fn test_duplicate_gesture() {
        let mut config = AppConfig::default();
        config.gestures.enabled.push("Click".into());
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("duplicate gesture"), "got: {err}");
    }

    #[test]
    fn test_empty_focus() {
        let mut config = AppConfig::default();
        config.gestures.focus = "  ".into();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_render_limits() {
        let mut config = AppConfig::default();
        config.render.consume_timeout_ms = 0;
        assert!(validate(&config).is_err());

        let mut config = AppConfig::default();
        config.render.exit_after_secs = f64::NAN;
        assert!(validate(&config).is_err());

        let mut config = AppConfig::default();
        config.render.exit_after_secs = 0.0;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_zero_hands() {
        let mut config = AppConfig::default();
        config.simulation.max_hands = 0;
        assert!(validate(&config).is_err());
    }
}
