//! AppConfig - Config Loader output
//!
//! Describes a complete hand-tracking session: depth output mode, trail
//! length, tracked gestures, render loop behaviour and the simulated device.

use serde::{Deserialize, Serialize};

use crate::MapOutputMode;

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete application config
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Depth generator settings
    #[serde(default)]
    pub depth: DepthConfig,

    /// Hand trail settings
    #[serde(default)]
    pub trail: TrailConfig,

    /// Gesture settings
    #[serde(default)]
    pub gestures: GestureConfig,

    /// Render loop settings
    #[serde(default)]
    pub render: RenderConfig,

    /// Simulated device settings
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Depth generator settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DepthConfig {
    #[serde(default = "default_x_res")]
    pub x_res: u32,

    #[serde(default = "default_y_res")]
    pub y_res: u32,

    #[serde(default = "default_fps")]
    pub fps: u32,

    /// Largest depth value the device reports (mm)
    #[serde(default = "default_max_depth_mm")]
    pub max_depth_mm: u16,
}

impl DepthConfig {
    /// Output mode described by this config
    pub fn output_mode(&self) -> MapOutputMode {
        MapOutputMode {
            x_res: self.x_res,
            y_res: self.y_res,
            fps: self.fps,
        }
    }
}

impl Default for DepthConfig {
    fn default() -> Self {
        Self {
            x_res: default_x_res(),
            y_res: default_y_res(),
            fps: default_fps(),
            max_depth_mm: default_max_depth_mm(),
        }
    }
}

fn default_x_res() -> u32 {
    640
}

fn default_y_res() -> u32 {
    480
}

fn default_fps() -> u32 {
    30
}

fn default_max_depth_mm() -> u16 {
    10000
}

/// Hand trail settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrailConfig {
    /// Positions kept per hand
    #[serde(default = "default_trail_capacity")]
    pub capacity: usize,
}

impl Default for TrailConfig {
    fn default() -> Self {
        Self {
            capacity: default_trail_capacity(),
        }
    }
}

fn default_trail_capacity() -> usize {
    10
}

/// Gesture settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GestureConfig {
    /// Gesture that starts tracking; removed while any hand is tracked
    #[serde(default = "default_focus_gesture")]
    pub focus: String,

    /// Gestures enabled at startup
    #[serde(default = "default_enabled_gestures")]
    pub enabled: Vec<String>,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            focus: default_focus_gesture(),
            enabled: default_enabled_gestures(),
        }
    }
}

fn default_focus_gesture() -> String {
    "Click".to_string()
}

fn default_enabled_gestures() -> Vec<String> {
    vec!["Click".to_string(), "Wave".to_string()]
}

/// Render loop settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Longest time the render loop waits for a frame
    #[serde(default = "default_consume_timeout_ms")]
    pub consume_timeout_ms: u64,

    /// A hand on the FOV edge for this long stops the session (0 = never)
    #[serde(default = "default_exit_after_secs")]
    pub exit_after_secs: f64,

    /// Write a snapshot every N rendered frames (0 = never)
    #[serde(default)]
    pub snapshot_every: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            consume_timeout_ms: default_consume_timeout_ms(),
            exit_after_secs: default_exit_after_secs(),
            snapshot_every: 0,
        }
    }
}

fn default_consume_timeout_ms() -> u64 {
    500
}

fn default_exit_after_secs() -> f64 {
    2.0
}

/// Simulated device settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Seed for the deterministic motion script
    #[serde(default)]
    pub seed: u64,

    /// Frames a tracked hand lives before it is lost
    #[serde(default = "default_hand_lifetime_frames")]
    pub hand_lifetime_frames: u64,

    /// Frames between recognized gestures
    #[serde(default = "default_gesture_interval_frames")]
    pub gesture_interval_frames: u64,

    /// Largest number of hands tracked at once
    #[serde(default = "default_max_hands")]
    pub max_hands: usize,

    /// Pace `wait_and_update_all` to the configured fps
    #[serde(default = "default_realtime")]
    pub realtime: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            hand_lifetime_frames: default_hand_lifetime_frames(),
            gesture_interval_frames: default_gesture_interval_frames(),
            max_hands: default_max_hands(),
            realtime: default_realtime(),
        }
    }
}

fn default_hand_lifetime_frames() -> u64 {
    90
}

fn default_gesture_interval_frames() -> u64 {
    20
}

fn default_max_hands() -> usize {
    2
}

fn default_realtime() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.trail.capacity, 10);
        assert_eq!(config.gestures.focus, "Click");
        assert_eq!(config.depth.output_mode().pixel_count(), 640 * 480);
        assert!(config.simulation.realtime);
    }
}
