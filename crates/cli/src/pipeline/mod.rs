//! Pipeline orchestration module.

mod fov_watcher;
mod histogram;
mod orchestrator;
mod render;
mod stats;
mod tracker;

pub use fov_watcher::FovWatcher;
pub use histogram::DepthHistogram;
pub use orchestrator::{Pipeline, PipelineConfig};
pub use render::{compose, trail_color, FrameRenderer, LogRenderer, RenderFrame, SnapshotRenderer, TrailPolyline};
pub use stats::{FrameIntervals, PipelineStats, StopReason};
pub use tracker::{Applied, HandTracker, TrackerEvent};
