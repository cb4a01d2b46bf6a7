//! Session metrics
//!
//! Prometheus recorders for the hand-tracking session plus an in-memory
//! aggregator used for the end-of-run summary.

use std::collections::BTreeMap;

use contracts::{FovDirection, GestureEvent, HandEvent};
use metrics::{counter, gauge, histogram};

/// Record a hand event reaching the render loop
pub fn record_hand_event(event: &HandEvent) {
    let kind = match event {
        HandEvent::Create { .. } => "create",
        HandEvent::Update { .. } => "update",
        HandEvent::Destroy { .. } => "destroy",
    };
    counter!("handtrail_hand_events_total", "kind" => kind).increment(1);
}

/// Record a gesture event reaching the render loop
pub fn record_gesture_event(event: &GestureEvent) {
    let stage = match event {
        GestureEvent::Recognized { .. } => "recognized",
        GestureEvent::Progress { .. } => "progress",
    };
    counter!(
        "handtrail_gesture_events_total",
        "gesture" => event.gesture().to_string(),
        "stage" => stage
    )
    .increment(1);
}

/// Record a hand touching the field-of-view edge
pub fn record_fov_edge(direction: FovDirection) {
    counter!("handtrail_fov_edge_events_total", "direction" => format!("{direction:?}"))
        .increment(1);
}

/// Record an update for a hand without a trail
pub fn record_dead_update() {
    counter!("handtrail_dead_updates_total").increment(1);
}

/// Record one rendered frame
pub fn record_frame_rendered(sequence: u64, tracked_hands: usize, render_ms: f64) {
    counter!("handtrail_frames_rendered_total").increment(1);
    gauge!("handtrail_last_rendered_sequence").set(sequence as f64);
    gauge!("handtrail_tracked_hands").set(tracked_hands as f64);
    histogram!("handtrail_render_ms").record(render_ms);
}

/// Record how long the render loop waited for a frame
pub fn record_frame_wait_ms(wait_ms: f64) {
    histogram!("handtrail_frame_wait_ms").record(wait_ms);
}

/// Record a consume that timed out without a frame
pub fn record_frame_timeout() {
    counter!("handtrail_frame_timeouts_total").increment(1);
}

/// Record the sequence gap between two rendered frames (> 1 = frames skipped)
pub fn record_frames_skipped(skipped: u64) {
    if skipped > 0 {
        counter!("handtrail_frames_skipped_total").increment(skipped);
    }
}

/// Session metrics aggregator
///
/// Aggregates in memory for the printed summary.
#[derive(Debug, Clone, Default)]
pub struct SessionMetricsAggregator {
    pub hands_created: u64,
    pub hands_destroyed: u64,
    pub hand_updates: u64,

    /// Updates for hands without a trail
    pub dead_updates: u64,

    /// Recognized count per gesture
    pub gestures_recognized: BTreeMap<String, u64>,

    pub gesture_progress: u64,

    /// Edge events per direction
    pub fov_edge_events: BTreeMap<String, u64>,

    pub frames_rendered: u64,
    pub frames_skipped: u64,
    pub frame_timeouts: u64,

    pub frame_wait_ms: RunningStats,
    pub render_ms: RunningStats,

    /// Points per trail at render time
    pub trail_points: RunningStats,
}

impl SessionMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_hand(&mut self, event: &HandEvent) {
        match event {
            HandEvent::Create { .. } => self.hands_created += 1,
            HandEvent::Update { .. } => self.hand_updates += 1,
            HandEvent::Destroy { .. } => self.hands_destroyed += 1,
        }
    }

    pub fn update_gesture(&mut self, event: &GestureEvent) {
        match event {
            GestureEvent::Recognized { gesture, .. } => {
                *self.gestures_recognized.entry(gesture.clone()).or_insert(0) += 1;
            }
            GestureEvent::Progress { .. } => self.gesture_progress += 1,
        }
    }

    pub fn update_fov_edge(&mut self, direction: FovDirection) {
        *self
            .fov_edge_events
            .entry(format!("{direction:?}"))
            .or_insert(0) += 1;
    }

    pub fn update_frame(&mut self, wait_ms: f64, render_ms: f64, trail_lengths: &[usize]) {
        self.frames_rendered += 1;
        self.frame_wait_ms.push(wait_ms);
        self.render_ms.push(render_ms);
        for &len in trail_lengths {
            self.trail_points.push(len as f64);
        }
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            hands_created: self.hands_created,
            hands_destroyed: self.hands_destroyed,
            hand_updates: self.hand_updates,
            dead_updates: self.dead_updates,
            gestures_recognized: self.gestures_recognized.clone(),
            gesture_progress: self.gesture_progress,
            fov_edge_events: self.fov_edge_events.clone(),
            frames_rendered: self.frames_rendered,
            frames_skipped: self.frames_skipped,
            frame_timeouts: self.frame_timeouts,
            timeout_rate: if self.frames_rendered + self.frame_timeouts > 0 {
                self.frame_timeouts as f64 / (self.frames_rendered + self.frame_timeouts) as f64
                    * 100.0
            } else {
                0.0
            },
            frame_wait_ms: StatsSummary::from(&self.frame_wait_ms),
            render_ms: StatsSummary::from(&self.render_ms),
            trail_points: StatsSummary::from(&self.trail_points),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Session summary
#[derive(Debug, Clone, Default)]
pub struct SessionSummary {
    pub hands_created: u64,
    pub hands_destroyed: u64,
    pub hand_updates: u64,
    pub dead_updates: u64,
    pub gestures_recognized: BTreeMap<String, u64>,
    pub gesture_progress: u64,
    pub fov_edge_events: BTreeMap<String, u64>,
    pub frames_rendered: u64,
    pub frames_skipped: u64,
    pub frame_timeouts: u64,
    /// Percentage of consume attempts that timed out
    pub timeout_rate: f64,
    pub frame_wait_ms: StatsSummary,
    pub render_ms: StatsSummary,
    pub trail_points: StatsSummary,
}

impl std::fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Session Summary ===")?;
        writeln!(
            f,
            "Hands: {} created, {} destroyed, {} updates ({} dead)",
            self.hands_created, self.hands_destroyed, self.hand_updates, self.dead_updates
        )?;
        writeln!(
            f,
            "Frames: {} rendered, {} skipped, {} timeouts ({:.2}%)",
            self.frames_rendered, self.frames_skipped, self.frame_timeouts, self.timeout_rate
        )?;
        writeln!(f, "Frame wait (ms): {}", self.frame_wait_ms)?;
        writeln!(f, "Render (ms): {}", self.render_ms)?;
        writeln!(f, "Trail points: {}", self.trail_points)?;

        if !self.gestures_recognized.is_empty() {
            writeln!(f, "Gestures recognized:")?;
            for (gesture, count) in &self.gestures_recognized {
                writeln!(f, "  {}: {}", gesture, count)?;
            }
        }
        if !self.fov_edge_events.is_empty() {
            writeln!(f, "FOV edge events:")?;
            for (direction, count) in &self.fov_edge_events {
                writeln!(f, "  {}: {}", direction, count)?;
            }
        }
        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            self.m2 += delta * (value - self.mean);
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
