//! Pipeline statistics and metrics.

use std::fmt;
use std::time::Duration;

use contracts::HandId;
use event_hub::HubStats;
use observability::SessionMetricsAggregator;
use ringbuf::{traits::*, HeapRb};

/// Frame intervals kept for the recent fps estimate
const INTERVAL_WINDOW: usize = 120;

/// Why the session ended
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StopReason {
    /// Not stopped yet
    #[default]
    Running,
    MaxFrames,
    Timeout,
    /// Ctrl+C or an external shutdown future
    Shutdown,
    /// A hand stayed on the FOV edge
    FovExit { hand: HandId },
    /// The producer stopped publishing
    SourceClosed,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::MaxFrames => write!(f, "max frames reached"),
            Self::Timeout => write!(f, "timeout"),
            Self::Shutdown => write!(f, "shutdown requested"),
            Self::FovExit { hand } => write!(f, "hand {hand} held on FOV edge"),
            Self::SourceClosed => write!(f, "frame source closed"),
        }
    }
}

/// Rolling window of render intervals
pub struct FrameIntervals {
    window: HeapRb<f64>,
}

impl fmt::Debug for FrameIntervals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameIntervals")
            .field("len", &self.window.occupied_len())
            .field("capacity", &INTERVAL_WINDOW)
            .finish()
    }
}

impl Default for FrameIntervals {
    fn default() -> Self {
        Self::new(INTERVAL_WINDOW)
    }
}

impl FrameIntervals {
    pub fn new(capacity: usize) -> Self {
        Self {
            window: HeapRb::new(capacity.max(1)),
        }
    }

    /// Record one interval; the oldest is dropped once the window is full
    pub fn push(&mut self, interval: Duration) {
        self.window.push_overwrite(interval.as_secs_f64());
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.window.occupied_len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Frames per second over the window
    pub fn fps(&self) -> f64 {
        let total: f64 = self.window.iter().sum();
        if total > 0.0 {
            self.len() as f64 / total
        } else {
            0.0
        }
    }
}

/// Statistics from a pipeline run
#[derive(Debug, Default)]
pub struct PipelineStats {
    /// Depth frames published by the producer
    pub frames_published: u64,

    /// Frames handed to the renderers
    pub frames_rendered: u64,

    /// Buffer copies forced by frames held across a publish
    pub buffer_copies: u64,

    /// Events the listeners could not forward
    pub events_dropped: u64,

    /// Total duration of the pipeline run
    pub duration: Duration,

    pub stop_reason: StopReason,

    /// Lifetime counters per event hub
    pub hubs: Vec<(String, HubStats)>,

    /// Recent render intervals
    pub intervals: FrameIntervals,

    /// Session metrics aggregator
    pub session: SessionMetricsAggregator,
}

impl PipelineStats {
    /// Average rendered frames per second over the whole run
    pub fn fps(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.frames_rendered as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Rendered frames per second over the recent window
    pub fn recent_fps(&self) -> f64 {
        self.intervals.fps()
    }

    /// Share of published frames the render loop never saw, as percentage
    pub fn skip_rate(&self) -> f64 {
        if self.frames_published > 0 {
            self.session.frames_skipped as f64 / self.frames_published as f64 * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Pipeline Statistics ===\n");

        println!("Overview");
        println!("  Duration: {:.2}s", self.duration.as_secs_f64());
        println!("  Stopped: {}", self.stop_reason);
        println!("  Frames published: {}", self.frames_published);
        println!("  Frames rendered: {}", self.frames_rendered);
        println!(
            "  FPS: {:.2} (recent {:.2})",
            self.fps(),
            self.recent_fps()
        );
        println!("  Skip rate: {:.2}%", self.skip_rate());
        println!("  Buffer copies: {}", self.buffer_copies);
        println!("  Events dropped: {}", self.events_dropped);

        if !self.hubs.is_empty() {
            println!("\nEvent hubs");
            for (name, hub) in &self.hubs {
                println!(
                    "  {}: {} dispatched, {} listener failures, {} registrations, {} deregistrations",
                    name,
                    hub.events_dispatched,
                    hub.listener_failures,
                    hub.registrations,
                    hub.deregistrations
                );
            }
        }

        println!("\n{}", self.session.summary());
    }
}
