//! Pipeline orchestrator - coordinates all components.
//!
//! Two blocking tasks share the simulated device:
//! - producer: `wait_and_update_all` (hub listeners fire here), fill the back
//!   depth buffer, equalize it, publish
//! - render loop: consume the next frame, drain forwarded events into the
//!   hand tracker, project trails, hand the frame to every renderer
//!
//! The async side only waits for the render loop, Ctrl+C or the timeout, then
//! tears everything down in order.

use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_channel::{Receiver, Sender, TrySendError};
use contracts::{
    AppConfig, CoordinateConverter, DepthFrame, FovEdgeEvent, FrameSource, GestureEvent,
    HandEvent, HandId, NativeEventSource,
};
use event_hub::{EventHub, ListenerError};
use frame_channel::{frame_channel, FrameConsumer, FrameError, FrameProducer};
use metrics::counter;
use observability::{
    record_dead_update, record_fov_edge, record_frame_rendered, record_frame_timeout,
    record_frame_wait_ms, record_frames_skipped, record_gesture_event, record_hand_event,
};
use sensor_sim::{DepthGenerator, ProjectiveConverter, SimContext, SimError};
use tracing::{debug, info, instrument, warn};

use super::fov_watcher::FovWatcher;
use super::histogram::DepthHistogram;
use super::render::{FrameRenderer, LogRenderer, RenderFrame, SnapshotRenderer, TrailPolyline};
use super::stats::{PipelineStats, StopReason};
use super::tracker::{Applied, HandTracker, TrackerEvent};
use crate::error::PipelineError;

/// Longest gap between edge events that still counts as one touch
const FOV_EDGE_MAX_GAP_SECS: f32 = 0.25;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Session configuration
    pub app: AppConfig,

    /// Maximum number of frames to render (None = unlimited)
    pub max_frames: Option<u64>,

    /// Pipeline timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,

    /// Directory for PNG snapshots (None = no snapshot renderer)
    pub snapshot_dir: Option<PathBuf>,

    /// Capacity of the listener -> render loop event queue
    pub event_queue: usize,
}

impl PipelineConfig {
    pub fn new(app: AppConfig) -> Self {
        Self {
            app,
            max_frames: None,
            timeout: None,
            metrics_port: None,
            snapshot_dir: None,
            event_queue: 4096,
        }
    }
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run until a stop condition or Ctrl+C
    pub async fn run(self) -> Result<PipelineStats> {
        self.run_until(ctrl_c()).await
    }

    /// Run until a stop condition or until `shutdown` completes
    pub async fn run_until<F>(self, shutdown: F) -> Result<PipelineStats>
    where
        F: Future<Output = ()>,
    {
        let start_time = Instant::now();

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let session = Session::open(&self.config).context("Failed to set up session")?;
        let Session {
            ctx,
            hands_hub,
            gesture_hub,
            fov_hub,
            events,
            dropped,
            tracker,
        } = session;

        let renderers = build_renderers(&self.config)?;
        let mode = ctx.output_mode();
        let (producer, consumer) = frame_channel(DepthFrame::new(mode), DepthFrame::new(mode));
        let stop = Arc::new(AtomicBool::new(false));

        let producer_handle = {
            let ctx = ctx.clone();
            let depth = ctx.depth_generator();
            let stop = stop.clone();
            tokio::task::spawn_blocking(move || produce(ctx, depth, producer, stop))
        };

        let render_loop = RenderLoop {
            consumer: consumer.clone(),
            events,
            tracker,
            watcher: FovWatcher::new(self.config.app.render.exit_after_secs, FOV_EDGE_MAX_GAP_SECS),
            converter: ctx.converter(),
            renderers,
            consume_timeout: Duration::from_millis(self.config.app.render.consume_timeout_ms),
            max_frames: self.config.max_frames,
            stop: stop.clone(),
            stats: PipelineStats::default(),
        };
        let mut render_handle = tokio::task::spawn_blocking(move || render_loop.run());

        info!(
            max_frames = ?self.config.max_frames,
            timeout = ?self.config.timeout,
            x_res = mode.x_res,
            y_res = mode.y_res,
            fps = mode.fps,
            "Pipeline running"
        );

        let timeout = self.config.timeout;
        let deadline = async move {
            match timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(shutdown);
        tokio::pin!(deadline);

        let (finished, external) = tokio::select! {
            result = &mut render_handle => (Some(result), None),
            _ = &mut shutdown => (None, Some(StopReason::Shutdown)),
            _ = &mut deadline => (None, Some(StopReason::Timeout)),
        };

        if let Some(reason) = external {
            info!(reason = %reason, "Stopping pipeline");
        }

        // Shutdown: stop the render loop first, then the device
        info!("Shutting down pipeline...");
        stop.store(true, Ordering::SeqCst);
        consumer.cancel_waiters();
        ctx.shutdown();

        let render_result = match finished {
            Some(result) => result,
            None => render_handle.await,
        };
        let producer_result = producer_handle.await;

        let mut stats = render_result
            .map_err(|e| PipelineError::task("render", e.to_string()))?
            .context("Render loop failed")?;
        let produced = producer_result
            .map_err(|e| PipelineError::task("producer", e.to_string()))?
            .context("Frame producer failed")?;

        if let Err(e) = hands_hub.clear() {
            warn!(error = %e, "Failed to release hands hub");
        }
        if let Err(e) = gesture_hub.clear() {
            warn!(error = %e, "Failed to release gesture hub");
        }
        if let Err(e) = fov_hub.clear() {
            warn!(error = %e, "Failed to release fov edge hub");
        }

        stats.hubs = vec![
            (hands_hub.name().to_string(), hands_hub.stats()),
            (gesture_hub.name().to_string(), gesture_hub.stats()),
            (fov_hub.name().to_string(), fov_hub.stats()),
        ];
        stats.frames_published = produced.published;
        stats.buffer_copies = produced.copies;
        stats.events_dropped = dropped.load(Ordering::Relaxed);
        if let Some(reason) = external {
            stats.stop_reason = reason;
        }
        stats.duration = start_time.elapsed();

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            fps = format!("{:.2}", stats.fps()),
            frames_rendered = stats.frames_rendered,
            stop_reason = %stats.stop_reason,
            "Pipeline shutdown complete"
        );

        Ok(stats)
    }
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Ctrl+C handler unavailable");
        std::future::pending::<()>().await;
    }
}

/// Device, hubs and the tracker, wired together
struct Session {
    ctx: SimContext,
    hands_hub: EventHub<HandEvent>,
    gesture_hub: EventHub<GestureEvent>,
    fov_hub: EventHub<FovEdgeEvent>,
    events: Receiver<TrackerEvent>,
    dropped: Arc<AtomicU64>,
    tracker: HandTracker,
}

impl Session {
    #[instrument(name = "session_open", skip(config))]
    fn open(config: &PipelineConfig) -> std::result::Result<Self, PipelineError> {
        let app = &config.app;
        let ctx = SimContext::new(&app.depth, &app.simulation)?;

        let gestures = ctx.gesture_generator();
        for name in &app.gestures.enabled {
            gestures.add_gesture(name)?;
        }
        let focus_active = app.gestures.enabled.contains(&app.gestures.focus);
        info!(
            gestures = ?app.gestures.enabled,
            focus = %app.gestures.focus,
            "Gestures enabled"
        );

        let hands_source: Arc<dyn NativeEventSource<HandEvent>> = ctx.hands_generator();
        let gesture_source: Arc<dyn NativeEventSource<GestureEvent>> = gestures.clone();
        let fov_source: Arc<dyn NativeEventSource<FovEdgeEvent>> = ctx.fov_edge();
        let hands_hub = EventHub::new("hands", hands_source);
        let gesture_hub = EventHub::new("gestures", gesture_source);
        let fov_hub = EventHub::new("fov_edge", fov_source);

        let (tx, events) = async_channel::bounded(config.event_queue.max(1));
        let dropped = Arc::new(AtomicU64::new(0));
        forward(&hands_hub, tx.clone(), dropped.clone(), TrackerEvent::Hand)?;
        forward(&gesture_hub, tx.clone(), dropped.clone(), TrackerEvent::Gesture)?;
        forward(&fov_hub, tx, dropped.clone(), TrackerEvent::FovEdge)?;
        debug!("Event hubs subscribed");

        let tracker = HandTracker::new(
            app.trail.capacity,
            ctx.hands_generator(),
            gestures,
            app.gestures.focus.clone(),
            focus_active,
        );

        Ok(Self {
            ctx,
            hands_hub,
            gesture_hub,
            fov_hub,
            events,
            dropped,
            tracker,
        })
    }
}

/// Subscribe a listener that forwards every event into the render loop queue
fn forward<E: Clone + 'static>(
    hub: &EventHub<E>,
    tx: Sender<TrackerEvent>,
    dropped: Arc<AtomicU64>,
    wrap: fn(E) -> TrackerEvent,
) -> std::result::Result<(), PipelineError> {
    let hub_name = hub.name().to_string();
    hub.subscribe(move |event: &E| -> std::result::Result<(), ListenerError> {
        match tx.try_send(wrap(event.clone())) {
            Ok(()) => Ok(()),
            Err(e) => {
                dropped.fetch_add(1, Ordering::Relaxed);
                let reason = match e {
                    TrySendError::Full(_) => "event queue full",
                    TrySendError::Closed(_) => "event queue closed",
                };
                counter!("handtrail_events_dropped_total", "hub" => hub_name.clone()).increment(1);
                warn!(hub = %hub_name, reason, "event dropped");
                Err(reason.into())
            }
        }
    })?;
    Ok(())
}

/// Build the configured renderers: always a log renderer, plus snapshots
/// when a directory is set
fn build_renderers(
    config: &PipelineConfig,
) -> std::result::Result<Vec<Box<dyn FrameRenderer>>, PipelineError> {
    let mut renderers: Vec<Box<dyn FrameRenderer>> = vec![Box::new(LogRenderer::new("log"))];
    if let Some(dir) = &config.snapshot_dir {
        let every = config.app.render.snapshot_every;
        renderers.push(Box::new(SnapshotRenderer::new("snapshot", dir, every)?));
        info!(dir = %dir.display(), every = every.max(1), "Snapshot renderer enabled");
    }
    Ok(renderers)
}

struct ProducerReport {
    published: u64,
    copies: u64,
}

fn produce(
    ctx: SimContext,
    depth: Arc<DepthGenerator>,
    mut producer: FrameProducer<DepthFrame>,
    stop: Arc<AtomicBool>,
) -> std::result::Result<ProducerReport, PipelineError> {
    let mut histogram = DepthHistogram::new(depth.max_depth_mm());

    while !stop.load(Ordering::SeqCst) {
        match ctx.wait_and_update_all() {
            Ok(_) => {}
            Err(SimError::Stopped) => break,
            Err(e) => return Err(e.into()),
        }

        let buffer = producer.begin_write();
        depth.fill(buffer)?;
        histogram.equalize(buffer);
        producer.publish();
    }

    debug!(published = producer.published_count(), "frame producer stopped");
    Ok(ProducerReport {
        published: producer.published_count(),
        copies: producer.copy_count(),
    })
}

struct RenderLoop {
    consumer: FrameConsumer<DepthFrame>,
    events: Receiver<TrackerEvent>,
    tracker: HandTracker,
    watcher: FovWatcher,
    converter: ProjectiveConverter,
    renderers: Vec<Box<dyn FrameRenderer>>,
    consume_timeout: Duration,
    max_frames: Option<u64>,
    stop: Arc<AtomicBool>,
    stats: PipelineStats,
}

impl RenderLoop {
    fn run(mut self) -> std::result::Result<PipelineStats, PipelineError> {
        let mut last_sequence = 0u64;
        let mut last_rendered: Option<Instant> = None;

        let reason = loop {
            if self.stop.load(Ordering::SeqCst) {
                break StopReason::Shutdown;
            }

            let wait_start = Instant::now();
            let frame = match self.consumer.consume_after(last_sequence, self.consume_timeout) {
                Ok(frame) => frame,
                Err(FrameError::Timeout { waited_ms }) => {
                    debug!(waited_ms, "no frame within timeout");
                    record_frame_timeout();
                    self.stats.session.frame_timeouts += 1;
                    if let Some(hand) = self.drain_events()? {
                        break StopReason::FovExit { hand };
                    }
                    continue;
                }
                Err(FrameError::Cancelled) => break StopReason::Shutdown,
                Err(FrameError::Closed) => break StopReason::SourceClosed,
            };
            let wait_ms = wait_start.elapsed().as_secs_f64() * 1000.0;

            let skipped = frame.sequence().saturating_sub(last_sequence + 1);
            record_frames_skipped(skipped);
            self.stats.session.frames_skipped += skipped;
            last_sequence = frame.sequence();

            if let Some(hand) = self.drain_events()? {
                break StopReason::FovExit { hand };
            }

            let render_start = Instant::now();
            let trails = self.project_trails();
            let render_frame = RenderFrame {
                depth: &frame,
                sequence: frame.sequence(),
                trails: &trails,
            };
            for renderer in &mut self.renderers {
                if let Err(e) = renderer.render(&render_frame) {
                    warn!(renderer = renderer.name(), error = %e, "render failed");
                }
            }
            drop(frame);
            let render_ms = render_start.elapsed().as_secs_f64() * 1000.0;

            let lengths: Vec<usize> = trails.iter().map(|t| t.points.len()).collect();
            record_frame_wait_ms(wait_ms);
            record_frame_rendered(last_sequence, trails.len(), render_ms);
            self.stats.session.update_frame(wait_ms, render_ms, &lengths);
            self.stats.frames_rendered += 1;

            let now = Instant::now();
            if let Some(previous) = last_rendered.replace(now) {
                self.stats.intervals.push(now - previous);
            }

            if let Some(max) = self.max_frames {
                if self.stats.frames_rendered >= max {
                    info!(frames = self.stats.frames_rendered, "Reached max frames limit");
                    break StopReason::MaxFrames;
                }
            }
        };

        for renderer in &mut self.renderers {
            if let Err(e) = renderer.close() {
                warn!(renderer = renderer.name(), error = %e, "renderer close failed");
            }
        }

        debug!(reason = %reason, "render loop finished");
        self.stats.stop_reason = reason;
        Ok(self.stats)
    }

    /// Apply every queued event; returns the hand that requested exit
    fn drain_events(&mut self) -> std::result::Result<Option<HandId>, PipelineError> {
        while let Ok(event) = self.events.try_recv() {
            match &event {
                TrackerEvent::Hand(hand) => {
                    record_hand_event(hand);
                    self.stats.session.update_hand(hand);
                    if let HandEvent::Destroy { id, .. } = hand {
                        self.watcher.forget(*id);
                    }
                }
                TrackerEvent::Gesture(gesture) => {
                    record_gesture_event(gesture);
                    self.stats.session.update_gesture(gesture);
                }
                TrackerEvent::FovEdge(edge) => {
                    record_fov_edge(edge.direction);
                    self.stats.session.update_fov_edge(edge.direction);
                    if self.watcher.observe(edge) {
                        return Ok(self.watcher.triggered_by());
                    }
                }
            }

            if self.tracker.apply(&event)? == Applied::DeadUpdate {
                record_dead_update();
                self.stats.session.dead_updates += 1;
            }
        }
        Ok(None)
    }

    /// Every trail in projective coordinates, ordered by hand id
    fn project_trails(&self) -> Vec<TrailPolyline> {
        let mut trails: Vec<TrailPolyline> = self
            .tracker
            .trails()
            .iter()
            .map(|(&id, trail)| TrailPolyline {
                id,
                points: trail
                    .snapshot()
                    .map(|p| self.converter.real_world_to_projective(p))
                    .collect(),
            })
            .collect();
        trails.sort_by_key(|t| t.id);
        trails
    }
}
