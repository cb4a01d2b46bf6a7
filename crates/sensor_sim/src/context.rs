//! Simulated native context and its generators
//!
//! `SimContext` owns the scene; generators are cheap handles onto it. Only
//! `wait_and_update_all` advances the scene and fires native callbacks, on
//! the calling thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use contracts::{
    CallbackHandle, ContractError, DepthConfig, DepthFrame, FovEdgeEvent, FrameSource,
    GestureEvent, HandEvent, HandId, MapOutputMode, NativeCallback, NativeEventSource, Point3D,
    SimulationConfig,
};
use parking_lot::Mutex;
use tracing::{debug, info, instrument, trace};

use crate::callbacks::CallbackRegistry;
use crate::converter::ProjectiveConverter;
use crate::depth::render_depth;
use crate::error::{Result, SimError};
use crate::world::{World, KNOWN_GESTURES};

struct Shared {
    mode: MapOutputMode,
    max_depth_mm: u16,
    realtime: bool,
    converter: ProjectiveConverter,
    world: Mutex<World>,
    /// Earliest instant the next frame may be produced
    next_frame_at: Mutex<Option<Instant>>,
    stopped: AtomicBool,
    hand_callbacks: CallbackRegistry<HandEvent>,
    gesture_callbacks: CallbackRegistry<GestureEvent>,
    fov_callbacks: CallbackRegistry<FovEdgeEvent>,
}

/// Simulated native context
#[derive(Clone)]
pub struct SimContext {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for SimContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimContext")
            .field("mode", &self.shared.mode)
            .field("frame", &self.frame())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

impl SimContext {
    /// Create a context producing the given depth output mode
    #[instrument(name = "sim_context_new", skip_all, fields(x_res = depth.x_res, y_res = depth.y_res, fps = depth.fps))]
    pub fn new(depth: &DepthConfig, simulation: &SimulationConfig) -> Result<Self> {
        let mode = depth.output_mode();
        if mode.x_res == 0 || mode.y_res == 0 || mode.fps == 0 {
            return Err(SimError::InvalidMode {
                x_res: mode.x_res,
                y_res: mode.y_res,
                fps: mode.fps,
            });
        }

        let converter = ProjectiveConverter::new(mode);
        let world = World::new(*simulation, mode.fps, depth.max_depth_mm, converter);

        info!(
            seed = simulation.seed,
            max_hands = simulation.max_hands,
            realtime = simulation.realtime,
            "simulated context created"
        );

        Ok(Self {
            shared: Arc::new(Shared {
                mode,
                max_depth_mm: depth.max_depth_mm,
                realtime: simulation.realtime,
                converter,
                world: Mutex::new(world),
                next_frame_at: Mutex::new(None),
                stopped: AtomicBool::new(false),
                hand_callbacks: CallbackRegistry::new("hands"),
                gesture_callbacks: CallbackRegistry::new("gestures"),
                fov_callbacks: CallbackRegistry::new("fov_edge"),
            }),
        })
    }

    /// Wait for the next frame, advance the scene and fire callbacks
    ///
    /// Paced to the configured fps when `realtime` is set. Returns the new
    /// frame number.
    pub fn wait_and_update_all(&self) -> Result<u64> {
        if self.is_stopped() {
            return Err(SimError::Stopped);
        }
        if self.shared.realtime {
            self.pace();
        }

        let (frame, events) = {
            let mut world = self.shared.world.lock();
            let events = world.step();
            (world.frame(), events)
        };

        trace!(
            frame,
            hands = events.hands.len(),
            gestures = events.gestures.len(),
            fov = events.fov.len(),
            "scene updated"
        );

        self.shared.hand_callbacks.dispatch(&events.hands);
        self.shared.fov_callbacks.dispatch(&events.fov);
        self.shared.gesture_callbacks.dispatch(&events.gestures);
        Ok(frame)
    }

    fn pace(&self) {
        let interval = Duration::from_secs_f64(1.0 / self.shared.mode.fps as f64);
        let mut next = self.shared.next_frame_at.lock();
        let now = Instant::now();
        let deadline = match *next {
            Some(deadline) if deadline > now => {
                thread::sleep(deadline - now);
                deadline
            }
            _ => now,
        };
        *next = Some(deadline + interval);
    }

    /// Make every later `wait_and_update_all` fail with `Stopped`
    pub fn shutdown(&self) {
        if !self.shared.stopped.swap(true, Ordering::SeqCst) {
            debug!(frame = self.frame(), "simulated context stopped");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.stopped.load(Ordering::SeqCst)
    }

    /// Frames produced so far
    pub fn frame(&self) -> u64 {
        self.shared.world.lock().frame()
    }

    #[inline]
    pub fn output_mode(&self) -> MapOutputMode {
        self.shared.mode
    }

    #[inline]
    pub fn converter(&self) -> ProjectiveConverter {
        self.shared.converter
    }

    pub fn hands_generator(&self) -> Arc<HandsGenerator> {
        Arc::new(HandsGenerator {
            shared: self.shared.clone(),
        })
    }

    pub fn gesture_generator(&self) -> Arc<GestureGenerator> {
        Arc::new(GestureGenerator {
            shared: self.shared.clone(),
        })
    }

    pub fn depth_generator(&self) -> Arc<DepthGenerator> {
        Arc::new(DepthGenerator {
            shared: self.shared.clone(),
        })
    }

    /// Hand-touching-FOV-edge capability of the hands generator
    pub fn fov_edge(&self) -> Arc<FovEdgeSource> {
        Arc::new(FovEdgeSource {
            shared: self.shared.clone(),
        })
    }
}

/// Simulated hands generator
pub struct HandsGenerator {
    shared: Arc<Shared>,
}

impl HandsGenerator {
    /// Start tracking a hand at `position`; the hand is created on the next frame
    pub fn start_tracking(&self, position: Point3D) {
        debug!(x = position.x, y = position.y, z = position.z, "start tracking");
        self.shared.world.lock().request_tracking(position);
    }

    /// Stop tracking a hand; returns `false` for an unknown id
    pub fn stop_tracking(&self, id: HandId) -> bool {
        self.shared.world.lock().request_stop(id)
    }

    pub fn tracked_count(&self) -> usize {
        self.shared.world.lock().tracked_hands()
    }

    /// Arm a one-shot failure of the next `register_native`
    pub fn fail_next_register(&self) {
        self.shared.hand_callbacks.fail_next_register();
    }

    /// Arm a one-shot failure of the next `unregister_native`
    pub fn fail_next_unregister(&self) {
        self.shared.hand_callbacks.fail_next_unregister();
    }

    pub fn callback_count(&self) -> usize {
        self.shared.hand_callbacks.len()
    }
}

impl NativeEventSource<HandEvent> for HandsGenerator {
    fn register_native(
        &self,
        callback: NativeCallback<HandEvent>,
    ) -> std::result::Result<CallbackHandle, ContractError> {
        Ok(self.shared.hand_callbacks.register(callback)?)
    }

    fn unregister_native(&self, handle: CallbackHandle) -> std::result::Result<(), ContractError> {
        Ok(self.shared.hand_callbacks.unregister(handle)?)
    }
}

/// Simulated hand-touching-FOV-edge notifications
pub struct FovEdgeSource {
    shared: Arc<Shared>,
}

impl FovEdgeSource {
    pub fn callback_count(&self) -> usize {
        self.shared.fov_callbacks.len()
    }
}

impl NativeEventSource<FovEdgeEvent> for FovEdgeSource {
    fn register_native(
        &self,
        callback: NativeCallback<FovEdgeEvent>,
    ) -> std::result::Result<CallbackHandle, ContractError> {
        Ok(self.shared.fov_callbacks.register(callback)?)
    }

    fn unregister_native(&self, handle: CallbackHandle) -> std::result::Result<(), ContractError> {
        Ok(self.shared.fov_callbacks.unregister(handle)?)
    }
}

/// Simulated gesture generator
pub struct GestureGenerator {
    shared: Arc<Shared>,
}

impl GestureGenerator {
    /// Activate a gesture; activating an active gesture is a no-op
    pub fn add_gesture(&self, name: &str) -> Result<()> {
        Self::check_known(name)?;
        if self.shared.world.lock().add_gesture(name) {
            debug!(gesture = name, "gesture added");
        }
        Ok(())
    }

    /// Deactivate a gesture; deactivating an inactive gesture is a no-op
    pub fn remove_gesture(&self, name: &str) -> Result<()> {
        Self::check_known(name)?;
        if self.shared.world.lock().remove_gesture(name) {
            debug!(gesture = name, "gesture removed");
        }
        Ok(())
    }

    /// Active gestures in activation order
    pub fn active_gestures(&self) -> Vec<String> {
        self.shared.world.lock().active_gestures()
    }

    /// Gestures this generator can recognize
    pub fn available_gestures(&self) -> &'static [&'static str] {
        KNOWN_GESTURES
    }

    pub fn fail_next_register(&self) {
        self.shared.gesture_callbacks.fail_next_register();
    }

    pub fn callback_count(&self) -> usize {
        self.shared.gesture_callbacks.len()
    }

    fn check_known(name: &str) -> Result<()> {
        if KNOWN_GESTURES.contains(&name) {
            Ok(())
        } else {
            Err(SimError::UnknownGesture {
                name: name.to_string(),
            })
        }
    }
}

impl NativeEventSource<GestureEvent> for GestureGenerator {
    fn register_native(
        &self,
        callback: NativeCallback<GestureEvent>,
    ) -> std::result::Result<CallbackHandle, ContractError> {
        Ok(self.shared.gesture_callbacks.register(callback)?)
    }

    fn unregister_native(&self, handle: CallbackHandle) -> std::result::Result<(), ContractError> {
        Ok(self.shared.gesture_callbacks.unregister(handle)?)
    }
}

/// Simulated depth generator
pub struct DepthGenerator {
    shared: Arc<Shared>,
}

impl DepthGenerator {
    #[inline]
    pub fn output_mode(&self) -> MapOutputMode {
        self.shared.mode
    }

    #[inline]
    pub fn max_depth_mm(&self) -> u16 {
        self.shared.max_depth_mm
    }
}

impl FrameSource<DepthFrame> for DepthGenerator {
    fn fill(&self, buffer: &mut DepthFrame) -> std::result::Result<(), ContractError> {
        let mode = self.shared.mode;
        if buffer.width != mode.x_res
            || buffer.height != mode.y_res
            || buffer.depth.len() != mode.pixel_count()
        {
            return Err(ContractError::FrameMismatch {
                expected: mode.pixel_count(),
                actual: buffer.depth.len(),
            });
        }

        let (frame_id, timestamp, hands) = {
            let world = self.shared.world.lock();
            (world.frame(), world.time() as f64, world.hand_samples())
        };

        buffer.frame_id = frame_id;
        buffer.timestamp = timestamp;
        render_depth(buffer, &hands, &self.shared.converter, self.shared.max_depth_mm);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn context() -> SimContext {
        let depth = DepthConfig {
            x_res: 64,
            y_res: 48,
            fps: 30,
            max_depth_mm: 10000,
        };
        let sim = SimulationConfig {
            seed: 1,
            hand_lifetime_frames: 30,
            gesture_interval_frames: 3,
            max_hands: 1,
            realtime: false,
        };
        SimContext::new(&depth, &sim).unwrap()
    }

    #[test]
    fn test_invalid_mode_rejected() {
        let depth = DepthConfig {
            x_res: 0,
            ..DepthConfig::default()
        };
        let err = SimContext::new(&depth, &SimulationConfig::default()).unwrap_err();
        assert!(matches!(err, SimError::InvalidMode { x_res: 0, .. }));
    }

    #[test]
    fn test_callbacks_fire_on_update() {
        let ctx = context();
        let hands = ctx.hands_generator();
        let seen = Arc::new(AtomicUsize::new(0));

        let s = seen.clone();
        let handle = hands
            .register_native(Arc::new(move |_event: HandEvent| {
                s.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();

        hands.start_tracking(Point3D::new(0.0, 0.0, 1500.0));
        ctx.wait_and_update_all().unwrap();
        ctx.wait_and_update_all().unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 2);

        hands.unregister_native(handle).unwrap();
        ctx.wait_and_update_all().unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 2);
        assert_eq!(ctx.frame(), 3);
    }

    #[test]
    fn test_callback_can_start_tracking() {
        let ctx = context();
        let hands = ctx.hands_generator();
        let gestures = ctx.gesture_generator();
        gestures.add_gesture("Click").unwrap();

        let h = hands.clone();
        gestures
            .register_native(Arc::new(move |event: GestureEvent| {
                if let GestureEvent::Recognized { end_position, .. } = event {
                    h.start_tracking(end_position);
                }
            }))
            .unwrap();

        for _ in 0..4 {
            ctx.wait_and_update_all().unwrap();
        }
        assert_eq!(hands.tracked_count(), 1);
    }

    #[test]
    fn test_unknown_gesture() {
        let ctx = context();
        let gestures = ctx.gesture_generator();
        assert!(matches!(
            gestures.add_gesture("Juggle"),
            Err(SimError::UnknownGesture { .. })
        ));
        gestures.add_gesture("Wave").unwrap();
        gestures.remove_gesture("Click").unwrap();
        assert_eq!(gestures.active_gestures(), vec!["Wave".to_string()]);
    }

    #[test]
    fn test_injected_register_failure_maps_to_native_status() {
        let ctx = context();
        let hands = ctx.hands_generator();
        hands.fail_next_register();
        let err = hands.register_native(Arc::new(|_| {})).unwrap_err();
        assert!(err.status().is_some());
        assert_eq!(hands.callback_count(), 0);
    }

    #[test]
    fn test_fill_rejects_wrong_buffer() {
        let ctx = context();
        let depth = ctx.depth_generator();
        let mut wrong = DepthFrame::new(MapOutputMode::default());
        assert!(matches!(
            depth.fill(&mut wrong),
            Err(ContractError::FrameMismatch { .. })
        ));

        let mut frame = DepthFrame::new(ctx.output_mode());
        ctx.wait_and_update_all().unwrap();
        depth.fill(&mut frame).unwrap();
        assert_eq!(frame.frame_id, 1);
    }

    #[test]
    fn test_stopped_context() {
        let ctx = context();
        ctx.shutdown();
        assert!(matches!(ctx.wait_and_update_all(), Err(SimError::Stopped)));
    }

    #[test]
    fn test_realtime_pacing() {
        let depth = DepthConfig {
            x_res: 8,
            y_res: 8,
            fps: 100,
            max_depth_mm: 10000,
        };
        let sim = SimulationConfig {
            realtime: true,
            ..SimulationConfig::default()
        };
        let ctx = SimContext::new(&depth, &sim).unwrap();

        let started = Instant::now();
        for _ in 0..6 {
            ctx.wait_and_update_all().unwrap();
        }
        // First frame is immediate, the remaining five are 10 ms apart
        assert!(started.elapsed() >= Duration::from_millis(45));
    }
}
