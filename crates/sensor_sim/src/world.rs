//! Deterministic scene state advanced once per `wait_and_update_all`.
//!
//! Every frame:
//! 1. pending stop requests destroy their hands
//! 2. live hands age, move, and are destroyed once their lifetime is over
//! 3. pending `start_tracking` requests create hands, up to `max_hands`
//! 4. active gestures progress and are recognized on a fixed cadence
//!
//! Events are collected here and dispatched by the context after the world
//! lock is released, so callbacks may call back into the generators.

use std::f32::consts::TAU;

use contracts::{
    FovDirection, FovEdgeEvent, GestureEvent, HandEvent, HandId, Point3D, SimulationConfig,
};
use tracing::debug;

use crate::converter::ProjectiveConverter;

/// Gestures the simulated gesture generator knows about
pub const KNOWN_GESTURES: &[&str] = &["Click", "Wave", "RaiseHand", "MovingHand"];

/// Closest distance the sensor reports (mm)
const NEAR_PLANE_MM: f32 = 500.0;

#[derive(Debug, Clone)]
struct SimHand {
    id: HandId,
    anchor: Point3D,
    position: Point3D,
    phase: f32,
    /// Sideways drift (mm per frame)
    drift: f32,
    age: u64,
}

/// Hand as seen by the depth generator
#[derive(Debug, Clone, Copy)]
pub(crate) struct HandSample {
    pub position: Point3D,
}

#[derive(Debug, Default)]
pub(crate) struct StepEvents {
    pub hands: Vec<HandEvent>,
    pub gestures: Vec<GestureEvent>,
    pub fov: Vec<FovEdgeEvent>,
}

pub(crate) struct World {
    config: SimulationConfig,
    fps: f32,
    far_plane_mm: f32,
    converter: ProjectiveConverter,
    frame: u64,
    next_hand_id: HandId,
    hands: Vec<SimHand>,
    pending_tracks: Vec<Point3D>,
    pending_stops: Vec<HandId>,
    /// Active gestures in activation order
    gestures: Vec<String>,
    recognized_count: u64,
    rng: u64,
}

impl World {
    pub(crate) fn new(
        config: SimulationConfig,
        fps: u32,
        max_depth_mm: u16,
        converter: ProjectiveConverter,
    ) -> Self {
        Self {
            config,
            fps: fps as f32,
            far_plane_mm: max_depth_mm as f32,
            converter,
            frame: 0,
            next_hand_id: 1,
            hands: Vec::new(),
            pending_tracks: Vec::new(),
            pending_stops: Vec::new(),
            gestures: Vec::new(),
            recognized_count: 0,
            rng: config.seed,
        }
    }

    #[inline]
    pub(crate) fn frame(&self) -> u64 {
        self.frame
    }

    /// Simulated clock (seconds since the first frame)
    #[inline]
    pub(crate) fn time(&self) -> f32 {
        self.frame as f32 / self.fps
    }

    pub(crate) fn hand_samples(&self) -> Vec<HandSample> {
        self.hands
            .iter()
            .map(|h| HandSample {
                position: h.position,
            })
            .collect()
    }

    pub(crate) fn tracked_hands(&self) -> usize {
        self.hands.len()
    }

    pub(crate) fn request_tracking(&mut self, position: Point3D) {
        self.pending_tracks.push(position);
    }

    pub(crate) fn request_stop(&mut self, id: HandId) -> bool {
        let known = self.hands.iter().any(|h| h.id == id);
        if known && !self.pending_stops.contains(&id) {
            self.pending_stops.push(id);
        }
        known
    }

    /// Returns `false` if the gesture was already active
    pub(crate) fn add_gesture(&mut self, name: &str) -> bool {
        if self.gestures.iter().any(|g| g == name) {
            return false;
        }
        self.gestures.push(name.to_string());
        true
    }

    /// Returns `false` if the gesture was not active
    pub(crate) fn remove_gesture(&mut self, name: &str) -> bool {
        let before = self.gestures.len();
        self.gestures.retain(|g| g != name);
        self.gestures.len() != before
    }

    pub(crate) fn active_gestures(&self) -> Vec<String> {
        self.gestures.clone()
    }

    pub(crate) fn step(&mut self) -> StepEvents {
        self.frame += 1;
        let time = self.time();
        let mut events = StepEvents::default();

        self.step_hands(time, &mut events);
        self.step_tracking_requests(time, &mut events);
        self.step_gestures(&mut events);

        events
    }

    fn step_hands(&mut self, time: f32, events: &mut StepEvents) {
        let stops = std::mem::take(&mut self.pending_stops);
        let lifetime = self.config.hand_lifetime_frames;
        let fps = self.fps;
        let converter = self.converter;
        let far_plane = self.far_plane_mm;

        self.hands.retain_mut(|hand| {
            hand.age += 1;
            if stops.contains(&hand.id) || (lifetime > 0 && hand.age > lifetime) {
                events.hands.push(HandEvent::Destroy { id: hand.id, time });
                return false;
            }

            let (position, edge) = hand_motion(hand, fps, &converter, far_plane);
            hand.position = position;
            events.hands.push(HandEvent::Update {
                id: hand.id,
                position,
                time,
            });
            if let Some(direction) = edge {
                events.fov.push(FovEdgeEvent {
                    id: hand.id,
                    position,
                    time,
                    direction,
                });
            }
            true
        });
    }

    fn step_tracking_requests(&mut self, time: f32, events: &mut StepEvents) {
        for position in std::mem::take(&mut self.pending_tracks) {
            if self.hands.len() >= self.config.max_hands {
                debug!(
                    max_hands = self.config.max_hands,
                    "tracking request dropped, hand limit reached"
                );
                continue;
            }

            let id = self.next_hand_id;
            self.next_hand_id = self.next_hand_id.wrapping_add(1).max(1);
            let phase = self.next_unit() * TAU;
            let drift = (self.next_unit() - 0.5) * 16.0;

            self.hands.push(SimHand {
                id,
                anchor: position,
                position,
                phase,
                drift,
                age: 0,
            });
            events.hands.push(HandEvent::Create { id, position, time });
        }
    }

    fn step_gestures(&mut self, events: &mut StepEvents) {
        let interval = self.config.gesture_interval_frames;
        if interval == 0 || self.gestures.is_empty() {
            return;
        }

        let gesture = self.gestures[(self.recognized_count % self.gestures.len() as u64) as usize]
            .clone();
        let phase = self.frame % interval;

        if interval >= 2 && phase == interval / 2 {
            let position = self.random_position();
            events.gestures.push(GestureEvent::Progress {
                gesture,
                position,
                progress: 0.5,
            });
        } else if phase == 0 {
            let id_position = self.random_position();
            let end_position = Point3D::new(id_position.x, id_position.y + 20.0, id_position.z - 10.0);
            self.recognized_count += 1;
            events.gestures.push(GestureEvent::Recognized {
                gesture,
                id_position,
                end_position,
            });
        }
    }

    /// A point comfortably inside the field of view
    fn random_position(&mut self) -> Point3D {
        Point3D::new(
            (self.next_unit() - 0.5) * 500.0,
            (self.next_unit() - 0.5) * 300.0,
            900.0 + self.next_unit() * 1100.0,
        )
    }

    /// Uniform value in [0, 1) from a splitmix64 stream
    fn next_unit(&mut self) -> f32 {
        self.rng = self.rng.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.rng;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^= z >> 31;
        (z >> 40) as f32 / (1u64 << 24) as f32
    }
}

/// Lissajous motion around the anchor plus drift, clamped to the view volume
fn hand_motion(
    hand: &SimHand,
    fps: f32,
    converter: &ProjectiveConverter,
    far_plane: f32,
) -> (Point3D, Option<FovDirection>) {
    let t = hand.age as f32 / fps;
    let mut p = Point3D {
        x: hand.anchor.x + hand.drift * hand.age as f32 + 120.0 * (TAU * 0.5 * t + hand.phase).sin(),
        y: hand.anchor.y + 80.0 * (TAU * 0.8 * t + hand.phase).sin(),
        z: hand.anchor.z + 60.0 * (TAU * 0.3 * t).sin(),
    };

    let mut edge = None;
    if p.z < NEAR_PLANE_MM {
        p.z = NEAR_PLANE_MM;
        edge = Some(FovDirection::Near);
    } else if p.z > far_plane {
        p.z = far_plane;
        edge = Some(FovDirection::Far);
    }

    let half_width = converter.half_width_at(p.z);
    let half_height = converter.half_height_at(p.z);
    if p.x >= half_width {
        p.x = half_width;
        edge = Some(FovDirection::Right);
    } else if p.x <= -half_width {
        p.x = -half_width;
        edge = Some(FovDirection::Left);
    }
    if p.y >= half_height {
        p.y = half_height;
        edge = Some(FovDirection::Top);
    } else if p.y <= -half_height {
        p.y = -half_height;
        edge = Some(FovDirection::Bottom);
    }

    (p, edge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::MapOutputMode;

    fn world(config: SimulationConfig) -> World {
        let mode = MapOutputMode::default();
        World::new(config, mode.fps, 10000, ProjectiveConverter::new(mode))
    }

    fn config() -> SimulationConfig {
        SimulationConfig {
            seed: 7,
            hand_lifetime_frames: 5,
            gesture_interval_frames: 4,
            max_hands: 2,
            realtime: false,
        }
    }

    #[test]
    fn test_tracking_request_creates_hand_on_next_step() {
        let mut w = world(config());
        w.request_tracking(Point3D::new(0.0, 0.0, 1500.0));
        assert_eq!(w.tracked_hands(), 0);

        let events = w.step();
        assert_eq!(
            events.hands,
            vec![HandEvent::Create {
                id: 1,
                position: Point3D::new(0.0, 0.0, 1500.0),
                time: w.time(),
            }]
        );
        assert_eq!(w.tracked_hands(), 1);

        let events = w.step();
        assert!(matches!(events.hands[0], HandEvent::Update { id: 1, .. }));
    }

    #[test]
    fn test_hand_destroyed_after_lifetime() {
        let mut w = world(config());
        w.request_tracking(Point3D::new(0.0, 0.0, 1500.0));
        w.step();

        let mut destroyed = false;
        for _ in 0..10 {
            let events = w.step();
            if events
                .hands
                .iter()
                .any(|e| matches!(e, HandEvent::Destroy { id: 1, .. }))
            {
                destroyed = true;
                break;
            }
        }
        assert!(destroyed);
        assert_eq!(w.tracked_hands(), 0);
    }

    #[test]
    fn test_max_hands_limit() {
        let mut w = world(config());
        for _ in 0..4 {
            w.request_tracking(Point3D::new(0.0, 0.0, 1500.0));
        }
        let events = w.step();
        assert_eq!(events.hands.len(), 2);
        assert_eq!(w.tracked_hands(), 2);
    }

    #[test]
    fn test_stop_request() {
        let mut w = world(config());
        w.request_tracking(Point3D::new(0.0, 0.0, 1500.0));
        w.step();
        assert!(w.request_stop(1));
        assert!(!w.request_stop(99));

        let events = w.step();
        assert!(matches!(events.hands[0], HandEvent::Destroy { id: 1, .. }));
    }

    #[test]
    fn test_gesture_cadence() {
        let mut w = world(config());
        assert!(w.add_gesture("Click"));
        assert!(!w.add_gesture("Click"));

        let mut recognized = 0;
        let mut progress = 0;
        for _ in 0..8 {
            for event in w.step().gestures {
                match event {
                    GestureEvent::Recognized { gesture, .. } => {
                        assert_eq!(gesture, "Click");
                        recognized += 1;
                    }
                    GestureEvent::Progress { .. } => progress += 1,
                }
            }
        }
        assert_eq!(recognized, 2);
        assert_eq!(progress, 2);

        assert!(w.remove_gesture("Click"));
        assert!(!w.remove_gesture("Click"));
        assert!((0..8).all(|_| w.step().gestures.is_empty()));
    }

    #[test]
    fn test_same_seed_same_script() {
        let run = || {
            let mut w = world(config());
            w.add_gesture("Wave");
            (0..12).flat_map(|_| w.step().gestures).collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_edge_clamp_reports_direction() {
        let mode = MapOutputMode::default();
        let converter = ProjectiveConverter::new(mode);
        let hand = SimHand {
            id: 1,
            anchor: Point3D::new(5000.0, 0.0, 1500.0),
            position: Point3D::default(),
            phase: 0.0,
            drift: 0.0,
            age: 0,
        };
        let (p, edge) = hand_motion(&hand, 30.0, &converter, 10000.0);
        assert_eq!(edge, Some(FovDirection::Right));
        assert!((p.x - converter.half_width_at(p.z)).abs() < 1e-3);
    }
}
