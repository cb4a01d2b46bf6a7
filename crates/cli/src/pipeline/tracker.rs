//! Hand tracker: turns native events into trail history.
//!
//! Owned by the render loop. Listeners on the event hubs only forward
//! events; this is where they take effect:
//! - gesture recognized: start tracking at the gesture end point and stop
//!   looking for the focus gesture
//! - hand created: new trail seeded with the first position
//! - hand moved: push onto its trail
//! - hand lost: drop its trail, and look for the focus gesture again once
//!   no hand is left

use std::sync::Arc;

use contracts::{FovEdgeEvent, GestureEvent, HandEvent};
use ring_trail::HandTrails;
use sensor_sim::{GestureGenerator, HandsGenerator};
use tracing::{debug, trace};

use crate::error::Result;

/// Event forwarded from a hub listener to the render loop
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerEvent {
    Hand(HandEvent),
    Gesture(GestureEvent),
    FovEdge(FovEdgeEvent),
}

/// What applying an event did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    TrailCreated,
    TrailExtended,
    TrailRemoved,
    /// Update for a hand without a trail
    DeadUpdate,
    TrackingRequested,
    /// Event with no effect on the trails
    Ignored,
}

/// Hand tracker state
pub struct HandTracker {
    trails: HandTrails,
    hands: Arc<HandsGenerator>,
    gestures: Arc<GestureGenerator>,
    focus_gesture: String,
    focus_active: bool,
}

impl HandTracker {
    /// Create a tracker; `focus_active` tells whether the focus gesture is
    /// currently enabled on the gesture generator
    pub fn new(
        trail_capacity: usize,
        hands: Arc<HandsGenerator>,
        gestures: Arc<GestureGenerator>,
        focus_gesture: impl Into<String>,
        focus_active: bool,
    ) -> Self {
        Self {
            trails: HandTrails::new(trail_capacity),
            hands,
            gestures,
            focus_gesture: focus_gesture.into(),
            focus_active,
        }
    }

    pub fn apply(&mut self, event: &TrackerEvent) -> Result<Applied> {
        match event {
            TrackerEvent::Hand(event) => self.apply_hand(event),
            TrackerEvent::Gesture(event) => self.apply_gesture(event),
            TrackerEvent::FovEdge(_) => Ok(Applied::Ignored),
        }
    }

    fn apply_hand(&mut self, event: &HandEvent) -> Result<Applied> {
        match *event {
            HandEvent::Create { id, position, .. } => {
                if self.trails.contains(id) {
                    return Ok(Applied::Ignored);
                }
                self.trails.add(id).push(position);
                debug!(hand = id, tracked = self.trails.len(), "hand created");
                Ok(Applied::TrailCreated)
            }
            HandEvent::Update { id, position, .. } => {
                if self.trails.push(id, position) {
                    Ok(Applied::TrailExtended)
                } else {
                    trace!(hand = id, "dead hand update skipped");
                    Ok(Applied::DeadUpdate)
                }
            }
            HandEvent::Destroy { id, .. } => {
                if self.trails.remove(id).is_none() {
                    return Ok(Applied::Ignored);
                }
                debug!(hand = id, tracked = self.trails.len(), "hand destroyed");
                if self.trails.is_empty() && !self.focus_active {
                    self.gestures.add_gesture(&self.focus_gesture)?;
                    self.focus_active = true;
                }
                Ok(Applied::TrailRemoved)
            }
        }
    }

    fn apply_gesture(&mut self, event: &GestureEvent) -> Result<Applied> {
        match event {
            GestureEvent::Recognized {
                gesture,
                end_position,
                ..
            } => {
                debug!(gesture = %gesture, "gesture recognized");
                self.hands.start_tracking(*end_position);
                if self.focus_active {
                    self.gestures.remove_gesture(&self.focus_gesture)?;
                    self.focus_active = false;
                }
                Ok(Applied::TrackingRequested)
            }
            GestureEvent::Progress { .. } => Ok(Applied::Ignored),
        }
    }

    #[inline]
    pub fn trails(&self) -> &HandTrails {
        &self.trails
    }

    #[inline]
    pub fn focus_active(&self) -> bool {
        self.focus_active
    }
}
