//! Native event payloads
//!
//! One tagged union per event kind. Each kind is fanned out through its own
//! `EventHub`, so a listener matches on the variant instead of binding one
//! callback per native signature.

use serde::{Deserialize, Serialize};

use crate::{HandId, Point3D};

/// Hands generator events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HandEvent {
    /// A new hand started being tracked
    Create {
        id: HandId,
        position: Point3D,
        /// Native timestamp (seconds)
        time: f32,
    },

    /// Tracked hand moved
    Update {
        id: HandId,
        position: Point3D,
        time: f32,
    },

    /// Hand was lost
    Destroy { id: HandId, time: f32 },
}

impl HandEvent {
    /// Hand this event refers to
    pub fn id(&self) -> HandId {
        match self {
            Self::Create { id, .. } | Self::Update { id, .. } | Self::Destroy { id, .. } => *id,
        }
    }

    /// Native timestamp
    pub fn time(&self) -> f32 {
        match self {
            Self::Create { time, .. } | Self::Update { time, .. } | Self::Destroy { time, .. } => {
                *time
            }
        }
    }
}

/// Gesture generator events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GestureEvent {
    /// A gesture completed
    Recognized {
        gesture: String,
        /// Position where the gesture was identified
        id_position: Point3D,
        /// Position where the gesture ended; tracking starts here
        end_position: Point3D,
    },

    /// A gesture is in progress
    Progress {
        gesture: String,
        position: Point3D,
        /// Completion in [0, 1]
        progress: f32,
    },
}

impl GestureEvent {
    /// Gesture name
    pub fn gesture(&self) -> &str {
        match self {
            Self::Recognized { gesture, .. } | Self::Progress { gesture, .. } => gesture,
        }
    }
}

/// Field-of-view edges a hand can touch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FovDirection {
    Left,
    Right,
    Top,
    Bottom,
    Near,
    Far,
}

/// Hand touching the field-of-view edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FovEdgeEvent {
    pub id: HandId,
    pub position: Point3D,
    pub time: f32,
    pub direction: FovDirection,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hand_event_accessors() {
        let event = HandEvent::Update {
            id: 3,
            position: Point3D::default(),
            time: 1.5,
        };
        assert_eq!(event.id(), 3);
        assert_eq!(event.time(), 1.5);

        let destroy = HandEvent::Destroy { id: 7, time: 2.0 };
        assert_eq!(destroy.id(), 7);
    }

    #[test]
    fn test_hand_event_tagged_json() {
        let event = HandEvent::Destroy { id: 1, time: 0.5 };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"kind\":\"destroy\""));
    }

    #[test]
    fn test_gesture_name() {
        let event = GestureEvent::Progress {
            gesture: "Wave".to_string(),
            position: Point3D::default(),
            progress: 0.5,
        };
        assert_eq!(event.gesture(), "Wave");
    }
}
