//! Exit-on-edge watcher.
//!
//! A hand that keeps touching the field-of-view edge for `exit_after`
//! seconds asks the session to end. Touches count as continuous while
//! consecutive edge events are at most `max_gap` apart; a longer gap, or the
//! hand being lost, restarts the clock.

use std::collections::HashMap;

use contracts::{FovEdgeEvent, HandId};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy)]
struct Touch {
    since: f32,
    last: f32,
}

/// Watches FOV-edge events per hand
#[derive(Debug)]
pub struct FovWatcher {
    exit_after: f32,
    max_gap: f32,
    touches: HashMap<HandId, Touch>,
    triggered: Option<HandId>,
}

impl FovWatcher {
    /// `exit_after == 0` disables the watcher
    pub fn new(exit_after_secs: f64, max_gap_secs: f32) -> Self {
        Self {
            exit_after: exit_after_secs as f32,
            max_gap: max_gap_secs,
            touches: HashMap::new(),
            triggered: None,
        }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.exit_after > 0.0
    }

    /// Feed one edge event; returns `true` once the exit condition is met
    pub fn observe(&mut self, event: &FovEdgeEvent) -> bool {
        if !self.is_enabled() {
            return false;
        }

        let touch = self
            .touches
            .entry(event.id)
            .and_modify(|t| {
                if event.time - t.last > self.max_gap {
                    debug!(hand = event.id, "edge touch restarted");
                    t.since = event.time;
                }
                t.last = event.time;
            })
            .or_insert(Touch {
                since: event.time,
                last: event.time,
            });

        if self.triggered.is_none() && touch.last - touch.since >= self.exit_after {
            info!(
                hand = event.id,
                direction = ?event.direction,
                held_secs = touch.last - touch.since,
                "hand held on FOV edge, requesting exit"
            );
            self.triggered = Some(event.id);
        }
        self.triggered.is_some()
    }

    /// Forget a lost hand
    pub fn forget(&mut self, id: HandId) {
        self.touches.remove(&id);
    }

    /// Hand that triggered the exit, if any
    #[inline]
    pub fn triggered_by(&self) -> Option<HandId> {
        self.triggered
    }
}
