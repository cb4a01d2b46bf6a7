//! # Ring Trail
//!
//! Fixed-capacity position history.
//!
//! Responsibilities:
//! - Keep the most recent N samples per tracked entity
//! - O(1) push with overwrite-oldest semantics
//! - Restartable oldest-to-newest snapshots
//! - Keyed history: add / find / push / remove per entity
//!
//! Neither type is thread-safe on its own; the owner serializes access.

mod history;
mod trail;

pub use history::TrailHistory;
pub use trail::{RingTrail, Snapshot};

/// Hand trail history keyed by hand id
pub type HandTrails = TrailHistory<contracts::HandId, contracts::Point3D>;
