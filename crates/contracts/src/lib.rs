//! # Contracts
//!
//! Frozen interface contracts shared by every handtrail crate: geometry,
//! native event payloads, depth frames, collaborator traits and the
//! application config blueprint.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Coordinate Model
//! - Real-world coordinates are millimetres in the sensor frame (`z` = distance)
//! - Projective coordinates are pixels (`x`, `y`) plus depth in millimetres (`z`)

mod app_config;
mod depth;
mod error;
mod events;
mod geometry;
mod native_source;

pub use app_config::*;
pub use depth::{DepthFrame, MapOutputMode};
pub use error::*;
pub use events::*;
pub use geometry::{HandId, Point3D};
pub use native_source::{
    CallbackHandle, CoordinateConverter, FrameSource, NativeCallback, NativeEventSource,
};
