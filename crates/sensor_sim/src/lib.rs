//! # Sensor Sim
//!
//! Deterministic stand-in for the native hand-tracking SDK.
//!
//! Responsibilities:
//! - Advance a scripted scene on `wait_and_update_all`, paced to the fps
//! - Hand, gesture and FOV-edge callback registration (`NativeEventSource`)
//! - Synthetic depth maps (`FrameSource<DepthFrame>`)
//! - Pinhole real-world <-> projective conversion
//! - Injectable registration failures for tests
//!
//! ## Usage Example
//!
//! ```ignore
//! let ctx = SimContext::new(&config.depth, &config.simulation)?;
//! let hands = ctx.hands_generator();
//! let hub = EventHub::new("hands", hands.clone());
//!
//! loop {
//!     ctx.wait_and_update_all()?; // hand callbacks fire here
//! }
//! ```

mod callbacks;
mod context;
mod converter;
mod depth;
mod error;
mod world;

pub use context::{DepthGenerator, FovEdgeSource, GestureGenerator, HandsGenerator, SimContext};
pub use converter::{ProjectiveConverter, HORIZONTAL_FOV, VERTICAL_FOV};
pub use error::{
    Result, SimError, STATUS_CONTEXT_STOPPED, STATUS_INJECTED_FAILURE, STATUS_INVALID_MODE,
    STATUS_UNKNOWN_GESTURE,
};
pub use world::KNOWN_GESTURES;
