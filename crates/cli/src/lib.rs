//! # handtrail
//!
//! Hand-tracking trail pipeline over a simulated depth sensor: event hubs
//! feed a hand tracker, depth frames flow through a double-buffered frame
//! channel, and every rendered frame carries the latest trail per hand.

pub mod error;
pub mod pipeline;
