//! # Event Hub
//!
//! One-to-many fan-out of native notifications.
//!
//! Responsibilities:
//! - Register with the native source on the first subscriber only
//! - Unregister when the last subscriber leaves
//! - Deliver every native event to all listeners in subscription order
//! - Isolate listener failures (errors and panics) from each other
//!
//! ## Usage Example
//!
//! ```ignore
//! use event_hub::EventHub;
//!
//! let hub = EventHub::new("hands", hands_generator.clone());
//! let id = hub.subscribe(|event: &HandEvent| {
//!     println!("hand event: {:?}", event);
//!     Ok(())
//! })?; // native registration happens here
//!
//! hub.unsubscribe(id)?; // and native deregistration here
//! ```

mod error;
mod hub;

pub use error::{HubError, ListenerError, Result};
pub use hub::{DispatchReport, EventHub, HubStats, Listener, SubscriptionId};
