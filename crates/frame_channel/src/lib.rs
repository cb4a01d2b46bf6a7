//! # Frame Channel
//!
//! Double-buffered frame hand-off between one producer thread and any number
//! of consumer threads.
//!
//! The producer fills its back buffer in place and publishes it; consumers
//! block until a frame has been published and then keep seeing that frame
//! until the next publish.
//!
//! ## Usage Example
//!
//! ```ignore
//! use frame_channel::frame_channel;
//!
//! let (mut producer, consumer) = frame_channel(DepthFrame::new(mode), DepthFrame::new(mode));
//!
//! // producer thread
//! depth_generator.fill(producer.begin_write())?;
//! producer.publish();
//!
//! // render thread
//! let frame = consumer.consume_latest_timeout(Duration::from_millis(500))?;
//! draw(&frame);
//! ```

mod channel;
mod error;

pub use channel::{frame_channel, Frame, FrameConsumer, FrameProducer};
pub use error::{FrameError, Result};
