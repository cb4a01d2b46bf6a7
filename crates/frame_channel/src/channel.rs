//! Single-slot double buffer with blocking consume.
//!
//! State transitions all happen under one mutex:
//! - the producer owns the back buffer outright and writes it without the lock
//! - `publish` swaps back and last-published, bumps the sequence, sets the
//!   freshness flag and wakes every waiter
//! - consumers wait on the condvar until the flag is set; the flag is never
//!   cleared, so later calls return the same frame until the next publish
//!
//! Buffers are reference-counted. When the producer reclaims a buffer that a
//! consumer still holds, `begin_write` detaches it first (copy-on-write), so a
//! retained `Frame` is never written under the reader.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::counter;
use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace};

use crate::error::{FrameError, Result};

struct Slot<B> {
    /// Last-published buffer; before the first publish, the spare buffer
    published: Arc<B>,
    /// Publish counter, 0 until the first publish
    sequence: u64,
    fresh: bool,
    /// Bumped by `cancel_waiters`; waiters started under an older epoch bail out
    cancel_epoch: u64,
    closed: bool,
}

struct Shared<B> {
    slot: Mutex<Slot<B>>,
    fresh: Condvar,
}

/// Create a channel from its two buffers
///
/// `back` is the first buffer the producer writes; `front` becomes the
/// producer's second back buffer after the first publish.
pub fn frame_channel<B: Clone>(front: B, back: B) -> (FrameProducer<B>, FrameConsumer<B>) {
    let shared = Arc::new(Shared {
        slot: Mutex::new(Slot {
            published: Arc::new(front),
            sequence: 0,
            fresh: false,
            cancel_epoch: 0,
            closed: false,
        }),
        fresh: Condvar::new(),
    });

    let producer = FrameProducer {
        back: Arc::new(back),
        shared: shared.clone(),
        published_count: 0,
        copy_count: 0,
    };
    (producer, FrameConsumer { shared })
}

/// A published frame
///
/// Dereferences to the buffer. Hold it only as long as needed: while it is
/// alive, the producer has to copy the buffer before reusing it.
pub struct Frame<B> {
    buffer: Arc<B>,
    sequence: u64,
}

impl<B> Frame<B> {
    /// Publish sequence number, starting at 1
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Check if two frames share the same buffer
    #[inline]
    pub fn same_buffer(&self, other: &Frame<B>) -> bool {
        Arc::ptr_eq(&self.buffer, &other.buffer)
    }
}

impl<B> Clone for Frame<B> {
    fn clone(&self) -> Self {
        Self {
            buffer: self.buffer.clone(),
            sequence: self.sequence,
        }
    }
}

impl<B> Deref for Frame<B> {
    type Target = B;

    #[inline]
    fn deref(&self) -> &B {
        &self.buffer
    }
}

impl<B> fmt::Debug for Frame<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("sequence", &self.sequence)
            .finish()
    }
}

/// Producer half; not `Clone`, so there is exactly one
pub struct FrameProducer<B> {
    back: Arc<B>,
    shared: Arc<Shared<B>>,
    published_count: u64,
    copy_count: u64,
}

impl<B: Clone> FrameProducer<B> {
    /// Back buffer, invisible to consumers until `publish`
    #[inline]
    pub fn begin_write(&mut self) -> &mut B {
        if Arc::get_mut(&mut self.back).is_none() {
            self.copy_count += 1;
            counter!("handtrail_frame_buffer_copies_total").increment(1);
            trace!("back buffer still held by a consumer, detaching");
        }
        Arc::make_mut(&mut self.back)
    }
}

impl<B> FrameProducer<B> {
    /// Publish the back buffer and wake all waiting consumers
    ///
    /// The previously published buffer becomes the new back buffer.
    /// Never blocks beyond the slot lock.
    pub fn publish(&mut self) -> u64 {
        let sequence = {
            let mut slot = self.shared.slot.lock();
            std::mem::swap(&mut self.back, &mut slot.published);
            slot.sequence += 1;
            slot.fresh = true;
            self.shared.fresh.notify_all();
            slot.sequence
        };

        self.published_count += 1;
        counter!("handtrail_frames_published_total").increment(1);
        trace!(sequence, "frame published");
        sequence
    }

    /// Frames published so far
    #[inline]
    pub fn published_count(&self) -> u64 {
        self.published_count
    }

    /// Times `begin_write` had to copy a buffer still held by a consumer
    #[inline]
    pub fn copy_count(&self) -> u64 {
        self.copy_count
    }

    /// A consumer attached to this producer
    pub fn consumer(&self) -> FrameConsumer<B> {
        FrameConsumer {
            shared: self.shared.clone(),
        }
    }
}

impl<B> Drop for FrameProducer<B> {
    fn drop(&mut self) {
        let mut slot = self.shared.slot.lock();
        slot.closed = true;
        self.shared.fresh.notify_all();
        debug!(published = self.published_count, "frame producer closed");
    }
}

impl<B> fmt::Debug for FrameProducer<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameProducer")
            .field("published", &self.published_count)
            .field("copies", &self.copy_count)
            .finish()
    }
}

/// Consumer half; clone it for additional consumers
pub struct FrameConsumer<B> {
    shared: Arc<Shared<B>>,
}

impl<B> Clone for FrameConsumer<B> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<B> fmt::Debug for FrameConsumer<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.shared.slot.lock();
        f.debug_struct("FrameConsumer")
            .field("sequence", &slot.sequence)
            .field("closed", &slot.closed)
            .finish()
    }
}

impl<B> FrameConsumer<B> {
    /// Block until a frame has been published, then return the latest one
    ///
    /// Returns `Cancelled` if `cancel_waiters` is called while blocked and
    /// `Closed` if the producer goes away without ever publishing.
    pub fn consume_latest(&self) -> Result<Frame<B>> {
        self.wait_for(0, None)
    }

    /// Like `consume_latest`, but gives up with `Timeout` after `timeout`
    pub fn consume_latest_timeout(&self, timeout: Duration) -> Result<Frame<B>> {
        self.wait_for(0, Some(timeout))
    }

    /// Block until a frame newer than `sequence` is published
    ///
    /// For render loops that must not draw the same frame twice. With
    /// `sequence == 0` this is `consume_latest_timeout`.
    pub fn consume_after(&self, sequence: u64, timeout: Duration) -> Result<Frame<B>> {
        self.wait_for(sequence, Some(timeout))
    }

    fn wait_for(&self, after: u64, timeout: Option<Duration>) -> Result<Frame<B>> {
        let started = Instant::now();
        // A deadline past what `Instant` can represent means no deadline
        let deadline = timeout.and_then(|t| started.checked_add(t));
        let mut slot = self.shared.slot.lock();
        let epoch = slot.cancel_epoch;
        let mut timed_out = false;

        loop {
            if slot.fresh && slot.sequence > after {
                return Ok(Self::frame(&slot));
            }
            if slot.cancel_epoch != epoch {
                return Err(FrameError::Cancelled);
            }
            if slot.closed {
                return Err(FrameError::Closed);
            }
            if timed_out {
                return Err(FrameError::Timeout {
                    waited_ms: started.elapsed().as_millis() as u64,
                });
            }

            match deadline {
                Some(deadline) => {
                    timed_out = self.shared.fresh.wait_until(&mut slot, deadline).timed_out();
                }
                None => self.shared.fresh.wait(&mut slot),
            }
        }
    }

    /// Latest frame without blocking, if one was ever published
    pub fn try_latest(&self) -> Option<Frame<B>> {
        let slot = self.shared.slot.lock();
        slot.fresh.then(|| Self::frame(&slot))
    }

    /// Wake every consumer currently blocked, making it return `Cancelled`
    ///
    /// Calls made afterwards wait normally.
    pub fn cancel_waiters(&self) {
        let mut slot = self.shared.slot.lock();
        slot.cancel_epoch += 1;
        self.shared.fresh.notify_all();
        debug!(epoch = slot.cancel_epoch, "frame waiters cancelled");
    }

    /// Sequence of the latest published frame (0 = none yet)
    pub fn sequence(&self) -> u64 {
        self.shared.slot.lock().sequence
    }

    /// Check if the producer has been dropped
    pub fn is_closed(&self) -> bool {
        self.shared.slot.lock().closed
    }

    #[inline]
    fn frame(slot: &Slot<B>) -> Frame<B> {
        Frame {
            buffer: slot.published.clone(),
            sequence: slot.sequence,
        }
    }
}
