//! Single-slot frame hand-off between the tick thread and the decode worker
//!
//! The slot carries at most one frame. The producer may only write while the
//! slot is vacant and the consumer may only read while it is pending, so the
//! `pending` flag doubles as ownership of the payload. A frame published while
//! the previous one is still unclaimed is dropped on the producer side; the
//! pending frame is never overwritten.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use crossbeam::utils::CachePadded;
use tracing::trace;

use crate::capture::PixelFormat;

/// Copy of a frame's pixels handed to the decoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFrame {
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
    pub size: usize,
    pub format: PixelFormat,
    pub sequence: u64,
}

impl PendingFrame {
    /// Copies `pixels` so the camera buffer can be released this tick
    pub fn copy_from(
        pixels: &[u8],
        width: u32,
        height: u32,
        format: PixelFormat,
        sequence: u64,
    ) -> Self {
        Self {
            data: Bytes::copy_from_slice(pixels),
            width,
            height,
            size: pixels.len(),
            format,
            sequence,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotStats {
    pub published: u64,
    pub taken: u64,
    pub dropped: u64,
}

#[derive(Default)]
struct Stats {
    published: AtomicU64,
    taken: AtomicU64,
    dropped: AtomicU64,
}

struct Shared {
    /// Set by the producer after writing, cleared by the consumer after reading
    pending: CachePadded<AtomicBool>,
    stop: CachePadded<AtomicBool>,
    payload: UnsafeCell<Option<PendingFrame>>,
    stats: CachePadded<Stats>,
}

// SAFETY: `payload` is only touched by the producer while `pending` is false
// and by the consumer while it is true. Each side observes the other's writes
// through the Acquire/Release pair on `pending`, and the handles enforcing the
// single-producer/single-consumer split are neither `Clone` nor `Sync`-shared.
unsafe impl Sync for Shared {}

/// Create a connected producer/consumer pair
pub fn frame_slot() -> (SlotProducer, SlotConsumer) {
    let shared = Arc::new(Shared {
        pending: CachePadded::new(AtomicBool::new(false)),
        stop: CachePadded::new(AtomicBool::new(false)),
        payload: UnsafeCell::new(None),
        stats: CachePadded::new(Stats::default()),
    });

    (
        SlotProducer {
            shared: shared.clone(),
        },
        SlotConsumer { shared },
    )
}

/// Tick-side half of the slot
pub struct SlotProducer {
    shared: Arc<Shared>,
}

impl SlotProducer {
    /// Whether the consumer has claimed the last published frame
    pub fn is_vacant(&self) -> bool {
        !self.shared.pending.load(Ordering::Acquire)
    }

    /// Publish `frame` if the slot is vacant. Never blocks.
    pub fn try_publish(&mut self, frame: PendingFrame) -> bool {
        self.try_publish_with(|| frame)
    }

    /// Like [`try_publish`](Self::try_publish) but only builds the frame when it
    /// will actually be stored, so dropped frames cost no copy.
    pub fn try_publish_with(&mut self, fill: impl FnOnce() -> PendingFrame) -> bool {
        if self.shared.pending.load(Ordering::Acquire) {
            self.shared.stats.dropped.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("argus_frames_dropped").increment(1);
            trace!("Decode slot busy, dropping frame");
            return false;
        }

        let frame = fill();
        // SAFETY: `pending` is false, so the consumer is done with the payload
        // and will not read it again until the Release store below.
        unsafe {
            *self.shared.payload.get() = Some(frame);
        }
        self.shared.pending.store(true, Ordering::Release);

        self.shared.stats.published.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("argus_frames_published").increment(1);
        true
    }

    pub fn request_stop(&self) {
        self.shared.stop.store(true, Ordering::Release);
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            shared: self.shared.clone(),
        }
    }

    pub fn stats(&self) -> SlotStats {
        self.shared.stats()
    }
}

/// Worker-side half of the slot
pub struct SlotConsumer {
    shared: Arc<Shared>,
}

impl SlotConsumer {
    /// Claim the pending frame, if any, and hand the slot back to the producer
    pub fn try_take(&mut self) -> Option<PendingFrame> {
        if !self.shared.pending.load(Ordering::Acquire) {
            return None;
        }

        // SAFETY: `pending` is true, so the producer finished writing before its
        // Release store and will not write again until we clear the flag.
        let frame = unsafe { (*self.shared.payload.get()).take() };
        self.shared.pending.store(false, Ordering::Release);

        self.shared.stats.taken.fetch_add(1, Ordering::Relaxed);
        frame
    }

    pub fn is_stop_requested(&self) -> bool {
        self.shared.stop.load(Ordering::Acquire)
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            shared: self.shared.clone(),
        }
    }

    pub fn stats(&self) -> SlotStats {
        self.shared.stats()
    }
}

/// Cooperative cancellation flag shared by both halves
#[derive(Clone)]
pub struct StopHandle {
    shared: Arc<Shared>,
}

impl StopHandle {
    pub fn request_stop(&self) {
        self.shared.stop.store(true, Ordering::Release);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.shared.stop.load(Ordering::Acquire)
    }
}

impl Shared {
    fn stats(&self) -> SlotStats {
        SlotStats {
            published: self.stats.published.load(Ordering::Relaxed),
            taken: self.stats.taken.load(Ordering::Relaxed),
            dropped: self.stats.dropped.load(Ordering::Relaxed),
        }
    }
}
