//! Frame source abstraction for the camera session

use flume::{Receiver, TryRecvError};
use tracing::warn;

use super::frame::Frame;

/// Supplies at most one frame per display tick.
///
/// Ownership of the frame passes to the caller for the duration of the tick
/// and comes back through [`FrameSource::release`] before the next one.
pub trait FrameSource {
    fn next_frame(&mut self) -> Option<Frame>;

    /// Return a frame to its source. Sources backed by pooled buffers recycle here.
    fn release(&mut self, frame: Frame) {
        drop(frame);
    }
}

/// Frames pushed by a capture task, drained in arrival order
impl FrameSource for Receiver<Frame> {
    fn next_frame(&mut self) -> Option<Frame> {
        match self.try_recv() {
            Ok(frame) => Some(frame),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                warn!("Capture channel disconnected");
                None
            }
        }
    }
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Option<Frame> {
        (**self).next_frame()
    }

    fn release(&mut self, frame: Frame) {
        (**self).release(frame)
    }
}
