pub mod frame_loop;
pub mod result;
pub mod slot;
pub mod worker;

pub use frame_loop::{FrameLoop, TickOutcome};
pub use result::LatestResult;
pub use slot::{frame_slot, PendingFrame, SlotConsumer, SlotProducer, SlotStats, StopHandle};
pub use worker::DecodeWorker;
