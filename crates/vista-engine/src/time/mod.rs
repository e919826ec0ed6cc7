//! Time subsystem.
//!
//! Frame timing driven by host-supplied timestamps (milliseconds), so the
//! scheduler stays testable without a real animation callback:
//! - one `FrameClock` per scheduler
//! - call `tick(t)` once per frame callback to obtain `FrameTime`

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};
