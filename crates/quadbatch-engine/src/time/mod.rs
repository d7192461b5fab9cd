//! Frame timing and pacing.
//!
//! One `FrameClock` per render loop: `tick()` once per frame, and
//! `next_deadline()` to know when the next frame is due.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};
