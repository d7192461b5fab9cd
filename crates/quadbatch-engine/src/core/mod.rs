//! Contract between the windowed runtime and the application.
//!
//! The runtime owns the event loop, the window and the renderer; the
//! application sees them only through `App` callbacks and `FrameCtx`.

mod app;
mod ctx;

pub use app::{App, AppControl, WindowRenderer};
pub use ctx::{FrameCtx, WindowCtx};
