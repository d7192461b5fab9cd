use winit::dpi::LogicalSize;
use winit::window::{Fullscreen, Window, WindowId};

use crate::time::FrameTime;
use crate::window::{RuntimeCtx, WindowMode};

use super::app::WindowRenderer;

/// The runtime's window.
pub struct WindowCtx<'a> {
    pub id: WindowId,
    pub window: &'a Window,
}

impl<'a> WindowCtx<'a> {
    /// Window size in logical pixels.
    pub fn logical_size(&self) -> (f32, f32) {
        let logical: LogicalSize<f64> = self.window.inner_size().to_logical(self.window.scale_factor());
        (logical.width as f32, logical.height as f32)
    }

    /// Drawable size in physical pixels.
    pub fn physical_size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }

    pub fn is_fullscreen(&self) -> bool {
        self.window.fullscreen().is_some()
    }

    /// Switches between a sized window and borderless fullscreen. The
    /// surface follows on the resulting resize event.
    pub fn set_window_mode(&self, mode: WindowMode) {
        match mode {
            WindowMode::Fullscreen => {
                self.window.set_fullscreen(Some(Fullscreen::Borderless(None)));
            }
            WindowMode::Windowed { width, height } => {
                self.window.set_fullscreen(None);
                let _ = self
                    .window
                    .request_inner_size(LogicalSize::new(width as f64, height as f64));
            }
        }
        log::debug!("window mode set to {mode:?}");
    }
}

/// Per-frame context passed to `App::on_frame`.
///
/// `'a` is the callback duration, `'w` the window borrow held by the renderer.
pub struct FrameCtx<'a, 'w> {
    pub window: WindowCtx<'a>,
    pub renderer: &'a mut WindowRenderer<'w>,
    pub time: FrameTime,
    pub runtime: &'a mut RuntimeCtx,
}
