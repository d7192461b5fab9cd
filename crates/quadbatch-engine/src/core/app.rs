use winit::event::WindowEvent;

use crate::backend::WgpuBackend;
use crate::renderer::Renderer;

use super::ctx::FrameCtx;

/// Renderer driving the runtime's window.
pub type WindowRenderer<'w> = Renderer<WgpuBackend<'w>>;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application driven by `window::Runtime`.
pub trait App {
    /// Called once the window and renderer exist. Create pipelines and load
    /// textures here; an error aborts the runtime.
    fn on_start(&mut self, renderer: &mut WindowRenderer<'_>) -> anyhow::Result<()>;

    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        let _ = event;
        AppControl::Continue
    }

    /// Called once per paced frame.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl;

    /// Called before the renderer is dropped. Release everything created in
    /// `on_start`; the renderer does not free caller resources itself.
    fn on_exit(&mut self, renderer: &mut WindowRenderer<'_>) {
        let _ = renderer;
    }
}
