use anyhow::{Context, Result};
use ouroboros::self_referencing;
use std::time::Instant;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Fullscreen, Window, WindowId};

use crate::backend::WgpuBackend;
use crate::config::RendererConfig;
use crate::core::{App, AppControl, FrameCtx, WindowCtx, WindowRenderer};
use crate::device::GpuInit;
use crate::renderer::Renderer;
use crate::time::FrameClock;

/// Windowed or borderless-fullscreen presentation.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum WindowMode {
    /// Logical size of the window's client area.
    Windowed { width: u32, height: u32 },
    Fullscreen,
}

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    pub fullscreen: bool,
    /// Frames per second the loop paces to; `None` redraws continuously.
    pub target_fps: Option<u32>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "quadbatch".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
            fullscreen: false,
            target_fps: Some(60),
        }
    }
}

/// Runtime context passed to the application.
///
/// Requests are applied after the current callback returns.
#[derive(Debug, Default)]
pub struct RuntimeCtx {
    exit: bool,
}

impl RuntimeCtx {
    pub fn exit(&mut self) {
        self.exit = true;
    }

    pub fn exit_requested(&self) -> bool {
        self.exit
    }
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Opens one window, creates its renderer and drives `app` until exit.
    ///
    /// Returns the error that aborted startup, if any.
    pub fn run<A>(
        initial: RuntimeConfig,
        gpu_init: GpuInit,
        renderer: RendererConfig,
        app: A,
    ) -> Result<()>
    where
        A: 'static + App,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(initial, gpu_init, renderer, app);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.startup_error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[self_referencing]
struct WindowEntry {
    clock: FrameClock,

    window: Window,

    #[borrows(window)]
    #[covariant]
    renderer: WindowRenderer<'this>,
}

struct AppState<A>
where
    A: App + 'static,
{
    initial: RuntimeConfig,
    gpu_init: GpuInit,
    renderer_config: RendererConfig,
    app: A,

    window: Option<WindowEntry>,
    exit_requested: bool,
    startup_error: Option<anyhow::Error>,
}

impl<A> AppState<A>
where
    A: App + 'static,
{
    fn new(initial: RuntimeConfig, gpu_init: GpuInit, renderer_config: RendererConfig, app: A) -> Self {
        Self {
            initial,
            gpu_init,
            renderer_config,
            app,
            window: None,
            exit_requested: false,
            startup_error: None,
        }
    }

    fn request_exit(&mut self) {
        self.exit_requested = true;
    }

    fn create_window_entry(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let config = &self.initial;
        let mut attrs = Window::default_attributes()
            .with_title(config.title.clone())
            .with_inner_size(config.initial_size);
        if config.fullscreen {
            attrs = attrs.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let gpu_init = self.gpu_init.clone();
        let renderer_config = self.renderer_config.clone();

        let mut entry = WindowEntryTryBuilder {
            clock: FrameClock::new().with_target_fps(config.target_fps),
            window,
            renderer_builder: |w| {
                let backend = pollster::block_on(WgpuBackend::new(w, gpu_init))?;
                Renderer::new(backend, renderer_config).map_err(anyhow::Error::from)
            },
        }
        .try_build()
        .context("renderer initialization failed")?;

        let app = &mut self.app;
        entry
            .with_renderer_mut(|renderer| app.on_start(renderer))
            .context("application startup failed")?;

        entry.with_mut(|fields| fields.clock.reset());
        entry.with_window(|w| w.request_redraw());
        self.window = Some(entry);
        Ok(())
    }

    /// Lets the app release its resources, then drops the renderer before
    /// the window it borrows.
    fn destroy_window_entry(&mut self) {
        if let Some(mut entry) = self.window.take() {
            let app = &mut self.app;
            entry.with_renderer_mut(|renderer| app.on_exit(renderer));
            drop(entry);
            log::info!("window closed");
        }
    }

    fn redraw(&mut self, window_id: WindowId) {
        let (app, window) = (&mut self.app, &mut self.window);
        let Some(entry) = window.as_mut() else {
            return;
        };

        let mut runtime_ctx = RuntimeCtx::default();
        let control = entry.with_mut(|fields| {
            let time = fields.clock.tick();
            let mut ctx = FrameCtx {
                window: WindowCtx {
                    id: window_id,
                    window: fields.window,
                },
                renderer: fields.renderer,
                time,
                runtime: &mut runtime_ctx,
            };
            app.on_frame(&mut ctx)
        });

        if control == AppControl::Exit || runtime_ctx.exit_requested() {
            self.request_exit();
        }
    }
}

impl<A> ApplicationHandler for AppState<A>
where
    A: App + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        if let Err(e) = self.create_window_entry(event_loop) {
            log::error!("failed to start: {e:#}");
            self.startup_error = Some(e);
            self.request_exit();
            event_loop.exit();
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        let Some(entry) = self.window.as_ref() else {
            event_loop.set_control_flow(ControlFlow::Wait);
            return;
        };

        let clock = entry.borrow_clock();
        if clock.is_due(Instant::now()) {
            entry.with_window(|w| w.request_redraw());
        }

        match clock.next_deadline() {
            Some(deadline) => event_loop.set_control_flow(ControlFlow::WaitUntil(deadline)),
            None => event_loop.set_control_flow(ControlFlow::Wait),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        if self.app.on_window_event(&event) == AppControl::Exit {
            self.request_exit();
            event_loop.exit();
            return;
        }

        match &event {
            WindowEvent::CloseRequested => {
                self.request_exit();
                event_loop.exit();
            }

            WindowEvent::Resized(new_size) => {
                if let Some(entry) = self.window.as_mut() {
                    entry.with_renderer_mut(|r| r.resize(new_size.width, new_size.height));
                    entry.with_window(|w| w.request_redraw());
                }
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(entry) = self.window.as_mut() {
                    let new_size = entry.with_window(|w| w.inner_size());
                    entry.with_renderer_mut(|r| r.resize(new_size.width, new_size.height));
                    entry.with_window(|w| w.request_redraw());
                }
            }

            WindowEvent::RedrawRequested => self.redraw(window_id),

            _ => {}
        }

        if self.exit_requested {
            event_loop.exit();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.destroy_window_entry();
    }
}
