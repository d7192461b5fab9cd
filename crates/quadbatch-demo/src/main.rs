//! Pixel-art demo: a tile and a movable sprite drawn into a 160x90 render
//! target, which is then upscaled to the window.
//!
//! Arrow keys move the sprite, `D` toggles fullscreen, `Escape` quits.
//! Images are read from `Content/Images/` beside the executable; missing
//! files are replaced by generated placeholders.

use anyhow::Result;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use quadbatch_engine::core::{App, AppControl, FrameCtx, WindowRenderer};
use quadbatch_engine::device::GpuInit;
use quadbatch_engine::logging::{init_logging, LoggingConfig};
use quadbatch_engine::window::{Runtime, RuntimeConfig, WindowMode};
use quadbatch_engine::{
    Camera, ColorRgba, ImageData, PipelineId, Rect, RendererConfig, ResourceError, ShaderId,
    ShaderStage, TextureId,
};

const LOGICAL_W: u32 = 160;
const LOGICAL_H: u32 = 90;
const WINDOWED: WindowMode = WindowMode::Windowed {
    width: 640,
    height: 360,
};
const TILE: f32 = 25.0;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let runtime = RuntimeConfig {
        title: "quadbatch demo".to_string(),
        initial_size: LogicalSize::new(640.0, 360.0),
        ..Default::default()
    };
    let renderer = RendererConfig::default().with_logical_size(LOGICAL_W as f32, LOGICAL_H as f32);

    Runtime::run(runtime, GpuInit::default(), renderer, Demo::default())
}

struct Texture {
    id: TextureId,
    width: f32,
    height: f32,
}

struct Resources {
    vertex: ShaderId,
    fragment: ShaderId,
    pipeline: PipelineId,
    tiles: Texture,
    sprite: Texture,
    target: TextureId,
}

struct Demo {
    resources: Option<Resources>,
    x: f32,
    y: f32,
    toggle_fullscreen: bool,
}

impl Default for Demo {
    fn default() -> Self {
        Self {
            resources: None,
            x: 64.0,
            y: 0.0,
            toggle_fullscreen: false,
        }
    }
}

impl App for Demo {
    fn on_start(&mut self, renderer: &mut WindowRenderer<'_>) -> Result<()> {
        let vertex = renderer.builtin_shader(ShaderStage::Vertex)?;
        let fragment = renderer.builtin_shader(ShaderStage::Fragment)?;
        let pipeline = renderer.create_pipeline(vertex, fragment)?;

        let tiles = load_or_generate(renderer, "tiles.png", || checker_atlas(10, TILE as u32))?;
        let sprite = load_or_generate(renderer, "sprite.png", || {
            Ok(ImageData::solid(64, 64, [230, 120, 40, 255]))
        })?;

        let target = renderer.create_render_target(LOGICAL_W, LOGICAL_H)?;

        self.resources = Some(Resources {
            vertex,
            fragment,
            pipeline,
            tiles,
            sprite,
            target,
        });
        Ok(())
    }

    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        let WindowEvent::KeyboardInput { event, .. } = event else {
            return AppControl::Continue;
        };
        if event.state != ElementState::Pressed {
            return AppControl::Continue;
        }

        match event.physical_key {
            PhysicalKey::Code(KeyCode::Escape) => return AppControl::Exit,
            PhysicalKey::Code(KeyCode::KeyD) if !event.repeat => self.toggle_fullscreen = true,
            PhysicalKey::Code(KeyCode::ArrowRight) => self.x += 1.0,
            PhysicalKey::Code(KeyCode::ArrowLeft) => self.x -= 1.0,
            PhysicalKey::Code(KeyCode::ArrowDown) => self.y += 1.0,
            PhysicalKey::Code(KeyCode::ArrowUp) => self.y -= 1.0,
            _ => {}
        }
        AppControl::Continue
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        if std::mem::take(&mut self.toggle_fullscreen) {
            let mode = if ctx.window.is_fullscreen() {
                WINDOWED
            } else {
                WindowMode::Fullscreen
            };
            ctx.window.set_window_mode(mode);
        }

        match self.draw(ctx.renderer) {
            Ok(()) => AppControl::Continue,
            Err(err) => {
                log::error!("demo: render failed: {err}");
                AppControl::Exit
            }
        }
    }

    fn on_exit(&mut self, renderer: &mut WindowRenderer<'_>) {
        let Some(res) = self.resources.take() else {
            return;
        };

        let released = [
            renderer.destroy_pipeline(res.pipeline),
            renderer.unload_texture(res.target),
            renderer.unload_texture(res.sprite.id),
            renderer.unload_texture(res.tiles.id),
            renderer.unload_shader(res.fragment),
            renderer.unload_shader(res.vertex),
        ];
        for err in released.into_iter().filter_map(Result::err) {
            log::warn!("demo: release failed: {err}");
        }
    }
}

impl Demo {
    fn draw(&self, renderer: &mut WindowRenderer<'_>) -> Result<(), ResourceError> {
        let Some(res) = self.resources.as_ref() else {
            return Ok(());
        };
        let camera = Camera::default();

        renderer.clear(Some(res.target))?;

        let tile = Rect::atlas_frame(0.0, 1.0, TILE, TILE, res.tiles.width, res.tiles.height);
        if let Err(err) = renderer.stage_sprite(Rect::new(0.0, 48.0, TILE, TILE), tile, ColorRgba::WHITE) {
            log::warn!("demo: {err}");
        }
        renderer.render(res.pipeline, res.tiles.id, camera, Some(res.target), false)?;

        let sprite = Rect::new(self.x, self.y, res.sprite.width, res.sprite.height);
        if let Err(err) = renderer.stage_sprite(sprite, Rect::FULL, ColorRgba::WHITE) {
            log::warn!("demo: {err}");
        }
        renderer.render(res.pipeline, res.sprite.id, camera, Some(res.target), false)?;

        let screen = Rect::new(0.0, 0.0, LOGICAL_W as f32, LOGICAL_H as f32);
        if let Err(err) = renderer.stage_sprite(screen, Rect::FULL, ColorRgba::WHITE) {
            log::warn!("demo: {err}");
        }
        renderer.render(res.pipeline, res.target, camera, None, true)?;

        Ok(())
    }
}

fn load_or_generate(
    renderer: &mut WindowRenderer<'_>,
    name: &str,
    generate: impl FnOnce() -> Result<ImageData>,
) -> Result<Texture> {
    match renderer.load_texture(name) {
        Ok(tex) => Ok(Texture {
            id: tex.id,
            width: tex.width as f32,
            height: tex.height as f32,
        }),
        Err(err) => {
            log::warn!("demo: {err}; using a generated image instead");
            let image = generate()?;
            let id = renderer.create_texture(&image)?;
            Ok(Texture {
                id,
                width: image.width as f32,
                height: image.height as f32,
            })
        }
    }
}

/// `cells x cells` grid of `cell`-sized squares in alternating colors.
fn checker_atlas(cells: u32, cell: u32) -> Result<ImageData> {
    let size = cells * cell;
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let dark = (x / cell + y / cell) % 2 == 0;
            let rgba = if dark {
                [60, 90, 70, 255]
            } else {
                [110, 160, 90, 255]
            };
            pixels.extend_from_slice(&rgba);
        }
    }
    Ok(ImageData::from_rgba8(size, size, pixels)?)
}
