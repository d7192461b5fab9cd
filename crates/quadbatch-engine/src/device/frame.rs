/// Swapchain image acquired for one frame.
///
/// Must be presented (or dropped) before the next image can be acquired.
pub struct SurfaceFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
}
