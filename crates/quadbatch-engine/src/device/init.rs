/// Device and surface creation parameters.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Prefer an sRGB swapchain format when the surface offers one.
    pub prefer_srgb: bool,

    /// FIFO paces presentation to the display and is always supported.
    pub present_mode: wgpu::PresentMode,

    /// Falls back to the first supported mode when unsupported.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    pub required_features: wgpu::Features,
    pub required_limits: wgpu::Limits,

    /// Hint only; support depends on the platform.
    pub desired_maximum_frame_latency: u32,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            prefer_srgb: true,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            desired_maximum_frame_latency: 2,
        }
    }
}
