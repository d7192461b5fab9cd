/// What the caller should do after a failed swapchain acquisition.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was reconfigured; the next frame may succeed.
    Reconfigured,
    /// Transient; drop this frame only.
    SkipFrame,
    /// Out of memory; rendering cannot continue.
    Fatal,
}
