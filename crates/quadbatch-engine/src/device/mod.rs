//! wgpu device and presentation surface.
//!
//! `Gpu` owns the instance, adapter, device, queue and the window surface.
//! Sprite-specific objects live in `backend::WgpuBackend`.

mod error;
mod frame;
mod gpu;
mod init;
mod surface;

pub use error::SurfaceErrorAction;
pub use frame::SurfaceFrame;
pub use gpu::Gpu;
pub use init::GpuInit;
