//! Caller-owned device resources: handles, shader sources, decoded images and
//! the asset directory layout used to find them.

mod assets;
mod handle;
mod image;
mod shader;

pub use assets::AssetPaths;
pub use handle::{LiveResources, PipelineId, ShaderId, TextureId};
pub(crate) use handle::ResourceTable;
pub use image::ImageData;
pub use shader::{ShaderSource, ShaderStage};
