use std::borrow::Cow;
use std::fmt;
use std::path::Path;

use wgpu::naga;
use wgpu::naga::valid::{Capabilities, ValidationFlags, Validator};

use crate::error::{LoadError, ResourceError};

/// Pipeline stage a shader module is compiled for.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    fn naga(self) -> naga::ShaderStage {
        match self {
            ShaderStage::Vertex => naga::ShaderStage::Vertex,
            ShaderStage::Fragment => naga::ShaderStage::Fragment,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Shader code handed to a backend. Every module exposes its stage's entry
/// point as `main`.
#[derive(Debug, Clone)]
pub enum ShaderSource {
    Wgsl(Cow<'static, str>),
}

impl ShaderSource {
    /// Entry point name shared by all sprite shaders.
    pub const ENTRY_POINT: &'static str = "main";

    pub fn wgsl(code: impl Into<Cow<'static, str>>) -> Self {
        ShaderSource::Wgsl(code.into())
    }

    /// Built-in sprite shader for `stage`: projects vertices by the camera
    /// uniform and outputs the premultiplied texel times the vertex tint.
    pub fn builtin(stage: ShaderStage) -> Self {
        match stage {
            ShaderStage::Vertex => Self::wgsl(include_str!("../../shaders/sprite_vertex.wgsl")),
            ShaderStage::Fragment => Self::wgsl(include_str!("../../shaders/sprite_fragment.wgsl")),
        }
    }

    pub fn read(path: &Path) -> Result<Self, LoadError> {
        let code = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::wgsl(code))
    }

    pub fn code(&self) -> &str {
        match self {
            ShaderSource::Wgsl(code) => code,
        }
    }

    /// Parses and validates the module, and checks that it declares a
    /// `main` entry point for `stage`.
    pub fn validate(&self, stage: ShaderStage) -> Result<(), ResourceError> {
        let code = self.code();
        let compile_error = |message: String| ResourceError::Compile { stage, message };

        let module = naga::front::wgsl::parse_str(code)
            .map_err(|err| compile_error(err.emit_to_string(code)))?;
        Validator::new(ValidationFlags::all(), Capabilities::empty())
            .validate(&module)
            .map_err(|err| compile_error(err.emit_to_string(code)))?;

        let has_entry = module
            .entry_points
            .iter()
            .any(|ep| ep.name == Self::ENTRY_POINT && ep.stage == stage.naga());
        if !has_entry {
            return Err(compile_error(format!(
                "no @{stage} entry point named `{}`",
                Self::ENTRY_POINT
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_shaders_use_main_entry_point() {
        for stage in [ShaderStage::Vertex, ShaderStage::Fragment] {
            let src = ShaderSource::builtin(stage);
            assert!(src.code().contains("fn main("), "{stage} shader lacks `main`");
        }
    }

    #[test]
    fn builtin_shaders_validate_for_their_stage() {
        for stage in [ShaderStage::Vertex, ShaderStage::Fragment] {
            ShaderSource::builtin(stage).validate(stage).unwrap();
        }
    }

    #[test]
    fn syntax_error_is_compile_error() {
        let err = ShaderSource::wgsl("fn main( this is not wgsl {{{")
            .validate(ShaderStage::Vertex)
            .unwrap_err();
        assert!(matches!(err, ResourceError::Compile { stage: ShaderStage::Vertex, .. }));
    }

    #[test]
    fn entry_point_must_match_stage() {
        let fragment = ShaderSource::builtin(ShaderStage::Fragment);
        let err = fragment.validate(ShaderStage::Vertex).unwrap_err();
        assert!(matches!(err, ResourceError::Compile { .. }));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ShaderSource::read(Path::new("/nonexistent/sprite.wgsl")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
