use std::path::{Path, PathBuf};

const CONTENT_DIR: &str = "Content";
const IMAGES_DIR: &str = "Images";
const SHADERS_DIR: &str = "Shaders";
const SHADER_EXTENSION: &str = "wgsl";

/// Directory layout for on-disk assets.
///
/// ```text
/// <root>/Content/Images/<name>
/// <root>/Content/Shaders/<name>.wgsl
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPaths {
    pub root: PathBuf,
}

impl AssetPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory of the running executable, or the working directory when
    /// that cannot be determined.
    pub fn beside_executable() -> Self {
        let root = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));
        Self { root }
    }

    pub fn image(&self, name: &str) -> PathBuf {
        self.root.join(CONTENT_DIR).join(IMAGES_DIR).join(name)
    }

    pub fn shader(&self, name: &str) -> PathBuf {
        self.root
            .join(CONTENT_DIR)
            .join(SHADERS_DIR)
            .join(name)
            .with_extension(SHADER_EXTENSION)
    }
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self::beside_executable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn images_keep_their_name() {
        let paths = AssetPaths::new("/game");
        assert_eq!(paths.image("tiles.png"), PathBuf::from("/game/Content/Images/tiles.png"));
    }

    #[test]
    fn shaders_get_wgsl_extension() {
        let paths = AssetPaths::new("/game");
        assert_eq!(paths.shader("sprite"), PathBuf::from("/game/Content/Shaders/sprite.wgsl"));
    }
}
