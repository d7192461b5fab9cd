use std::path::Path;

use crate::error::LoadError;

/// Decoded RGBA8 pixels (straight alpha, row-major, top row first).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl ImageData {
    /// Wraps raw pixels, checking that the buffer matches `width * height * 4`.
    pub fn from_rgba8(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, LoadError> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(LoadError::PixelData {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self { width, height, pixels })
    }

    /// Image filled with a single color.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = rgba.repeat(width as usize * height as usize);
        Self { width, height, pixels }
    }

    /// Decodes any format enabled on the `image` crate and converts to RGBA8.
    pub fn decode_file(path: &Path) -> Result<Self, LoadError> {
        let decoded = image::open(path).map_err(|err| match err {
            image::ImageError::IoError(source) => LoadError::Io {
                path: path.to_path_buf(),
                source,
            },
            source => LoadError::Decode {
                path: path.to_path_buf(),
                source,
            },
        })?;

        let rgba = decoded.into_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(Self {
            width,
            height,
            pixels: rgba.into_raw(),
        })
    }

    /// RGBA of the texel at `(x, y)`.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        [self.pixels[i], self.pixels[i + 1], self.pixels[i + 2], self.pixels[i + 3]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_length_is_checked() {
        let err = ImageData::from_rgba8(2, 2, vec![0; 15]).unwrap_err();
        assert!(matches!(err, LoadError::PixelData { expected: 16, actual: 15, .. }));
        assert!(ImageData::from_rgba8(2, 2, vec![0; 16]).is_ok());
    }

    #[test]
    fn solid_repeats_color() {
        let img = ImageData::solid(3, 2, [1, 2, 3, 4]);
        assert_eq!(img.pixels.len(), 24);
        assert_eq!(img.pixel(2, 1), [1, 2, 3, 4]);
    }

    #[test]
    fn decode_missing_file_is_io_error() {
        let err = ImageData::decode_file(Path::new("/nonexistent/tiles.png")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
