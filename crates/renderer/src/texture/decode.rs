use std::path::{Path, PathBuf};

use super::CubeFace;

#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    #[error("failed to decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("image {path} has zero size")]
    Empty { path: PathBuf },
    #[error("cubemap face {face} must be square, got {width}x{height}")]
    NotSquare {
        face: CubeFace,
        width: u32,
        height: u32,
    },
    #[error("cubemap face {face} is {actual}px wide but +X is {expected}px")]
    FaceSizeMismatch {
        face: CubeFace,
        expected: u32,
        actual: u32,
    },
    #[error("no image for cubemap face {face} in {dir} (tried {stem}.png/.jpg/.jpeg/.bmp)")]
    MissingFace {
        face: CubeFace,
        stem: &'static str,
        dir: PathBuf,
    },
    #[error("pixel buffer holds {actual} bytes, expected {expected} for {width}x{height} RGBA8")]
    PixelCount {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

/// Decoded RGBA8 pixels, row-major with the first row at the top of the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, TextureError> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(TextureError::PixelCount {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Single-colour image, used as a placeholder when no texture is configured.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }
}

/// Decodes any raster format the `image` crate was built with into RGBA8.
pub fn decode_file(path: &Path) -> Result<DecodedImage, TextureError> {
    let image = image::open(path)
        .map_err(|source| TextureError::Decode {
            path: path.to_path_buf(),
            source,
        })?
        .to_rgba8();
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(TextureError::Empty {
            path: path.to_path_buf(),
        });
    }
    tracing::debug!(path = %path.display(), width, height, "decoded image");
    Ok(DecodedImage {
        width,
        height,
        pixels: image.into_raw(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_png_top_row_first() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("two_rows.png");
        let mut image = image::RgbaImage::new(1, 2);
        image.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        image.put_pixel(0, 1, image::Rgba([0, 0, 255, 128]));
        image.save(&path).unwrap();

        let decoded = decode_file(&path).unwrap();
        assert_eq!((decoded.width, decoded.height), (1, 2));
        assert_eq!(decoded.pixels, vec![255, 0, 0, 255, 0, 0, 255, 128]);
    }

    #[test]
    fn missing_file_is_decode_error() {
        let err = decode_file(Path::new("/nonexistent/texture.png")).unwrap_err();
        assert!(matches!(err, TextureError::Decode { .. }));
    }

    #[test]
    fn rejects_mismatched_pixel_buffer() {
        let err = DecodedImage::new(2, 2, vec![0; 12]).unwrap_err();
        assert!(matches!(err, TextureError::PixelCount { expected: 16, .. }));
    }

    #[test]
    fn solid_fills_every_pixel() {
        let image = DecodedImage::solid(3, 2, [1, 2, 3, 4]);
        assert_eq!(image.pixels.len(), 24);
        assert!(image.pixels.chunks(4).all(|px| px == [1, 2, 3, 4]));
    }
}
