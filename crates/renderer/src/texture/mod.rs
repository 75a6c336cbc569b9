//! Image to GPU texture conversion.
//!
//! Loading is split in two: decoding files and planning the upload is pure and
//! runs before any GPU object exists, then `gpu::upload` executes the plan. A
//! failed decode therefore never leaves a half-built texture behind.

pub mod decode;
pub mod mipmap;

use std::fmt;
use std::path::{Path, PathBuf};

pub use decode::{decode_file, DecodedImage, TextureError};
pub use mipmap::{build_mip_chain, mip_level_count, MipLevel};

/// Storage format for every colour texture: gamma-encoded, sampled as linear.
pub const COLOR_TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

const FACE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Cubemap faces in array-layer order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CubeFace {
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    PositiveZ,
    NegativeZ,
}

impl CubeFace {
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PositiveX,
        CubeFace::NegativeX,
        CubeFace::PositiveY,
        CubeFace::NegativeY,
        CubeFace::PositiveZ,
        CubeFace::NegativeZ,
    ];

    pub fn layer(self) -> u32 {
        self as u32
    }

    /// File stem looked up by [`CubemapFaces::from_directory`].
    pub fn stem(self) -> &'static str {
        match self {
            CubeFace::PositiveX => "posx",
            CubeFace::NegativeX => "negx",
            CubeFace::PositiveY => "posy",
            CubeFace::NegativeY => "negy",
            CubeFace::PositiveZ => "posz",
            CubeFace::NegativeZ => "negz",
        }
    }
}

impl fmt::Display for CubeFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CubeFace::PositiveX => "+X",
            CubeFace::NegativeX => "-X",
            CubeFace::PositiveY => "+Y",
            CubeFace::NegativeY => "-Y",
            CubeFace::PositiveZ => "+Z",
            CubeFace::NegativeZ => "-Z",
        };
        f.write_str(label)
    }
}

/// Image paths for the six faces, named so callers cannot reorder them by accident.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CubemapFaces {
    pub positive_x: PathBuf,
    pub negative_x: PathBuf,
    pub positive_y: PathBuf,
    pub negative_y: PathBuf,
    pub positive_z: PathBuf,
    pub negative_z: PathBuf,
}

impl CubemapFaces {
    pub fn from_directory(dir: &Path) -> Result<Self, TextureError> {
        let find = |face: CubeFace| -> Result<PathBuf, TextureError> {
            FACE_EXTENSIONS
                .iter()
                .map(|ext| dir.join(format!("{}.{ext}", face.stem())))
                .find(|candidate| candidate.is_file())
                .ok_or_else(|| TextureError::MissingFace {
                    face,
                    stem: face.stem(),
                    dir: dir.to_path_buf(),
                })
        };
        Ok(Self {
            positive_x: find(CubeFace::PositiveX)?,
            negative_x: find(CubeFace::NegativeX)?,
            positive_y: find(CubeFace::PositiveY)?,
            negative_y: find(CubeFace::NegativeY)?,
            positive_z: find(CubeFace::PositiveZ)?,
            negative_z: find(CubeFace::NegativeZ)?,
        })
    }

    /// Decodes all six faces in layer order. Stops at the first failure.
    pub fn decode(&self) -> Result<[DecodedImage; 6], TextureError> {
        Ok([
            decode_file(&self.positive_x)?,
            decode_file(&self.negative_x)?,
            decode_file(&self.positive_y)?,
            decode_file(&self.negative_y)?,
            decode_file(&self.positive_z)?,
            decode_file(&self.negative_z)?,
        ])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureKind {
    D2,
    Cube,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerSpec {
    pub address_mode: wgpu::AddressMode,
    pub mag_filter: wgpu::FilterMode,
    pub min_filter: wgpu::FilterMode,
    pub mipmap_filter: wgpu::FilterMode,
    pub lod_max_clamp: f32,
}

impl SamplerSpec {
    /// Linear min/mag with linear blending between mip levels, clamped to edge.
    pub fn trilinear_clamped() -> Self {
        Self {
            address_mode: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            lod_max_clamp: 32.0,
        }
    }

    /// Linear min/mag locked to the base level, clamped to edge.
    pub fn linear_base_level_clamped() -> Self {
        Self {
            address_mode: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            lod_max_clamp: 0.0,
        }
    }

    pub fn uses_mipmaps(&self) -> bool {
        self.lod_max_clamp > 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubImage {
    pub layer: u32,
    pub level: u32,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Everything the GPU needs to build one texture, computed without a device.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureUpload {
    pub label: String,
    pub kind: TextureKind,
    pub width: u32,
    pub height: u32,
    pub mip_level_count: u32,
    pub format: wgpu::TextureFormat,
    pub sampler: SamplerSpec,
    pub sub_images: Vec<SubImage>,
}

impl TextureUpload {
    pub fn layer_count(&self) -> u32 {
        match self.kind {
            TextureKind::D2 => 1,
            TextureKind::Cube => 6,
        }
    }

    /// Total bytes across every layer and level.
    pub fn byte_len(&self) -> usize {
        self.sub_images.iter().map(|sub| sub.pixels.len()).sum()
    }
}

pub fn plan_texture_2d(label: &str, image: DecodedImage) -> TextureUpload {
    let sub_images = build_mip_chain(&image)
        .into_iter()
        .zip(0..)
        .map(|(level, index)| SubImage {
            layer: 0,
            level: index,
            width: level.width,
            height: level.height,
            pixels: level.pixels,
        })
        .collect();
    TextureUpload {
        label: label.to_string(),
        kind: TextureKind::D2,
        width: image.width,
        height: image.height,
        mip_level_count: mip_level_count(image.width, image.height),
        format: COLOR_TEXTURE_FORMAT,
        sampler: SamplerSpec::trilinear_clamped(),
        sub_images,
    }
}

/// Faces must be square and share the size of the +X face. Level 0 of every
/// face is listed before any mip level, in layer order.
pub fn plan_cubemap(label: &str, faces: [DecodedImage; 6]) -> Result<TextureUpload, TextureError> {
    let size = faces[0].width;
    for (face, image) in CubeFace::ALL.into_iter().zip(faces.iter()) {
        if image.width != image.height {
            return Err(TextureError::NotSquare {
                face,
                width: image.width,
                height: image.height,
            });
        }
        if image.width != size {
            return Err(TextureError::FaceSizeMismatch {
                face,
                expected: size,
                actual: image.width,
            });
        }
    }

    let mut base_levels = Vec::with_capacity(6);
    let mut mip_levels = Vec::new();
    for (face, image) in CubeFace::ALL.into_iter().zip(faces.iter()) {
        for (level, index) in build_mip_chain(image).into_iter().zip(0u32..) {
            let sub = SubImage {
                layer: face.layer(),
                level: index,
                width: level.width,
                height: level.height,
                pixels: level.pixels,
            };
            if index == 0 {
                base_levels.push(sub);
            } else {
                mip_levels.push(sub);
            }
        }
    }
    base_levels.extend(mip_levels);

    Ok(TextureUpload {
        label: label.to_string(),
        kind: TextureKind::Cube,
        width: size,
        height: size,
        mip_level_count: mip_level_count(size, size),
        format: COLOR_TEXTURE_FORMAT,
        sampler: SamplerSpec::linear_base_level_clamped(),
        sub_images: base_levels,
    })
}
