//! CPU mip chain generation for sRGB-encoded RGBA8 images.
//!
//! Colour channels are averaged in linear light and re-encoded; alpha is
//! averaged as stored.

use super::decode::DecodedImage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MipLevel {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// `floor(log2(max(width, height))) + 1`, so the last level is 1x1.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    let max_dim = width.max(height);
    if max_dim == 0 {
        return 0;
    }
    u32::BITS - max_dim.leading_zeros()
}

/// Returns every level including the base, largest first.
pub fn build_mip_chain(base: &DecodedImage) -> Vec<MipLevel> {
    let to_linear = srgb_decode_table();
    let mut levels = vec![MipLevel {
        width: base.width,
        height: base.height,
        pixels: base.pixels.clone(),
    }];

    let mut width = base.width;
    let mut height = base.height;
    while width > 1 || height > 1 {
        let next_width = (width / 2).max(1);
        let next_height = (height / 2).max(1);
        let Some(previous) = levels.last() else {
            break;
        };
        let pixels = downsample(&previous.pixels, width, height, next_width, next_height, &to_linear);
        levels.push(MipLevel {
            width: next_width,
            height: next_height,
            pixels,
        });
        width = next_width;
        height = next_height;
    }
    levels
}

fn downsample(
    src: &[u8],
    src_width: u32,
    src_height: u32,
    dst_width: u32,
    dst_height: u32,
    to_linear: &[f32; 256],
) -> Vec<u8> {
    let mut dst = Vec::with_capacity((dst_width * dst_height * 4) as usize);
    // Odd sizes fold the trailing row/column into the last box.
    let x_scale = src_width / dst_width;
    let y_scale = src_height / dst_height;

    for dst_y in 0..dst_height {
        let y_start = dst_y * y_scale;
        let y_end = if dst_y + 1 == dst_height {
            src_height
        } else {
            y_start + y_scale
        };
        for dst_x in 0..dst_width {
            let x_start = dst_x * x_scale;
            let x_end = if dst_x + 1 == dst_width {
                src_width
            } else {
                x_start + x_scale
            };

            let mut sum = [0.0f32; 4];
            let mut count = 0u32;
            for y in y_start..y_end {
                for x in x_start..x_end {
                    let idx = ((y * src_width + x) * 4) as usize;
                    sum[0] += to_linear[src[idx] as usize];
                    sum[1] += to_linear[src[idx + 1] as usize];
                    sum[2] += to_linear[src[idx + 2] as usize];
                    sum[3] += src[idx + 3] as f32;
                    count += 1;
                }
            }

            let inv = 1.0 / count as f32;
            dst.push(linear_to_srgb8(sum[0] * inv));
            dst.push(linear_to_srgb8(sum[1] * inv));
            dst.push(linear_to_srgb8(sum[2] * inv));
            dst.push((sum[3] * inv).round().clamp(0.0, 255.0) as u8);
        }
    }
    dst
}

fn srgb_decode_table() -> [f32; 256] {
    let mut table = [0.0f32; 256];
    for (value, entry) in table.iter_mut().enumerate() {
        *entry = srgb_to_linear(value as f32 / 255.0);
    }
    table
}

#[inline]
fn srgb_to_linear(srgb: f32) -> f32 {
    if srgb <= 0.04045 {
        srgb / 12.92
    } else {
        ((srgb + 0.055) / 1.055).powf(2.4)
    }
}

#[inline]
fn linear_to_srgb8(linear: f32) -> u8 {
    let srgb = if linear <= 0.0031308 {
        12.92 * linear
    } else {
        1.055 * linear.powf(1.0 / 2.4) - 0.055
    };
    (srgb * 255.0).round().clamp(0.0, 255.0) as u8
}
