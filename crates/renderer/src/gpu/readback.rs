use std::sync::mpsc;

use crate::capture::{PixelLayout, ReadbackImage, RowOrigin};

use super::error::GpuError;

const BYTES_PER_PIXEL: u32 = 4;

/// Rounds a row up to wgpu's 256-byte copy alignment.
pub(crate) fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * BYTES_PER_PIXEL;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

pub(crate) fn pixel_layout(format: wgpu::TextureFormat) -> Result<PixelLayout, GpuError> {
    match format {
        wgpu::TextureFormat::Rgba8Unorm | wgpu::TextureFormat::Rgba8UnormSrgb => {
            Ok(PixelLayout::Rgba8)
        }
        wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb => {
            Ok(PixelLayout::Bgra8)
        }
        other => Err(GpuError::Readback(format!(
            "unsupported capture format {other:?}"
        ))),
    }
}

/// Strips row padding from a mapped buffer.
pub(crate) fn depad_rows(padded: &[u8], width: u32, height: u32) -> Vec<u8> {
    let tight_bpr = (width * BYTES_PER_PIXEL) as usize;
    let padded_bpr = padded_bytes_per_row(width) as usize;
    let mut tight = Vec::with_capacity(tight_bpr * height as usize);
    for row in 0..height as usize {
        let start = row * padded_bpr;
        tight.extend_from_slice(&padded[start..start + tight_bpr]);
    }
    tight
}

/// Copies a single-sample RGBA8/BGRA8 texture to the CPU. Blocks until done.
pub(crate) fn read_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
) -> Result<ReadbackImage, GpuError> {
    let width = texture.width();
    let height = texture.height();
    let layout = pixel_layout(texture.format())?;
    let padded_bpr = padded_bytes_per_row(width);

    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("capture readback"),
        size: padded_bpr as u64 * height as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("capture readback encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &staging,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_bpr),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    queue.submit(std::iter::once(encoder.finish()));

    let slice = staging.slice(..);
    let (sender, receiver) = mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });
    device
        .poll(wgpu::PollType::Wait)
        .map_err(|err| GpuError::Readback(err.to_string()))?;
    receiver
        .recv()
        .map_err(|_| GpuError::Readback("map callback dropped".into()))?
        .map_err(|err| GpuError::Readback(err.to_string()))?;

    let pixels = {
        let mapped = slice.get_mapped_range();
        depad_rows(&mapped, width, height)
    };
    staging.unmap();

    Ok(ReadbackImage {
        width,
        height,
        layout,
        origin: RowOrigin::TopLeft,
        pixels,
    })
}
