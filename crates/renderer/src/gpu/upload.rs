use std::path::Path;

use crate::texture::{
    decode_file, plan_cubemap, plan_texture_2d, CubemapFaces, DecodedImage, TextureError,
    TextureKind, TextureUpload,
};

/// A texture with the single view and sampler it is always bound with.
pub(crate) struct GpuTexture {
    texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl Drop for GpuTexture {
    fn drop(&mut self) {
        self.texture.destroy();
    }
}

/// Creates the texture described by `plan` and writes every sub-image into it.
pub(crate) fn upload_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    plan: &TextureUpload,
) -> GpuTexture {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(&plan.label),
        size: wgpu::Extent3d {
            width: plan.width,
            height: plan.height,
            depth_or_array_layers: plan.layer_count(),
        },
        mip_level_count: plan.mip_level_count,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: plan.format,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    for sub in &plan.sub_images {
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: sub.level,
                origin: wgpu::Origin3d {
                    x: 0,
                    y: 0,
                    z: sub.layer,
                },
                aspect: wgpu::TextureAspect::All,
            },
            &sub.pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(sub.width * 4),
                rows_per_image: Some(sub.height),
            },
            wgpu::Extent3d {
                width: sub.width,
                height: sub.height,
                depth_or_array_layers: 1,
            },
        );
    }

    let (dimension, array_layer_count) = match plan.kind {
        TextureKind::D2 => (wgpu::TextureViewDimension::D2, None),
        TextureKind::Cube => (wgpu::TextureViewDimension::Cube, Some(6)),
    };
    let view = texture.create_view(&wgpu::TextureViewDescriptor {
        label: Some(&plan.label),
        dimension: Some(dimension),
        array_layer_count,
        ..Default::default()
    });

    let spec = plan.sampler;
    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(&plan.label),
        address_mode_u: spec.address_mode,
        address_mode_v: spec.address_mode,
        address_mode_w: spec.address_mode,
        mag_filter: spec.mag_filter,
        min_filter: spec.min_filter,
        mipmap_filter: spec.mipmap_filter,
        lod_min_clamp: 0.0,
        lod_max_clamp: spec.lod_max_clamp,
        ..Default::default()
    });

    tracing::debug!(
        label = %plan.label,
        kind = ?plan.kind,
        width = plan.width,
        height = plan.height,
        mip_levels = plan.mip_level_count,
        bytes = plan.byte_len(),
        "uploaded texture"
    );

    GpuTexture {
        texture,
        view,
        sampler,
    }
}

/// Decodes `path` and uploads it as a mipmapped 2D texture.
///
/// Decoding finishes before any GPU object exists, so a bad file leaves
/// nothing behind.
pub(crate) fn load_texture_2d(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    path: &Path,
) -> Result<GpuTexture, TextureError> {
    let image = decode_file(path)?;
    let plan = plan_texture_2d(&path.display().to_string(), image);
    tracing::info!(path = %path.display(), width = plan.width, height = plan.height, "loaded texture");
    Ok(upload_texture(device, queue, &plan))
}

/// Decodes all six faces, then uploads them as one cube texture.
pub(crate) fn load_cubemap(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    faces: &CubemapFaces,
) -> Result<GpuTexture, TextureError> {
    let plan = plan_cubemap("skybox", faces.decode()?)?;
    tracing::info!(
        positive_x = %faces.positive_x.display(),
        face_size = plan.width,
        "loaded cubemap"
    );
    Ok(upload_texture(device, queue, &plan))
}

/// 1x1 white texture bound when the scene has no cube texture configured.
pub(crate) fn placeholder_texture(device: &wgpu::Device, queue: &wgpu::Queue) -> GpuTexture {
    let plan = plan_texture_2d("placeholder texture", DecodedImage::solid(1, 1, [255; 4]));
    upload_texture(device, queue, &plan)
}
