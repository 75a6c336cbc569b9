//! Fixed-resolution screenshot and frame-sequence capture.
//!
//! Captures never touch the window surface. The scene is rendered into a
//! dedicated offscreen target at [`CaptureSize`], the camera's aspect ratio is
//! swapped for the capture's while that happens, and the pixels are normalised
//! to top-left RGBA before PNG encoding.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use image::imageops::flip_vertical_in_place;
use image::{ImageFormat, RgbaImage};

use crate::camera::Camera;
use crate::gpu::GpuError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSize {
    pub width: u32,
    pub height: u32,
}

impl CaptureSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

impl Default for CaptureSize {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

/// Channel order of pixels handed back by a readback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    Rgba8,
    Bgra8,
}

/// Which image row comes first in a readback buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOrigin {
    TopLeft,
    BottomLeft,
}

/// Tightly packed pixels read back from an offscreen target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadbackImage {
    pub width: u32,
    pub height: u32,
    pub layout: PixelLayout,
    pub origin: RowOrigin,
    pub pixels: Vec<u8>,
}

impl ReadbackImage {
    /// Converts to opaque RGBA with the first row at the top.
    pub fn into_rgba_image(self) -> Result<RgbaImage, CaptureError> {
        let ReadbackImage {
            width,
            height,
            layout,
            origin,
            mut pixels,
        } = self;

        for pixel in pixels.chunks_exact_mut(4) {
            if layout == PixelLayout::Bgra8 {
                pixel.swap(0, 2);
            }
            // Captures are always opaque, like the window.
            pixel[3] = u8::MAX;
        }

        let actual = pixels.len();
        let mut image =
            RgbaImage::from_raw(width, height, pixels).ok_or(CaptureError::ReadbackSize {
                width,
                height,
                actual,
            })?;
        if origin == RowOrigin::BottomLeft {
            flip_vertical_in_place(&mut image);
        }
        Ok(image)
    }
}

/// How the frame clock advances for one offscreen render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStep {
    /// Tick with the wall clock, exactly like an on-screen frame.
    Live,
    /// Advance simulation time by exactly this much.
    Fixed(Duration),
}

/// Something that can draw the scene into a transient target and read it back.
pub trait FrameRenderer {
    fn render_offscreen(
        &mut self,
        camera: &Camera,
        size: CaptureSize,
        step: FrameStep,
    ) -> Result<ReadbackImage, CaptureError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("capture size {width}x{height} must be non-zero")]
    InvalidSize { width: u32, height: u32 },
    #[error("offscreen render failed: {0}")]
    Gpu(#[from] GpuError),
    #[error("readback returned {actual} bytes, too few for {width}x{height} RGBA")]
    ReadbackSize { width: u32, height: u32, actual: usize },
    #[error("failed to write {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to create capture directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("video frame {index} failed: {source}")]
    Frame {
        index: u32,
        #[source]
        source: Box<CaptureError>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSettings {
    pub size: CaptureSize,
    pub screenshot_path: PathBuf,
    pub video_dir: PathBuf,
    pub video_frames: u32,
    /// `None` keeps video frames on the live clock.
    pub fixed_step: Option<Duration>,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            size: CaptureSize::default(),
            screenshot_path: PathBuf::from("screenshot.png"),
            video_dir: PathBuf::from("video_frames"),
            video_frames: 48,
            fixed_step: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CaptureController {
    settings: CaptureSettings,
}

impl CaptureController {
    pub fn new(settings: CaptureSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &CaptureSettings {
        &self.settings
    }

    /// Writes a screenshot to the configured path.
    pub fn screenshot<R>(&self, renderer: &mut R, camera: &mut Camera) -> Result<PathBuf, CaptureError>
    where
        R: FrameRenderer + ?Sized,
    {
        let path = self.settings.screenshot_path.clone();
        self.capture_frame(renderer, camera, &path)?;
        Ok(path)
    }

    /// Writes the configured number of frames into the configured directory.
    pub fn record_video<R>(
        &self,
        renderer: &mut R,
        camera: &mut Camera,
    ) -> Result<Vec<PathBuf>, CaptureError>
    where
        R: FrameRenderer + ?Sized,
    {
        self.capture_video_frames(
            renderer,
            camera,
            &self.settings.video_dir,
            self.settings.video_frames,
        )
    }

    pub fn capture_frame<R>(
        &self,
        renderer: &mut R,
        camera: &mut Camera,
        output: &Path,
    ) -> Result<(), CaptureError>
    where
        R: FrameRenderer + ?Sized,
    {
        self.capture_with_step(renderer, camera, output, FrameStep::Live)
    }

    /// Captures `frames` consecutive frames as `frame_0.png` .. `frame_{n-1}.png`.
    ///
    /// The directory is created if missing. Each frame advances the loop by one
    /// tick, or by the fixed step when one is configured.
    pub fn capture_video_frames<R>(
        &self,
        renderer: &mut R,
        camera: &mut Camera,
        dir: &Path,
        frames: u32,
    ) -> Result<Vec<PathBuf>, CaptureError>
    where
        R: FrameRenderer + ?Sized,
    {
        fs::create_dir_all(dir).map_err(|source| CaptureError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;

        let step = self
            .settings
            .fixed_step
            .map(FrameStep::Fixed)
            .unwrap_or(FrameStep::Live);

        let mut written = Vec::with_capacity(frames as usize);
        for index in 0..frames {
            let path = dir.join(format!("frame_{index}.png"));
            self.capture_with_step(renderer, camera, &path, step)
                .map_err(|source| CaptureError::Frame {
                    index,
                    source: Box::new(source),
                })?;
            written.push(path);
        }
        tracing::info!(dir = %dir.display(), frames, "captured video frames");
        Ok(written)
    }

    fn capture_with_step<R>(
        &self,
        renderer: &mut R,
        camera: &mut Camera,
        output: &Path,
        step: FrameStep,
    ) -> Result<(), CaptureError>
    where
        R: FrameRenderer + ?Sized,
    {
        let size = self.settings.size;
        if size.width == 0 || size.height == 0 {
            return Err(CaptureError::InvalidSize {
                width: size.width,
                height: size.height,
            });
        }

        let readback = {
            let scoped = camera.override_aspect(size.aspect_ratio());
            renderer.render_offscreen(&scoped, size, step)?
        };

        let image = readback.into_rgba_image()?;
        image
            .save_with_format(output, ImageFormat::Png)
            .map_err(|source| CaptureError::Encode {
                path: output.to_path_buf(),
                source,
            })?;
        tracing::debug!(
            path = %output.display(),
            width = size.width,
            height = size.height,
            "wrote capture"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::{decode_file, DecodedImage};

    /// Renders a 2-row image: red on top, blue below, stored bottom-up in BGRA.
    struct FakeRenderer {
        seen_aspects: Vec<f32>,
        seen_steps: Vec<FrameStep>,
        fail_at: Option<usize>,
    }

    impl FakeRenderer {
        fn new() -> Self {
            Self {
                seen_aspects: Vec::new(),
                seen_steps: Vec::new(),
                fail_at: None,
            }
        }
    }

    impl FrameRenderer for FakeRenderer {
        fn render_offscreen(
            &mut self,
            camera: &Camera,
            size: CaptureSize,
            step: FrameStep,
        ) -> Result<ReadbackImage, CaptureError> {
            self.seen_aspects.push(camera.aspect_ratio());
            self.seen_steps.push(step);
            if self.fail_at == Some(self.seen_steps.len() - 1) {
                return Err(GpuError::Validation("bad pipeline".into()).into());
            }
            let row_len = size.width as usize * 4;
            let mut pixels = Vec::with_capacity(row_len * size.height as usize);
            for row in 0..size.height {
                // Bottom row first: blue for the bottom half, red for the top half.
                let bgra = if row < size.height / 2 {
                    [255, 0, 0, 200]
                } else {
                    [0, 0, 255, 255]
                };
                for _ in 0..size.width {
                    pixels.extend_from_slice(&bgra);
                }
            }
            Ok(ReadbackImage {
                width: size.width,
                height: size.height,
                layout: PixelLayout::Bgra8,
                origin: RowOrigin::BottomLeft,
                pixels,
            })
        }
    }

    fn controller(size: CaptureSize, fixed_step: Option<Duration>) -> CaptureController {
        CaptureController::new(CaptureSettings {
            size,
            fixed_step,
            ..CaptureSettings::default()
        })
    }

    #[test]
    fn normalises_bgra_bottom_up_readback() {
        let readback = ReadbackImage {
            width: 1,
            height: 2,
            layout: PixelLayout::Bgra8,
            origin: RowOrigin::BottomLeft,
            pixels: vec![1, 2, 3, 4, 5, 6, 7, 8],
        };
        let image = readback.into_rgba_image().unwrap();
        assert_eq!(image.get_pixel(0, 0).0, [7, 6, 5, 255]);
        assert_eq!(image.get_pixel(0, 1).0, [3, 2, 1, 255]);
    }

    #[test]
    fn top_left_rgba_is_left_untouched() {
        let pixels = vec![1, 2, 3, 255, 5, 6, 7, 255];
        let readback = ReadbackImage {
            width: 1,
            height: 2,
            layout: PixelLayout::Rgba8,
            origin: RowOrigin::TopLeft,
            pixels: pixels.clone(),
        };
        assert_eq!(readback.into_rgba_image().unwrap().into_raw(), pixels);
    }

    #[test]
    fn short_readback_is_an_error() {
        let readback = ReadbackImage {
            width: 2,
            height: 2,
            layout: PixelLayout::Rgba8,
            origin: RowOrigin::TopLeft,
            pixels: vec![0; 8],
        };
        assert!(matches!(
            readback.into_rgba_image(),
            Err(CaptureError::ReadbackSize { actual: 8, .. })
        ));
    }

    #[test]
    fn transparent_pixels_are_written_opaque() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hole.png");
        let readback = ReadbackImage {
            width: 1,
            height: 1,
            layout: PixelLayout::Rgba8,
            origin: RowOrigin::TopLeft,
            pixels: vec![10, 20, 30, 0],
        };
        readback.into_rgba_image().unwrap().save(&path).unwrap();
        assert_eq!(image::open(&path).unwrap().to_rgba8().get_pixel(0, 0).0, [10, 20, 30, 255]);
    }

    #[test]
    fn bottom_left_flip_twice_is_identity() {
        let pixels: Vec<u8> = (0..6u8).flat_map(|i| [i, i * 2, i * 3, 255]).collect();
        let flip = |pixels: Vec<u8>| {
            ReadbackImage {
                width: 2,
                height: 3,
                layout: PixelLayout::Rgba8,
                origin: RowOrigin::BottomLeft,
                pixels,
            }
            .into_rgba_image()
            .unwrap()
            .into_raw()
        };
        let once = flip(pixels.clone());
        assert_ne!(once, pixels);
        assert_eq!(&once[..8], &pixels[16..]);
        assert_eq!(flip(once), pixels);
    }

    /// Hands back a decoded image as if the GPU had rendered it.
    struct ReplayRenderer {
        image: DecodedImage,
    }

    impl FrameRenderer for ReplayRenderer {
        fn render_offscreen(
            &mut self,
            _camera: &Camera,
            size: CaptureSize,
            _step: FrameStep,
        ) -> Result<ReadbackImage, CaptureError> {
            assert_eq!((size.width, size.height), (self.image.width, self.image.height));
            Ok(ReadbackImage {
                width: size.width,
                height: size.height,
                layout: PixelLayout::Rgba8,
                origin: RowOrigin::TopLeft,
                pixels: self.image.pixels.clone(),
            })
        }
    }

    #[test]
    fn decoded_image_survives_capture_and_reencode() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.png");
        let pixels: Vec<u8> = (0..6u8)
            .flat_map(|i| [i * 40, 255 - i * 40, i * 7, 255])
            .collect();
        RgbaImage::from_raw(3, 2, pixels.clone())
            .unwrap()
            .save(&source)
            .unwrap();
        let decoded = decode_file(&source).unwrap();
        assert_eq!(decoded.pixels, pixels);

        let output = dir.path().join("capture.png");
        let mut camera = Camera::new(1.0, 1.0);
        let mut renderer = ReplayRenderer {
            image: decoded.clone(),
        };
        controller(CaptureSize::new(3, 2), None)
            .capture_frame(&mut renderer, &mut camera, &output)
            .unwrap();

        assert_eq!(decode_file(&output).unwrap(), decoded);
    }

    #[test]
    fn screenshot_uses_capture_aspect_and_restores_camera() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot.png");
        let mut camera = Camera::new(16.0 / 9.0, 50f32.to_radians());
        let mut renderer = FakeRenderer::new();

        controller(CaptureSize::new(8, 6), None)
            .capture_frame(&mut renderer, &mut camera, &path)
            .unwrap();

        assert_eq!(renderer.seen_aspects, vec![8.0 / 6.0]);
        assert_eq!(renderer.seen_steps, vec![FrameStep::Live]);
        assert_eq!(camera.aspect_ratio(), 16.0 / 9.0);

        let written = image::open(&path).unwrap().to_rgba8();
        assert_eq!(written.dimensions(), (8, 6));
        assert_eq!(written.get_pixel(0, 0).0, [255, 0, 0, 255]);
        // Translucent rendered pixels come out opaque.
        assert_eq!(written.get_pixel(7, 5).0, [0, 0, 255, 255]);
    }

    #[test]
    fn failed_render_restores_camera_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot.png");
        let mut camera = Camera::new(2.0, 1.0);
        let mut renderer = FakeRenderer::new();
        renderer.fail_at = Some(0);

        let err = controller(CaptureSize::new(4, 4), None)
            .capture_frame(&mut renderer, &mut camera, &path)
            .unwrap_err();

        assert!(matches!(err, CaptureError::Gpu(GpuError::Validation(_))));
        assert_eq!(camera.aspect_ratio(), 2.0);
        assert!(!path.exists());
    }

    #[test]
    fn unwritable_path_is_encode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("shot.png");
        let mut camera = Camera::new(1.0, 1.0);
        let err = controller(CaptureSize::new(2, 2), None)
            .capture_frame(&mut FakeRenderer::new(), &mut camera, &path)
            .unwrap_err();
        assert!(matches!(err, CaptureError::Encode { .. }));
    }

    #[test]
    fn video_writes_numbered_frames_into_new_directory() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("video_frames");
        let mut camera = Camera::new(1.0, 1.0);
        let mut renderer = FakeRenderer::new();

        let written = controller(CaptureSize::new(4, 2), None)
            .capture_video_frames(&mut renderer, &mut camera, &dir, 3)
            .unwrap();

        assert_eq!(written.len(), 3);
        for index in 0..3 {
            assert!(dir.join(format!("frame_{index}.png")).is_file());
        }
        assert!(!dir.join("frame_3.png").exists());
        assert_eq!(renderer.seen_steps.len(), 3);
    }

    #[test]
    fn video_tolerates_existing_directory_and_fixed_step() {
        let dir = tempfile::tempdir().unwrap();
        let mut camera = Camera::new(1.0, 1.0);
        let mut renderer = FakeRenderer::new();
        let step = Duration::from_millis(40);

        controller(CaptureSize::new(2, 2), Some(step))
            .capture_video_frames(&mut renderer, &mut camera, dir.path(), 2)
            .unwrap();

        assert_eq!(renderer.seen_steps, vec![FrameStep::Fixed(step); 2]);
    }

    #[test]
    fn video_failure_reports_frame_index() {
        let dir = tempfile::tempdir().unwrap();
        let mut camera = Camera::new(1.0, 1.0);
        let mut renderer = FakeRenderer::new();
        renderer.fail_at = Some(1);

        let err = controller(CaptureSize::new(2, 2), None)
            .capture_video_frames(&mut renderer, &mut camera, dir.path(), 4)
            .unwrap_err();

        assert!(matches!(err, CaptureError::Frame { index: 1, .. }));
        assert!(dir.path().join("frame_0.png").is_file());
        assert!(!dir.path().join("frame_1.png").exists());
    }

    #[test]
    fn zero_capture_size_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut camera = Camera::new(1.0, 1.0);
        let err = controller(CaptureSize::new(0, 600), None)
            .capture_frame(&mut FakeRenderer::new(), &mut camera, &dir.path().join("x.png"))
            .unwrap_err();
        assert!(matches!(err, CaptureError::InvalidSize { .. }));
        assert_eq!(camera.aspect_ratio(), 1.0);
    }
}
