//! Video texture shared with the external decoder
//!
//! The decoder collaborator writes decoded frames straight into this texture;
//! the compositor samples whatever frame is latest. There is no frame queue:
//! over-drawing a stale frame is fine and uploads are idempotent, which is how
//! the independent decoder and render clocks are reconciled.

use std::sync::atomic::{AtomicU64, Ordering};

/// GPU texture receiving decoded video frames
///
/// Created once per compositor init and alive for the playback session. The
/// handle given to the decoder is an `Arc` of this; the compositor keeps its
/// own clone for sampling.
pub struct VideoTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
    /// Frames written so far; bumped by the producer, read by the renderer
    frame_counter: AtomicU64,
}

impl VideoTexture {
    /// Create the texture at the source stream's dimensions
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Video Frame Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        log::info!("Created video texture {}x{}", width, height);

        Self {
            texture,
            view,
            width,
            height,
            frame_counter: AtomicU64::new(0),
        }
    }

    /// Upload one decoded RGBA frame, replacing the previous one
    ///
    /// Called from the decoder's context. A frame of the wrong size is logged
    /// and dropped; the renderer keeps sampling the previous frame.
    pub fn write_frame(&self, queue: &wgpu::Queue, rgba: &[u8]) {
        let expected = (self.width * self.height * 4) as usize;
        if rgba.len() != expected {
            log::warn!(
                "Dropped video frame: {} bytes, expected {}",
                rgba.len(),
                expected
            );
            return;
        }

        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(self.width * 4),
                rows_per_image: None,
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );

        self.frame_counter.fetch_add(1, Ordering::Release);
    }

    /// View for sampling in the compositor
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    /// Total frames written by the producer
    pub fn frames_received(&self) -> u64 {
        self.frame_counter.load(Ordering::Acquire)
    }

    /// Texture dimensions
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
