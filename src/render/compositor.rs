//! Frame compositor for the tile
//!
//! Owns the GPU resources for the tile's only draw: one full-viewport
//! triangle strip sampling the video texture through the warp shader. Driven
//! by the platform's continuous render loop; each call is idempotent and
//! bounded, with no layout set it draws the full source frame.

use std::sync::Arc;

use tokio::sync::oneshot;

use super::{viewport_quad, Vertex, WarpUniforms, TEX_COORD_LAYOUT};
use crate::layout::{self, LayoutReceiver, TileLayout};
use crate::video::VideoTexture;

/// Compositor rendering this device's tile every display refresh
pub struct FrameCompositor {
    device: Option<Arc<wgpu::Device>>,
    queue: Option<Arc<wgpu::Queue>>,
    /// Shared video texture; the decoder holds another clone
    video: Option<Arc<VideoTexture>>,
    /// Warp pipeline; `None` doubles as the invalid-program sentinel after a
    /// shader validation failure
    pipeline: Option<wgpu::RenderPipeline>,
    texture_bind_group: Option<wgpu::BindGroup>,
    warp_bind_group: Option<wgpu::BindGroup>,
    /// Constant full-viewport positions
    position_buffer: Option<wgpu::Buffer>,
    /// Texture coordinates, replaced wholesale on layout change
    tex_coord_buffer: Option<wgpu::Buffer>,
    warp_uniform_buffer: Option<wgpu::Buffer>,
    /// Latest-value layout channel from the network context
    layout_rx: LayoutReceiver,
    /// One-shot surface-ready signal; fired exactly once on init
    surface_ready_tx: Option<oneshot::Sender<Arc<VideoTexture>>>,
    /// Frame counter value at the last draw, for trace logging only
    last_seen_frame: u64,
}

impl FrameCompositor {
    /// Create a compositor wired to a layout channel.
    ///
    /// Returns the receiver the decoder collaborator waits on for the video
    /// texture handle; it resolves once [`init`](Self::init) runs.
    pub fn new(layout_rx: LayoutReceiver) -> (Self, oneshot::Receiver<Arc<VideoTexture>>) {
        let (surface_ready_tx, surface_ready_rx) = oneshot::channel();
        (
            Self {
                device: None,
                queue: None,
                video: None,
                pipeline: None,
                texture_bind_group: None,
                warp_bind_group: None,
                position_buffer: None,
                tex_coord_buffer: None,
                warp_uniform_buffer: None,
                layout_rx,
                surface_ready_tx: Some(surface_ready_tx),
                last_seen_frame: 0,
            },
            surface_ready_rx,
        )
    }

    /// One-time GPU setup on context creation.
    ///
    /// Creates the video texture and fires the surface-ready signal, then
    /// builds the warp pipeline. A shader or pipeline validation failure is
    /// logged and leaves the pipeline slot empty; draws then no-op instead of
    /// touching an invalid program.
    pub fn init(
        &mut self,
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        video_size: (u32, u32),
        target_format: wgpu::TextureFormat,
    ) {
        let video = Arc::new(VideoTexture::new(&device, video_size.0, video_size.1));

        // Sampler clamps so out-of-range mapper output samples the frame edge.
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Video Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let texture_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Tile Texture Bind Group Layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let warp_uniform_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Warp Uniform Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let texture_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Tile Texture Bind Group"),
            layout: &texture_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(video.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        let warp_uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Warp Uniform Buffer"),
            size: std::mem::size_of::<WarpUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let warp_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Warp Uniform Bind Group"),
            layout: &warp_uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: warp_uniform_buffer.as_entire_binding(),
            }],
        });

        let positions = viewport_quad();
        let position_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Tile Position Buffer"),
            size: std::mem::size_of_val(&positions) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let tex_coord_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Tile Tex Coord Buffer"),
            size: (std::mem::size_of::<f32>() * 8) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        queue.write_buffer(&position_buffer, 0, bytemuck::cast_slice(&positions));

        // Seed the frame with whatever the slot holds, or the full-frame
        // default; the first draw must never wait for a layout.
        let initial = self.layout_rx.latest();
        queue.write_buffer(
            &tex_coord_buffer,
            0,
            bytemuck::cast_slice(&layout::map(initial.as_ref()).0),
        );
        queue.write_buffer(
            &warp_uniform_buffer,
            0,
            bytemuck::bytes_of(&WarpUniforms::from(layout::rotation(initial.as_ref()))),
        );

        self.pipeline = Self::build_pipeline(
            &device,
            &texture_bind_group_layout,
            &warp_uniform_layout,
            target_format,
        );

        self.device = Some(device);
        self.queue = Some(queue);
        self.texture_bind_group = Some(texture_bind_group);
        self.warp_bind_group = Some(warp_bind_group);
        self.position_buffer = Some(position_buffer);
        self.tex_coord_buffer = Some(tex_coord_buffer);
        self.warp_uniform_buffer = Some(warp_uniform_buffer);
        self.video = Some(video.clone());

        // Hand the render surface to the decoder collaborator, once.
        if let Some(tx) = self.surface_ready_tx.take() {
            if tx.send(video).is_err() {
                log::warn!("No decoder waiting for the video texture handle");
            }
        }

        log::info!("Tile compositor initialized ({}x{})", video_size.0, video_size.1);
    }

    /// Build the warp pipeline inside a validation error scope.
    ///
    /// Returns `None` on compile/link failure; the caller treats that as the
    /// invalid-program sentinel.
    fn build_pipeline(
        device: &wgpu::Device,
        texture_layout: &wgpu::BindGroupLayout,
        warp_layout: &wgpu::BindGroupLayout,
        target_format: wgpu::TextureFormat,
    ) -> Option<wgpu::RenderPipeline> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Tile Warp Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/tile_warp.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Tile Warp Pipeline Layout"),
            bind_group_layouts: &[texture_layout, warp_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Tile Warp Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[Vertex::LAYOUT, TEX_COORD_LAYOUT],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        match pollster::block_on(device.pop_error_scope()) {
            None => Some(pipeline),
            Some(err) => {
                log::error!("Tile warp pipeline failed validation: {}", err);
                None
            }
        }
    }

    /// Check if GPU setup ran
    pub fn is_initialized(&self) -> bool {
        self.device.is_some() && self.queue.is_some()
    }

    /// Whether the warp program compiled and draws are live
    pub fn pipeline_valid(&self) -> bool {
        self.pipeline.is_some()
    }

    /// Texture coordinates the next draw will use
    pub fn current_tex_coords(&self) -> layout::TexCoords {
        layout::map(self.layout_rx.latest().as_ref())
    }

    /// Draw the tile for one display refresh.
    ///
    /// Picks up any pending layout change as a single wholesale buffer
    /// replacement, then clears and issues the one triangle-strip draw. Safe
    /// to call before init or after a shader failure; both are no-ops.
    pub fn draw(&mut self, target: &wgpu::TextureView) {
        let Some(device) = &self.device else { return };
        let Some(queue) = &self.queue else { return };
        let Some(texture_bind_group) = &self.texture_bind_group else {
            return;
        };
        let Some(warp_bind_group) = &self.warp_bind_group else {
            return;
        };
        let Some(position_buffer) = &self.position_buffer else {
            return;
        };
        let Some(tex_coord_buffer) = &self.tex_coord_buffer else {
            return;
        };
        let Some(warp_uniform_buffer) = &self.warp_uniform_buffer else {
            return;
        };

        if let Some(update) = self.layout_rx.take_changed() {
            self.apply_layout(queue, tex_coord_buffer, warp_uniform_buffer, update);
        }

        if let Some(video) = &self.video {
            let frame = video.frames_received();
            if frame != self.last_seen_frame {
                log::trace!("Sampling video frame {}", frame);
                self.last_seen_frame = frame;
            }
        }

        // Invalid program sentinel: never issue GPU work with a failed shader.
        let Some(pipeline) = &self.pipeline else { return };

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Tile Encoder"),
        });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Tile Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_pipeline(pipeline);
            render_pass.set_bind_group(0, texture_bind_group, &[]);
            render_pass.set_bind_group(1, warp_bind_group, &[]);
            render_pass.set_vertex_buffer(0, position_buffer.slice(..));
            render_pass.set_vertex_buffer(1, tex_coord_buffer.slice(..));
            render_pass.draw(0..4, 0..1);
        }

        queue.submit(std::iter::once(encoder.finish()));
    }

    /// Write the mapper output for a layout update as one replacement each of
    /// the texture coordinate buffer and the warp uniforms
    fn apply_layout(
        &self,
        queue: &wgpu::Queue,
        tex_coord_buffer: &wgpu::Buffer,
        warp_uniform_buffer: &wgpu::Buffer,
        update: Option<TileLayout>,
    ) {
        let coords = layout::map(update.as_ref());
        let uniforms = WarpUniforms::from(layout::rotation(update.as_ref()));
        queue.write_buffer(tex_coord_buffer, 0, bytemuck::cast_slice(&coords.0));
        queue.write_buffer(warp_uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
        log::debug!("Applied layout update: {:?}", update);
    }

    /// Release GPU resources. Safe even if init never completed.
    pub fn teardown(&mut self) {
        self.pipeline = None;
        self.texture_bind_group = None;
        self.warp_bind_group = None;
        self.position_buffer = None;
        self.tex_coord_buffer = None;
        self.warp_uniform_buffer = None;
        self.video = None;
        self.queue = None;
        self.device = None;
        log::info!("Tile compositor torn down");
    }
}
