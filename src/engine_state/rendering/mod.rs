//! Rendering system for the voxel builder.
//!
//! `SurfaceRenderer` owns the swapchain, the pipelines and the pick target and
//! runs the two passes:
//!
//! - the shaded pass draws the textured surface to the window every frame from
//!   geometry that is rebuilt only when the surface changes;
//! - the pick pass draws every face in its id color to the off-screen target on
//!   request and copies back the pixel under the cursor.
//!
//! Both passes use the same camera bind group and the same target size, so a
//! pixel addresses the same world point in each.

use anyhow::anyhow;
use log::{debug, warn};
use wgpu::{Device, Queue, Surface, SurfaceConfiguration};

use crate::core::StSystem;

use super::{
    buffer_state::BufferState,
    camera_state::camera::Projection,
    picking::{picker::PICK_TARGET_FORMAT, ChannelBits, ColorIdCodec, GpuPicker},
    voxels::voxel::FaceId,
};

pub mod atlas;
pub mod bind_group_state;
pub mod drawable;
pub mod pipeline_manager;
pub mod texture;
pub mod vertex;

use atlas::AtlasImage;
use bind_group_state::{BindGroupState, CAMERA_BIND_GROUP, TEXTURE_BIND_GROUP};
use drawable::{
    DrawCall, Drawable, FrameBuilder, PassKind, CUBE_INDICES, INDICES_PER_CUBE, VERTICES_PER_CUBE,
};
use pipeline_manager::PipelineManager;
use texture::Texture;

/// Name of the shared cube index buffer
pub const CUBE_INDEX_BUFFER_NAME: &str = "cube_index_buffer";
/// Name of the shaded pass vertex buffer
pub const SHADED_VERTEX_BUFFER_NAME: &str = "shaded_vertex_buffer";
/// Name of the pick pass vertex buffer
pub const PICK_VERTEX_BUFFER_NAME: &str = "pick_vertex_buffer";

const SKY_COLOR: wgpu::Color = wgpu::Color {
    r: 0.53,
    g: 0.77,
    b: 0.92,
    a: 1.0,
};

/// Draws the surface and answers pick requests.
pub struct SurfaceRenderer {
    pub surface: Surface<'static>,
    pub surface_config: SurfaceConfiguration,
    pub device: StSystem<Device>,
    pub queue: StSystem<Queue>,
    pub camera_projection: Projection,
    buffer_state: StSystem<BufferState>,
    pipelines: PipelineManager,
    bind_group_state: BindGroupState,
    depth_texture: Texture,
    picker: GpuPicker,
    codec: ColorIdCodec,
    shaded_draws: Vec<DrawCall>,
    shaded_stride: u64,
}

impl SurfaceRenderer {
    /// Creates the renderer with the placeholder atlas bound.
    ///
    /// # Arguments
    /// * `surface` - The configured window surface
    /// * `surface_config` - Its configuration
    /// * `device`, `queue` - Shared GPU handles
    /// * `buffer_state` - Buffer registry, which must already hold the camera buffer
    /// * `pipelines` - Pipelines created for the surface format
    /// * `camera_projection` - Projection matching the surface size
    pub fn new(
        surface: Surface<'static>,
        surface_config: SurfaceConfiguration,
        device: StSystem<Device>,
        queue: StSystem<Queue>,
        buffer_state: StSystem<BufferState>,
        pipelines: PipelineManager,
        camera_projection: Projection,
    ) -> anyhow::Result<Self> {
        let codec = ColorIdCodec::new(ChannelBits::from_format(PICK_TARGET_FORMAT)?)?;

        buffer_state.get_mut().create_buffer_init(
            CUBE_INDEX_BUFFER_NAME,
            wgpu::util::BufferInitDescriptor {
                label: Some(CUBE_INDEX_BUFFER_NAME),
                contents: bytemuck::cast_slice(&CUBE_INDICES),
                usage: wgpu::BufferUsages::INDEX,
            },
        );

        let (bind_group_state, depth_texture, picker) = {
            let device_ref = device.get();
            let placeholder = Texture::from_image(
                &device_ref,
                &queue.get(),
                &AtlasImage::placeholder(),
                "Placeholder Atlas",
            );
            let bind_group_state = BindGroupState::new(
                &device_ref,
                &buffer_state.get(),
                &pipelines.camera_layout,
                &pipelines.texture_layout,
                &placeholder,
            )?;
            let depth_texture = Texture::create_depth_texture(
                &device_ref,
                surface_config.width,
                surface_config.height,
                "DEPTH TEXTURE",
            );
            let picker = GpuPicker::new(
                &device_ref,
                buffer_state.clone(),
                surface_config.width,
                surface_config.height,
            );
            (bind_group_state, depth_texture, picker)
        };

        Ok(Self {
            surface,
            surface_config,
            device,
            queue,
            camera_projection,
            buffer_state,
            pipelines,
            bind_group_state,
            depth_texture,
            picker,
            codec,
            shaded_draws: Vec::new(),
            shaded_stride: std::mem::size_of::<vertex::Vertex>() as u64,
        })
    }

    /// Handles window resize events. Zero-sized windows are ignored.
    pub fn resize_surface(&mut self, size: winit::dpi::PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }

        self.surface_config.width = size.width;
        self.surface_config.height = size.height;
        self.reconfigure();

        self.camera_projection.resize(size.width, size.height);

        let device = self.device.get();
        self.depth_texture =
            Texture::create_depth_texture(&device, size.width, size.height, "DEPTH TEXTURE");
        self.picker.resize(&device, size.width, size.height);
    }

    fn reconfigure(&self) {
        self.surface
            .configure(&self.device.get(), &self.surface_config);
    }

    /// Binds a newly loaded atlas in place of the current one.
    pub fn set_atlas(&mut self, atlas: &AtlasImage) {
        let device = self.device.get();
        let texture = Texture::from_image(&device, &self.queue.get(), atlas, "Block Atlas");
        self.bind_group_state
            .set_texture(&device, &self.pipelines.texture_layout, &texture);
    }

    /// Rebuilds and uploads the shaded geometry.
    pub fn rebuild_shaded(&mut self, drawable: &dyn Drawable) -> anyhow::Result<()> {
        let mut frame = FrameBuilder::new(PassKind::Shaded, self.codec);
        drawable.compute_buffers(&mut frame)?;
        let (geometry, draws) = frame.finish();

        let mut buffer_state = self.buffer_state.get_mut();
        buffer_state.upload(
            SHADED_VERTEX_BUFFER_NAME,
            wgpu::BufferUsages::VERTEX,
            geometry.as_bytes(),
        )?;
        debug!(
            "Shaded frame: {} draws, {} vertices, {}/{} bytes of GPU buffers in use",
            draws.len(),
            geometry.len(),
            buffer_state.get_total_used_memory(),
            buffer_state.get_total_allocated_memory()
        );

        self.shaded_stride = geometry.stride();
        self.shaded_draws = draws;
        Ok(())
    }

    /// Draws the shaded pass to the window.
    ///
    /// A lost or outdated surface is reconfigured and the frame skipped. Other
    /// acquisition errors are logged and the frame skipped.
    pub fn render(&mut self) -> anyhow::Result<()> {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                debug!("Surface lost or outdated, reconfiguring");
                self.reconfigure();
                return Ok(());
            }
            Err(err) => {
                warn!("Error getting current frame: {err}");
                return Ok(());
            }
        };

        let view = frame.texture.create_view(&Default::default());
        let mut encoder = self
            .device
            .get()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Shaded Encoder"),
            });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shaded Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(SKY_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            rpass.set_pipeline(&self.pipelines.shaded_pipeline);
            rpass.set_bind_group(0, self.bind_group(CAMERA_BIND_GROUP)?, &[]);
            rpass.set_bind_group(1, self.bind_group(TEXTURE_BIND_GROUP)?, &[]);
            self.draw_voxels(
                &mut rpass,
                SHADED_VERTEX_BUFFER_NAME,
                self.shaded_stride,
                &self.shaded_draws,
            )?;
        }

        self.queue.get().submit([encoder.finish()]);
        frame.present();
        Ok(())
    }

    /// Renders the pick pass and starts reading back the pixel at `(x, y)`.
    ///
    /// On native the device is polled until the readback has settled, so the
    /// result is available from [`Self::poll_pick`] immediately. On the web it
    /// arrives on a later frame.
    ///
    /// # Returns
    /// `false` without rendering if a previous pick is still in flight.
    pub fn render_pick(&mut self, drawable: &dyn Drawable, x: u32, y: u32) -> anyhow::Result<bool> {
        if self.picker.is_busy() {
            return Ok(false);
        }

        let mut frame = FrameBuilder::new(PassKind::Pick, self.codec);
        drawable.compute_buffers(&mut frame)?;
        let (geometry, draws) = frame.finish();
        self.buffer_state.get_mut().upload(
            PICK_VERTEX_BUFFER_NAME,
            wgpu::BufferUsages::VERTEX,
            geometry.as_bytes(),
        )?;

        let device = self.device.get();
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Pick Encoder"),
        });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Pick Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.picker.id_texture_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        // id 0, a miss
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.picker.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            rpass.set_pipeline(&self.pipelines.pick_pipeline);
            rpass.set_bind_group(0, self.bind_group(CAMERA_BIND_GROUP)?, &[]);
            self.draw_voxels(&mut rpass, PICK_VERTEX_BUFFER_NAME, geometry.stride(), &draws)?;
        }
        self.picker.encode_read_pixel(&mut encoder, x, y)?;

        self.queue.get().submit([encoder.finish()]);
        self.picker.begin_readback()?;

        #[cfg(not(target_family = "wasm"))]
        if let Err(err) = device.poll(wgpu::PollType::Wait) {
            warn!("Device poll during pick failed: {err}");
        }

        Ok(true)
    }

    /// Decoded face id of the last pick once its readback has settled.
    pub fn poll_pick(&mut self) -> Option<anyhow::Result<FaceId>> {
        let codec = self.codec;
        self.picker
            .take_pixel()
            .map(|pixel| pixel.map(|pixel| codec.decode_rgba8(pixel)))
    }

    fn bind_group(&self, name: &'static str) -> anyhow::Result<&wgpu::BindGroup> {
        self.bind_group_state
            .get_bind_group(name)
            .ok_or_else(|| anyhow!("Missing bind group '{name}'"))
    }

    /// Issues one indexed draw per voxel, binding the vertex buffer at the
    /// voxel's first vertex.
    fn draw_voxels(
        &self,
        rpass: &mut wgpu::RenderPass<'_>,
        vertex_buffer_name: &'static str,
        stride: u64,
        draws: &[DrawCall],
    ) -> anyhow::Result<()> {
        if draws.is_empty() {
            return Ok(());
        }

        let buffer_state = self.buffer_state.get();
        let vertices = buffer_state
            .get_buffer(vertex_buffer_name)
            .ok_or_else(|| anyhow!("Missing vertex buffer '{vertex_buffer_name}'"))?;
        let indices = buffer_state
            .get_buffer(CUBE_INDEX_BUFFER_NAME)
            .ok_or_else(|| anyhow!("Missing cube index buffer"))?;

        rpass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint16);
        let cube_bytes = VERTICES_PER_CUBE as u64 * stride;
        for draw in draws {
            let start = draw.first_vertex as u64 * stride;
            rpass.set_vertex_buffer(0, vertices.slice(start..start + cube_bytes));
            rpass.draw_indexed(0..INDICES_PER_CUBE, 0, 0..1);
        }
        Ok(())
    }
}
