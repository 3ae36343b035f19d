//! Creates the render pipelines of the two passes.
//!
//! # Architecture
//!
//! - Shaded pipeline: textured, lit cubes drawn to the swapchain
//! - Pick pipeline: flat-colored cubes drawn to the off-screen pick target
//!
//! Both share the camera bind group layout and the depth format. Creation runs
//! inside a validation error scope so shader compile and link errors surface as
//! an error instead of a panic on the device's error handler.

use anyhow::anyhow;
use log::info;
use wgpu::{BindGroupLayout, Device, RenderPipeline, TextureFormat};

use crate::engine_state::picking::picker::PICK_TARGET_FORMAT;

use super::{
    bind_group_state::{camera_bind_group_layout, texture_bind_group_layout},
    texture,
    vertex::{PickVertex, Vertex},
};

const SHADED_SHADER: &str = include_str!("../../../assets/shaders/shaded.wgsl");
const PICK_SHADER: &str = include_str!("../../../assets/shaders/pick.wgsl");

/// The bind group layouts and pipelines used by the renderer.
pub struct PipelineManager {
    pub camera_layout: BindGroupLayout,
    pub texture_layout: BindGroupLayout,
    pub shaded_pipeline: RenderPipeline,
    pub pick_pipeline: RenderPipeline,
}

impl PipelineManager {
    /// Compiles both shaders and builds the pipelines.
    ///
    /// # Arguments
    /// * `device` - The WebGPU device
    /// * `surface_format` - Format of the swapchain the shaded pass draws to
    ///
    /// # Returns
    /// The validation error text if any shader fails to compile or link.
    pub async fn create(device: &Device, surface_format: TextureFormat) -> anyhow::Result<Self> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let camera_layout = camera_bind_group_layout(device);
        let texture_layout = texture_bind_group_layout(device);

        let shaded_pipeline = Self::create_pipeline(
            device,
            "Shaded",
            SHADED_SHADER,
            &[&camera_layout, &texture_layout],
            Vertex::desc(),
            surface_format,
        );
        let pick_pipeline = Self::create_pipeline(
            device,
            "Pick",
            PICK_SHADER,
            &[&camera_layout],
            PickVertex::desc(),
            PICK_TARGET_FORMAT,
        );

        if let Some(error) = device.pop_error_scope().await {
            return Err(anyhow!("Failed to build render pipelines: {error}"));
        }

        info!("Render pipelines ready (surface format {surface_format:?})");
        Ok(Self {
            camera_layout,
            texture_layout,
            shaded_pipeline,
            pick_pipeline,
        })
    }

    fn create_pipeline(
        device: &Device,
        name: &str,
        source: &str,
        bind_group_layouts: &[&BindGroupLayout],
        vertex_layout: wgpu::VertexBufferLayout,
        target_format: TextureFormat,
    ) -> RenderPipeline {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{name} Shader")),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{name} Pipeline Layout")),
            bind_group_layouts,
            push_constant_ranges: &[],
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&format!("{name} Render Pipeline")),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[vertex_layout],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    // pick colors must reach the target untouched
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: texture::Texture::DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        })
    }
}
