//! Manages WebGPU bind groups and their layouts.
//!
//! Layouts are created together with the pipelines. Bind groups are created once
//! the buffers and textures they reference exist, and the texture group is
//! replaced when the atlas arrives.

use std::collections::HashMap;

use anyhow::anyhow;
use wgpu::{BindGroup, BindGroupLayout, Device};

use crate::engine_state::{buffer_state::BufferState, camera_state::CAMERA_BUFFER_NAME};

use super::texture::Texture;

/// Name of the camera bind group
pub const CAMERA_BIND_GROUP: &str = "camera_bind_group";
/// Name of the camera bind group layout
pub const CAMERA_BIND_GROUP_LAYOUT: &str = "camera_bind_group_layout";
/// Name of the atlas bind group
pub const TEXTURE_BIND_GROUP: &str = "texture_bind_group";
/// Name of the atlas bind group layout
pub const TEXTURE_BIND_GROUP_LAYOUT: &str = "texture_bind_group_layout";

/// Creates the layout of the camera uniform group (group 0 in both shaders).
pub fn camera_bind_group_layout(device: &Device) -> BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some(CAMERA_BIND_GROUP_LAYOUT),
    })
}

/// Creates the layout of the atlas texture and sampler group (group 1 of the
/// shaded shader).
pub fn texture_bind_group_layout(device: &Device) -> BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                // This should match the filterable field of the Texture entry above.
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some(TEXTURE_BIND_GROUP_LAYOUT),
    })
}

/// Holds the bind groups used by the render passes, by name.
pub struct BindGroupState {
    bind_groups: HashMap<&'static str, BindGroup>,
}

impl BindGroupState {
    /// Creates the camera group and an atlas group around `atlas`.
    ///
    /// # Returns
    /// An error if the camera buffer has not been created yet.
    pub fn new(
        device: &Device,
        buffer_state: &BufferState,
        camera_layout: &BindGroupLayout,
        texture_layout: &BindGroupLayout,
        atlas: &Texture,
    ) -> anyhow::Result<Self> {
        let camera_binding = buffer_state
            .get_entire_binding(CAMERA_BUFFER_NAME)
            .ok_or_else(|| anyhow!("Camera buffer must exist before its bind group"))?;

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_binding,
            }],
            label: Some(CAMERA_BIND_GROUP),
        });

        let mut bind_groups = HashMap::new();
        bind_groups.insert(CAMERA_BIND_GROUP, camera_bind_group);

        let mut state = Self { bind_groups };
        state.set_texture(device, texture_layout, atlas);
        Ok(state)
    }

    /// Replaces the atlas bind group.
    pub fn set_texture(&mut self, device: &Device, texture_layout: &BindGroupLayout, atlas: &Texture) {
        let texture_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&atlas.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&atlas.sampler),
                },
            ],
            label: Some(TEXTURE_BIND_GROUP),
        });
        self.bind_groups.insert(TEXTURE_BIND_GROUP, texture_bind_group);
    }

    /// Retrieves a bind group by name.
    pub fn get_bind_group(&self, name: &'static str) -> Option<&BindGroup> {
        self.bind_groups.get(name)
    }
}
