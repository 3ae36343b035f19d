//! # Camera State Management
//!
//! Owns the camera, its controller and the uniform buffer the shaders read.
//!
//! ## Core Components
//! - `Camera`: the camera's position and orientation in 3D space
//! - `CameraController`: input accumulated between updates
//! - `Projection`: the camera's projection matrix
//! - `CameraUniform`: GPU representation of camera data for shaders

use camera::CameraController;
use cgmath::{Deg, Point3};
use log::warn;

use crate::{config::CameraConfig, core::StSystem};

use super::{buffer_state::BufferState, PlayerAction};

pub mod camera;

/// Name of the GPU buffer used for camera uniform data
pub const CAMERA_BUFFER_NAME: &str = "camera_buffer";

/// Height of the starting viewpoint above the grid, before scaling by the
/// world size.
const START_HEIGHT: f32 = 10.0;

/// Manages the camera, its controls and its GPU buffer.
pub struct CameraState {
    /// The current camera position and orientation
    pub camera: camera::Camera,
    /// GPU-optimized camera data for shaders
    pub camera_uniform: camera::CameraUniform,
    /// Handles player input and camera movement
    pub camera_controller: camera::CameraController,
    /// Manages GPU buffer state for camera data
    pub buffer_state: StSystem<BufferState>,
}

impl CameraState {
    /// Creates the camera just outside the grid's corner, looking diagonally
    /// across it and down, and creates the camera buffer.
    ///
    /// # Arguments
    /// * `buffer_state` - The buffer state system for GPU resource management
    /// * `projection` - The initial camera projection settings
    /// * `config` - Movement speed and look sensitivity
    /// * `world_size` - Edge length of the grid in voxels
    pub fn new(
        buffer_state: StSystem<BufferState>,
        projection: &camera::Projection,
        config: &CameraConfig,
        world_size: usize,
    ) -> Self {
        let camera = camera::Camera::new(
            Self::start_position(world_size),
            Deg(45.0),
            Deg(-30.0),
        );
        let camera_controller = CameraController::new(config.speed, config.sensitivity);

        let mut camera_uniform = camera::CameraUniform::new();
        camera_uniform.update_view_proj_and_pos(&camera, projection);

        buffer_state.get_mut().create_buffer_init(
            CAMERA_BUFFER_NAME,
            wgpu::util::BufferInitDescriptor {
                label: Some(CAMERA_BUFFER_NAME),
                contents: bytemuck::cast_slice(&[camera_uniform]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            },
        );

        CameraState {
            camera,
            camera_uniform,
            camera_controller,
            buffer_state,
        }
    }

    fn start_position(world_size: usize) -> Point3<f32> {
        Point3::new(-4.0, START_HEIGHT + 0.2 * world_size as f32, -4.0)
    }

    /// Processes player input actions and updates the camera controller state.
    pub fn intake_actions(&mut self, actions: &PlayerAction) {
        self.camera_controller.intake_actions(actions);
    }

    /// Applies pending movement and writes the camera buffer.
    ///
    /// # Returns
    /// `true` if the camera moved or turned.
    pub fn update(&mut self, dt: web_time::Duration, projection: &camera::Projection) -> bool {
        if !self.camera_controller.has_updates() {
            return false;
        }

        self.camera
            .get_controller_updates_and_reset_controller(&mut self.camera_controller, dt);
        self.refresh(projection);
        true
    }

    /// Recomputes the uniform, e.g. after the projection changed, and uploads it.
    pub fn refresh(&mut self, projection: &camera::Projection) {
        self.camera_uniform
            .update_view_proj_and_pos(&self.camera, projection);
        if let Err(err) = self.buffer_state.get_mut().write_buffer(
            CAMERA_BUFFER_NAME,
            0,
            bytemuck::cast_slice(&[self.camera_uniform]),
        ) {
            warn!("Failed to upload camera uniform: {err:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;

    use super::*;

    #[test]
    fn start_position_rises_with_world_size() {
        let small = CameraState::start_position(10);
        let large = CameraState::start_position(40);
        assert_approx_eq!(small.y, 12.0, 1e-6);
        assert_approx_eq!(large.y, 18.0, 1e-6);
        assert_approx_eq!(large.x, -4.0, 1e-6);
        assert_approx_eq!(large.z, -4.0, 1e-6);
    }
}
