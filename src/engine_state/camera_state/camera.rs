//! # Camera Implementation
//!
//! - `Camera`: position and orientation in world space
//! - `Projection`: perspective projection settings
//! - `CameraController`: movement and look input accumulated between updates
//! - `CameraUniform`: packed data for the shaders

use cgmath::*;
use std::f32::consts::FRAC_PI_2;
use web_time::Duration;

use crate::engine_state::PlayerAction;

/// Transformation matrix to convert from OpenGL's coordinate system to WGPU's.
///
/// WGPU's normalized device coordinates range from 0 to 1 in Z where OpenGL's
/// range from -1 to 1, so Z is scaled by a half and shifted by a half.
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Safe limit for pitch to prevent gimbal lock
const SAFE_FRAC_PI_2: f32 = FRAC_PI_2 - 0.0001;

/// A first-person camera in 3D space.
///
/// Yaw is measured from +X towards +Z, pitch from the horizon upwards.
#[derive(Debug)]
pub struct Camera {
    /// The camera's position in world space
    pub position: Point3<f32>,
    /// Horizontal rotation (around Y axis) in radians
    pub yaw: Rad<f32>,
    /// Vertical rotation (around X axis) in radians
    pub pitch: Rad<f32>,
}

impl Camera {
    /// Creates a new camera with the specified position and orientation.
    ///
    /// # Example
    /// ```ignore
    /// use cgmath::{Point3, Deg};
    /// let camera = Camera::new(
    ///     Point3::new(0.0, 0.0, 0.0),  // Position at origin
    ///     Deg(0.0),                     // Facing along positive X
    ///     Deg(0.0),                     // Level horizon
    /// );
    /// ```
    pub fn new<V: Into<Point3<f32>>, Y: Into<Rad<f32>>, P: Into<Rad<f32>>>(
        position: V,
        yaw: Y,
        pitch: P,
    ) -> Self {
        Self {
            position: position.into(),
            yaw: yaw.into(),
            pitch: pitch.into(),
        }
    }

    /// Gets the camera's normalized forward direction.
    pub fn get_view_vec(&self) -> Vector3<f32> {
        let (yaw_sin, yaw_cos) = self.yaw.0.sin_cos();
        let (pitch_sin, pitch_cos) = self.pitch.0.sin_cos();
        Vector3::new(pitch_cos * yaw_cos, pitch_sin, pitch_cos * yaw_sin).normalize()
    }

    /// Calculates the view matrix for this camera.
    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_to_rh(self.position, self.get_view_vec(), Vector3::unit_y())
    }

    /// Applies the controller's accumulated input and resets it.
    ///
    /// Movement stays in the horizontal plane except for the explicit up and
    /// down amounts. Pitch is clamped just short of straight up or down.
    pub fn get_controller_updates_and_reset_controller(
        &mut self,
        controller: &mut CameraController,
        dt: Duration,
    ) {
        let dt = dt.as_secs_f32();

        let (yaw_sin, yaw_cos) = self.yaw.0.sin_cos();
        let forward = Vector3::new(yaw_cos, 0.0, yaw_sin);
        let right = Vector3::new(-yaw_sin, 0.0, yaw_cos);
        let step = controller.speed * dt;
        self.position += forward * (controller.amount_forward - controller.amount_backward) * step;
        self.position += right * (controller.amount_right - controller.amount_left) * step;
        self.position.y += (controller.amount_up - controller.amount_down) * step;

        self.yaw += Rad::from(Deg(controller.rotate_horizontal * controller.sensitivity));
        self.pitch += Rad::from(Deg(-controller.rotate_vertical * controller.sensitivity));

        if self.pitch < -Rad(SAFE_FRAC_PI_2) {
            self.pitch = -Rad(SAFE_FRAC_PI_2);
        } else if self.pitch > Rad(SAFE_FRAC_PI_2) {
            self.pitch = Rad(SAFE_FRAC_PI_2);
        }

        controller.reset();
    }
}

/// A camera's perspective projection.
#[derive(Debug)]
pub struct Projection {
    /// Aspect ratio (width / height)
    aspect: f32,
    /// Vertical field of view in radians
    fovy: Rad<f32>,
    /// Near clipping plane distance
    znear: f32,
    /// Far clipping plane distance
    zfar: f32,
}

impl Projection {
    /// Creates a new projection with the given parameters.
    ///
    /// # Arguments
    /// * `width` - Viewport width in pixels
    /// * `height` - Viewport height in pixels
    /// * `fovy` - Vertical field of view
    /// * `znear` - Near clipping plane distance
    /// * `zfar` - Far clipping plane distance
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: Self::aspect_of(width, height),
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    /// Updates the projection's aspect ratio for viewport resizing.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = Self::aspect_of(width, height);
    }

    #[cfg(test)]
    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    fn aspect_of(width: u32, height: u32) -> f32 {
        width as f32 / height.max(1) as f32
    }

    /// Calculates the projection matrix, including the conversion to WGPU's
    /// depth range.
    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

/// Accumulates movement and look input until the next camera update.
#[derive(Debug)]
pub struct CameraController {
    // Movement amounts, 0 or 1
    amount_left: f32,
    amount_right: f32,
    amount_forward: f32,
    amount_backward: f32,
    amount_up: f32,
    amount_down: f32,

    // Mouse delta in pixels
    rotate_horizontal: f32,
    rotate_vertical: f32,

    /// Movement speed in world units per second
    speed: f32,
    /// Mouse look in degrees per pixel
    sensitivity: f32,
}

impl CameraController {
    /// Creates a new camera controller with the given speed and sensitivity.
    ///
    /// # Arguments
    /// * `speed` - Movement speed in units per second
    /// * `sensitivity` - Mouse look in degrees per pixel of motion
    pub fn new(speed: f32, sensitivity: f32) -> Self {
        Self {
            amount_left: 0.0,
            amount_right: 0.0,
            amount_forward: 0.0,
            amount_backward: 0.0,
            amount_up: 0.0,
            amount_down: 0.0,
            rotate_horizontal: 0.0,
            rotate_vertical: 0.0,
            speed,
            sensitivity,
        }
    }

    /// Processes player actions and updates controller state accordingly.
    pub fn intake_actions(&mut self, actions: &PlayerAction) {
        let amount = |active: bool| if active { 1.0 } else { 0.0 };
        self.amount_forward = amount(actions.move_forward);
        self.amount_backward = amount(actions.move_backward);
        self.amount_left = amount(actions.move_left);
        self.amount_right = amount(actions.move_right);
        self.amount_up = amount(actions.move_up);
        self.amount_down = amount(actions.move_down);
        if let Some((delta_x, delta_y)) = actions.rotate_view {
            self.rotate_horizontal += delta_x as f32;
            self.rotate_vertical += delta_y as f32;
        }
    }

    /// Checks if there are any pending updates that would affect the camera.
    pub fn has_updates(&self) -> bool {
        self.amount_forward > 0.0
            || self.amount_backward > 0.0
            || self.amount_left > 0.0
            || self.amount_right > 0.0
            || self.amount_up > 0.0
            || self.amount_down > 0.0
            || self.rotate_horizontal != 0.0
            || self.rotate_vertical != 0.0
    }

    fn reset(&mut self) {
        *self = Self::new(self.speed, self.sensitivity);
    }
}

/// GPU-friendly representation of camera data for shaders.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    // We can't use cgmath with bytemuck directly so we'll have to convert the Matrix4 into a 4x4 f32 array
    view_proj: [[f32; 4]; 4],
    position: [f32; 4],
}

impl CameraUniform {
    /// Creates a new camera uniform with an identity matrix and zero position.
    pub fn new() -> Self {
        Self {
            view_proj: cgmath::Matrix4::identity().into(),
            position: [0.0, 0.0, 0.0, 0.0],
        }
    }

    #[cfg(test)]
    pub fn view_proj(&self) -> Matrix4<f32> {
        self.view_proj.into()
    }

    /// Updates the view-projection matrix and position from the camera.
    pub fn update_view_proj_and_pos(&mut self, camera: &Camera, projection: &Projection) {
        self.view_proj = (projection.calc_matrix() * camera.calc_matrix()).into();
        let pos3: [f32; 3] = camera.position.into();
        self.position = [pos3[0], pos3[1], pos3[2], 1.0];
    }
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;

    use super::*;

    fn actions() -> PlayerAction {
        PlayerAction::default()
    }

    #[test]
    fn view_vector_follows_yaw_and_pitch() {
        let camera = Camera::new((0.0, 0.0, 0.0), Deg(90.0), Deg(0.0));
        let view = camera.get_view_vec();
        assert_approx_eq!(view.x, 0.0, 1e-6);
        assert_approx_eq!(view.z, 1.0, 1e-6);

        let camera = Camera::new((0.0, 0.0, 0.0), Deg(0.0), Deg(-30.0));
        let view = camera.get_view_vec();
        assert_approx_eq!(view.y, -0.5, 1e-6);
        assert_approx_eq!(view.magnitude(), 1.0, 1e-6);
    }

    #[test]
    fn forward_moves_along_yaw_at_speed() {
        let mut camera = Camera::new((0.0, 5.0, 0.0), Deg(0.0), Deg(-45.0));
        let mut controller = CameraController::new(8.0, 0.4);
        controller.intake_actions(&PlayerAction {
            move_forward: true,
            ..actions()
        });
        assert!(controller.has_updates());

        camera.get_controller_updates_and_reset_controller(&mut controller, Duration::from_millis(500));
        // pitch does not tilt horizontal movement
        assert_approx_eq!(camera.position.x, 4.0, 1e-5);
        assert_approx_eq!(camera.position.y, 5.0, 1e-5);
        assert_approx_eq!(camera.position.z, 0.0, 1e-5);
        assert!(!controller.has_updates());
    }

    #[test]
    fn up_and_down_cancel() {
        let mut camera = Camera::new((0.0, 0.0, 0.0), Deg(0.0), Deg(0.0));
        let mut controller = CameraController::new(8.0, 0.4);
        controller.intake_actions(&PlayerAction {
            move_up: true,
            move_down: true,
            ..actions()
        });
        camera.get_controller_updates_and_reset_controller(&mut controller, Duration::from_secs(1));
        assert_approx_eq!(camera.position.y, 0.0, 1e-6);
    }

    #[test]
    fn mouse_look_scales_by_sensitivity_and_clamps_pitch() {
        let mut camera = Camera::new((0.0, 0.0, 0.0), Deg(0.0), Deg(0.0));
        let mut controller = CameraController::new(8.0, 0.5);
        controller.intake_actions(&PlayerAction {
            rotate_view: Some((20.0, 0.0)),
            ..actions()
        });
        camera.get_controller_updates_and_reset_controller(&mut controller, Duration::from_millis(16));
        assert_approx_eq!(Deg::from(camera.yaw).0, 10.0, 1e-4);

        controller.intake_actions(&PlayerAction {
            rotate_view: Some((0.0, -1000.0)),
            ..actions()
        });
        camera.get_controller_updates_and_reset_controller(&mut controller, Duration::from_millis(16));
        assert!(camera.pitch.0 <= SAFE_FRAC_PI_2);
        assert_approx_eq!(camera.pitch.0, SAFE_FRAC_PI_2, 1e-6);
    }

    #[test]
    fn strafing_moves_across_the_view_and_keeps_yaw() {
        let mut camera = Camera::new((0.0, 0.0, 0.0), Deg(0.0), Deg(0.0));
        let mut controller = CameraController::new(8.0, 0.4);
        controller.intake_actions(&PlayerAction {
            move_left: true,
            ..actions()
        });
        camera.get_controller_updates_and_reset_controller(&mut controller, Duration::from_millis(500));
        assert_approx_eq!(camera.position.x, 0.0, 1e-5);
        assert_approx_eq!(camera.position.z, -4.0, 1e-5);
        assert_approx_eq!(camera.yaw.0, 0.0, 1e-6);
    }

    #[test]
    fn projection_maps_near_and_far_planes_to_wgpu_depth() {
        let projection = Projection::new(800, 600, Deg(45.0), 0.1, 1000.0);
        assert_approx_eq!(projection.aspect(), 800.0 / 600.0, 1e-6);

        let matrix = projection.calc_matrix();
        let near = matrix * Vector4::new(0.0, 0.0, -0.1, 1.0);
        let far = matrix * Vector4::new(0.0, 0.0, -1000.0, 1.0);
        assert_approx_eq!(near.z / near.w, 0.0, 1e-4);
        assert_approx_eq!(far.z / far.w, 1.0, 1e-4);
    }

    #[test]
    fn zero_height_resize_keeps_a_finite_aspect() {
        let mut projection = Projection::new(800, 600, Deg(45.0), 0.1, 1000.0);
        projection.resize(800, 0);
        assert!(projection.aspect().is_finite());
    }

    #[test]
    fn uniform_projects_the_point_ahead_to_screen_center() {
        let camera = Camera::new((0.0, 0.0, 0.0), Deg(0.0), Deg(0.0));
        let projection = Projection::new(100, 100, Deg(45.0), 0.1, 1000.0);
        let mut uniform = CameraUniform::new();
        uniform.update_view_proj_and_pos(&camera, &projection);

        let clip = uniform.view_proj() * Vector4::new(10.0, 0.0, 0.0, 1.0);
        assert_approx_eq!(clip.x / clip.w, 0.0, 1e-5);
        assert_approx_eq!(clip.y / clip.w, 0.0, 1e-5);
    }
}
