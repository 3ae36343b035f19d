//! # Engine State Module
//!
//! Owns the surface grid and the systems that draw and edit it.
//!
//! ## Key Components
//!
//! * `EngineState` - The main state container for the engine
//! * `buffer_state` - Manages GPU buffers for rendering
//! * `camera_state` - Handles camera positioning and movement
//! * `picking` - Face id colors and the off-screen pick target
//! * `rendering` - The shaded and pick passes
//! * `voxels` - The surface grid, terrain and edits
//!
//! ## Frame Flow
//!
//! Input is translated into a `PlayerAction` once per loop iteration. Movement
//! goes to the camera. A click renders the pick pass and reads back the pixel
//! under the cursor; once the pixel arrives its face id is resolved against the
//! grid and the edit is applied. Any change to the grid marks the shaded
//! geometry dirty so it is rebuilt before the next frame is drawn.

use cgmath::Deg;
use log::{debug, error, info, warn};
use wgpu::{Device, Queue, Surface, SurfaceConfiguration};
use winit::{event::MouseButton, keyboard::KeyCode};

use crate::{application_state::input_state::ProcessedInputState, config::EngineConfig, core::StSystem};

use camera_state::{camera, CameraState};
use rendering::{atlas::AtlasImage, pipeline_manager::PipelineManager, SurfaceRenderer};
use voxels::{
    surface::{EditAction, SurfaceGrid},
    voxel::{block_type::BlockType, FaceId},
};

pub mod buffer_state;
pub mod camera_state;
pub mod picking;
pub mod rendering;
pub mod voxels;

/// The main state container of the voxel builder.
///
/// # Examples
///
/// ```ignore
/// let mut engine_state = EngineState::new(
///     surface,
///     surface_config,
///     device,
///     queue,
///     pipelines,
///     &EngineConfig::default(),
/// )?;
///
/// // Main loop
/// loop {
///     engine_state.set_input_commands(input);
///     engine_state.process_input(delta_time);
///     engine_state.render();
/// }
/// ```
pub struct EngineState {
    /// Camera state managing position, orientation and movement
    pub camera_state: CameraState,
    /// Current player actions derived from input
    pub player_actions: PlayerAction,
    /// Draws the surface and answers picks
    pub renderer: SurfaceRenderer,
    /// The editable voxel surface
    pub surface: SurfaceGrid,
    /// Block type placed by builds
    block_type: BlockType,
    /// Edit waiting for its pick readback
    pending_pick: PendingPick,
    /// The shaded geometry no longer matches the surface
    surface_dirty: bool,
}

impl EngineState {
    /// Creates the engine, generates the terrain and sets up the renderer.
    ///
    /// # Arguments
    ///
    /// * `surface` - The configured window surface
    /// * `surface_config` - Configuration for the rendering surface
    /// * `device` - The GPU device
    /// * `queue` - The GPU command queue
    /// * `pipelines` - Pipelines compiled for the surface format
    /// * `config` - World and camera settings
    pub fn new(
        surface: Surface<'static>,
        surface_config: SurfaceConfiguration,
        device: Device,
        queue: Queue,
        pipelines: PipelineManager,
        config: &EngineConfig,
    ) -> anyhow::Result<Self> {
        let device = StSystem::new(Box::new(device));
        let queue = StSystem::new(Box::new(queue));
        let buffer_state = StSystem::new(Box::new(buffer_state::BufferState::new(
            device.clone(),
            queue.clone(),
        )));

        let camera_projection = camera::Projection::new(
            surface_config.width,
            surface_config.height,
            Deg(45.0),
            0.1,
            1000.0,
        );

        let camera_state = CameraState::new(
            buffer_state.clone(),
            &camera_projection,
            &config.camera,
            config.world_size,
        );

        let renderer = SurfaceRenderer::new(
            surface,
            surface_config,
            device,
            queue,
            buffer_state.clone(),
            pipelines,
            camera_projection,
        )?;

        let mut surface = SurfaceGrid::new(config.world_size);
        let mut rng = match config.terrain.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        let summary = surface.randomize(&mut rng, &config.terrain);
        info!(
            "Generated {0}x{0} surface: {1} voxels, {2} mountains, {3} ridge voxels",
            config.world_size,
            surface.voxel_count(),
            summary.mountains_placed,
            summary.ridge_voxels
        );

        Ok(Self {
            camera_state,
            player_actions: PlayerAction::default(),
            renderer,
            surface,
            block_type: BlockType::default(),
            pending_pick: PendingPick::default(),
            surface_dirty: true,
        })
    }

    /// Resizes the rendering surface when the window size changes
    pub fn resize_surface(&mut self, size: winit::dpi::PhysicalSize<u32>) {
        self.renderer.resize_surface(size);
        self.camera_state.refresh(&self.renderer.camera_projection);
    }

    /// Binds the loaded block atlas.
    pub fn set_atlas(&mut self, atlas: &AtlasImage) {
        info!("Atlas loaded ({}x{})", atlas.width, atlas.height);
        self.renderer.set_atlas(atlas);
    }

    /// Renders the current frame, rebuilding the shaded geometry first if the
    /// surface changed.
    pub fn render(&mut self) {
        if self.surface_dirty {
            match self.renderer.rebuild_shaded(&self.surface) {
                Ok(()) => self.surface_dirty = false,
                Err(err) => error!("Failed to rebuild surface geometry: {err:#}"),
            }
        }

        if let Err(err) = self.renderer.render() {
            error!("Failed to render frame: {err:#}");
        }
    }

    /// Processes input and updates the camera and the surface.
    ///
    /// # Arguments
    ///
    /// * `wait_duration` - The time elapsed since the last frame
    pub fn process_input(&mut self, wait_duration: web_time::Duration) {
        self.camera_state.intake_actions(&self.player_actions);
        self.camera_state
            .update(wait_duration, &self.renderer.camera_projection);

        if let Some(block_type) = self.player_actions.select_block {
            if block_type != self.block_type {
                info!("Selected block type {block_type:?}");
                self.block_type = block_type;
            }
        }

        // A readback started on an earlier frame lands first.
        self.resolve_pending_pick();

        if let Some((action, x, y)) = self.player_actions.edit.take() {
            self.request_pick(action, x, y);
            self.resolve_pending_pick();
        }
    }

    fn request_pick(&mut self, action: EditAction, x: u32, y: u32) {
        let renderer = &mut self.renderer;
        let surface = &self.surface;
        self.pending_pick
            .request(action, || renderer.render_pick(surface, x, y));
    }

    fn resolve_pending_pick(&mut self) {
        let Some((action, result)) = self.pending_pick.resolve(|| self.renderer.poll_pick()) else {
            return;
        };

        match result {
            Ok(face_id) => {
                let outcome = self.surface.apply_edit(action, face_id, self.block_type);
                if outcome.mutated() {
                    info!("{action:?}: {outcome:?}");
                    self.surface_dirty = true;
                } else {
                    debug!("{action:?} on face {face_id}: {outcome:?}");
                }
            }
            Err(err) => warn!("Pick readback failed: {err:#}"),
        }
    }

    /// Sets the input commands for the engine state.
    ///
    /// # Arguments
    /// * `input` - The processed input state to use for setting commands
    pub fn set_input_commands(&mut self, input: ProcessedInputState) {
        self.player_actions = PlayerAction::from_input(&input);
    }
}

/// The edit waiting for its pick pixel. At most one pick is in flight; a click
/// made while one is pending is dropped.
#[derive(Debug, Default)]
struct PendingPick {
    action: Option<EditAction>,
}

impl PendingPick {
    /// Starts a pick for `action` through `render_pick` unless one is pending.
    ///
    /// `render_pick` returns `false` when the picker could not take the request.
    ///
    /// # Returns
    /// Whether a pick was started.
    fn request(
        &mut self,
        action: EditAction,
        render_pick: impl FnOnce() -> anyhow::Result<bool>,
    ) -> bool {
        if let Some(pending) = self.action {
            debug!("Pick for {pending:?} in flight, dropping {action:?}");
            return false;
        }

        match render_pick() {
            Ok(true) => {
                debug!("Pick requested for {action:?}");
                self.action = Some(action);
                true
            }
            Ok(false) => {
                debug!("Picker busy, dropping {action:?}");
                false
            }
            Err(err) => {
                warn!("Pick pass failed: {err:#}");
                false
            }
        }
    }

    /// Polls the pending pick and hands back its edit once the pixel arrived.
    /// `poll` is not called when nothing is pending.
    fn resolve(
        &mut self,
        poll: impl FnOnce() -> Option<anyhow::Result<FaceId>>,
    ) -> Option<(EditAction, anyhow::Result<FaceId>)> {
        let action = self.action?;
        let result = poll()?;
        self.action = None;
        Some((action, result))
    }
}

/// Player actions derived from one frame of input.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PlayerAction {
    /// Movement actions - true if key is pressed or held
    move_forward: bool,
    move_backward: bool,
    move_left: bool,
    move_right: bool,
    move_up: bool,
    move_down: bool,

    /// View rotation - Some if the middle button is held and the mouse moved
    rotate_view: Option<(f64, f64)>,

    /// Block type chosen this frame
    select_block: Option<BlockType>,

    /// Edit requested this frame, at the cursor pixel
    edit: Option<(EditAction, u32, u32)>,
}

const BLOCK_KEYS: [(KeyCode, u8); 3] = [
    (KeyCode::Digit1, 1),
    (KeyCode::Digit2, 2),
    (KeyCode::Digit3, 3),
];

impl PlayerAction {
    /// Translates the processed input state into player actions.
    fn from_input(input: &ProcessedInputState) -> Self {
        let mut player_action = PlayerAction::default();

        player_action.move_forward = input.get_key_state(KeyCode::KeyW).is_active()
            || input.get_key_state(KeyCode::ArrowUp).is_active();
        player_action.move_backward = input.get_key_state(KeyCode::KeyS).is_active()
            || input.get_key_state(KeyCode::ArrowDown).is_active();
        player_action.move_left = input.get_key_state(KeyCode::KeyA).is_active()
            || input.get_key_state(KeyCode::ArrowLeft).is_active();
        player_action.move_right = input.get_key_state(KeyCode::KeyD).is_active()
            || input.get_key_state(KeyCode::ArrowRight).is_active();
        player_action.move_up = input.get_key_state(KeyCode::Space).is_active();
        player_action.move_down = input.get_key_state(KeyCode::ShiftLeft).is_active();

        if input.get_mouse_delta().is_some()
            && input.get_mouse_button_state(MouseButton::Middle).is_active()
        {
            player_action.rotate_view = input.mouse_delta;
        }

        player_action.select_block = BLOCK_KEYS
            .iter()
            .filter(|(key, _)| input.get_key_state(*key).is_just_pressed())
            .find_map(|(_, digit)| BlockType::from_digit(*digit));

        if let Some((x, y)) = input.get_cursor_position() {
            let (x, y) = (x.max(0.0) as u32, y.max(0.0) as u32);
            if input.get_mouse_button_state(MouseButton::Left).is_just_pressed() {
                player_action.edit = Some((EditAction::Break, x, y));
            } else if input.get_mouse_button_state(MouseButton::Right).is_just_pressed() {
                player_action.edit = Some((EditAction::Build, x, y));
            }
        }

        player_action
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, collections::HashMap};

    use anyhow::anyhow;

    use crate::application_state::input_state::RawInputState;

    use super::*;

    fn input(
        keys: &[(KeyCode, RawInputState)],
        buttons: &[(MouseButton, RawInputState)],
        mouse_delta: Option<(f64, f64)>,
        cursor_position: Option<(f64, f64)>,
    ) -> ProcessedInputState {
        ProcessedInputState {
            keyboard_states: keys.iter().copied().collect::<HashMap<_, _>>(),
            mouse_button_states: buttons.iter().copied().collect::<HashMap<_, _>>(),
            mouse_delta,
            cursor_position,
        }
    }

    #[test]
    fn keys_and_arrows_map_to_movement() {
        let actions = PlayerAction::from_input(&input(
            &[
                (KeyCode::ArrowUp, RawInputState::Held),
                (KeyCode::KeyD, RawInputState::Pressed),
                (KeyCode::ArrowLeft, RawInputState::Held),
                (KeyCode::Space, RawInputState::Released),
            ],
            &[],
            None,
            None,
        ));

        assert!(actions.move_forward);
        assert!(actions.move_right);
        assert!(actions.move_left);
        assert!(!actions.move_up);
        assert!(!actions.move_backward);
    }

    #[test]
    fn mouse_look_needs_middle_button() {
        let without = PlayerAction::from_input(&input(&[], &[], Some((3.0, 4.0)), None));
        assert_eq!(without.rotate_view, None);

        let with = PlayerAction::from_input(&input(
            &[],
            &[(MouseButton::Middle, RawInputState::Held)],
            Some((3.0, 4.0)),
            None,
        ));
        assert_eq!(with.rotate_view, Some((3.0, 4.0)));
    }

    #[test]
    fn digits_select_block_types_on_press_only() {
        let pressed = PlayerAction::from_input(&input(
            &[(KeyCode::Digit2, RawInputState::Pressed)],
            &[],
            None,
            None,
        ));
        assert_eq!(pressed.select_block, Some(BlockType::IRON));

        let held = PlayerAction::from_input(&input(
            &[(KeyCode::Digit1, RawInputState::Held)],
            &[],
            None,
            None,
        ));
        assert_eq!(held.select_block, None);
    }

    #[test]
    fn clicks_request_edits_at_the_cursor() {
        let left = PlayerAction::from_input(&input(
            &[],
            &[(MouseButton::Left, RawInputState::Pressed)],
            None,
            Some((120.7, 64.2)),
        ));
        assert_eq!(left.edit, Some((EditAction::Break, 120, 64)));

        let right = PlayerAction::from_input(&input(
            &[],
            &[(MouseButton::Right, RawInputState::Pressed)],
            None,
            Some((5.0, 6.0)),
        ));
        assert_eq!(right.edit, Some((EditAction::Build, 5, 6)));
    }

    #[test]
    fn held_click_or_unknown_cursor_requests_nothing() {
        let held = PlayerAction::from_input(&input(
            &[],
            &[(MouseButton::Left, RawInputState::Held)],
            None,
            Some((1.0, 1.0)),
        ));
        assert_eq!(held.edit, None);

        let no_cursor = PlayerAction::from_input(&input(
            &[],
            &[(MouseButton::Left, RawInputState::Pressed)],
            None,
            None,
        ));
        assert_eq!(no_cursor.edit, None);
    }

    #[test]
    fn click_during_pending_pick_starts_no_second_pick() {
        let mut pending = PendingPick::default();
        let renders = Cell::new(0);
        let render = || {
            renders.set(renders.get() + 1);
            Ok(true)
        };

        assert!(pending.request(EditAction::Break, render));
        assert!(!pending.request(EditAction::Build, render));
        assert_eq!(renders.get(), 1);
        assert_eq!(pending.action, Some(EditAction::Break));
    }

    #[test]
    fn pending_pick_resolves_once_with_its_own_action() {
        let mut pending = PendingPick::default();
        assert!(pending.resolve(|| panic!("nothing to poll")).is_none());

        pending.request(EditAction::Build, || Ok(true));
        assert!(pending.resolve(|| None).is_none());
        assert_eq!(pending.action, Some(EditAction::Build));

        let (action, face_id) = pending.resolve(|| Some(Ok(42))).unwrap();
        assert_eq!(action, EditAction::Build);
        assert_eq!(face_id.unwrap(), 42);
        assert_eq!(pending.action, None);
    }

    #[test]
    fn busy_or_failed_pick_pass_leaves_nothing_pending() {
        let mut pending = PendingPick::default();
        assert!(!pending.request(EditAction::Break, || Ok(false)));
        assert_eq!(pending.action, None);

        assert!(!pending.request(EditAction::Break, || Err(anyhow!("no staging buffer"))));
        assert_eq!(pending.action, None);

        assert!(pending.request(EditAction::Break, || Ok(true)));
    }
}
