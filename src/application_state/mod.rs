//! # Application State Management
//!
//! This module handles the application's state management, including:
//! - Window and graphics initialization
//! - Input handling
//! - Application lifecycle events
//! - State transitions between initialization and running states

pub mod atlas_loader;
pub mod graphics_resources_builder;
pub mod input_manager;
pub mod input_state;

use std::sync::Arc;

use graphics_resources_builder::{Graphics, GraphicsBuilder, MaybeGraphics};
use input_manager::InputManager;
use log::{error, warn};

use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoopProxy},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::{
    config::EngineConfig,
    engine_state::{rendering::atlas::AtlasImage, EngineState},
};

/// Results of the asynchronous startup work, delivered through the event loop.
pub enum EngineEvent {
    GraphicsReady(Graphics),
    /// Fatal: the window, surface, adapter, device or pipelines could not be created.
    GraphicsFailed(anyhow::Error),
    AtlasLoaded(AtlasImage),
    AtlasFailed(anyhow::Error),
}

/// The main application state container that manages the application's lifecycle.
pub struct ApplicationState {
    /// The current graphics state, which may be initializing, ready or moved
    pub graphics: MaybeGraphics,

    /// The initialized application state, if the application has started
    pub state: Option<InitializedApplicationState>,

    /// Cached window size for web platforms during initialization
    pub web_window_size: Option<PhysicalSize<u32>>,

    config: EngineConfig,

    /// Atlas that arrived before the engine was built
    pending_atlas: Option<AtlasImage>,
}

/// Represents the fully initialized and running state of the application.
pub struct InitializedApplicationState {
    /// The engine state and logic
    pub engine_state: EngineState,

    /// Handle to the application window
    pub window: Arc<Window>,

    /// Manages input state and event processing
    pub input_manager: InputManager,

    /// Timestamp of the last frame for delta time calculations
    pub last_wait_time: web_time::Instant,
}

impl ApplicationState {
    pub fn new(event_loop_proxy: EventLoopProxy<EngineEvent>, config: EngineConfig) -> Self {
        Self {
            graphics: MaybeGraphics::Builder(GraphicsBuilder::new(event_loop_proxy)),
            state: None,
            web_window_size: None,
            config,
            pending_atlas: None,
        }
    }

    /// Handles window resize events during the initialization phase.
    ///
    /// Configures the surface once the window has a usable size and builds the
    /// engine.
    fn resized(&mut self, event_loop: &ActiveEventLoop, size: PhysicalSize<u32>) {
        let MaybeGraphics::Graphics(gfx) = &mut self.graphics else {
            return;
        };
        if size.width == 0 || size.height == 0 {
            return;
        }

        gfx.surface_config.width = size.width;
        gfx.surface_config.height = size.height;
        gfx.surface.configure(&gfx.device, &gfx.surface_config);
        gfx.is_surface_configured = true;
        self.initialize_application_state(event_loop);
    }

    /// Moves the graphics resources into a new engine.
    ///
    /// An engine that fails to start is fatal and ends the event loop.
    fn initialize_application_state(&mut self, event_loop: &ActiveEventLoop) {
        let MaybeGraphics::Graphics(_) = &self.graphics else {
            return;
        };
        let MaybeGraphics::Graphics(gfx) = std::mem::replace(&mut self.graphics, MaybeGraphics::Moved)
        else {
            return;
        };

        let Graphics {
            window,
            surface,
            surface_config,
            device,
            queue,
            pipelines,
            ..
        } = gfx;

        match EngineState::new(surface, surface_config, device, queue, pipelines, &self.config) {
            Ok(mut engine_state) => {
                if let Some(atlas) = self.pending_atlas.take() {
                    engine_state.set_atlas(&atlas);
                }
                window.request_redraw();
                self.state = Some(InitializedApplicationState {
                    engine_state,
                    window,
                    input_manager: InputManager::new(),
                    last_wait_time: web_time::Instant::now(),
                });
            }
            Err(err) => {
                error!("Failed to start engine: {err:#}");
                event_loop.exit();
            }
        }
    }
}

fn is_exit_request(event: &WindowEvent) -> bool {
    matches!(
        event,
        WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event: KeyEvent {
                    state: ElementState::Pressed,
                    physical_key: PhysicalKey::Code(KeyCode::Escape),
                    ..
                },
                ..
            }
    )
}

impl ApplicationHandler<EngineEvent> for ApplicationState {
    /// Handles window-related events such as resize, focus changes, and input events.
    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if is_exit_request(&event) {
            event_loop.exit();
            return;
        }

        if let Some(state) = &mut self.state {
            let input_manager = &mut state.input_manager;
            let engine_state = &mut state.engine_state;

            input_manager.intake_input(&event);

            match event {
                WindowEvent::Resized(size) => {
                    engine_state.resize_surface(size);
                }
                WindowEvent::Focused(is_focused) => {
                    if !is_focused {
                        input_manager.release_all();
                    }
                }
                WindowEvent::RedrawRequested => {
                    engine_state.render();
                }
                _ => (),
            }
        } else if let WindowEvent::Resized(size) = event {
            self.web_window_size = Some(size);
            self.resized(event_loop, size);
        }
    }

    /// Handles raw mouse motion, used for mouse look.
    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if let Some(state) = &mut self.state {
            if let DeviceEvent::MouseMotion { delta } = event {
                state.input_manager.intake_mouse_motion(delta);
            }
        }
    }

    /// Triggers graphics initialization and the atlas load on first resume.
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let MaybeGraphics::Builder(builder) = &mut self.graphics {
            builder.build_and_send(event_loop);
        }
    }

    /// Handles the results of the asynchronous startup work.
    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: EngineEvent) {
        match event {
            EngineEvent::GraphicsReady(graphics) => {
                let is_surface_configured = graphics.is_surface_configured;

                self.graphics = MaybeGraphics::Graphics(graphics);

                if is_surface_configured {
                    self.initialize_application_state(event_loop);
                } else if let Some(size) = self.web_window_size {
                    self.resized(event_loop, size);
                }
            }
            EngineEvent::GraphicsFailed(err) => {
                error!("Failed to initialize graphics: {err:#}");
                event_loop.exit();
            }
            EngineEvent::AtlasLoaded(atlas) => match &mut self.state {
                Some(state) => state.engine_state.set_atlas(&atlas),
                None => self.pending_atlas = Some(atlas),
            },
            EngineEvent::AtlasFailed(err) => {
                warn!("Failed to load block atlas, keeping placeholder: {err:#}");
            }
        }
    }

    /// Called before the event loop goes to sleep.
    ///
    /// Hands the frame's input to the engine, advances the camera and edits,
    /// and requests the next redraw.
    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &mut self.state {
            let now = web_time::Instant::now();
            let wait_dt = now - state.last_wait_time;

            let processed_input = state.input_manager.get_and_reset_processed_input();
            state.engine_state.set_input_commands(processed_input);
            state.engine_state.process_input(wait_dt);

            state.last_wait_time = now;

            state.window.request_redraw();
        }
    }
}
