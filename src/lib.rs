#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel Builder
//!
//! A small voxel building toy rendered with WGPU, on native and on the web
//! (WebAssembly, WebGL2).
//!
//! A square grid of voxel stacks is randomized with mountains and ridges at
//! startup. Left click breaks the voxel under the cursor, right click builds
//! one against the clicked face, and the number keys choose the block type.
//! The voxel under the cursor is found with an off-screen pick pass that draws
//! every face in a color encoding its id.
//!
//! ## Key Modules
//!
//! * `application_state` - Window, graphics setup, input and the event loop
//! * `config` - Startup settings
//! * `core` - Shared single-threaded system handles
//! * `engine_state` - The grid, the camera and both render passes
//!
//! ## Usage
//!
//! ```ignore
//! // Native application initialization
//! fn main() {
//!     voxel_builder::run();
//! }
//! ```
//!
//! For web applications:
//!
//! ```ignore
//! // Called from JavaScript
//! #[wasm_bindgen]
//! pub fn start() {
//!     voxel_builder::run_web();
//! }
//! ```

use application_state::{ApplicationState, EngineEvent};
#[cfg(target_family = "wasm")]
use wasm_bindgen::prelude::wasm_bindgen;

use winit::event_loop::EventLoop;

#[cfg(not(target_family = "wasm"))]
use log::{error, info};

mod application_state;
mod config;
mod core;
mod engine_state;

/// Id of the canvas element the web build draws into.
#[cfg(target_family = "wasm")]
const CANVAS_ID: &str = "wgpu-canvas";

/// Starts the native application and blocks until the window is closed.
///
/// Logging goes to stdout, filtered by `RUST_LOG`.
#[cfg(not(target_family = "wasm"))]
pub fn run() {
    let mut log_builder = env_logger::Builder::new();
    log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .init();

    info!("Logger initialized");
    let config = config::EngineConfig::load();

    let event_loop = match EventLoop::<EngineEvent>::with_user_event().build() {
        Ok(event_loop) => event_loop,
        Err(err) => {
            error!("Failed to create event loop: {err}");
            return;
        }
    };

    let mut state = ApplicationState::new(event_loop.create_proxy(), config);

    if let Err(err) = event_loop.run_app(&mut state) {
        error!("Event loop exited with an error: {err}");
    }
}

/// Starts the web application on the page's `wgpu-canvas` element.
#[cfg(target_family = "wasm")]
#[wasm_bindgen]
pub fn run_web() {
    use winit::platform::web::EventLoopExtWebSys;

    std::panic::set_hook(Box::new(console_error_panic_hook::hook));
    if console_log::init_with_level(log::Level::Info).is_ok() {
        log::info!("Logger initialized");
    }

    let event_loop = match EventLoop::<EngineEvent>::with_user_event().build() {
        Ok(event_loop) => event_loop,
        Err(err) => {
            log::error!("Failed to create event loop: {err}");
            return;
        }
    };

    let state = ApplicationState::new(event_loop.create_proxy(), config::EngineConfig::default());

    event_loop.spawn_app(state);
}
