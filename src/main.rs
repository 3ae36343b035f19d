//! # Voxel Builder Entry Point
//!
//! The native entry point. It calls into the library's `run()` function.
//!
//! For web applications, see the `run_web()` function in the library.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo run --release
//! ```

fn main() {
    #[cfg(not(target_family = "wasm"))]
    voxel_builder::run();
}
