//! # Core Module
//!
//! Shared-ownership primitives used across the engine. Everything runs on the
//! event-loop thread, so handles are single-threaded.
//!
//! ## Key Components
//! - `StSystem`: Single-threaded shared handle with interior mutability

pub mod st_system;

pub use st_system::StSystem;
