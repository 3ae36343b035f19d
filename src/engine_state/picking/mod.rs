//! # Picking
//!
//! Identifies the voxel face under the cursor. Every face is drawn in a flat
//! color that encodes its id into an off-screen target, one pixel is copied back
//! and the color is decoded into the id again.
//!
//! - `unique_id`: face id to color codec
//! - `picker`: off-screen target and readback

pub mod picker;
pub mod unique_id;

pub use picker::GpuPicker;
pub use unique_id::{ChannelBits, ColorIdCodec};
