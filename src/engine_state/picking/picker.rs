//! Off-screen pick target and one-pixel readback.

use std::sync::{
    atomic::{AtomicU8, Ordering},
    Arc,
};

use anyhow::{anyhow, bail};
use log::warn;

use crate::{
    core::StSystem,
    engine_state::{buffer_state::BufferState, rendering::texture::Texture},
};

/// Name of the buffer the picked pixel is copied into.
pub const PICK_STAGING_BUFFER_NAME: &str = "pick_staging_buffer";

/// Format of the pick target. Must round-trip channel values exactly.
pub const PICK_TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

const IDLE: u8 = 0;
const MAPPING: u8 = 1;
const READY: u8 = 2;
const FAILED: u8 = 3;

/// Where the staging buffer's readback stands. Shared with the `map_async`
/// callback, which settles it.
///
/// Moves IDLE -> MAPPING on `begin`, MAPPING -> READY or FAILED on `settle`,
/// and back to IDLE when the result is taken.
#[derive(Clone, Debug, Default)]
pub struct PickReadback {
    state: Arc<AtomicU8>,
}

/// A settled readback, as handed out by [`PickReadback::take`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReadbackOutcome {
    Mapped,
    Failed,
}

impl PickReadback {
    pub fn is_busy(&self) -> bool {
        self.state.load(Ordering::Acquire) != IDLE
    }

    /// Claims the readback. Fails if one is already in flight or untaken.
    pub fn begin(&self) -> anyhow::Result<()> {
        if self
            .state
            .compare_exchange(IDLE, MAPPING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            bail!("A pick readback is already in flight");
        }
        Ok(())
    }

    /// Records the mapping result.
    pub fn settle(&self, mapped: bool) {
        let state = if mapped { READY } else { FAILED };
        // A late callback after `cancel` leaves the state alone.
        let _ = self
            .state
            .compare_exchange(MAPPING, state, Ordering::AcqRel, Ordering::Acquire);
    }

    /// Releases a claim whose mapping never started.
    pub fn cancel(&self) {
        self.state.store(IDLE, Ordering::Release);
    }

    /// Takes the settled result and returns to IDLE. `None` while mapping or idle.
    pub fn take(&self) -> Option<ReadbackOutcome> {
        let outcome = match self.state.load(Ordering::Acquire) {
            READY => ReadbackOutcome::Mapped,
            FAILED => ReadbackOutcome::Failed,
            _ => return None,
        };
        self.state.store(IDLE, Ordering::Release);
        Some(outcome)
    }
}

/// Owns the pick color target, its depth buffer and the readback state.
///
/// At most one readback is in flight. `is_busy` reports whether a pixel has
/// been requested and not yet taken.
pub struct GpuPicker {
    pub id_texture_view: wgpu::TextureView,
    id_texture: wgpu::Texture,
    pub depth_texture: Texture,
    buffer_state: StSystem<BufferState>,
    readback: PickReadback,
    width: u32,
    height: u32,
}

impl GpuPicker {
    pub fn new(
        device: &wgpu::Device,
        buffer_state: StSystem<BufferState>,
        width: u32,
        height: u32,
    ) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let (id_texture, id_texture_view) = Self::create_target(device, width, height);

        // `bytes_per_row` of a texture copy must be 256-byte aligned even for a
        // single pixel, so the staging buffer holds one full aligned row.
        buffer_state.get_mut().create_buffer(
            PICK_STAGING_BUFFER_NAME,
            &wgpu::BufferDescriptor {
                label: Some(PICK_STAGING_BUFFER_NAME),
                size: wgpu::COPY_BYTES_PER_ROW_ALIGNMENT as u64,
                usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                mapped_at_creation: false,
            },
        );

        Self {
            id_texture_view,
            id_texture,
            depth_texture: Texture::create_depth_texture(device, width, height, "Pick Depth Texture"),
            buffer_state,
            readback: PickReadback::default(),
            width,
            height,
        }
    }

    /// Recreates the target at a new size.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        let width = width.max(1);
        let height = height.max(1);
        if self.width == width && self.height == height {
            return;
        }

        self.width = width;
        self.height = height;
        (self.id_texture, self.id_texture_view) = Self::create_target(device, width, height);
        self.depth_texture = Texture::create_depth_texture(device, width, height, "Pick Depth Texture");
    }

    pub fn is_busy(&self) -> bool {
        self.readback.is_busy()
    }

    /// Copies the pixel at `(x, y)` of the pick target into the staging buffer.
    /// Coordinates past the edge are clamped.
    pub fn encode_read_pixel(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        x: u32,
        y: u32,
    ) -> anyhow::Result<()> {
        let x = x.min(self.width - 1);
        let y = y.min(self.height - 1);

        let buffer_state = self.buffer_state.get();
        let staging = buffer_state
            .get_buffer(PICK_STAGING_BUFFER_NAME)
            .ok_or_else(|| anyhow!("Pick staging buffer is missing"))?;

        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.id_texture,
                mip_level: 0,
                origin: wgpu::Origin3d { x, y, z: 0 },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT),
                    rows_per_image: Some(1),
                },
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }

    /// Starts mapping the staging buffer. Must follow the submit that performed
    /// the copy.
    pub fn begin_readback(&self) -> anyhow::Result<()> {
        self.readback.begin()?;

        let readback = self.readback.clone();
        let mapped = self.buffer_state.get().map_async(
            PICK_STAGING_BUFFER_NAME,
            wgpu::MapMode::Read,
            move |result| {
                if let Err(err) = &result {
                    warn!("Pick readback failed to map: {err}");
                }
                readback.settle(result.is_ok());
            },
        );

        if mapped.is_err() {
            self.readback.cancel();
        }
        mapped
    }

    /// Takes the picked pixel once the mapping has settled.
    ///
    /// # Returns
    /// `None` while the readback is still pending or none was requested.
    pub fn take_pixel(&self) -> Option<anyhow::Result<[u8; 4]>> {
        match self.readback.take()? {
            ReadbackOutcome::Mapped => Some(self.read_mapped()),
            ReadbackOutcome::Failed => Some(Err(anyhow!("Pick readback could not be mapped"))),
        }
    }

    fn read_mapped(&self) -> anyhow::Result<[u8; 4]> {
        let buffer_state = self.buffer_state.get();
        let staging = buffer_state
            .get_buffer(PICK_STAGING_BUFFER_NAME)
            .ok_or_else(|| anyhow!("Pick staging buffer is missing"))?;

        let pixel = {
            let data = staging.slice(..).get_mapped_range();
            let mut pixel = [0u8; 4];
            pixel.copy_from_slice(&data[..4]);
            pixel
        };
        staging.unmap();
        Ok(pixel)
    }

    fn create_target(device: &wgpu::Device, width: u32, height: u32) -> (wgpu::Texture, wgpu::TextureView) {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Pick ID Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: PICK_TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        (texture, view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_begin_is_rejected_while_mapping() {
        let readback = PickReadback::default();
        assert!(!readback.is_busy());

        readback.begin().unwrap();
        assert!(readback.is_busy());
        assert!(readback.begin().is_err());
        assert_eq!(readback.take(), None);
    }

    #[test]
    fn mapped_result_is_taken_once() {
        let readback = PickReadback::default();
        readback.begin().unwrap();
        readback.clone().settle(true);

        assert_eq!(readback.take(), Some(ReadbackOutcome::Mapped));
        assert!(!readback.is_busy());
        assert_eq!(readback.take(), None);
        readback.begin().unwrap();
    }

    #[test]
    fn failed_mapping_is_reported_then_idle() {
        let readback = PickReadback::default();
        readback.begin().unwrap();
        readback.settle(false);
        assert!(readback.is_busy());
        assert!(readback.begin().is_err());

        assert_eq!(readback.take(), Some(ReadbackOutcome::Failed));
        assert!(!readback.is_busy());
    }

    #[test]
    fn cancel_frees_the_claim_and_ignores_a_late_settle() {
        let readback = PickReadback::default();
        readback.begin().unwrap();
        readback.cancel();
        readback.settle(true);

        assert!(!readback.is_busy());
        assert_eq!(readback.take(), None);
    }
}
