//! # Buffer State Module
//!
//! This module provides a centralized registry for the GPU buffers the engine uses:
//! the camera uniform, the per-pass vertex buffers, the shared cube index buffer and
//! the pick readback buffer.
//!
//! ## Key Features
//!
//! * Buffers referenced by name
//! * Re-upload that reuses a buffer while the new contents still fit
//! * Memory tracking per buffer
//! * Asynchronous mapping for readback

use std::collections::HashMap;

use anyhow::{anyhow, ensure};
use log::debug;
use wgpu::{util::DeviceExt, Buffer, BufferAsyncError, Device, MapMode, Queue, WasmNotSend};

use crate::core::StSystem;

/// Memory tracking for one buffer.
#[derive(Debug)]
struct BufferAnalytics {
    /// Total memory allocated for the buffer in bytes
    allocated_memory: u64,
    /// Bytes written so far (high-water mark)
    used_memory: u64,
}

/// Central registry of named GPU buffers.
///
/// # Examples
///
/// ```ignore
/// let mut buffer_state = BufferState::new(device, queue);
///
/// buffer_state.create_buffer_init(
///     "vertex_buffer",
///     wgpu::util::BufferInitDescriptor {
///         label: Some("Vertex Buffer"),
///         contents: bytemuck::cast_slice(&vertices),
///         usage: wgpu::BufferUsages::VERTEX,
///     },
/// );
///
/// let vertex_buffer = buffer_state.get_buffer("vertex_buffer");
/// ```
pub struct BufferState {
    pub device: StSystem<Device>,
    pub queue: StSystem<Queue>,
    buffers: HashMap<&'static str, Buffer>,
    buffer_analytics: HashMap<&'static str, BufferAnalytics>,
}

impl BufferState {
    pub fn new(device: StSystem<Device>, queue: StSystem<Queue>) -> Self {
        Self {
            device,
            queue,
            buffers: HashMap::new(),
            buffer_analytics: HashMap::new(),
        }
    }

    /// Creates an empty buffer with the specified descriptor, replacing any buffer
    /// already registered under `buffer_name`.
    pub fn create_buffer(
        &mut self,
        buffer_name: &'static str,
        buffer_descriptor: &wgpu::BufferDescriptor,
    ) {
        let buffer = self.device.get().create_buffer(buffer_descriptor);
        self.insert(buffer_name, buffer, buffer_descriptor.size, 0);
    }

    /// Creates a buffer initialized with data.
    pub fn create_buffer_init(
        &mut self,
        buffer_name: &'static str,
        init_descriptor: wgpu::util::BufferInitDescriptor,
    ) {
        let size = init_descriptor.contents.len() as u64;
        let buffer = self.device.get().create_buffer_init(&init_descriptor);
        self.insert(buffer_name, buffer, size, size);
    }

    /// Uploads `data` to the named buffer.
    ///
    /// The existing buffer is written in place when it is large enough, otherwise
    /// a new one is created with `usage | COPY_DST`. Empty uploads are ignored.
    pub fn upload(
        &mut self,
        buffer_name: &'static str,
        usage: wgpu::BufferUsages,
        data: &[u8],
    ) -> anyhow::Result<()> {
        if data.is_empty() {
            return Ok(());
        }

        let fits = self
            .buffer_analytics
            .get(buffer_name)
            .is_some_and(|analytics| analytics.allocated_memory >= data.len() as u64);

        if fits {
            self.write_buffer(buffer_name, 0, data)
        } else {
            debug!("Allocating {} bytes for {buffer_name}", data.len());
            self.create_buffer_init(
                buffer_name,
                wgpu::util::BufferInitDescriptor {
                    label: Some(buffer_name),
                    contents: data,
                    usage: usage | wgpu::BufferUsages::COPY_DST,
                },
            );
            Ok(())
        }
    }

    /// Writes raw bytes into a buffer through the queue.
    ///
    /// # Returns
    /// An error if the buffer does not exist or the write would run past its end.
    pub fn write_buffer(
        &mut self,
        buffer_name: &'static str,
        offset: wgpu::BufferAddress,
        data: &[u8],
    ) -> anyhow::Result<()> {
        let buffer = self
            .buffers
            .get(buffer_name)
            .ok_or_else(|| anyhow!("No buffer named '{buffer_name}'"))?;
        let analytics = self
            .buffer_analytics
            .get_mut(buffer_name)
            .ok_or_else(|| anyhow!("No analytics for buffer '{buffer_name}'"))?;

        let end = offset + data.len() as u64;
        ensure!(
            end <= analytics.allocated_memory,
            "Buffer write out of bounds for buffer name '{buffer_name}'"
        );

        self.queue.get().write_buffer(buffer, offset, data);
        analytics.used_memory = analytics.used_memory.max(end);
        Ok(())
    }

    /// Maps a whole buffer asynchronously. `callback` runs once the mapping
    /// settles, which on native requires the device to be polled.
    pub fn map_async(
        &self,
        buffer_name: &'static str,
        mode: MapMode,
        callback: impl FnOnce(Result<(), BufferAsyncError>) + WasmNotSend + 'static,
    ) -> anyhow::Result<()> {
        let buffer = self
            .get_buffer(buffer_name)
            .ok_or_else(|| anyhow!("No buffer named '{buffer_name}'"))?;
        buffer.slice(..).map_async(mode, callback);
        Ok(())
    }

    pub fn get_buffer(&self, buffer_name: &'static str) -> Option<&Buffer> {
        self.buffers.get(buffer_name)
    }

    /// Binding resource covering the whole named buffer.
    pub fn get_entire_binding(&self, buffer_name: &'static str) -> Option<wgpu::BindingResource<'_>> {
        self.buffers
            .get(buffer_name)
            .map(Buffer::as_entire_binding)
    }

    /// Total allocated memory across all buffers, in bytes.
    pub fn get_total_allocated_memory(&self) -> u64 {
        self.buffer_analytics
            .values()
            .map(|analytics| analytics.allocated_memory)
            .sum()
    }

    /// Total used memory across all buffers, in bytes.
    pub fn get_total_used_memory(&self) -> u64 {
        self.buffer_analytics
            .values()
            .map(|analytics| analytics.used_memory)
            .sum()
    }

    fn insert(&mut self, buffer_name: &'static str, buffer: Buffer, allocated: u64, used: u64) {
        self.buffers.insert(buffer_name, buffer);
        self.buffer_analytics.insert(
            buffer_name,
            BufferAnalytics {
                allocated_memory: allocated,
                used_memory: used,
            },
        );
    }
}
