//! # Graphics Resources Builder
//!
//! Creates the window, the wgpu context and the render pipelines.
//!
//! The main components are:
//! - `Graphics`: Holds all graphics-related resources
//! - `GraphicsBuilder`: Helper for asynchronous graphics initialization
//! - `MaybeGraphics`: Represents the various states of graphics initialization

use std::future::Future;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use log::{error, info};
use wgpu::{Device, Queue, Surface, SurfaceConfiguration};
use winit::{
    event_loop::{ActiveEventLoop, EventLoopProxy},
    window::Window,
};

#[cfg(target_family = "wasm")]
use crate::CANVAS_ID;
use crate::engine_state::rendering::pipeline_manager::PipelineManager;

use super::{atlas_loader, EngineEvent};

/// The graphics resources the engine is created from.
pub struct Graphics {
    pub window: Arc<Window>,
    pub surface: Surface<'static>,
    pub surface_config: SurfaceConfiguration,
    pub device: Device,
    pub queue: Queue,
    pub pipelines: PipelineManager,
    /// `false` on the web until the canvas reports a usable size
    pub is_surface_configured: bool,
}

/// Asynchronously creates and initializes all required graphics resources.
///
/// The window and surface are created up front on the event loop. Adapter,
/// device and pipeline creation happen in the returned future.
///
/// # Returns
/// A future resolving to the graphics, or to the reason they could not be
/// created.
fn create_graphics(
    event_loop: &ActiveEventLoop,
) -> impl Future<Output = anyhow::Result<Graphics>> + 'static {
    let setup = create_window_and_surface(event_loop);

    async move {
        let (window, instance, surface) = setup?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No compatible graphics adapter")?;
        info!("Using adapter {:?}", adapter.get_info());

        let required_limits = if cfg!(target_family = "wasm") {
            wgpu::Limits::downlevel_webgl2_defaults().using_resolution(adapter.limits())
        } else {
            wgpu::Limits::default()
        };

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                required_features: wgpu::Features::empty(),
                required_limits,
                label: None,
                memory_hints: wgpu::MemoryHints::MemoryUsage,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("Failed to create graphics device")?;

        let size = window.inner_size();

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or_else(|| anyhow!("Surface reports no supported formats"))?;
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let pipelines = PipelineManager::create(&device, surface_format).await?;

        // The canvas has no size yet on the web; the first resize configures it.
        let is_surface_configured = size.width > 0 && size.height > 0 && cfg!(not(target_family = "wasm"));
        if is_surface_configured {
            surface.configure(&device, &surface_config);
        }

        Ok(Graphics {
            window,
            surface,
            surface_config,
            device,
            queue,
            pipelines,
            is_surface_configured,
        })
    }
}

fn create_window_and_surface(
    event_loop: &ActiveEventLoop,
) -> anyhow::Result<(Arc<Window>, wgpu::Instance, Surface<'static>)> {
    #[allow(unused_mut)]
    let mut window_attrs = Window::default_attributes().with_title("Voxel Builder");

    #[cfg(target_family = "wasm")]
    {
        use web_sys::wasm_bindgen::JsCast;
        use winit::platform::web::WindowAttributesExtWebSys;

        let canvas = web_sys::window()
            .and_then(|window| window.document())
            .and_then(|document| document.get_element_by_id(CANVAS_ID))
            .ok_or_else(|| anyhow!("No canvas with id '{CANVAS_ID}'"))?;
        window_attrs = window_attrs.with_canvas(Some(canvas.unchecked_into()));
    }

    let window = Arc::new(
        event_loop
            .create_window(window_attrs)
            .context("Failed to create window")?,
    );

    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        #[cfg(not(target_family = "wasm"))]
        backends: wgpu::Backends::PRIMARY,
        #[cfg(target_family = "wasm")]
        backends: wgpu::Backends::GL | wgpu::Backends::BROWSER_WEBGPU,
        flags: wgpu::InstanceFlags::empty(),
        backend_options: wgpu::BackendOptions::from_env_or_default(),
    });

    let surface = instance
        .create_surface(window.clone())
        .context("Failed to create surface")?;

    Ok((window, instance, surface))
}

/// Helper for the asynchronous initialization of graphics resources.
pub struct GraphicsBuilder {
    event_loop_proxy: Option<EventLoopProxy<EngineEvent>>,
}

/// Represents the possible states of the graphics initialization process.
pub enum MaybeGraphics {
    /// State during asynchronous graphics initialization
    Builder(GraphicsBuilder),

    /// State when graphics resources are ready but the engine is not yet built
    Graphics(Graphics),

    /// State after graphics resources have been moved to the engine
    Moved,
}

impl GraphicsBuilder {
    /// Creates a new GraphicsBuilder with the specified event loop proxy.
    ///
    /// # Arguments
    /// * `event_loop_proxy` - Used to send the graphics and the atlas back to the event loop
    pub fn new(event_loop_proxy: EventLoopProxy<EngineEvent>) -> Self {
        Self {
            event_loop_proxy: Some(event_loop_proxy),
        }
    }

    /// Starts graphics initialization and the atlas load.
    ///
    /// Both results come back as `EngineEvent`s. Later calls do nothing.
    pub fn build_and_send(&mut self, event_loop: &ActiveEventLoop) {
        let Some(event_loop_proxy) = self.event_loop_proxy.take() else {
            // event_loop_proxy is already spent - we already constructed Graphics
            return;
        };

        atlas_loader::spawn_atlas_load(event_loop_proxy.clone());

        #[cfg(target_family = "wasm")]
        {
            let gfx_fut = create_graphics(event_loop);
            wasm_bindgen_futures::spawn_local(async move {
                send_graphics(&event_loop_proxy, gfx_fut.await);
            });
        }

        #[cfg(not(target_family = "wasm"))]
        {
            let gfx = pollster::block_on(create_graphics(event_loop));
            send_graphics(&event_loop_proxy, gfx);
        }
    }
}

fn send_graphics(event_loop_proxy: &EventLoopProxy<EngineEvent>, gfx: anyhow::Result<Graphics>) {
    let event = match gfx {
        Ok(graphics) => EngineEvent::GraphicsReady(graphics),
        Err(err) => EngineEvent::GraphicsFailed(err),
    };
    if event_loop_proxy.send_event(event).is_err() {
        error!("Event loop closed before graphics were delivered");
    }
}
