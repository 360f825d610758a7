//! Window, event pumping and the per-frame call sequence.
//!
//! The caller drives the loop:
//!
//! ```no_run
//! # fn main() -> anyhow::Result<()> {
//! let mut engine = spark_ngin::Engine::new(spark_ngin::EngineConfig::default())?;
//! while engine.run() {
//!     engine.poll_events();
//!     if engine.begin_scene() {
//!         engine.draw_objects();
//!         engine.render_overlay();
//!         engine.end_scene();
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Unlike a callback-driven winit application the loop is owned by the
//! caller; winit events are drained with `pump_app_events` in
//! [`Engine::poll_events`] and handed out raw by [`Engine::take_events`].

use std::{iter, sync::Arc, time::Duration};

use anyhow::bail;
use instant::Instant;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    platform::pump_events::{EventLoopExtPumpEvents, PumpStatus},
    window::{CursorGrabMode, Window, WindowAttributes, WindowId},
};

use crate::{
    config::EngineConfig, context::Context, render::Renderer, scene::Scene,
};

/// An immediate-mode UI drawn on top of the 3D scene, right before present.
pub trait Overlay {
    fn init(&mut self, ctx: &Context) -> anyhow::Result<()>;

    /// Record the overlay into `encoder`. The colour target is `view` and
    /// already holds the rendered scene.
    fn render(
        &mut self,
        ctx: &Context,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
    );

    fn terminate(&mut self);
}

/// Collects what winit reports between two [`Engine::poll_events`] calls.
struct WindowState {
    attributes: WindowAttributes,
    window: Option<Arc<Window>>,
    create_error: Option<anyhow::Error>,
    events: Vec<WindowEvent>,
    resized: Option<PhysicalSize<u32>>,
    close_requested: bool,
}

impl ApplicationHandler for WindowState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        match event_loop.create_window(self.attributes.clone()) {
            Ok(window) => self.window = Some(Arc::new(window)),
            Err(e) => self.create_error = Some(e.into()),
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match &event {
            WindowEvent::CloseRequested => self.close_requested = true,
            WindowEvent::Resized(size) => self.resized = Some(*size),
            _ => {}
        }
        self.events.push(event);
    }
}

/// A frame between [`Engine::begin_scene`] and [`Engine::end_scene`].
struct Frame {
    surface_texture: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    encoder: wgpu::CommandEncoder,
}

pub struct Engine {
    event_loop: EventLoop<()>,
    state: WindowState,
    ctx: Context,
    scene: Scene,
    renderer: Renderer,
    overlay: Option<Box<dyn Overlay>>,
    frame: Option<Frame>,
    clear_colour: wgpu::Color,
    shadows_active: bool,
    start: Instant,
    last_update: Instant,
}

#[cfg(not(feature = "integration-tests"))]
fn build_event_loop() -> anyhow::Result<EventLoop<()>> {
    Ok(EventLoop::new()?)
}

// Tests run the engine off the main thread.
#[cfg(all(feature = "integration-tests", target_os = "linux"))]
fn build_event_loop() -> anyhow::Result<EventLoop<()>> {
    use winit::platform::wayland::EventLoopBuilderExtWayland;

    Ok(EventLoop::builder().with_any_thread(true).build()?)
}

#[cfg(all(feature = "integration-tests", target_os = "windows"))]
fn build_event_loop() -> anyhow::Result<EventLoop<()>> {
    use winit::platform::windows::EventLoopBuilderExtWindows;

    Ok(EventLoop::builder().with_any_thread(true).build()?)
}

#[cfg(all(
    feature = "integration-tests",
    not(any(target_os = "linux", target_os = "windows"))
))]
fn build_event_loop() -> anyhow::Result<EventLoop<()>> {
    Ok(EventLoop::new()?)
}

impl Engine {
    /// Open the window and set up the GPU. Every error here is fatal.
    pub fn new(config: EngineConfig) -> anyhow::Result<Self> {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };

        let runtime = tokio::runtime::Runtime::new()?;
        let mut event_loop = build_event_loop()?;
        let mut state = WindowState {
            attributes: Window::default_attributes()
                .with_title(config.title.clone())
                .with_inner_size(PhysicalSize::new(config.width, config.height)),
            window: None,
            create_error: None,
            events: Vec::new(),
            resized: None,
            close_requested: false,
        };

        // The window is created in `resumed`, which arrives within the first pumps.
        let mut attempts = 0;
        let window = loop {
            if let PumpStatus::Exit(code) =
                event_loop.pump_app_events(Some(Duration::ZERO), &mut state)
            {
                bail!("event loop exited with code {code} before a window was created");
            }
            if let Some(e) = state.create_error.take() {
                return Err(e.context("creating the window"));
            }
            if let Some(window) = &state.window {
                break window.clone();
            }
            attempts += 1;
            if attempts > 100 {
                bail!("the platform never resumed the application, no window was created");
            }
        };

        let ctx = runtime.block_on(Context::new(window, config.vsync))?;
        let mut scene = Scene::new(&config);
        let renderer = Renderer::new(&ctx.device, ctx.config.format, scene.resources_mut())?;
        log::info!(
            "engine started at {}x{} ({:?})",
            ctx.config.width,
            ctx.config.height,
            ctx.config.format
        );

        let start = Instant::now();
        Ok(Self {
            event_loop,
            state,
            ctx,
            scene,
            renderer,
            overlay: None,
            frame: None,
            clear_colour: config.clear_colour,
            shadows_active: false,
            start,
            last_update: start,
        })
    }

    /// `false` once the window was asked to close.
    pub fn run(&self) -> bool {
        !self.state.close_requested
    }

    /// Drain pending window events without blocking.
    pub fn poll_events(&mut self) {
        if let PumpStatus::Exit(code) = self
            .event_loop
            .pump_app_events(Some(Duration::ZERO), &mut self.state)
        {
            log::debug!("event loop exited with code {code}");
            self.state.close_requested = true;
        }
        if let Some(size) = self.state.resized.take() {
            self.ctx.resize(size.width, size.height);
        }
    }

    /// Window events received since the last call.
    pub fn take_events(&mut self) -> Vec<WindowEvent> {
        std::mem::take(&mut self.state.events)
    }

    /// Acquire the next surface texture and clear colour and depth. Returns
    /// `false` if this frame must be skipped.
    pub fn begin_scene(&mut self) -> bool {
        if self.frame.is_some() {
            log::warn!("begin_scene called twice without end_scene");
            return false;
        }
        if !self.ctx.is_surface_configured() {
            return false;
        }
        let surface_texture = match self.ctx.surface.get_current_texture() {
            wgpu::CurrentSurfaceTexture::Success(texture)
            | wgpu::CurrentSurfaceTexture::Suboptimal(texture) => texture,
            wgpu::CurrentSurfaceTexture::Lost | wgpu::CurrentSurfaceTexture::Outdated => {
                self.ctx.reconfigure();
                return false;
            }
            wgpu::CurrentSurfaceTexture::Timeout => {
                log::warn!("timed out acquiring the surface texture");
                return false;
            }
            e => {
                log::error!("Unable to render {:?}", e);
                return false;
            }
        };
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let _clear = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Clear Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.ctx.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });
        }
        self.frame = Some(Frame {
            surface_texture,
            view,
            encoder,
        });
        true
    }

    /// Advance particles, then record the shadow pass and the main pass.
    pub fn draw_objects(&mut self) {
        let Some(frame) = self.frame.as_mut() else {
            log::warn!("draw_objects called outside begin_scene/end_scene");
            return;
        };
        let now = Instant::now();
        self.scene.update(now - self.last_update);
        self.last_update = now;

        let frame_context = self.scene.frame_context(self.ctx.aspect());
        self.renderer.prepare(
            &self.ctx.device,
            &self.ctx.queue,
            &mut self.scene,
            &frame_context,
            self.shadows_active,
        );
        self.renderer
            .draw_shadow_pass(&mut frame.encoder, &self.scene);
        self.renderer.draw_main_pass(
            &mut frame.encoder,
            &frame.view,
            &self.ctx.depth_texture.view,
            &self.scene,
        );
        self.scene.clear_debug_lines();
    }

    pub fn render_overlay(&mut self) {
        let (Some(overlay), Some(frame)) = (self.overlay.as_mut(), self.frame.as_mut()) else {
            return;
        };
        overlay.render(&self.ctx, &mut frame.encoder, &frame.view);
    }

    /// Submit the frame and present it.
    pub fn end_scene(&mut self) {
        let Some(frame) = self.frame.take() else {
            log::warn!("end_scene called without begin_scene");
            return;
        };
        self.ctx.queue.submit(iter::once(frame.encoder.finish()));
        self.ctx.window.pre_present_notify();
        frame.surface_texture.present();
    }

    pub fn overlay_init(&mut self, mut overlay: Box<dyn Overlay>) -> anyhow::Result<()> {
        self.terminate_overlay();
        overlay.init(&self.ctx)?;
        self.overlay = Some(overlay);
        Ok(())
    }

    pub fn terminate_overlay(&mut self) {
        if let Some(mut overlay) = self.overlay.take() {
            overlay.terminate();
        }
    }

    pub fn window(&self) -> &Window {
        &self.ctx.window
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn set_vsync(&mut self, vsync: bool) {
        self.ctx.set_vsync(vsync);
    }

    pub fn set_title(&self, title: &str) {
        self.ctx.window.set_title(title);
    }

    /// Make [`Engine::run`] return `false`.
    pub fn close_window(&mut self) {
        self.state.close_requested = true;
    }

    /// Hide the cursor and lock it to the window, or release it again.
    pub fn disable_cursor(&self, disabled: bool) {
        let window = &self.ctx.window;
        window.set_cursor_visible(!disabled);
        let result = if disabled {
            window
                .set_cursor_grab(CursorGrabMode::Locked)
                .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined))
        } else {
            window.set_cursor_grab(CursorGrabMode::None)
        };
        if let Err(e) = result {
            log::warn!("cursor grab not supported: {e}");
        }
    }

    /// Resize the render targets. Window resizes already do this.
    pub fn update_viewport(&mut self, width: u32, height: u32) {
        self.ctx.resize(width, height);
    }

    /// Seconds since the engine was created.
    pub fn get_time(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    pub fn screen_width(&self) -> u32 {
        self.ctx.config.width
    }

    pub fn screen_height(&self) -> u32 {
        self.ctx.config.height
    }

    pub fn set_clear_colour(&mut self, colour: wgpu::Color) {
        self.clear_colour = colour;
    }

    /// Shadows start switched off. The shadow pass also needs a light bound
    /// with [`Scene::add_shadow_mapping`].
    pub fn set_shadows_active(&mut self, active: bool) {
        self.shadows_active = active;
    }

    pub fn shadows_active(&self) -> bool {
        self.shadows_active
    }

    pub fn set_particles_visibility(&mut self, visible: bool) {
        self.scene.set_particles_visibility(visible);
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.terminate_overlay();
    }
}
