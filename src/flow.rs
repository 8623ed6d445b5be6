//! Application host and event loop.
//!
//! The host owns the window, the GPU [`Context`], the [`Renderer`] and the
//! demo [`Scene`]. Every redraw it applies keyboard movement and mouse look
//! to the scene, renders one frame and presents it.
//!
//! # Controls
//!
//! - `W` `A` `S` `D` move the player in the ground plane relative to its yaw
//! - the arrow keys move the movable cube the same way
//! - the mouse turns the camera; the cursor is hidden and re-centred each frame
//! - `Escape` or closing the window exits
//!
//! # Lifecycle
//!
//! 1. `resumed` creates the window, the context and the renderer
//! 2. input events update the pressed-key sets and the cursor position
//! 3. `RedrawRequested` advances the scene, renders and presents
//! 4. exit destroys the renderer before the window goes away

use std::sync::Arc;

use anyhow::Context as _;
use cgmath::Vector3;
use instant::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    dpi::{PhysicalPosition, PhysicalSize},
    event::{KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

use crate::{
    config::RendererConfig,
    context::Context,
    data_structures::scene::Scene,
    renderer::Renderer,
};

/// World units moved per millisecond of frame time.
pub const MOVE_SPEED: f32 = 0.025;

/// Frame time the mouse rate is normalised against (60 fps).
pub const REFERENCE_FRAME_MS: f32 = 16.67;

/// Bit set of the four direction keys currently held.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DirectionKeys(u8);

impl DirectionKeys {
    pub const FORWARD: u8 = 1;
    pub const LEFT: u8 = 2;
    pub const BACK: u8 = 4;
    pub const RIGHT: u8 = 8;

    pub fn set(&mut self, key: u8, pressed: bool) {
        if pressed {
            self.0 |= key;
        } else {
            self.0 &= !key;
        }
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    /// Angle added to the yaw for the held combination, `None` when idle.
    pub fn offset(self) -> Option<f32> {
        direction_offset(self.0)
    }
}

/// Maps a key combination to a heading relative to the player's yaw, in
/// degrees. Contradictory combinations fall back to straight ahead.
pub fn direction_offset(combo: u8) -> Option<f32> {
    let degrees = match combo {
        0 => return None,
        3 => 45.0,
        2 | 7 => 90.0,
        6 => 135.0,
        4 | 14 => 180.0,
        12 => 225.0,
        8 | 13 => 270.0,
        9 => 315.0,
        _ => 0.0,
    };
    Some(degrees)
}

/// Displacement in the ground plane for one frame.
pub fn movement(theta: f32, offset: f32, frame_time_ms: f32) -> Vector3<f32> {
    let heading = (theta + offset).to_radians();
    let distance = frame_time_ms * MOVE_SPEED;
    Vector3::new(distance * heading.cos(), distance * heading.sin(), 0.0)
}

/// Yaw and pitch increments for a cursor at `cursor` in a window of `size`.
pub fn mouse_look(
    cursor: PhysicalPosition<f64>,
    size: PhysicalSize<u32>,
    frame_time_ms: f32,
) -> (f32, f32) {
    let rate = frame_time_ms / REFERENCE_FRAME_MS;
    let d_theta = rate * (size.width as f64 / 2.0 - cursor.x) as f32;
    let d_phi = rate * (size.height as f64 / 2.0 - cursor.y) as f32;
    (d_theta, d_phi)
}

/// Last known cursor position. Its offset from the window centre turns the
/// camera every frame until the cursor is successfully re-centred.
#[derive(Clone, Copy, Debug, Default)]
pub struct CursorTracker {
    position: Option<PhysicalPosition<f64>>,
}

impl CursorTracker {
    pub fn moved(&mut self, position: PhysicalPosition<f64>) {
        self.position = Some(position);
    }

    pub fn look(&self, size: PhysicalSize<u32>, frame_time_ms: f32) -> Option<(f32, f32)> {
        self.position.map(|cursor| mouse_look(cursor, size, frame_time_ms))
    }

    pub fn recentred(&mut self, size: PhysicalSize<u32>) {
        self.position = Some(window_centre(size));
    }
}

fn window_centre(size: PhysicalSize<u32>) -> PhysicalPosition<f64> {
    PhysicalPosition::new(size.width as f64 / 2.0, size.height as f64 / 2.0)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Control {
    Player(u8),
    Object(u8),
    Exit,
}

pub fn control_for(code: KeyCode) -> Option<Control> {
    let control = match code {
        KeyCode::KeyW => Control::Player(DirectionKeys::FORWARD),
        KeyCode::KeyA => Control::Player(DirectionKeys::LEFT),
        KeyCode::KeyS => Control::Player(DirectionKeys::BACK),
        KeyCode::KeyD => Control::Player(DirectionKeys::RIGHT),
        KeyCode::ArrowUp => Control::Object(DirectionKeys::FORWARD),
        KeyCode::ArrowLeft => Control::Object(DirectionKeys::LEFT),
        KeyCode::ArrowDown => Control::Object(DirectionKeys::BACK),
        KeyCode::ArrowRight => Control::Object(DirectionKeys::RIGHT),
        KeyCode::Escape => Control::Exit,
        _ => return None,
    };
    Some(control)
}

/// Counts frames and reports the rate about once per second.
#[derive(Clone, Debug)]
pub struct FrameTimer {
    frames: u32,
    last_report: Instant,
    frame_time_ms: f32,
}

impl FrameTimer {
    pub fn new(now: Instant) -> Self {
        Self {
            frames: 0,
            last_report: now,
            frame_time_ms: REFERENCE_FRAME_MS,
        }
    }

    /// Counts one frame. Returns the frame rate when a second or more has
    /// passed since the last report.
    pub fn tick(&mut self, now: Instant) -> Option<u32> {
        self.frames += 1;
        let elapsed = now.duration_since(self.last_report);
        if elapsed < Duration::from_secs(1) {
            return None;
        }
        let fps = ((self.frames as f64 / elapsed.as_secs_f64()) as u32).max(1);
        self.frame_time_ms = 1000.0 / fps as f32;
        self.frames = 0;
        self.last_report = now;
        Some(fps)
    }

    /// Mean frame time of the last reported second.
    pub fn frame_time_ms(&self) -> f32 {
        self.frame_time_ms
    }
}

pub fn fps_title(fps: u32) -> String {
    format!("Running at {} fps.", fps)
}

struct Host {
    ctx: Context,
    renderer: Renderer,
    scene: Scene,
}

impl Host {
    fn resize(&mut self, width: u32, height: u32) -> anyhow::Result<()> {
        self.ctx.resize(width, height);
        self.renderer.resize(&self.ctx, width, height)?;
        Ok(())
    }

    fn render(&mut self) -> anyhow::Result<()> {
        let Some(surface) = self.ctx.surface.as_ref() else {
            return Ok(());
        };
        let output = match surface.get_current_texture() {
            Ok(output) => output,
            // Reconfigure the surface if it's lost or outdated
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let (width, height) = (self.ctx.config.width, self.ctx.config.height);
                return self.resize(width, height);
            }
            Err(e) => {
                log::error!("Unable to render {}", e);
                return Ok(());
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.renderer.render(&self.ctx, &self.scene, &view)?;
        output.present();
        Ok(())
    }

    fn shutdown(self) -> anyhow::Result<()> {
        let Host { ctx, renderer, .. } = self;
        let ledger = renderer.destroy()?;
        if !ledger.outstanding().is_empty() {
            anyhow::bail!("{} GPU resources outlived the renderer", ledger.outstanding().len());
        }
        drop(ctx);
        Ok(())
    }
}

pub struct App {
    async_runtime: tokio::runtime::Runtime,
    config: RendererConfig,
    host: Option<Host>,
    player_keys: DirectionKeys,
    object_keys: DirectionKeys,
    cursor: CursorTracker,
    timer: FrameTimer,
    failure: Option<anyhow::Error>,
}

impl App {
    pub fn new(config: RendererConfig) -> anyhow::Result<Self> {
        let async_runtime =
            tokio::runtime::Runtime::new().context("could not start the async runtime")?;
        Ok(Self {
            async_runtime,
            config,
            host: None,
            player_keys: DirectionKeys::default(),
            object_keys: DirectionKeys::default(),
            cursor: CursorTracker::default(),
            timer: FrameTimer::new(Instant::now()),
            failure: None,
        })
    }

    fn start(&self, event_loop: &ActiveEventLoop) -> anyhow::Result<Host> {
        let window_attributes = Window::default_attributes()
            .with_title(fps_title(0))
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height))
            .with_resizable(false);
        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .context("could not create the window")?,
        );
        window.set_cursor_visible(false);

        let config = self.config.clone();
        let (ctx, renderer) = self.async_runtime.block_on(async move {
            let ctx = Context::new(window, &config).await?;
            let renderer = Renderer::new(&ctx, config).await?;
            Ok::<_, anyhow::Error>((ctx, renderer))
        })?;
        Ok(Host {
            ctx,
            renderer,
            scene: Scene::demo(),
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{:#}", error);
        self.failure.get_or_insert(error);
        self.exit(event_loop);
    }

    fn exit(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(host) = self.host.take() {
            if let Err(e) = host.shutdown() {
                log::error!("{:#}", e);
                self.failure.get_or_insert(e);
            }
        }
        event_loop.exit();
    }

    fn on_key(&mut self, event_loop: &ActiveEventLoop, event: &KeyEvent) {
        let PhysicalKey::Code(code) = event.physical_key else {
            return;
        };
        let pressed = event.state.is_pressed();
        match control_for(code) {
            Some(Control::Player(key)) => self.player_keys.set(key, pressed),
            Some(Control::Object(key)) => self.object_keys.set(key, pressed),
            Some(Control::Exit) if pressed => self.exit(event_loop),
            _ => (),
        }
    }

    fn update(&mut self) {
        let Some(host) = self.host.as_mut() else {
            return;
        };
        let frame_time = self.timer.frame_time_ms();
        let theta = host.scene.player.theta();
        if let Some(offset) = self.player_keys.offset() {
            host.scene.move_player(movement(theta, offset, frame_time));
        }
        if let Some(offset) = self.object_keys.offset() {
            host.scene.move_object(movement(theta, offset, frame_time));
        }

        let Some(window) = host.ctx.window() else {
            return;
        };
        let size = window.inner_size();
        if let Some((d_theta, d_phi)) = self.cursor.look(size, frame_time) {
            host.scene.spin_player(d_theta, d_phi);
        }
        match window.set_cursor_position(window_centre(size)) {
            Ok(()) => self.cursor.recentred(size),
            Err(e) => log::debug!("cursor cannot be re-centred: {}", e),
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        self.update();
        let Some(host) = self.host.as_mut() else {
            return;
        };
        if let Err(e) = host.render() {
            self.fail(event_loop, e);
            return;
        }
        if let Some(window) = host.ctx.window() {
            if let Some(fps) = self.timer.tick(Instant::now()) {
                window.set_title(&fps_title(fps));
            }
            window.request_redraw();
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.host.is_some() {
            return;
        }
        match self.start(event_loop) {
            Ok(host) => {
                if let Some(window) = host.ctx.window() {
                    window.request_redraw();
                }
                self.host = Some(host);
            }
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => self.exit(event_loop),
            WindowEvent::KeyboardInput { event, .. } => self.on_key(event_loop, &event),
            WindowEvent::CursorMoved { position, .. } => self.cursor.moved(position),
            WindowEvent::Resized(size) => {
                if let Some(host) = self.host.as_mut() {
                    if let Err(e) = host.resize(size.width, size.height) {
                        self.fail(event_loop, e);
                    }
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }
}

/// Opens the demo window and runs until it is closed.
pub fn run() -> anyhow::Result<()> {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    };

    let event_loop = EventLoop::new()?;
    let mut app = App::new(RendererConfig::default())?;
    event_loop.run_app(&mut app)?;

    match app.failure.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
