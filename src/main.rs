//! attest-board: Attestation Review Dashboard
//!
//! A GPU-rendered dashboard of attestation stats, each attestation shown as
//! an interactive 3D pie chart with a detail table. All data comes from a
//! TOML config that is hot-reloaded while the app runs.
//!
//! Uses vello/wgpu for rendering and winit for the window and input.

mod chart;
mod config;
mod config_watcher;
mod dashboard;
mod logging;
mod state_machine;
mod text;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, error, info, warn};
use vello::kurbo::Point;
use vello::util::{RenderContext, RenderSurface};
use vello::{AaConfig, Renderer, RendererOptions, Scene};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy};
use winit::keyboard::{Key, NamedKey};
use winit::window::{CursorIcon, Fullscreen, Window};

use vello::wgpu;

use config::DashboardConfig;
use config_watcher::ConfigWatcher;
use dashboard::Dashboard;
use text::TextPainter;

/// Pixels scrolled per wheel line.
const LINE_SCROLL: f64 = 48.0;

/// Attestation Review Dashboard
#[derive(Parser, Debug)]
#[command(name = "attest-board", version, about = "Attestation review dashboard")]
struct Args {
    /// Dashboard config file [default: ~/.config/attest-board/dashboard.toml]
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Start in windowed mode instead of fullscreen
    #[arg(short, long)]
    windowed: bool,

    /// Don't reload the config when the file changes
    #[arg(long)]
    no_watch: bool,

    /// Write the default config (unless one exists) and exit
    #[arg(long)]
    write_default_config: bool,
}

/// Events delivered to the event loop from other threads.
#[derive(Debug)]
enum UserEvent {
    ConfigReloaded(Box<DashboardConfig>),
}

#[derive(Debug)]
enum RenderState {
    Active {
        surface: Box<RenderSurface<'static>>,
        valid_surface: bool,
        window: Arc<Window>,
    },
    Suspended(Option<Arc<Window>>),
}

struct App {
    context: RenderContext,
    renderers: Vec<Option<Renderer>>,
    state: RenderState,
    scene: Scene,
    start_time: Instant,
    windowed: bool,
    dashboard: Dashboard,
    cursor_icon: CursorIcon,
}

impl App {
    fn now(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }
}

impl ApplicationHandler<UserEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let RenderState::Suspended(cached_window) = &mut self.state else {
            return;
        };

        let window = match cached_window.take() {
            Some(window) => window,
            None => match create_window(event_loop, self.windowed) {
                Ok(window) => window,
                Err(e) => {
                    error!("creating window: {e}");
                    event_loop.exit();
                    return;
                }
            },
        };

        let size = window.inner_size();
        let surface_future = self.context.create_surface(
            window.clone(),
            size.width,
            size.height,
            wgpu::PresentMode::AutoVsync,
        );
        let surface = match pollster::block_on(surface_future) {
            Ok(surface) => surface,
            Err(e) => {
                error!("creating surface: {e}");
                event_loop.exit();
                return;
            }
        };

        self.renderers
            .resize_with(self.context.devices.len(), || None);
        if self.renderers[surface.dev_id].is_none() {
            match create_renderer(&self.context, &surface) {
                Ok(renderer) => self.renderers[surface.dev_id] = Some(renderer),
                Err(e) => {
                    error!("creating renderer: {e}");
                    event_loop.exit();
                    return;
                }
            }
        }

        self.dashboard.resize(size.width as f64, size.height as f64);
        window.request_redraw();
        self.state = RenderState::Active {
            surface: Box::new(surface),
            valid_surface: true,
            window,
        };
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        if let RenderState::Active { window, .. } = &self.state {
            self.state = RenderState::Suspended(Some(window.clone()));
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: UserEvent) {
        match event {
            UserEvent::ConfigReloaded(config) => {
                let now = self.now();
                self.dashboard.apply_config(*config, now);
                if let RenderState::Active { window, .. } = &self.state {
                    window.request_redraw();
                }
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let now = self.now();
        let (surface, valid_surface, window) = match &mut self.state {
            RenderState::Active {
                surface,
                valid_surface,
                window,
            } if window.id() == window_id => (surface, valid_surface, window.clone()),
            _ => return,
        };

        match event {
            WindowEvent::CloseRequested => {
                self.dashboard.shutdown();
                event_loop.exit();
            }

            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key: Key::Named(NamedKey::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                self.dashboard.shutdown();
                event_loop.exit();
            }

            // Press 'M' to toggle the sidebar menu
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key: Key::Character(ref c),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } if c.as_str() == "m" || c.as_str() == "M" => {
                self.dashboard.toggle_sidebar(now);
                window.request_redraw();
            }

            WindowEvent::Resized(size) => {
                if size.width != 0 && size.height != 0 {
                    self.context
                        .resize_surface(surface, size.width, size.height);
                    self.dashboard.resize(size.width as f64, size.height as f64);
                    *valid_surface = true;
                } else {
                    *valid_surface = false;
                }
                window.request_redraw();
            }

            WindowEvent::CursorMoved { position, .. } => {
                self.dashboard.cursor_moved(Point::new(position.x, position.y), now);
                update_cursor(&window, &self.dashboard, &mut self.cursor_icon);
                window.request_redraw();
            }

            WindowEvent::CursorLeft { .. } => {
                self.dashboard.cursor_left(now);
                update_cursor(&window, &self.dashboard, &mut self.cursor_icon);
                window.request_redraw();
            }

            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                self.dashboard.mouse_input(state == ElementState::Pressed, now);
                update_cursor(&window, &self.dashboard, &mut self.cursor_icon);
                window.request_redraw();
            }

            WindowEvent::MouseWheel { delta, .. } => {
                let dy = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y as f64 * LINE_SCROLL,
                    MouseScrollDelta::PixelDelta(p) => p.y,
                };
                self.dashboard.scroll(dy, now);
                update_cursor(&window, &self.dashboard, &mut self.cursor_icon);
                window.request_redraw();
            }

            WindowEvent::RedrawRequested => {
                if !*valid_surface {
                    return;
                }

                let running = self.dashboard.tick(now);
                self.scene.reset();
                self.dashboard.render(&mut self.scene);

                let device_handle = &self.context.devices[surface.dev_id];
                let Some(renderer) = self.renderers[surface.dev_id].as_mut() else {
                    return;
                };

                if let Err(e) = renderer.render_to_texture(
                    &device_handle.device,
                    &device_handle.queue,
                    &self.scene,
                    &surface.target_view,
                    &vello::RenderParams {
                        base_color: dashboard::BG_COLOR,
                        width: surface.config.width,
                        height: surface.config.height,
                        antialiasing_method: AaConfig::Msaa16,
                    },
                ) {
                    error!("render failed: {e}");
                    return;
                }

                let surface_texture = match surface.surface.get_current_texture() {
                    Ok(texture) => texture,
                    Err(e) => {
                        warn!("surface texture unavailable: {e}");
                        window.request_redraw();
                        return;
                    }
                };

                let mut encoder =
                    device_handle
                        .device
                        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                            label: Some("Surface Blit"),
                        });
                surface.blitter.copy(
                    &device_handle.device,
                    &mut encoder,
                    &surface.target_view,
                    &surface_texture
                        .texture
                        .create_view(&wgpu::TextureViewDescriptor::default()),
                );
                device_handle.queue.submit([encoder.finish()]);
                surface_texture.present();
                if let Err(e) = device_handle.device.poll(wgpu::PollType::Poll) {
                    debug!("device poll: {e}");
                }

                // Keep animating only while some chart is still ticking.
                if running {
                    window.request_redraw();
                }
            }

            _ => {}
        }
    }
}

fn update_cursor(window: &Window, dashboard: &Dashboard, current: &mut CursorIcon) {
    let icon = dashboard.cursor_icon();
    if icon != *current {
        window.set_cursor(icon);
        *current = icon;
    }
}

fn start_watcher(path: PathBuf, proxy: EventLoopProxy<UserEvent>) -> Option<ConfigWatcher> {
    let watcher = ConfigWatcher::start(path, move |config| {
        if proxy
            .send_event(UserEvent::ConfigReloaded(Box::new(config)))
            .is_err()
        {
            warn!(target: "config", "event loop closed, dropping reloaded config");
        }
    });
    match watcher {
        Ok(watcher) => {
            info!(target: "config", path = %watcher.path().display(), "watching config");
            Some(watcher)
        }
        Err(e) => {
            warn!(target: "config", "config hot-reload disabled: {e}");
            None
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = logging::init();

    let explicit_path = args.config.is_some();
    let config_path = args
        .config
        .unwrap_or_else(config_watcher::default_config_path);

    if args.write_default_config {
        let written = config_watcher::ensure_default_config(
            &config_path,
            &config_watcher::default_config_content(),
        )
        .with_context(|| format!("writing {}", config_path.display()))?;
        if written {
            println!("Wrote {}", config_path.display());
        } else {
            println!("{} already exists, left unchanged", config_path.display());
        }
        return Ok(());
    }

    // Seed the default location so there is a file to edit and a directory to watch.
    if !explicit_path {
        if let Err(e) = config_watcher::ensure_default_config(
            &config_path,
            &config_watcher::default_config_content(),
        ) {
            warn!(target: "config", "could not write default config: {e}");
        }
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        "starting attest-board"
    );
    let config = DashboardConfig::load_or_default(&config_path);

    let event_loop = EventLoop::<UserEvent>::with_user_event()
        .build()
        .context("creating event loop")?;
    let _watcher = if args.no_watch {
        None
    } else {
        start_watcher(config_path, event_loop.create_proxy())
    };

    let start_time = Instant::now();
    let dashboard = Dashboard::new(config, 1280.0, 800.0, TextPainter::load(), 0.0);

    let mut app = App {
        context: RenderContext::new(),
        renderers: vec![],
        state: RenderState::Suspended(None),
        scene: Scene::new(),
        start_time,
        windowed: args.windowed,
        dashboard,
        cursor_icon: CursorIcon::Default,
    };

    event_loop
        .run_app(&mut app)
        .context("running event loop")?;
    Ok(())
}

fn create_window(
    event_loop: &ActiveEventLoop,
    windowed: bool,
) -> Result<Arc<Window>, winit::error::OsError> {
    let mut attr = Window::default_attributes().with_title("attest-board | Attestation Review");

    if !windowed {
        attr = attr.with_fullscreen(Some(Fullscreen::Borderless(None)));
    } else {
        attr = attr.with_inner_size(winit::dpi::LogicalSize::new(1280, 800));
    }

    Ok(Arc::new(event_loop.create_window(attr)?))
}

fn create_renderer(
    render_cx: &RenderContext,
    surface: &RenderSurface<'_>,
) -> Result<Renderer, vello::Error> {
    Renderer::new(
        &render_cx.devices[surface.dev_id].device,
        RendererOptions::default(),
    )
}
