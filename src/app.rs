//! The application trait and the windowed frame loop that drives it.
//!
//! [`run`] owns the winit event loop. The window and GPU only exist once
//! the event loop delivers `resumed`, so the driver starts in a pending
//! state, builds the [`GpuContext`] and [`Renderer`] there, runs the
//! application's one-time setup, and then pumps update/draw on every
//! redraw. Frame timing comes from an [`Instant`] taken per redraw, and
//! each frame immediately requests the next one.

use std::sync::Arc;
use std::time::Instant;

use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::error::RenderError;
use crate::gpu::GpuContext;
use crate::input::Input;
use crate::renderer::Renderer;

/// A program hosted by the frame loop.
///
/// The driver guarantees [`initialise`](Application::initialise) completes
/// before the first update. Implementations that keep setup state behind an
/// `Option` should return [`RenderError::NotInitialised`] if an operation
/// finds it empty, rather than unwrapping.
pub trait Application {
    /// One-time setup, called once the window and GPU exist.
    fn initialise(&mut self, gpu: &GpuContext, renderer: &mut Renderer) -> Result<(), RenderError>;

    /// Advances simulation by `dt` seconds.
    fn update(&mut self, dt: f32, input: &Input) -> Result<(), RenderError>;

    /// Records and presents one frame.
    fn draw(&mut self, gpu: &GpuContext, renderer: &mut Renderer) -> Result<(), RenderError>;

    /// The surface was resized.
    fn resized(&mut self, _width: u32, _height: u32) {}
}

/// Window settings for [`run`].
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "phalanx".to_owned(),
            width: 1280,
            height: 720,
        }
    }
}

impl AppConfig {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_owned(),
            ..Self::default()
        }
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

/// Opens a window and runs `app` until it errors or the window closes.
///
/// Errors from the application's update or draw are logged and stop the
/// loop; there is no sensible way to keep presenting frames after one.
pub fn run<A: Application + 'static>(config: AppConfig, app: A) {
    let event_loop = EventLoop::new().expect("failed to create event loop");
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut driver = Driver::Pending {
        config,
        app: Some(app),
    };
    event_loop.run_app(&mut driver).expect("event loop failed");
}

enum Driver<A> {
    Pending {
        config: AppConfig,
        app: Option<A>,
    },
    Running {
        window: Arc<Window>,
        gpu: GpuContext,
        renderer: Renderer,
        input: Input,
        app: A,
        last_frame: Instant,
    },
}

impl<A: Application> ApplicationHandler for Driver<A> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let Driver::Pending { config, app } = self else {
            return;
        };
        let Some(mut app) = app.take() else {
            return;
        };

        let attributes = WindowAttributes::default()
            .with_title(&config.title)
            .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height));
        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .expect("failed to create window"),
        );

        let gpu = GpuContext::new(window.clone());
        let mut renderer = Renderer::new(&gpu);

        if let Err(error) = app.initialise(&gpu, &mut renderer) {
            log::error!("initialisation failed: {error}");
            event_loop.exit();
            return;
        }

        window.request_redraw();
        *self = Driver::Running {
            window,
            gpu,
            renderer,
            input: Input::new(),
            app,
            last_frame: Instant::now(),
        };
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Driver::Running {
            window,
            gpu,
            renderer,
            input,
            app,
            last_frame,
        } = self
        else {
            return;
        };

        input.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                gpu.resize(size.width, size.height);
                app.resized(gpu.width(), gpu.height());
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let dt = now.duration_since(*last_frame).as_secs_f32();
                *last_frame = now;

                let frame = app
                    .update(dt, input)
                    .and_then(|()| app.draw(gpu, renderer));
                if let Err(error) = frame {
                    log::error!("frame failed: {error}");
                    event_loop.exit();
                    return;
                }

                input.begin_frame();
                window.request_redraw();
            }
            _ => {}
        }
    }
}
