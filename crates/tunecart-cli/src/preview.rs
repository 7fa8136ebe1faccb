//! Ventana de previsualización de portadas.
//!
//! Un único `EventLoop` por proceso: se crea la primera vez y se reutiliza
//! con `run_app_on_demand` en cada previsualización.

use std::num::NonZeroU32;
use std::path::Path;
use std::rc::Rc;

use image::RgbImage;
use softbuffer::{Context, Surface};
use tracing::debug;
use tunecart_library::{ImagePreview, LibraryError, Result};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    platform::run_on_demand::EventLoopExtRunOnDemand,
    window::{Window, WindowId},
};

/// Lado máximo de la ventana; las imágenes mayores se reducen.
const MAX_SIDE: u32 = 800;

#[derive(Default)]
pub struct WindowPreview {
    event_loop: Option<EventLoop<()>>,
}

impl WindowPreview {
    pub fn new() -> Self {
        Self::default()
    }

    fn event_loop(&mut self) -> Result<&mut EventLoop<()>> {
        if self.event_loop.is_none() {
            let event_loop = EventLoop::new().map_err(preview_error)?;
            self.event_loop = Some(event_loop);
        }
        self.event_loop
            .as_mut()
            .ok_or_else(|| LibraryError::Preview("event loop unavailable".into()))
    }
}

impl ImagePreview for WindowPreview {
    fn show(&mut self, path: &Path) -> Result<()> {
        let image = load_scaled(path)?;
        let title = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Cover".into());

        let mut app = PreviewWindow::new(title, image);
        self.event_loop()?.run_app_on_demand(&mut app).map_err(preview_error)?;
        app.exit_state
    }
}

fn load_scaled(path: &Path) -> Result<RgbImage> {
    let image = image::open(path).map_err(preview_error)?;
    let image = if image.width() > MAX_SIDE || image.height() > MAX_SIDE {
        image.thumbnail(MAX_SIDE, MAX_SIDE)
    } else {
        image
    };
    Ok(image.to_rgb8())
}

fn preview_error(e: impl std::fmt::Display) -> LibraryError {
    LibraryError::Preview(e.to_string())
}

struct PreviewWindow {
    title: String,
    image: RgbImage,
    window: Option<Rc<Window>>,
    surface: Option<Surface<Rc<Window>, Rc<Window>>>,
    exit_state: Result<()>,
}

impl PreviewWindow {
    fn new(title: String, image: RgbImage) -> Self {
        Self {
            title,
            image,
            window: None,
            surface: None,
            exit_state: Ok(()),
        }
    }

    fn open(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attributes = Window::default_attributes()
            .with_title(self.title.clone())
            .with_inner_size(PhysicalSize::new(self.image.width(), self.image.height()))
            .with_resizable(false);

        let window = Rc::new(event_loop.create_window(attributes).map_err(preview_error)?);
        let context = Context::new(window.clone()).map_err(preview_error)?;
        let surface = Surface::new(&context, window.clone()).map_err(preview_error)?;

        window.request_redraw();
        self.window = Some(window);
        self.surface = Some(surface);
        Ok(())
    }

    fn redraw(&mut self) -> Result<()> {
        let (Some(window), Some(surface)) = (&self.window, &mut self.surface) else {
            return Ok(());
        };

        let size = window.inner_size();
        let (Some(width), Some(height)) = (NonZeroU32::new(size.width), NonZeroU32::new(size.height)) else {
            return Ok(());
        };
        surface.resize(width, height).map_err(preview_error)?;

        let mut buffer = surface.buffer_mut().map_err(preview_error)?;
        for y in 0..size.height {
            for x in 0..size.width {
                // 0x00RRGGBB; fuera de la imagen, negro
                let pixel = if x < self.image.width() && y < self.image.height() {
                    let [r, g, b] = self.image.get_pixel(x, y).0;
                    (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b)
                } else {
                    0
                };
                buffer[(y * size.width + x) as usize] = pixel;
            }
        }
        buffer.present().map_err(preview_error)?;
        Ok(())
    }

    fn close(&mut self, event_loop: &ActiveEventLoop) {
        self.surface = None;
        self.window = None;
        event_loop.exit();
    }
}

impl ApplicationHandler for PreviewWindow {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.open(event_loop) {
            self.exit_state = Err(e);
            self.close(event_loop);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event: KeyEvent {
                    state: ElementState::Pressed,
                    ..
                },
                ..
            } => {
                debug!(title = %self.title, "preview closed");
                self.close(event_loop);
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.redraw() {
                    self.exit_state = Err(e);
                    self.close(event_loop);
                }
            }
            _ => (),
        }
    }
}
