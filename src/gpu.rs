//! GPU context and viewport sizing.
//!
//! [`GpuContext`] holds the wgpu surface, device, queue and surface
//! configuration. [`Viewport`] turns the window's physical size and scale
//! factor into the camera aspect and the surface size, so both always come
//! from the same numbers.

use std::sync::Arc;

use glam::Vec2;
use winit::window::Window;

/// Highest device pixel ratio the surface renders at.
pub const MAX_PIXEL_RATIO: f32 = 2.0;

#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("no suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to create device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("surface reports no supported formats")]
    NoSurfaceFormat,
}

/// Window size and density.
///
/// Winit reports physical pixels and a scale factor. The camera works in
/// logical units; the surface renders at logical size times the pixel ratio,
/// with the ratio capped at [`MAX_PIXEL_RATIO`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub physical_width: u32,
    pub physical_height: u32,
    pub scale_factor: f64,
}

impl Viewport {
    pub fn new(physical_width: u32, physical_height: u32, scale_factor: f64) -> Self {
        Self {
            physical_width,
            physical_height,
            scale_factor: if scale_factor > 0.0 { scale_factor } else { 1.0 },
        }
    }

    pub fn logical_size(&self) -> Vec2 {
        Vec2::new(self.physical_width as f32, self.physical_height as f32)
            / self.scale_factor as f32
    }

    pub fn pixel_ratio(&self) -> f32 {
        (self.scale_factor as f32).min(MAX_PIXEL_RATIO)
    }

    /// Surface size in pixels; never zero.
    pub fn render_size(&self) -> (u32, u32) {
        let size = (self.logical_size() * self.pixel_ratio()).round();
        ((size.x as u32).max(1), (size.y as u32).max(1))
    }

    /// Camera aspect ratio, width over height.
    pub fn aspect(&self) -> f32 {
        let size = self.logical_size();
        if size.y > 0.0 { size.x / size.y } else { 1.0 }
    }

    /// Whether the window currently has no area (minimized).
    pub fn is_empty(&self) -> bool {
        self.physical_width == 0 || self.physical_height == 0
    }

    /// Map a window position (physical pixels) to surface pixels.
    pub fn to_render(&self, position: Vec2) -> Vec2 {
        position * self.pixel_ratio() / self.scale_factor as f32
    }
}

/// Core GPU context holding wgpu resources.
pub struct GpuContext {
    /// The surface for presenting rendered frames to the window.
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    /// Current surface configuration (format, size, present mode).
    pub config: wgpu::SurfaceConfiguration,
}

impl GpuContext {
    /// Create the instance, surface, adapter and device for `window`, sized for `viewport`.
    pub fn new(window: Arc<Window>, viewport: &Viewport) -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))?;

        log::info!("using adapter {}", adapter.get_info().name);

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Shape Lab Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: Default::default(),
            trace: Default::default(),
            experimental_features: Default::default(),
        }))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or(GpuError::NoSurfaceFormat)?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let (width, height) = viewport.render_size();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        Ok(Self {
            surface,
            device,
            queue,
            config,
        })
    }

    /// Resize the surface to new dimensions.
    ///
    /// Zero-sized dimensions are ignored (minimized windows).
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    /// Reconfigure the surface with its current settings.
    pub fn reconfigure(&self) {
        self.surface.configure(&self.device, &self.config);
    }

    pub fn width(&self) -> u32 {
        self.config.width
    }

    pub fn height(&self) -> u32 {
        self.config.height
    }

    /// True when colors written to the surface are sRGB-encoded by the hardware.
    pub fn is_srgb(&self) -> bool {
        self.config.format.is_srgb()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn unit_scale_renders_at_window_size() {
        let viewport = Viewport::new(1280, 720, 1.0);
        assert_eq!(viewport.render_size(), (1280, 720));
        assert_relative_eq!(viewport.aspect(), 1280.0 / 720.0);
        assert_eq!(viewport.pixel_ratio(), 1.0);
    }

    #[test]
    fn pixel_ratio_is_capped_at_two() {
        let viewport = Viewport::new(3000, 1500, 3.0);
        assert_eq!(viewport.pixel_ratio(), 2.0);
        assert_eq!(viewport.logical_size(), Vec2::new(1000.0, 500.0));
        assert_eq!(viewport.render_size(), (2000, 1000));
        assert_relative_eq!(viewport.aspect(), 2.0);
        assert_eq!(viewport.to_render(Vec2::new(300.0, 150.0)), Vec2::new(200.0, 100.0));
    }

    #[test]
    fn hidpi_under_cap_keeps_physical_size() {
        let viewport = Viewport::new(1600, 1200, 2.0);
        assert_eq!(viewport.render_size(), (1600, 1200));
        assert_eq!(viewport.to_render(Vec2::new(10.0, 20.0)), Vec2::new(10.0, 20.0));
    }

    #[test]
    fn minimized_window_still_has_a_render_size() {
        let viewport = Viewport::new(0, 0, 1.0);
        assert!(viewport.is_empty());
        assert_eq!(viewport.render_size(), (1, 1));
        assert_eq!(viewport.aspect(), 1.0);
    }
}
