// Rendering system using wgpu

mod animation;
mod batch;
mod camera;
mod pipeline;
pub mod shader;
mod sprite;
pub mod texture;
mod vertex;

pub use animation::{AnimatedSprite, PlayMode};
pub use batch::{DrawCall, SpriteBatch, DEFAULT_MAX_QUADS};
pub use camera::Camera;
pub use pipeline::BatchPipeline;
pub use shader::{Shader, ShaderError, UniformBlock, UniformLayout, UniformType, VertexLayout};
pub use sprite::{Sprite, SpriteSource};
pub use texture::{Texture, TextureError, TextureHandle, TextureManager};
pub use vertex::Vertex;

use anyhow::Result;
use log::info;
use std::sync::Arc;
use winit::window::Window;

/// Window/context bootstrap and per-frame driver
///
/// Thin glue over the core: owns the wgpu surface and device, the batch
/// pipeline, the texture pool, a camera, and a sprite batch. Everything
/// here runs on one thread; none of it is safe to share.
pub struct Renderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: winit::dpi::PhysicalSize<u32>,
    pipeline: BatchPipeline,
    textures: TextureManager,
    camera: Camera,
    batch: SpriteBatch,
}

impl Renderer {
    /// Create a renderer for the given window
    pub async fn new(window: Arc<Window>) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow::anyhow!("Failed to find suitable GPU adapter"))?;

        info!("Using GPU: {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Main Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(&device, &config);

        let pipeline = BatchPipeline::new(&device, surface_format, DEFAULT_MAX_QUADS)?;
        let textures = TextureManager::new();
        let camera = Camera::new(size.width as f32, size.height as f32);
        let batch = SpriteBatch::new();

        info!(
            "Renderer initialized with {}x{} resolution",
            size.width, size.height
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            pipeline,
            textures,
            camera,
            batch,
        })
    }

    /// Resize the surface and camera viewport
    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.camera
                .resize(new_size.width as f32, new_size.height as f32);
            info!("Renderer resized to {}x{}", new_size.width, new_size.height);
        }
    }

    /// Render one frame
    ///
    /// Opens a batch frame under the camera's combined matrix, hands the
    /// batch and texture pool to the caller, then submits whatever was
    /// recorded.
    pub fn render(
        &mut self,
        clear: wgpu::Color,
        frame: impl FnOnce(&mut SpriteBatch, &mut TextureManager),
    ) -> Result<()> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.batch.set_projection_matrix(self.camera.combined());
        self.batch.begin();
        frame(&mut self.batch, &mut self.textures);
        self.batch.end();

        self.pipeline
            .submit(&self.device, &self.queue, &view, clear, &self.batch, &self.textures);
        output.present();

        Ok(())
    }

    /// Release a texture and drop its cached bind group
    pub fn release_texture(&mut self, handle: TextureHandle) -> Option<Texture> {
        self.pipeline.invalidate_texture(handle);
        self.textures.release(handle)
    }

    /// Get a reference to the device
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Get a reference to the queue
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Get a reference to the texture pool
    pub fn textures(&self) -> &TextureManager {
        &self.textures
    }

    /// Get a mutable reference to the texture pool
    pub fn textures_mut(&mut self) -> &mut TextureManager {
        &mut self.textures
    }

    /// Get a reference to the camera
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Get a mutable reference to the camera
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// Get the surface format
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }
}
