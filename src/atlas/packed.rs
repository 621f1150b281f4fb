// GPU-backed packed texture: atlas surface plus one pooled texture

use super::{AtlasError, AtlasSurface};
use crate::math::Rect;
use crate::renderer::{Sprite, TextureError, TextureHandle, TextureManager};
use image::RgbaImage;
use log::{debug, warn};
use std::path::Path;

/// An atlas surface paired with the GPU texture it uploads into
///
/// Inserts only touch the packing tree and the pending list; the GPU
/// texture changes exclusively in [`commit_pack`], which blits every
/// pending image and uploads the whole surface in one transfer. Glyph
/// caches and tileset renderers insert everything they need up front and
/// commit once.
///
/// [`commit_pack`]: PackedTexture::commit_pack
pub struct PackedTexture {
    surface: AtlasSurface,
    handle: TextureHandle,
}

impl PackedTexture {
    /// Create a packed texture with fixed dimensions
    ///
    /// Allocates a blank texture slot in the pool; the slot should be
    /// released when this atlas is dropped.
    pub fn new(
        device: &wgpu::Device,
        textures: &mut TextureManager,
        width: u32,
        height: u32,
        label: &str,
    ) -> Result<Self, TextureError> {
        let handle = textures.create_blank(device, width, height, label)?;
        debug!("packed texture '{label}': {width}x{height}");

        Ok(Self {
            surface: AtlasSurface::new(width, height),
            handle,
        })
    }

    /// Pack a decoded image, deferring the blit to the next commit
    pub fn insert_image(&mut self, pixels: RgbaImage) -> Result<Rect, AtlasError> {
        self.surface.insert_image(pixels)
    }

    /// Decode and pack an image file
    pub fn insert_file<P: AsRef<Path>>(&mut self, path: P) -> Result<Rect, AtlasError> {
        self.surface.insert_file(path)
    }

    /// Blit all pending images and upload the surface to the GPU texture
    ///
    /// The one and only GPU-touching atlas operation; not safe to call
    /// while a submitted frame still samples this texture.
    pub fn commit_pack(&mut self, queue: &wgpu::Queue, textures: &TextureManager) {
        let Some(texture) = textures.get(self.handle) else {
            warn!("commit_pack on released texture {:?}", self.handle);
            return;
        };

        let (width, height) = self.surface.dimensions();
        let surface = self.surface.commit_blit();

        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            surface,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
    }

    /// Wrap a packed region in a drawable sprite
    pub fn sprite(&self, region: Rect) -> Sprite {
        Sprite::new(self.handle, self.surface.dimensions(), region)
    }

    /// Handle of the GPU texture this atlas uploads into
    pub fn handle(&self) -> TextureHandle {
        self.handle
    }

    /// Atlas dimensions in pixels
    pub fn dimensions(&self) -> (u32, u32) {
        self.surface.dimensions()
    }

    /// Number of images awaiting the next commit
    pub fn pending_count(&self) -> usize {
        self.surface.pending_count()
    }
}
