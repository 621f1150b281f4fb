// Sprite: a lightweight view of a texture region

use super::TextureHandle;
use crate::math::Rect;
use glam::Vec2;

/// The capability set the batch needs from anything it draws
///
/// Implemented by [`Sprite`] for static regions and by
/// [`AnimatedSprite`](super::AnimatedSprite), which forwards every call to
/// its current frame.
pub trait SpriteSource {
    /// Texture the region lives on
    fn texture(&self) -> TextureHandle;
    /// Region width in pixels
    fn width(&self) -> u32;
    /// Region height in pixels
    fn height(&self) -> u32;
    /// Top-left texture coordinate
    fn uv_min(&self) -> Vec2;
    /// Bottom-right texture coordinate
    fn uv_max(&self) -> Vec2;
}

/// A static region of a texture
///
/// UVs are computed once at construction from the pixel rectangle and the
/// texture's inverse dimensions; the sprite is immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sprite {
    texture: TextureHandle,
    width: u32,
    height: u32,
    uv_min: Vec2,
    uv_max: Vec2,
}

impl Sprite {
    /// Create a sprite from a pixel region of a texture
    ///
    /// The region must lie inside the texture; violating that is a
    /// programmer error caught by a debug assertion rather than silently
    /// clipped.
    pub fn new(texture: TextureHandle, texture_size: (u32, u32), region: Rect) -> Self {
        let (tex_w, tex_h) = texture_size;
        debug_assert!(
            region.right() <= tex_w && region.bottom() <= tex_h,
            "sprite region {region:?} exceeds {tex_w}x{tex_h} texture bounds"
        );

        let inv_w = 1.0 / tex_w as f32;
        let inv_h = 1.0 / tex_h as f32;

        Self {
            texture,
            width: region.w,
            height: region.h,
            uv_min: Vec2::new(region.x as f32 * inv_w, region.y as f32 * inv_h),
            uv_max: Vec2::new(
                region.right() as f32 * inv_w,
                region.bottom() as f32 * inv_h,
            ),
        }
    }

    /// Create a sprite covering an entire texture
    pub fn full(texture: TextureHandle, texture_size: (u32, u32)) -> Self {
        Self::new(
            texture,
            texture_size,
            Rect::new(0, 0, texture_size.0, texture_size.1),
        )
    }
}

impl SpriteSource for Sprite {
    fn texture(&self) -> TextureHandle {
        self.texture
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn uv_min(&self) -> Vec2 {
        self.uv_min
    }

    fn uv_max(&self) -> Vec2 {
        self.uv_max
    }
}
