//! Batched 2D sprite rendering over wgpu.
//!
//! Two subsystems carry the performance load: the [`renderer::SpriteBatch`],
//! which accumulates textured quads and submits maximal same-texture runs as
//! single draw calls, and the [`atlas`] bin packer, which coalesces many
//! small images into few shared textures so those runs stay long.

pub mod atlas;
pub mod math;
pub mod renderer;

pub use atlas::{AtlasError, AtlasSurface, PackedTexture};
pub use math::Rect;
pub use renderer::{
    AnimatedSprite, Camera, PlayMode, Renderer, Sprite, SpriteBatch, SpriteSource, Texture,
    TextureHandle, TextureManager,
};
