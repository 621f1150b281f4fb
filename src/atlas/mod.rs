// Texture atlas system
//
// Coalesces many small images into a few large GPU textures so the sprite
// batch can keep texture switches (and therefore draw calls) to a minimum.

mod packed;
mod packer;
mod surface;

pub use packed::PackedTexture;
pub use packer::PackNode;
pub use surface::AtlasSurface;

/// Atlas packing and loading errors
#[derive(Debug, thiserror::Error)]
pub enum AtlasError {
    #[error("atlas out of space for {width}x{height} image")]
    OutOfSpace { width: u32, height: u32 },

    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
