// CPU-side atlas surface: packing plus deferred blitting

use super::{packer::PackNode, AtlasError};
use crate::math::Rect;
use image::RgbaImage;
use log::debug;
use std::path::Path;

/// An image that has been assigned a region but not yet blitted
struct PendingImage {
    pixels: RgbaImage,
    rect: Rect,
}

/// CPU half of a packed texture
///
/// Owns the packing tree, a working surface the size of the atlas, and the
/// list of inserted images waiting for the next [`commit_blit`]. Inserting
/// never touches the working surface; only a commit does. This lets callers
/// insert a whole batch of images (every tile of a map, every glyph of a
/// string) and pay the blit once.
///
/// [`commit_blit`]: AtlasSurface::commit_blit
pub struct AtlasSurface {
    width: u32,
    height: u32,
    surface: RgbaImage,
    root: PackNode,
    pending: Vec<PendingImage>,
    insert_count: usize,
}

impl AtlasSurface {
    /// Create an empty surface with fixed dimensions (capacity never grows)
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            surface: RgbaImage::new(width, height),
            root: PackNode::new(width, height),
            pending: Vec::new(),
            insert_count: 0,
        }
    }

    /// Atlas dimensions in pixels
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of images inserted but not yet blitted
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Total number of successful inserts since construction
    pub fn insert_count(&self) -> usize {
        self.insert_count
    }

    /// Pack an in-memory image and buffer it for the next commit
    ///
    /// On failure the image is dropped and no state changes.
    pub fn insert_image(&mut self, pixels: RgbaImage) -> Result<Rect, AtlasError> {
        let (w, h) = pixels.dimensions();
        let rect = self.root.insert(w, h).ok_or(AtlasError::OutOfSpace {
            width: w,
            height: h,
        })?;

        self.pending.push(PendingImage { pixels, rect });
        self.insert_count += 1;
        Ok(rect)
    }

    /// Decode an image file and pack it
    pub fn insert_file<P: AsRef<Path>>(&mut self, path: P) -> Result<Rect, AtlasError> {
        let pixels = image::open(path.as_ref())?.to_rgba8();
        self.insert_image(pixels)
    }

    /// Blit every pending image onto the working surface and return it
    ///
    /// After this returns, the surface reflects every successful insert made
    /// so far, and the pending list is empty.
    pub fn commit_blit(&mut self) -> &RgbaImage {
        if !self.pending.is_empty() {
            debug!(
                "atlas blit: {} pending image(s) onto {}x{} surface",
                self.pending.len(),
                self.width,
                self.height
            );
        }

        for pending in self.pending.drain(..) {
            image::imageops::replace(
                &mut self.surface,
                &pending.pixels,
                i64::from(pending.rect.x),
                i64::from(pending.rect.y),
            );
        }

        &self.surface
    }

    /// The working surface as last committed
    pub fn surface(&self) -> &RgbaImage {
        &self.surface
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn solid(w: u32, h: u32, color: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba(color))
    }

    // Commit paths emit debug logs; route them through the test harness
    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_insert_defers_blit() {
        init_logging();
        let mut atlas = AtlasSurface::new(32, 32);
        let rect = atlas.insert_image(solid(8, 8, [255, 0, 0, 255])).unwrap();

        assert_eq!(atlas.pending_count(), 1);
        // Surface untouched until commit
        assert_eq!(atlas.surface().get_pixel(rect.x, rect.y), &Rgba([0; 4]));

        atlas.commit_blit();
        assert_eq!(atlas.pending_count(), 0);
        assert_eq!(
            atlas.surface().get_pixel(rect.x, rect.y),
            &Rgba([255, 0, 0, 255])
        );
    }

    #[test]
    fn test_commit_blits_every_pending_rect() {
        init_logging();
        let mut atlas = AtlasSurface::new(32, 32);
        let red = atlas.insert_image(solid(16, 16, [255, 0, 0, 255])).unwrap();
        let green = atlas.insert_image(solid(16, 16, [0, 255, 0, 255])).unwrap();
        let blue = atlas.insert_image(solid(16, 16, [0, 0, 255, 255])).unwrap();

        let surface = atlas.commit_blit();
        for (rect, color) in [
            (red, [255, 0, 0, 255]),
            (green, [0, 255, 0, 255]),
            (blue, [0, 0, 255, 255]),
        ] {
            // Check the corners of each committed region
            assert_eq!(surface.get_pixel(rect.x, rect.y), &Rgba(color));
            assert_eq!(
                surface.get_pixel(rect.right() - 1, rect.bottom() - 1),
                &Rgba(color)
            );
        }
    }

    #[test]
    fn test_commits_accumulate() {
        let mut atlas = AtlasSurface::new(32, 32);
        let first = atlas.insert_image(solid(8, 8, [10, 10, 10, 255])).unwrap();
        atlas.commit_blit();

        let second = atlas.insert_image(solid(8, 8, [20, 20, 20, 255])).unwrap();
        let surface = atlas.commit_blit();

        // Earlier commits survive later ones
        assert_eq!(surface.get_pixel(first.x, first.y), &Rgba([10, 10, 10, 255]));
        assert_eq!(
            surface.get_pixel(second.x, second.y),
            &Rgba([20, 20, 20, 255])
        );
    }

    #[test]
    fn test_three_quadrants_then_out_of_space() {
        let mut atlas = AtlasSurface::new(32, 32);
        let mut rects = Vec::new();
        for _ in 0..3 {
            rects.push(atlas.insert_image(solid(16, 16, [1, 2, 3, 255])).unwrap());
        }

        let bounds = Rect::new(0, 0, 32, 32);
        for (i, a) in rects.iter().enumerate() {
            assert!(bounds.contains(a));
            for b in rects.iter().skip(i + 1) {
                assert!(!a.overlaps(b));
            }
        }

        let err = atlas
            .insert_image(solid(32, 32, [0, 0, 0, 255]))
            .unwrap_err();
        assert!(matches!(
            err,
            AtlasError::OutOfSpace {
                width: 32,
                height: 32
            }
        ));
        // The failure buffered nothing
        assert_eq!(atlas.pending_count(), 3);
        assert_eq!(atlas.insert_count(), 3);
    }

    #[test]
    fn test_insert_missing_file_is_recoverable() {
        let mut atlas = AtlasSurface::new(32, 32);
        assert!(atlas.insert_file("no/such/image.png").is_err());
        // The atlas is still usable afterwards
        assert!(atlas.insert_image(solid(4, 4, [9, 9, 9, 255])).is_ok());
    }
}
