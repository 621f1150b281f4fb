// Texture loading and the GPU texture handle pool

use image::GenericImageView;
use std::collections::HashMap;
use std::path::Path;

/// Default number of slots in a [`TextureManager`] pool
pub const DEFAULT_POOL_CAPACITY: usize = 256;

/// Texture loading and pool errors
#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    #[error("texture pool exhausted ({capacity} slots in use)")]
    PoolExhausted { capacity: usize },

    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Handle to a texture slot in a [`TextureManager`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub(crate) usize);

/// A loaded texture with GPU resources
///
/// The wgpu handles release their GPU objects when dropped, so a `Texture`
/// leaving the pool (or a constructor failing partway) never leaks.
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    /// Create a texture from encoded image bytes
    pub fn from_bytes(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        bytes: &[u8],
        label: &str,
    ) -> Result<Self, TextureError> {
        let img = image::load_from_memory(bytes)?;
        Ok(Self::from_image(device, queue, &img, Some(label)))
    }

    /// Create a texture from a decoded image
    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        img: &image::DynamicImage,
        label: Option<&str>,
    ) -> Self {
        let rgba = img.to_rgba8();
        let (width, height) = img.dimensions();

        let texture = Self::blank(device, width, height, label);
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &rgba,
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

        texture
    }

    /// Create an empty texture that can be written to later
    ///
    /// Used as the GPU side of a packed atlas; contents are undefined until
    /// the first upload.
    pub fn blank(device: &wgpu::Device, width: u32, height: u32, label: Option<&str>) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
            width,
            height,
        }
    }

    /// Create a 1x1 solid color texture (useful as a default white)
    pub fn from_color(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        color: [u8; 4],
        label: Option<&str>,
    ) -> Self {
        let texture = Self::blank(device, 1, 1, label);
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &color,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4),
                rows_per_image: Some(1),
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
        texture
    }

    /// Texture dimensions in pixels
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Fixed-capacity slot storage with a free list
///
/// Released slots are recycled instead of handing out ever-increasing
/// indices, so a long-running process that loads and releases resources
/// stays within a bounded handle range.
struct SlotPool<T> {
    slots: Vec<Option<T>>,
    free: Vec<usize>,
    capacity: usize,
}

impl<T> SlotPool<T> {
    fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            capacity,
        }
    }

    fn insert(&mut self, value: T) -> Option<usize> {
        if let Some(index) = self.free.pop() {
            self.slots[index] = Some(value);
            return Some(index);
        }

        if self.slots.len() >= self.capacity {
            return None;
        }

        self.slots.push(Some(value));
        Some(self.slots.len() - 1)
    }

    fn get(&self, index: usize) -> Option<&T> {
        self.slots.get(index).and_then(|slot| slot.as_ref())
    }

    fn remove(&mut self, index: usize) -> Option<T> {
        let value = self.slots.get_mut(index)?.take()?;
        self.free.push(index);
        Some(value)
    }

    fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }
}

/// Texture pool with explicit release and path-based caching
pub struct TextureManager {
    pool: SlotPool<Texture>,
    path_cache: HashMap<String, TextureHandle>,
}

impl TextureManager {
    /// Create a pool with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_POOL_CAPACITY)
    }

    /// Create a pool with an explicit slot capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pool: SlotPool::new(capacity),
            path_cache: HashMap::new(),
        }
    }

    /// Add a texture to the pool
    pub fn insert(&mut self, texture: Texture) -> Result<TextureHandle, TextureError> {
        self.pool
            .insert(texture)
            .map(TextureHandle)
            .ok_or(TextureError::PoolExhausted {
                capacity: self.pool.capacity,
            })
    }

    /// Load a texture from a file path, reusing a previously loaded slot
    pub fn load_file<P: AsRef<Path>>(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        path: P,
    ) -> Result<TextureHandle, TextureError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        if let Some(&handle) = self.path_cache.get(&path_str) {
            return Ok(handle);
        }

        let bytes = std::fs::read(&path)?;
        let texture = Texture::from_bytes(device, queue, &bytes, &path_str)?;
        let handle = self.insert(texture)?;
        self.path_cache.insert(path_str, handle);

        Ok(handle)
    }

    /// Create an empty texture slot for atlas uploads
    pub fn create_blank(
        &mut self,
        device: &wgpu::Device,
        width: u32,
        height: u32,
        label: &str,
    ) -> Result<TextureHandle, TextureError> {
        self.insert(Texture::blank(device, width, height, Some(label)))
    }

    /// Get a texture by handle
    pub fn get(&self, handle: TextureHandle) -> Option<&Texture> {
        self.pool.get(handle.0)
    }

    /// Release a texture, returning its slot to the free list
    ///
    /// The returned texture drops its GPU resources when it goes out of
    /// scope. Any cached bind groups for this handle must be invalidated by
    /// the caller (the renderer glue does this).
    pub fn release(&mut self, handle: TextureHandle) -> Option<Texture> {
        let texture = self.pool.remove(handle.0)?;
        self.path_cache.retain(|_, &mut h| h != handle);
        Some(texture)
    }

    /// Number of live textures in the pool
    pub fn len(&self) -> usize {
        self.pool.len()
    }

    /// Whether the pool holds no textures
    pub fn is_empty(&self) -> bool {
        self.pool.len() == 0
    }

    /// Total slot capacity
    pub fn capacity(&self) -> usize {
        self.pool.capacity
    }
}

impl Default for TextureManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // GPU-backed constructors need a device; the pool bookkeeping is
    // exercised directly instead.

    #[test]
    fn test_pool_insert_and_get() {
        let mut pool = SlotPool::new(4);
        let a = pool.insert("a").unwrap();
        let b = pool.insert("b").unwrap();

        assert_eq!(pool.get(a), Some(&"a"));
        assert_eq!(pool.get(b), Some(&"b"));
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_pool_capacity_bound() {
        let mut pool = SlotPool::new(2);
        pool.insert(1).unwrap();
        pool.insert(2).unwrap();
        assert!(pool.insert(3).is_none());
    }

    #[test]
    fn test_pool_recycles_released_slots() {
        let mut pool = SlotPool::new(2);
        let a = pool.insert("a").unwrap();
        pool.insert("b").unwrap();

        assert_eq!(pool.remove(a), Some("a"));
        assert!(pool.get(a).is_none());

        // The freed slot is reused rather than growing past capacity
        let c = pool.insert("c").unwrap();
        assert_eq!(c, a);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_pool_remove_unknown_slot() {
        let mut pool: SlotPool<u32> = SlotPool::new(4);
        assert!(pool.remove(3).is_none());
    }

    #[test]
    fn test_manager_unknown_handle() {
        let manager = TextureManager::with_capacity(4);
        assert!(manager.get(TextureHandle(0)).is_none());
        assert!(manager.is_empty());
    }
}
