// Quad batching: accumulate vertices, flush on texture switch

use super::{SpriteSource, TextureHandle, Vertex};
use crate::math::Rect;
use glam::{Mat4, Vec2, Vec4};
use log::trace;

/// Default scratch capacity in quads
pub const DEFAULT_MAX_QUADS: usize = 1024;

/// One flushed run of quads sharing a texture and a combined matrix
///
/// `base_vertex` indexes into the batch's frame vertex list; every call
/// covers `quad_count * 4` vertices drawn with the fixed per-quad index
/// pattern `0,1,2,2,3,0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall {
    pub texture: TextureHandle,
    pub base_vertex: u32,
    pub quad_count: u32,
    pub matrix_slot: u32,
}

/// Accumulates textured quads and groups them into minimal draw calls
///
/// Quads are written into a fixed-capacity scratch buffer. A flush — moving
/// the scratch into the frame list as one [`DrawCall`] — happens when the
/// texture changes, when the scratch passes half capacity (headroom for one
/// more quad, so it can never overflow), when the active matrix changes, and
/// at `end()`. Draw order is exactly call order; flushing only decides when
/// a run is submitted, never reorders it.
///
/// `draw` is only valid between `begin()` and `end()`; violations are caught
/// by debug assertions rather than corrupting buffered state.
pub struct SpriteBatch {
    scratch: Vec<Vertex>,
    max_quads: usize,
    frame_vertices: Vec<Vertex>,
    calls: Vec<DrawCall>,
    matrices: Vec<Mat4>,
    bound_texture: Option<TextureHandle>,
    drawing: bool,
    color: Vec4,
    projection: Mat4,
    transform: Mat4,
    combined: Mat4,
}

impl SpriteBatch {
    /// Create a batch with the default scratch capacity
    pub fn new() -> Self {
        Self::with_max_quads(DEFAULT_MAX_QUADS)
    }

    /// Create a batch holding at most `max_quads` quads in its scratch
    pub fn with_max_quads(max_quads: usize) -> Self {
        assert!(max_quads >= 2, "batch needs room for at least two quads");
        Self {
            scratch: Vec::with_capacity(max_quads * 4),
            max_quads,
            frame_vertices: Vec::new(),
            calls: Vec::new(),
            matrices: Vec::new(),
            bound_texture: None,
            drawing: false,
            color: Vec4::ONE,
            projection: Mat4::IDENTITY,
            transform: Mat4::IDENTITY,
            combined: Mat4::IDENTITY,
        }
    }

    /// Begin a frame: clears the previous frame's runs and records the
    /// combined matrix the first run will render under
    pub fn begin(&mut self) {
        debug_assert!(!self.drawing, "begin called while already drawing");
        self.drawing = true;
        self.frame_vertices.clear();
        self.calls.clear();
        self.matrices.clear();
        self.bound_texture = None;
        self.combined = self.projection * self.transform;
        self.matrices.push(self.combined);
    }

    /// End the frame, flushing any remaining quads
    pub fn end(&mut self) {
        debug_assert!(self.drawing, "end called without begin");
        self.flush();
        self.drawing = false;
        trace!(
            "batch frame: {} draw call(s), {} vertices",
            self.calls.len(),
            self.frame_vertices.len()
        );
    }

    /// Draw a sprite at its native pixel size
    pub fn draw(&mut self, sprite: &impl SpriteSource, x: f32, y: f32) {
        self.draw_scaled(sprite, x, y, sprite.width() as f32, sprite.height() as f32);
    }

    /// Draw a sprite stretched to `w` x `h`
    pub fn draw_scaled(&mut self, sprite: &impl SpriteSource, x: f32, y: f32, w: f32, h: f32) {
        self.switch_texture(sprite.texture());
        self.push_quad(x, y, w, h, sprite.uv_min(), sprite.uv_max());
    }

    /// Draw a pixel region of a raw texture without building a sprite
    pub fn draw_region(
        &mut self,
        texture: TextureHandle,
        texture_size: (u32, u32),
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        src: Rect,
    ) {
        let (tex_w, tex_h) = texture_size;
        debug_assert!(
            src.right() <= tex_w && src.bottom() <= tex_h,
            "source region {src:?} exceeds {tex_w}x{tex_h} texture bounds"
        );

        let inv_w = 1.0 / tex_w as f32;
        let inv_h = 1.0 / tex_h as f32;
        let uv_min = Vec2::new(src.x as f32 * inv_w, src.y as f32 * inv_h);
        let uv_max = Vec2::new(src.right() as f32 * inv_w, src.bottom() as f32 * inv_h);

        self.switch_texture(texture);
        self.push_quad(x, y, w, h, uv_min, uv_max);
    }

    /// Submit the scratch as one draw call
    ///
    /// No-op while nothing is buffered.
    pub fn flush(&mut self) {
        if self.scratch.is_empty() {
            return;
        }
        let Some(texture) = self.bound_texture else {
            return;
        };

        self.calls.push(DrawCall {
            texture,
            base_vertex: self.frame_vertices.len() as u32,
            quad_count: (self.scratch.len() / 4) as u32,
            matrix_slot: (self.matrices.len() - 1) as u32,
        });
        self.frame_vertices.append(&mut self.scratch);
    }

    /// Replace the projection matrix
    ///
    /// Quads already buffered still render under the old matrix, so a flush
    /// happens first when a frame is open.
    pub fn set_projection_matrix(&mut self, projection: Mat4) {
        if self.drawing {
            self.flush();
        }
        self.projection = projection;
        self.combined = self.projection * self.transform;
        if self.drawing {
            self.matrices.push(self.combined);
        }
    }

    /// Replace the model/view transform matrix; same flushing rule as
    /// [`set_projection_matrix`](SpriteBatch::set_projection_matrix)
    pub fn set_transform_matrix(&mut self, transform: Mat4) {
        if self.drawing {
            self.flush();
        }
        self.transform = transform;
        self.combined = self.projection * self.transform;
        if self.drawing {
            self.matrices.push(self.combined);
        }
    }

    /// Set the fill color applied to subsequent quads (default opaque white)
    pub fn set_color(&mut self, color: Vec4) {
        self.color = color;
    }

    /// Current fill color
    pub fn color(&self) -> Vec4 {
        self.color
    }

    /// Whether a frame is open
    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    /// Scratch capacity in quads
    pub fn max_quads(&self) -> usize {
        self.max_quads
    }

    /// Draw calls recorded this frame
    pub fn calls(&self) -> &[DrawCall] {
        &self.calls
    }

    /// Flushed vertex data for this frame
    pub fn vertices(&self) -> &[Vertex] {
        &self.frame_vertices
    }

    /// Combined matrices referenced by this frame's draw calls
    pub fn matrices(&self) -> &[Mat4] {
        &self.matrices
    }

    fn switch_texture(&mut self, texture: TextureHandle) {
        debug_assert!(self.drawing, "draw called outside begin/end");
        if self.bound_texture != Some(texture) {
            self.flush();
            self.bound_texture = Some(texture);
        }
    }

    fn push_quad(&mut self, x: f32, y: f32, w: f32, h: f32, uv_min: Vec2, uv_max: Vec2) {
        // Corner order: top-left, bottom-left, bottom-right, top-right.
        // uv_min names the region's top-left texel, and world y points up.
        self.scratch.extend_from_slice(&[
            Vertex::new(Vec2::new(x, y + h), self.color, uv_min),
            Vertex::new(Vec2::new(x, y), self.color, Vec2::new(uv_min.x, uv_max.y)),
            Vertex::new(Vec2::new(x + w, y), self.color, uv_max),
            Vertex::new(Vec2::new(x + w, y + h), self.color, Vec2::new(uv_max.x, uv_min.y)),
        ]);

        // Keep headroom for one more quad so the scratch can never overflow
        if self.scratch.len() > self.max_quads * 4 / 2 {
            self.flush();
        }
    }
}

impl Default for SpriteBatch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::Sprite;

    fn sprite(texture: usize) -> Sprite {
        Sprite::new(TextureHandle(texture), (64, 64), Rect::new(0, 0, 16, 16))
    }

    // end() traces per-frame stats; route them through the test harness
    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_same_texture_coalesces_into_one_call() {
        init_logging();
        let mut batch = SpriteBatch::new();
        batch.begin();
        for i in 0..10 {
            batch.draw(&sprite(0), i as f32 * 16.0, 0.0);
        }
        batch.end();

        assert_eq!(batch.calls().len(), 1);
        assert_eq!(batch.calls()[0].quad_count, 10);
        assert_eq!(batch.vertices().len(), 40);
    }

    #[test]
    fn test_texture_switch_flushes() {
        init_logging();
        let a = sprite(1);
        let b = sprite(2);

        let mut batch = SpriteBatch::new();
        batch.begin();
        batch.draw(&a, 0.0, 0.0);
        batch.draw(&b, 32.0, 0.0);
        batch.end();

        let calls = batch.calls();
        assert_eq!(calls.len(), 2);

        // First run holds only the first sprite's four vertices, bound to
        // its texture
        assert_eq!(calls[0].texture, TextureHandle(1));
        assert_eq!(calls[0].base_vertex, 0);
        assert_eq!(calls[0].quad_count, 1);

        assert_eq!(calls[1].texture, TextureHandle(2));
        assert_eq!(calls[1].base_vertex, 4);
        assert_eq!(calls[1].quad_count, 1);
    }

    #[test]
    fn test_quad_corner_order_and_uvs() {
        let s = Sprite::new(TextureHandle(0), (64, 64), Rect::new(16, 16, 32, 16));

        let mut batch = SpriteBatch::new();
        batch.begin();
        batch.draw(&s, 10.0, 20.0);
        batch.end();

        let v = batch.vertices();
        // top-left, bottom-left, bottom-right, top-right
        assert_eq!(v[0].position, [10.0, 36.0]);
        assert_eq!(v[1].position, [10.0, 20.0]);
        assert_eq!(v[2].position, [42.0, 20.0]);
        assert_eq!(v[3].position, [42.0, 36.0]);

        // Top corners sample the top of the region
        assert_eq!(v[0].uv, [0.25, 0.25]);
        assert_eq!(v[1].uv, [0.25, 0.5]);
        assert_eq!(v[2].uv, [0.75, 0.5]);
        assert_eq!(v[3].uv, [0.75, 0.25]);
    }

    #[test]
    fn test_fill_color_is_per_quad_state() {
        let mut batch = SpriteBatch::new();
        batch.begin();
        batch.draw(&sprite(0), 0.0, 0.0);
        batch.set_color(Vec4::new(1.0, 0.0, 0.0, 0.5));
        batch.draw(&sprite(0), 16.0, 0.0);
        batch.end();

        let v = batch.vertices();
        assert_eq!(v[0].color, [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(v[4].color, [1.0, 0.0, 0.0, 0.5]);
        // One texture throughout, so still a single call
        assert_eq!(batch.calls().len(), 1);
    }

    #[test]
    fn test_half_full_scratch_flushes_early() {
        let mut batch = SpriteBatch::with_max_quads(4); // threshold: >8 vertices
        batch.begin();
        for i in 0..5 {
            batch.draw(&sprite(0), i as f32, 0.0);
        }
        batch.end();

        let quads: Vec<u32> = batch.calls().iter().map(|c| c.quad_count).collect();
        assert_eq!(quads, [3, 2]);
        assert_eq!(batch.vertices().len(), 20);
    }

    #[test]
    fn test_empty_frame_records_nothing() {
        let mut batch = SpriteBatch::new();
        batch.begin();
        batch.flush(); // explicit flush with nothing buffered is a no-op
        batch.end();

        assert!(batch.calls().is_empty());
        assert!(batch.vertices().is_empty());
    }

    #[test]
    fn test_matrix_change_splits_runs() {
        let mut batch = SpriteBatch::new();
        batch.begin();
        batch.draw(&sprite(0), 0.0, 0.0);
        batch.set_projection_matrix(Mat4::orthographic_rh(0.0, 800.0, 0.0, 600.0, -1.0, 1.0));
        batch.draw(&sprite(0), 16.0, 0.0);
        batch.end();

        let calls = batch.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].matrix_slot, 0);
        assert_eq!(calls[1].matrix_slot, 1);
        assert_eq!(batch.matrices().len(), 2);
        assert_eq!(batch.matrices()[0], Mat4::IDENTITY);
    }

    #[test]
    fn test_matrix_outside_frame_takes_effect_next_begin() {
        let mut batch = SpriteBatch::new();
        let ortho = Mat4::orthographic_rh(0.0, 320.0, 0.0, 240.0, -1.0, 1.0);
        batch.set_projection_matrix(ortho);

        batch.begin();
        batch.draw(&sprite(0), 0.0, 0.0);
        batch.end();

        assert_eq!(batch.matrices(), std::slice::from_ref(&ortho));
    }

    #[test]
    fn test_draw_region_without_sprite() {
        let mut batch = SpriteBatch::new();
        batch.begin();
        batch.draw_region(
            TextureHandle(7),
            (128, 128),
            0.0,
            0.0,
            64.0,
            64.0,
            Rect::new(32, 0, 64, 64),
        );
        batch.end();

        assert_eq!(batch.calls().len(), 1);
        assert_eq!(batch.calls()[0].texture, TextureHandle(7));
        assert_eq!(batch.vertices()[1].uv, [0.25, 0.5]); // bottom-left
    }

    #[test]
    fn test_draw_order_is_call_order() {
        let mut batch = SpriteBatch::new();
        batch.begin();
        for i in 0..3 {
            batch.draw(&sprite(0), i as f32 * 100.0, 0.0);
        }
        batch.end();

        let xs: Vec<f32> = batch
            .vertices()
            .chunks(4)
            .map(|quad| quad[1].position[0]) // bottom-left x per quad
            .collect();
        assert_eq!(xs, [0.0, 100.0, 200.0]);
    }

    #[test]
    #[should_panic(expected = "outside begin/end")]
    fn test_draw_before_begin_panics() {
        let mut batch = SpriteBatch::new();
        batch.draw(&sprite(0), 0.0, 0.0);
    }

    #[test]
    #[should_panic(expected = "without begin")]
    fn test_end_before_begin_panics() {
        let mut batch = SpriteBatch::new();
        batch.end();
    }

    #[test]
    #[should_panic(expected = "already drawing")]
    fn test_nested_begin_panics() {
        let mut batch = SpriteBatch::new();
        batch.begin();
        batch.begin();
    }
}
