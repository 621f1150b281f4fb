// Orthographic camera for 2D rendering

use glam::{Mat4, Vec2, Vec3, Vec4};

/// Orthographic camera
///
/// Holds position/direction/up vectors and derives the projection, view,
/// and combined matrices on [`update`]. The combined matrix is what the
/// sprite batch consumes as its projection.
///
/// [`update`]: Camera::update
#[derive(Debug, Clone)]
pub struct Camera {
    /// Camera position in world space
    pub position: Vec3,
    /// View direction (unit vector)
    pub direction: Vec3,
    /// Up vector (unit vector)
    pub up: Vec3,
    /// Zoom level (1.0 = normal, 2.0 = zoomed in 2x)
    pub zoom: f32,
    /// Near clipping plane
    pub near: f32,
    /// Far clipping plane
    pub far: f32,
    viewport_width: f32,
    viewport_height: f32,
    projection: Mat4,
    view: Mat4,
    combined: Mat4,
}

impl Camera {
    /// Create a y-up camera centered on the viewport
    pub fn new(viewport_width: f32, viewport_height: f32) -> Self {
        let mut camera = Self {
            position: Vec3::ZERO,
            direction: Vec3::NEG_Z,
            up: Vec3::Y,
            zoom: 1.0,
            near: -100.0,
            far: 100.0,
            viewport_width,
            viewport_height,
            projection: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            combined: Mat4::IDENTITY,
        };
        camera.set_to_ortho(false, viewport_width, viewport_height);
        camera
    }

    /// Reconfigure for a full-viewport orthographic view
    ///
    /// With `y_down` the world origin lands at the top-left screen corner
    /// and y grows downward; otherwise the origin is bottom-left with y up.
    /// The camera is repositioned to center the `width` x `height` region.
    pub fn set_to_ortho(&mut self, y_down: bool, width: f32, height: f32) {
        if y_down {
            self.up = Vec3::NEG_Y;
            self.direction = Vec3::Z;
        } else {
            self.up = Vec3::Y;
            self.direction = Vec3::NEG_Z;
        }
        self.position = Vec3::new(width / 2.0, height / 2.0, 0.0);
        self.viewport_width = width;
        self.viewport_height = height;
        self.update();
    }

    /// Recompute projection, view, and combined matrices from the current
    /// position/direction/up/zoom state
    pub fn update(&mut self) {
        let half_w = (self.viewport_width / 2.0) / self.zoom;
        let half_h = (self.viewport_height / 2.0) / self.zoom;

        self.projection =
            Mat4::orthographic_rh(-half_w, half_w, -half_h, half_h, self.near, self.far);
        self.view = Mat4::look_at_rh(self.position, self.position + self.direction, self.up);
        self.combined = self.projection * self.view;
    }

    /// Move the camera and refresh its matrices
    pub fn translate(&mut self, delta: Vec2) {
        self.position += Vec3::new(delta.x, delta.y, 0.0);
        self.update();
    }

    /// Set camera zoom, refreshing matrices
    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom.max(0.1); // Prevent zoom from being too small
        self.update();
    }

    /// Resize the viewport, refreshing matrices
    pub fn resize(&mut self, width: f32, height: f32) {
        self.viewport_width = width;
        self.viewport_height = height;
        self.update();
    }

    /// Map a screen-space point (pixels, origin top-left) to world space
    ///
    /// Uses the inverse combined matrix, so it stays correct for any
    /// position/zoom/axis configuration.
    pub fn unproject(&self, screen: Vec2) -> Vec3 {
        let ndc = Vec2::new(
            (screen.x / self.viewport_width) * 2.0 - 1.0,
            1.0 - (screen.y / self.viewport_height) * 2.0,
        );

        let world = self.combined.inverse() * Vec4::new(ndc.x, ndc.y, 0.0, 1.0);
        world.truncate()
    }

    /// Viewport width in pixels
    pub fn viewport_width(&self) -> f32 {
        self.viewport_width
    }

    /// Viewport height in pixels
    pub fn viewport_height(&self) -> f32 {
        self.viewport_height
    }

    /// The orthographic projection matrix
    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    /// The look-at view matrix
    pub fn view(&self) -> Mat4 {
        self.view
    }

    /// Projection x view, as consumed by the sprite batch
    pub fn combined(&self) -> Mat4 {
        self.combined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_y_up_origin_is_bottom_left() {
        let camera = Camera::new(800.0, 600.0);

        let bottom_left = camera.unproject(Vec2::new(0.0, 600.0));
        assert_relative_eq!(bottom_left.x, 0.0, epsilon = 1e-3);
        assert_relative_eq!(bottom_left.y, 0.0, epsilon = 1e-3);

        let top_left = camera.unproject(Vec2::ZERO);
        assert_relative_eq!(top_left.y, 600.0, epsilon = 1e-3);
    }

    #[test]
    fn test_y_down_origin_is_top_left() {
        let mut camera = Camera::new(800.0, 600.0);
        camera.set_to_ortho(true, 800.0, 600.0);

        let top_left = camera.unproject(Vec2::ZERO);
        assert_relative_eq!(top_left.x, 0.0, epsilon = 1e-3);
        assert_relative_eq!(top_left.y, 0.0, epsilon = 1e-3);

        let bottom_right = camera.unproject(Vec2::new(800.0, 600.0));
        assert_relative_eq!(bottom_right.x, 800.0, epsilon = 1e-3);
        assert_relative_eq!(bottom_right.y, 600.0, epsilon = 1e-3);
    }

    #[test]
    fn test_screen_center_maps_to_camera_position() {
        let mut camera = Camera::new(640.0, 480.0);
        camera.position = Vec3::new(1000.0, -250.0, 0.0);
        camera.update();

        let center = camera.unproject(Vec2::new(320.0, 240.0));
        assert_relative_eq!(center.x, 1000.0, epsilon = 1e-2);
        assert_relative_eq!(center.y, -250.0, epsilon = 1e-2);
    }

    #[test]
    fn test_zoom_narrows_coverage() {
        let mut camera = Camera::new(800.0, 600.0);
        camera.set_zoom(2.0);

        // Zoomed in 2x: the left edge is halfway between center and the
        // unzoomed edge
        let left = camera.unproject(Vec2::new(0.0, 300.0));
        assert_relative_eq!(left.x, 200.0, epsilon = 1e-2);
    }

    #[test]
    fn test_translate_shifts_view() {
        let mut camera = Camera::new(800.0, 600.0);
        camera.translate(Vec2::new(100.0, 50.0));

        let center = camera.unproject(Vec2::new(400.0, 300.0));
        assert_relative_eq!(center.x, 500.0, epsilon = 1e-2);
        assert_relative_eq!(center.y, 350.0, epsilon = 1e-2);
    }

    #[test]
    fn test_combined_is_projection_times_view() {
        let camera = Camera::new(320.0, 240.0);
        let expected = camera.projection() * camera.view();
        assert_eq!(camera.combined(), expected);
    }

    #[test]
    fn test_minimum_zoom_clamped() {
        let mut camera = Camera::new(100.0, 100.0);
        camera.set_zoom(0.0);
        assert_relative_eq!(camera.zoom, 0.1);
    }
}
