// Axis-aligned rectangle math shared by the atlas packer and sprite UVs

/// An axis-aligned rectangle in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    /// Create a new rectangle
    pub const fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// The x coordinate one past the right edge
    pub const fn right(&self) -> u32 {
        self.x + self.w
    }

    /// The y coordinate one past the bottom edge
    pub const fn bottom(&self) -> u32 {
        self.y + self.h
    }

    /// Area in pixels
    pub const fn area(&self) -> u32 {
        self.w * self.h
    }

    /// Check whether `other` lies entirely inside this rectangle
    pub const fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Check whether this rectangle and `other` share any pixel
    pub const fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}
