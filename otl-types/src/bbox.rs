//! Glyph bounding boxes

/// A bounding box, in whatever units the caller is working in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BoundingBox<T> {
    pub x_min: T,
    pub y_min: T,
    pub x_max: T,
    pub y_max: T,
}

impl<T: PartialOrd> BoundingBox<T> {
    /// `true` if this box encloses no area.
    pub fn is_empty(&self) -> bool {
        self.x_min >= self.x_max || self.y_min >= self.y_max
    }
}
