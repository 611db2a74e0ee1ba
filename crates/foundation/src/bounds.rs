use serde::{Deserialize, Serialize};

/// Screen-space axis-aligned rectangle.
///
/// Convention: `min` is the top-left corner and `max` the bottom-right corner
/// in a y-down coordinate system. Both edges are inclusive, so rectangles that
/// only touch along an edge still intersect.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aabb2 {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl Aabb2 {
    pub fn new(min: [f64; 2], max: [f64; 2]) -> Self {
        Aabb2 { min, max }
    }

    /// Rectangle with its top-left corner at `origin`.
    pub fn from_origin_size(origin: [f64; 2], size: [f64; 2]) -> Self {
        Aabb2 {
            min: origin,
            max: [origin[0] + size[0], origin[1] + size[1]],
        }
    }

    pub fn width(&self) -> f64 {
        self.max[0] - self.min[0]
    }

    pub fn height(&self) -> f64 {
        self.max[1] - self.min[1]
    }

    pub fn size(&self) -> [f64; 2] {
        [self.width(), self.height()]
    }

    pub fn translate(&self, d: [f64; 2]) -> Self {
        Aabb2 {
            min: [self.min[0] + d[0], self.min[1] + d[1]],
            max: [self.max[0] + d[0], self.max[1] + d[1]],
        }
    }

    pub fn is_finite(&self) -> bool {
        self.min.iter().chain(self.max.iter()).all(|v| v.is_finite())
    }

    /// Closed-interval overlap test on both axes.
    pub fn intersects(&self, other: &Aabb2) -> bool {
        self.min[0] <= other.max[0]
            && other.min[0] <= self.max[0]
            && self.min[1] <= other.max[1]
            && other.min[1] <= self.max[1]
    }
}

#[cfg(test)]
mod tests {
    use super::Aabb2;

    #[test]
    fn touching_edges_intersect() {
        let a = Aabb2::new([0.0, 0.0], [10.0, 10.0]);
        let b = Aabb2::new([10.0, 5.0], [20.0, 8.0]);
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
    }

    #[test]
    fn separated_on_one_axis_do_not_intersect() {
        let a = Aabb2::new([0.0, 0.0], [10.0, 10.0]);
        let b = Aabb2::new([2.0, 10.5], [8.0, 12.0]);
        assert!(!a.intersects(&b));
    }

    #[test]
    fn nan_never_intersects() {
        let a = Aabb2::new([0.0, 0.0], [10.0, 10.0]);
        let b = Aabb2::new([f64::NAN, 0.0], [5.0, 5.0]);
        assert!(!a.intersects(&b));
        assert!(!b.is_finite());
    }

    #[test]
    fn translate_keeps_size() {
        let a = Aabb2::from_origin_size([1.0, 2.0], [30.0, 13.0]);
        let b = a.translate([-30.0, -13.0]);
        assert_eq!(b.size(), [30.0, 13.0]);
        assert_eq!(b.min, [-29.0, -11.0]);
    }
}
