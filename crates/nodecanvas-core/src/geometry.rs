//! Geometry primitives.
//!
//! Pixel-space values use `f32` (`Vec2`, `Rect`); grid-space values are whole
//! cells (`GridPoint`, `GridSize`, `GridRect`).

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Sub};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Sum of the absolute coordinate differences.
    pub fn manhattan_distance(&self, other: Vec2) -> f32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

/// Axis-aligned rectangle in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    /// An empty rectangle
    pub const NOTHING: Self = Self {
        min: Vec2 { x: 0.0, y: 0.0 },
        max: Vec2 { x: 0.0, y: 0.0 },
    };

    /// Create a new rectangle from min and max corners
    pub fn from_min_max(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Create a new rectangle from position and size
    pub fn from_pos_size(pos: Vec2, size: Vec2) -> Self {
        Self {
            min: pos,
            max: Vec2::new(pos.x + size.x, pos.y + size.y),
        }
    }

    /// Smallest rectangle containing both points, in any order.
    pub fn from_points(a: Vec2, b: Vec2) -> Self {
        Self {
            min: Vec2::new(a.x.min(b.x), a.y.min(b.y)),
            max: Vec2::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width(), self.height())
    }

    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(
            self.min.x + self.width() * 0.5,
            self.min.y + self.height() * 0.5,
        )
    }

    /// Check if the rectangle contains a point (edges inclusive)
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    /// Check if this rectangle intersects with another rectangle (touching edges count)
    pub fn intersects(&self, other: &Rect) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    /// Overlapping region, or `None` when the rectangles are disjoint.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let min = Vec2::new(self.min.x.max(other.min.x), self.min.y.max(other.min.y));
        let max = Vec2::new(self.max.x.min(other.max.x), self.max.y.min(other.max.y));
        if min.x > max.x || min.y > max.y {
            None
        } else {
            Some(Rect { min, max })
        }
    }

    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            min: Vec2::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Vec2::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }

    /// Grow the rectangle by `amount` on every side
    pub fn expand(&self, amount: f32) -> Rect {
        Rect {
            min: Vec2::new(self.min.x - amount, self.min.y - amount),
            max: Vec2::new(self.max.x + amount, self.max.y + amount),
        }
    }

    pub fn translate(&self, offset: Vec2) -> Rect {
        Rect {
            min: self.min + offset,
            max: self.max + offset,
        }
    }
}

/// A position in grid cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GridPoint {
    pub x: i32,
    pub y: i32,
}

impl GridPoint {
    pub const ORIGIN: Self = Self { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// An extent in grid cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GridSize {
    pub width: i32,
    pub height: i32,
}

impl GridSize {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// A rectangle of whole grid cells.
///
/// Unlike [`Rect`], rectangles that only share an edge do not intersect: two
/// nodes stacked directly on top of each other are not overlapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GridRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl GridRect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_origin_size(origin: GridPoint, size: GridSize) -> Self {
        Self::new(origin.x, origin.y, size.width, size.height)
    }

    pub fn origin(&self) -> GridPoint {
        GridPoint::new(self.x, self.y)
    }

    pub fn size(&self) -> GridSize {
        GridSize::new(self.width, self.height)
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn intersects(&self, other: &GridRect) -> bool {
        if self.width <= 0 || self.height <= 0 || other.width <= 0 || other.height <= 0 {
            return false;
        }
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    pub fn contains(&self, point: GridPoint) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }

    pub fn moved_to(&self, origin: GridPoint) -> GridRect {
        GridRect::new(origin.x, origin.y, self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_rect(x: f32, y: f32, w: f32, h: f32) -> Rect {
        Rect::from_pos_size(Vec2::new(x, y), Vec2::new(w, h))
    }

    #[test]
    fn test_rect_from_points_orders_corners() {
        let r = Rect::from_points(Vec2::new(10.0, 5.0), Vec2::new(2.0, 8.0));
        assert_eq!(r.min, Vec2::new(2.0, 5.0));
        assert_eq!(r.max, Vec2::new(10.0, 8.0));
    }

    #[test]
    fn test_rect_intersection() {
        let a = make_rect(0.0, 0.0, 10.0, 10.0);
        let b = make_rect(5.0, 5.0, 10.0, 10.0);
        let i = a.intersection(&b).unwrap();
        assert_eq!(i, make_rect(5.0, 5.0, 5.0, 5.0));
        assert_eq!(i.area(), 25.0);

        let c = make_rect(20.0, 20.0, 1.0, 1.0);
        assert!(a.intersection(&c).is_none());
    }

    #[test]
    fn test_rect_contains_is_inclusive() {
        let r = make_rect(0.0, 0.0, 10.0, 10.0);
        assert!(r.contains(Vec2::new(10.0, 10.0)));
        assert!(!r.contains(Vec2::new(10.1, 5.0)));
    }

    #[test]
    fn test_grid_rect_touching_does_not_intersect() {
        let a = GridRect::new(0, 0, 4, 3);
        let below = GridRect::new(0, 3, 4, 3);
        let overlapping = GridRect::new(3, 2, 4, 3);
        assert!(!a.intersects(&below));
        assert!(a.intersects(&overlapping));
        assert!(overlapping.intersects(&a));
    }

    #[test]
    fn test_grid_rect_empty_never_intersects() {
        let a = GridRect::new(0, 0, 0, 3);
        let b = GridRect::new(0, 0, 4, 3);
        assert!(!a.intersects(&b));
    }

    #[test]
    fn test_manhattan_distance() {
        let a = Vec2::new(1.0, 2.0);
        let b = Vec2::new(4.0, -2.0);
        assert_eq!(a.manhattan_distance(b), 7.0);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn grid_rect_strategy() -> impl Strategy<Value = GridRect> {
        (-50i32..50, -50i32..50, 1i32..20, 1i32..20)
            .prop_map(|(x, y, w, h)| GridRect::new(x, y, w, h))
    }

    proptest! {
        #[test]
        fn prop_grid_intersection_is_symmetric(a in grid_rect_strategy(), b in grid_rect_strategy()) {
            prop_assert_eq!(a.intersects(&b), b.intersects(&a));
        }

        #[test]
        fn prop_grid_rect_intersects_itself(a in grid_rect_strategy()) {
            prop_assert!(a.intersects(&a));
        }

        #[test]
        fn prop_intersection_is_within_both(
            (ax, ay, aw, ah) in (0.0f32..100.0, 0.0f32..100.0, 1.0f32..50.0, 1.0f32..50.0),
            (bx, by, bw, bh) in (0.0f32..100.0, 0.0f32..100.0, 1.0f32..50.0, 1.0f32..50.0),
        ) {
            let a = Rect::from_pos_size(Vec2::new(ax, ay), Vec2::new(aw, ah));
            let b = Rect::from_pos_size(Vec2::new(bx, by), Vec2::new(bw, bh));
            if let Some(i) = a.intersection(&b) {
                prop_assert!(i.area() <= a.area() + 1e-3);
                prop_assert!(i.area() <= b.area() + 1e-3);
            }
        }
    }
}
