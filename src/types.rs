use serde::{Deserialize, Serialize};

/// A 2D point with floating-point coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub const fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    pub fn distance(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Clamp into `[0, width - 1] x [0, height - 1]`.
    pub fn constrain(&self, width: u32, height: u32) -> Point {
        Point::new(
            self.x.max(0.0).min(width as f32 - 1.0),
            self.y.max(0.0).min(height as f32 - 1.0),
        )
    }
}

impl std::ops::Add for Point {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::AddAssign for Point {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl std::ops::Sub for Point {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl std::ops::Mul<f32> for Point {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self::Output {
        Self {
            x: self.x * rhs,
            y: self.y * rhs,
        }
    }
}

impl std::ops::Div<f32> for Point {
    type Output = Self;

    fn div(self, rhs: f32) -> Self::Output {
        Self {
            x: self.x / rhs,
            y: self.y / rhs,
        }
    }
}

/// Integer pixel rectangle: `x..x + width`, `y..y + height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Smallest pixel rectangle covering every point.
    ///
    /// Origin is `floor(min)` and extent `floor(max) - floor(min) + 1`, so a
    /// single point yields a 1x1 rectangle. Returns `None` for an empty slice.
    pub fn bounding(points: &[Point]) -> Option<Rect> {
        let first = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }

        let x0 = min_x.floor() as i32;
        let y0 = min_y.floor() as i32;
        let x1 = max_x.floor() as i32;
        let y1 = max_y.floor() as i32;
        Some(Rect::new(x0, y0, (x1 - x0 + 1) as u32, (y1 - y0 + 1) as u32))
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x as f32, self.y as f32)
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Closed containment test against the real-valued rectangle
    /// `[x, x + width] x [y, y + height]`.
    pub fn contains(&self, p: &Point) -> bool {
        p.x >= self.x as f32
            && p.y >= self.y as f32
            && p.x <= (self.x as i64 + self.width as i64) as f32
            && p.y <= (self.y as i64 + self.height as i64) as f32
    }
}

/// Three indices into a shared point indexing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triangle {
    pub a: usize,
    pub b: usize,
    pub c: usize,
}

impl Triangle {
    pub const fn new(a: usize, b: usize, c: usize) -> Self {
        Self { a, b, c }
    }

    pub fn indices(&self) -> [usize; 3] {
        [self.a, self.b, self.c]
    }

    /// Resolve the vertex coordinates against a point set.
    pub fn vertices(&self, points: &PointSet) -> [Point; 3] {
        [points[self.a], points[self.b], points[self.c]]
    }

    /// Same triangle with its indices in ascending order.
    pub fn sorted(&self) -> Triangle {
        let mut idx = self.indices();
        idx.sort_unstable();
        Triangle::new(idx[0], idx[1], idx[2])
    }
}

/// An ordered collection of points sharing one index scheme across images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointSet {
    pub points: Vec<Point>,
}

impl PointSet {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn with_capacity(n: usize) -> Self {
        Self {
            points: Vec::with_capacity(n),
        }
    }

    /// Create a zeroed set with n points.
    pub fn zeros(n: usize) -> Self {
        Self {
            points: vec![Point::zero(); n],
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Add another set's points index by index.
    pub fn accumulate(&mut self, other: &PointSet) {
        debug_assert_eq!(self.points.len(), other.points.len());
        for (p, q) in self.points.iter_mut().zip(other.points.iter()) {
            *p += *q;
        }
    }

    /// Divide every point by a scalar.
    pub fn scale(&mut self, factor: f32) {
        for p in &mut self.points {
            *p = *p * factor;
        }
    }
}

impl std::ops::Index<usize> for PointSet {
    type Output = Point;

    fn index(&self, idx: usize) -> &Self::Output {
        &self.points[idx]
    }
}

impl std::ops::IndexMut<usize> for PointSet {
    fn index_mut(&mut self, idx: usize) -> &mut Self::Output {
        &mut self.points[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_arithmetic() {
        let a = Point::new(1.0, 2.0);
        let b = Point::new(3.0, 4.0);

        let sum = a + b;
        assert_eq!(sum.x, 4.0);
        assert_eq!(sum.y, 6.0);

        let diff = b - a;
        assert_eq!(diff.x, 2.0);
        assert_eq!(diff.y, 2.0);

        let scaled = a * 2.0;
        assert_eq!(scaled.x, 2.0);
        assert_eq!(scaled.y, 4.0);

        let halved = b / 2.0;
        assert_eq!(halved.x, 1.5);
        assert_eq!(halved.y, 2.0);
    }

    #[test]
    fn constrain_clamps_into_canvas() {
        let p = Point::new(-4.0, 700.0).constrain(600, 600);
        assert_eq!(p, Point::new(0.0, 599.0));

        let inside = Point::new(12.5, 40.25).constrain(600, 600);
        assert_eq!(inside, Point::new(12.5, 40.25));
    }

    #[test]
    fn bounding_rect_uses_pixel_extent() {
        let pts = [
            Point::new(10.2, 5.9),
            Point::new(20.7, 8.0),
            Point::new(15.0, 30.5),
        ];
        let r = Rect::bounding(&pts).unwrap();
        assert_eq!(r, Rect::new(10, 5, 11, 26));

        let single = Rect::bounding(&[Point::new(3.4, 3.4)]).unwrap();
        assert_eq!(single, Rect::new(3, 3, 1, 1));

        assert!(Rect::bounding(&[]).is_none());
    }

    #[test]
    fn rect_containment_is_closed() {
        let r = Rect::new(0, 0, 600, 600);
        assert!(r.contains(&Point::new(0.0, 0.0)));
        assert!(r.contains(&Point::new(600.0, 600.0)));
        assert!(!r.contains(&Point::new(-0.01, 10.0)));
        assert!(!r.contains(&Point::new(10.0, 600.5)));
    }

    #[test]
    fn point_set_accumulate_and_scale() {
        let mut acc = PointSet::zeros(2);
        acc.accumulate(&PointSet::new(vec![Point::new(1.0, 2.0), Point::new(3.0, 4.0)]));
        acc.accumulate(&PointSet::new(vec![Point::new(3.0, 2.0), Point::new(1.0, 0.0)]));
        acc.scale(0.5);

        assert!((acc[0].x - 2.0).abs() < 1e-6);
        assert!((acc[0].y - 2.0).abs() < 1e-6);
        assert!((acc[1].x - 2.0).abs() < 1e-6);
        assert!((acc[1].y - 2.0).abs() < 1e-6);
    }

    #[test]
    fn triangle_sorted() {
        assert_eq!(Triangle::new(5, 1, 3).sorted(), Triangle::new(1, 3, 5));
    }
}
