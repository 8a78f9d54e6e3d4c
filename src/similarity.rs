//! 2x3 affine maps: similarity fitting from eye anchors and exact
//! three-point solves for per-triangle warps.

use serde::{Deserialize, Serialize};

use crate::types::Point;

/// Anchors closer than this are treated as coincident.
const MIN_ANCHOR_DISTANCE: f64 = 1e-6;

/// Determinants below this magnitude make a three-point system singular.
const SINGULAR_EPSILON: f64 = 1e-9;

/// A 2x3 affine transform `[a b tx; c d ty]` acting on column vectors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Affine2 {
    pub m: [[f64; 3]; 2],
}

impl Affine2 {
    pub const fn new(m: [[f64; 3]; 2]) -> Self {
        Self { m }
    }

    pub const fn identity() -> Self {
        Self::new([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]])
    }

    pub fn apply(&self, p: Point) -> Point {
        let (x, y) = (p.x as f64, p.y as f64);
        Point::new(
            (self.m[0][0] * x + self.m[0][1] * y + self.m[0][2]) as f32,
            (self.m[1][0] * x + self.m[1][1] * y + self.m[1][2]) as f32,
        )
    }

    /// Apply to `(x, y)` in double precision.
    #[inline]
    pub fn apply_f64(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.m[0][0] * x + self.m[0][1] * y + self.m[0][2],
            self.m[1][0] * x + self.m[1][1] * y + self.m[1][2],
        )
    }

    pub fn determinant(&self) -> f64 {
        self.m[0][0] * self.m[1][1] - self.m[0][1] * self.m[1][0]
    }

    /// Inverse map, or `None` when the linear part is singular.
    pub fn inverse(&self) -> Option<Affine2> {
        let det = self.determinant();
        if det.abs() < SINGULAR_EPSILON {
            return None;
        }
        let [[a, b, tx], [c, d, ty]] = self.m;
        let ia = d / det;
        let ib = -b / det;
        let ic = -c / det;
        let id = a / det;
        Some(Affine2::new([
            [ia, ib, -(ia * tx + ib * ty)],
            [ic, id, -(ic * tx + id * ty)],
        ]))
    }

    /// Uniform scale factor of a similarity transform.
    pub fn scale_factor(&self) -> f64 {
        self.determinant().abs().sqrt()
    }

    /// Rotation angle in radians of a similarity transform.
    pub fn rotation_angle(&self) -> f64 {
        self.m[1][0].atan2(self.m[0][0])
    }
}

impl Default for Affine2 {
    fn default() -> Self {
        Self::identity()
    }
}

/// Third vertex of the equilateral triangle on `p0`, `p1`: `p0` rotated by
/// 60 degrees about `p1`.
pub fn equilateral_vertex(p0: Point, p1: Point) -> Point {
    let (s60, c60) = 60f64.to_radians().sin_cos();
    let dx = (p0.x - p1.x) as f64;
    let dy = (p0.y - p1.y) as f64;
    Point::new(
        (c60 * dx - s60 * dy + p1.x as f64) as f32,
        (s60 * dx + c60 * dy + p1.y as f64) as f32,
    )
}

/// Similarity transform (rotation, uniform scale, translation) taking the
/// two `src` anchors onto the two `dst` anchors.
///
/// A third correspondence is synthesized on each side as the equilateral
/// vertex of the anchor pair, and the four similarity parameters are fitted
/// to the three correspondences in closed-form least squares. Returns `None`
/// if either anchor pair coincides.
pub fn similarity_transform(src: [Point; 2], dst: [Point; 2]) -> Option<Affine2> {
    if (src[0].distance(&src[1]) as f64) < MIN_ANCHOR_DISTANCE
        || (dst[0].distance(&dst[1]) as f64) < MIN_ANCHOR_DISTANCE
    {
        return None;
    }

    let src3 = [src[0], src[1], equilateral_vertex(src[0], src[1])];
    let dst3 = [dst[0], dst[1], equilateral_vertex(dst[0], dst[1])];
    fit_similarity(&src3, &dst3)
}

/// Least-squares fit of `x' = a x - b y + tx`, `y' = b x + a y + ty`.
fn fit_similarity(src: &[Point], dst: &[Point]) -> Option<Affine2> {
    debug_assert_eq!(src.len(), dst.len());
    let n = src.len() as f64;

    let (mut sx, mut sy, mut dx, mut dy) = (0.0, 0.0, 0.0, 0.0);
    for (s, d) in src.iter().zip(dst) {
        sx += s.x as f64;
        sy += s.y as f64;
        dx += d.x as f64;
        dy += d.y as f64;
    }
    let (sx, sy, dx, dy) = (sx / n, sy / n, dx / n, dy / n);

    let (mut norm, mut dot, mut cross) = (0.0, 0.0, 0.0);
    for (s, d) in src.iter().zip(dst) {
        let (ux, uy) = (s.x as f64 - sx, s.y as f64 - sy);
        let (vx, vy) = (d.x as f64 - dx, d.y as f64 - dy);
        norm += ux * ux + uy * uy;
        dot += ux * vx + uy * vy;
        cross += ux * vy - uy * vx;
    }
    if norm < SINGULAR_EPSILON {
        return None;
    }

    let a = dot / norm;
    let b = cross / norm;
    let tx = dx - (a * sx - b * sy);
    let ty = dy - (b * sx + a * sy);
    Some(Affine2::new([[a, -b, tx], [b, a, ty]]))
}

/// Exact affine map taking the three `src` vertices onto the three `dst`
/// vertices. Returns `None` when `src` is collinear.
pub fn affine_from_triangles(src: &[Point; 3], dst: &[Point; 3]) -> Option<Affine2> {
    let (x0, y0) = (src[0].x as f64, src[0].y as f64);
    let (x1, y1) = (src[1].x as f64, src[1].y as f64);
    let (x2, y2) = (src[2].x as f64, src[2].y as f64);

    let det = (x1 - x0) * (y2 - y0) - (x2 - x0) * (y1 - y0);
    if det.abs() < SINGULAR_EPSILON {
        return None;
    }

    // Solve each output row independently by Cramer's rule on the
    // translated system.
    let row = |u0: f64, u1: f64, u2: f64| {
        let (du1, du2) = (u1 - u0, u2 - u0);
        let a = (du1 * (y2 - y0) - du2 * (y1 - y0)) / det;
        let b = ((x1 - x0) * du2 - (x2 - x0) * du1) / det;
        [a, b, u0 - a * x0 - b * y0]
    };

    Some(Affine2::new([
        row(dst[0].x as f64, dst[1].x as f64, dst[2].x as f64),
        row(dst[0].y as f64, dst[1].y as f64, dst[2].y as f64),
    ]))
}
