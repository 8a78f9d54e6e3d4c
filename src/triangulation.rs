//! Delaunay triangulation that carries point indices through to its output.
//!
//! Incremental Bowyer-Watson over a super triangle. Every vertex keeps the
//! index of the input point it came from, so the result is a list of index
//! triples valid for any point set sharing the same indexing; no coordinate
//! matching is needed afterwards.
//!
//! Tie-breaks:
//! - Points are inserted in index order.
//! - A point lying exactly on a circumcircle is *not* inside it, so for
//!   cocircular configurations the earlier triangle survives. The result is
//!   reproducible for this implementation but is not the only valid
//!   Delaunay triangulation of such input.
//! - Points within [`DUPLICATE_TOLERANCE`] of an earlier point are merged
//!   onto the lowest index and never appear in a triangle.

use log::debug;

use crate::error::{Error, Result};
use crate::types::{Point, PointSet, Rect, Triangle};

/// Distance below which two input points are treated as one vertex.
pub const DUPLICATE_TOLERANCE: f32 = 1e-3;

/// Super triangle size relative to the point spread.
const SUPER_TRIANGLE_SCALE: f64 = 100.0;

/// Relative slack of the in-circumcircle test.
const CIRCUMCIRCLE_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, Copy)]
struct Cell {
    v: [usize; 3],
    cx: f64,
    cy: f64,
    r2: f64,
}

impl Cell {
    fn new(v: [usize; 3], coords: &[(f64, f64)]) -> Self {
        let [a, b, c] = v.map(|i| coords[i]);
        let d = 2.0 * (a.0 * (b.1 - c.1) + b.0 * (c.1 - a.1) + c.0 * (a.1 - b.1));
        if d.abs() < f64::EPSILON {
            // Collinear: make it swallow every later point so it gets rebuilt.
            return Self {
                v,
                cx: (a.0 + b.0 + c.0) / 3.0,
                cy: (a.1 + b.1 + c.1) / 3.0,
                r2: f64::INFINITY,
            };
        }
        let a2 = a.0 * a.0 + a.1 * a.1;
        let b2 = b.0 * b.0 + b.1 * b.1;
        let c2 = c.0 * c.0 + c.1 * c.1;
        let cx = (a2 * (b.1 - c.1) + b2 * (c.1 - a.1) + c2 * (a.1 - b.1)) / d;
        let cy = (a2 * (c.0 - b.0) + b2 * (a.0 - c.0) + c2 * (b.0 - a.0)) / d;
        let r2 = (a.0 - cx).powi(2) + (a.1 - cy).powi(2);
        Self { v, cx, cy, r2 }
    }

    fn circumcircle_contains(&self, p: (f64, f64)) -> bool {
        let d2 = (p.0 - self.cx).powi(2) + (p.1 - self.cy).powi(2);
        d2 < self.r2 * (1.0 - CIRCUMCIRCLE_EPSILON)
    }

    fn edges(&self) -> [(usize, usize); 3] {
        let [a, b, c] = self.v;
        [(a, b), (b, c), (c, a)]
    }
}

fn same_edge(e: (usize, usize), f: (usize, usize)) -> bool {
    (e.0 == f.0 && e.1 == f.1) || (e.0 == f.1 && e.1 == f.0)
}

/// For each point, the lowest index it coincides with (itself if unique).
fn merge_duplicates(points: &[Point]) -> Vec<usize> {
    let mut rep: Vec<usize> = (0..points.len()).collect();
    for i in 0..points.len() {
        let earlier = (0..i)
            .find(|&j| rep[j] == j && points[j].distance(&points[i]) < DUPLICATE_TOLERANCE);
        if let Some(j) = earlier {
            rep[i] = j;
        }
    }
    rep
}

/// Delaunay triangulation of `points`, keeping only triangles whose three
/// vertices lie inside `bounds` (closed).
///
/// Fails with `IndexMatchFailure` when a point cannot be placed in the
/// triangulation (non-finite coordinates), and with `EmptyTriangleList` when
/// no triangle survives.
pub fn triangulate(points: &PointSet, bounds: Rect) -> Result<Vec<Triangle>> {
    let n = points.len();
    if n == 0 {
        return Err(Error::EmptyTriangleList);
    }
    if let Some(index) = points.points.iter().position(|p| !p.is_finite()) {
        return Err(Error::IndexMatchFailure { index });
    }

    let rep = merge_duplicates(&points.points);
    let merged = rep.iter().enumerate().filter(|(i, r)| *i != **r).count();
    if merged > 0 {
        debug!("merged {merged} coincident point(s) before triangulation");
    }

    let mut coords: Vec<(f64, f64)> = points
        .points
        .iter()
        .map(|p| (p.x as f64, p.y as f64))
        .collect();

    // Super triangle enclosing every point; its vertices take indices n..n+3.
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (f64::MAX, f64::MAX, f64::MIN, f64::MIN);
    for &(x, y) in &coords {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }
    let span = (max_x - min_x).max(max_y - min_y).max(1.0) * SUPER_TRIANGLE_SCALE;
    let (mid_x, mid_y) = ((min_x + max_x) / 2.0, (min_y + max_y) / 2.0);
    coords.push((mid_x - span, mid_y - span));
    coords.push((mid_x + span, mid_y - span));
    coords.push((mid_x, mid_y + span));

    let mut cells = vec![Cell::new([n, n + 1, n + 2], &coords)];

    for (i, &r) in rep.iter().enumerate() {
        if r != i {
            continue;
        }
        let p = coords[i];

        let (bad, good): (Vec<Cell>, Vec<Cell>) =
            cells.into_iter().partition(|c| c.circumcircle_contains(p));
        if bad.is_empty() {
            return Err(Error::IndexMatchFailure { index: i });
        }
        cells = good;

        // Cavity boundary: edges owned by exactly one bad cell.
        for (k, cell) in bad.iter().enumerate() {
            for edge in cell.edges() {
                let shared = bad
                    .iter()
                    .enumerate()
                    .any(|(m, other)| m != k && other.edges().iter().any(|&f| same_edge(edge, f)));
                if !shared {
                    cells.push(Cell::new([edge.0, edge.1, i], &coords));
                }
            }
        }
    }

    let mut triangles: Vec<Triangle> = cells
        .iter()
        .filter(|c| c.v.iter().all(|&v| v < n))
        .map(|c| Triangle::new(c.v[0], c.v[1], c.v[2]))
        .filter(|t| t.indices().iter().all(|&v| bounds.contains(&points[v])))
        .collect();
    triangles.sort_by_key(|t| t.sorted().indices());

    debug!(
        "triangulated {} points into {} triangles ({} cells before filtering)",
        n,
        triangles.len(),
        cells.len()
    );

    if triangles.is_empty() {
        return Err(Error::EmptyTriangleList);
    }
    Ok(triangles)
}
