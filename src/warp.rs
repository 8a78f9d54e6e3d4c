//! Piecewise affine warping of one aligned face onto the averaged layout.

use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::landmarks::polygon_area;
use crate::raster::{warp_affine, Border, FloatImage, ImageAccess};
use crate::similarity::affine_from_triangles;
use crate::types::{Point, PointSet, Rect, Triangle};

/// Triangles with less area than this are skipped.
pub const MIN_TRIANGLE_AREA: f32 = 1e-6;

/// Binary interior mask of a triangle over a `width` x `height` patch.
///
/// A pixel is inside when its coordinate lies in the closed triangle, so
/// pixels on an edge belong to every triangle sharing that edge.
pub fn triangle_mask(tri: &[Point; 3], width: u32, height: u32) -> Vec<bool> {
    let [a, b, c] = tri.map(|p| (p.x as f64, p.y as f64));
    let area2 = (b.0 - a.0) * (c.1 - a.1) - (c.0 - a.0) * (b.1 - a.1);
    let sign = if area2 < 0.0 { -1.0 } else { 1.0 };
    // Slack for vertices computed in f32.
    let eps = 1e-4 * area2.abs().max(1.0);

    let edge = |p: (f64, f64), q: (f64, f64), x: f64, y: f64| {
        sign * ((q.0 - p.0) * (y - p.1) - (q.1 - p.1) * (x - p.0))
    };

    let mut mask = Vec::with_capacity((width as usize) * (height as usize));
    for y in 0..height {
        for x in 0..width {
            let (fx, fy) = (x as f64, y as f64);
            mask.push(
                edge(a, b, fx, fy) >= -eps && edge(b, c, fx, fy) >= -eps && edge(c, a, fx, fy) >= -eps,
            );
        }
    }
    mask
}

/// Warp the triangle `src_tri` of `src` onto `dst_tri` of `dst`.
///
/// Both triangles must already be constrained to the canvas. Pixels inside
/// the destination triangle are replaced; nothing outside it is touched.
/// A zero-area source or destination triangle returns `ZeroAreaTriangle`
/// and leaves `dst` unchanged.
pub fn warp_triangle(
    src: &FloatImage,
    dst: &mut FloatImage,
    src_tri: &[Point; 3],
    dst_tri: &[Point; 3],
    triangle: Triangle,
) -> Result<()> {
    let zero_area = Error::ZeroAreaTriangle { triangle };
    let (Some(r1), Some(r2)) = (Rect::bounding(src_tri), Rect::bounding(dst_tri)) else {
        return Err(zero_area);
    };
    if polygon_area(src_tri) < MIN_TRIANGLE_AREA || polygon_area(dst_tri) < MIN_TRIANGLE_AREA {
        return Err(zero_area);
    }

    // Triangles relative to their bounding rectangles.
    let (o1, o2) = (r1.origin(), r2.origin());
    let t1 = src_tri.map(|p| p - o1);
    let t2 = dst_tri.map(|p| p - o2);

    let Some(local) = affine_from_triangles(&t1, &t2) else {
        return Err(zero_area);
    };

    let patch = src.crop(r1);
    let warped = warp_affine(&patch, &local, r2.width, r2.height, Border::Reflect101);
    let mask = triangle_mask(&t2, r2.width, r2.height);

    for dy in 0..r2.height {
        let y = r2.y + dy as i32;
        if y < 0 || y >= dst.height() as i32 {
            continue;
        }
        for dx in 0..r2.width {
            let x = r2.x + dx as i32;
            if x < 0 || x >= dst.width() as i32 {
                continue;
            }
            if mask[(dy * r2.width + dx) as usize] {
                *dst.pixel_mut(x as u32, y as u32) = warped.pixel(dx, dy);
            }
        }
    }
    Ok(())
}

/// Build one face's contribution: every triangle of `triangles` warped from
/// `aligned` (indexed by `source`) onto `target`, over a black canvas.
///
/// Zero-area triangles are skipped. When `budget` is set, the elapsed time
/// is checked before each triangle and the face fails with `WarpTimeout`
/// once the budget is used up.
pub fn warp_face(
    aligned: &FloatImage,
    source: &PointSet,
    target: &PointSet,
    triangles: &[Triangle],
    image: usize,
    budget: Option<Duration>,
) -> Result<FloatImage> {
    let (width, height) = (aligned.width(), aligned.height());
    let mut canvas = FloatImage::new(width, height);
    let started = Instant::now();
    let mut skipped = 0usize;

    for &triangle in triangles {
        if let Some(budget) = budget {
            if started.elapsed() >= budget {
                return Err(Error::WarpTimeout { image, budget });
            }
        }

        let src_tri = triangle.vertices(source).map(|p| p.constrain(width, height));
        let dst_tri = triangle.vertices(target).map(|p| p.constrain(width, height));

        match warp_triangle(aligned, &mut canvas, &src_tri, &dst_tri, triangle) {
            Ok(()) => {}
            Err(err @ Error::ZeroAreaTriangle { .. }) => {
                warn!("image {image}: skipping {err}");
                skipped += 1;
            }
            Err(err) => return Err(err),
        }
    }

    debug!(
        "image {image}: warped {} of {} triangles in {:?}",
        triangles.len() - skipped,
        triangles.len(),
        started.elapsed()
    );
    Ok(canvas)
}
