//! # mean-face
//!
//! Pure Rust average-face compositing from 68-point facial landmarks.
//!
//! Given any number of face photographs and one landmark set per face, the
//! crate produces a single composite in which the facial features of all
//! inputs line up on their average geometry.
//!
//! ## Algorithm Overview
//!
//! 1. Map each face into a fixed canvas with the similarity transform that
//!    sends its outer eye corners (landmarks 36 and 45) to canonical anchors
//! 2. Append 8 canvas border points and average the normalized point sets
//! 3. Delaunay triangulate the averaged points once
//! 4. For every image:
//!    - Resample it into the canvas through its similarity transform
//!    - Warp each triangle of its own layout onto the averaged layout
//! 5. Sum the per-image canvases and divide by the image count
//!
//! Images with a degenerate transform or a stalled warp are left out of the
//! average; the run only fails when fewer than two images remain.
//!
//! ## Quick Start
//!
//! ```rust
//! use mean_face::{FaceAverager, FaceInput, FloatImage, LandmarkSet, Point};
//!
//! # fn face(shift: f32) -> FaceInput {
//! #     let mut points: Vec<Point> = (0..68)
//! #         .map(|i| Point::new(60.0 + shift + (i % 9) as f32 * 10.0, 50.0 + (i / 9) as f32 * 12.0))
//! #         .collect();
//! #     points[36] = Point::new(70.0 + shift, 80.0);
//! #     points[45] = Point::new(130.0 + shift, 80.0);
//! #     let image = FloatImage::from_fn(200, 200, |x, y| [x as f32 / 200.0, y as f32 / 200.0, 0.5]);
//! #     FaceInput::new(image, LandmarkSet::new(points).unwrap())
//! # }
//! let averager = FaceAverager::builder()
//!     .canvas_size(120, 120)
//!     .build()
//!     .unwrap();
//!
//! let faces = vec![face(0.0), face(8.0)];
//! let result = averager.average(&faces).unwrap();
//!
//! println!(
//!     "{} faces over {} triangles",
//!     result.used.len(),
//!     result.triangles.len()
//! );
//! let rgb = result.composite.to_rgb8();
//! assert_eq!(rgb.dimensions(), (120, 120));
//! ```
//!
//! ## Custom Image Types
//!
//! Alignment reads source pixels through the [`ImageAccess`] trait:
//!
//! ```rust
//! use mean_face::ImageAccess;
//!
//! struct MyImage { /* ... */ }
//!
//! impl ImageAccess for MyImage {
//!     fn get_pixel(&self, x: i32, y: i32) -> [f32; 3] {
//!         // Return RGB in [0, 1] at (x, y), black when out of bounds
//!         [0.0; 3]
//!     }
//!     fn width(&self) -> u32 { 640 }
//!     fn height(&self) -> u32 { 480 }
//! }
//! ```

mod composite;
mod config;
mod error;
mod landmarks;
mod normalize;
mod pipeline;
mod raster;
mod similarity;
mod triangulation;
mod types;
mod warp;

pub use composite::average_canvases;
pub use config::AverageConfig;
pub use error::{Error, Result, Stage};
pub use landmarks::{
    polygon_area, LandmarkSet, Region, LEFT_EYE_CORNER, NUM_LANDMARKS, RIGHT_EYE_CORNER,
};
pub use normalize::{
    align_image, average_points, normalize_face, Canvas, NormalizedFace, NUM_BOUNDARY_POINTS,
};
pub use pipeline::{
    AverageResult, FaceAverager, FaceAveragerBuilder, FaceInput, ImageFailure, NormalizedPoints,
};
pub use raster::{sample_bilinear, warp_affine, Border, FloatImage, ImageAccess, Rgb};
pub use similarity::{affine_from_triangles, equilateral_vertex, similarity_transform, Affine2};
pub use triangulation::{triangulate, DUPLICATE_TOLERANCE};
pub use types::{Point, PointSet, Rect, Triangle};
pub use warp::{triangle_mask, warp_face, warp_triangle, MIN_TRIANGLE_AREA};
