//! Landmark normalization into the canonical canvas and point averaging.

use log::debug;

use crate::error::{Error, Result};
use crate::landmarks::LandmarkSet;
use crate::raster::{warp_affine, Border, FloatImage, ImageAccess};
use crate::similarity::{similarity_transform, Affine2};
use crate::types::{Point, PointSet};

/// Number of fixed canvas-border points appended to each landmark set.
pub const NUM_BOUNDARY_POINTS: usize = 8;

const ANCHOR_SLACK: f32 = 1e-3;

/// The canonical frame every face is normalized into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
    /// Destination of the first eye corner, in pixels.
    pub left_eye: Point,
    /// Destination of the second eye corner, in pixels.
    pub right_eye: Point,
}

impl Canvas {
    /// Canvas with eye anchors at 30% / 70% of the width and a third of the height.
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_anchors(width, height, Point::new(0.3, 1.0 / 3.0), Point::new(0.7, 1.0 / 3.0))
    }

    /// Canvas with eye anchors given as fractions of the canvas size,
    /// truncated to whole pixels (`0.7` of 301 is column 210).
    pub fn with_anchors(width: u32, height: u32, left: Point, right: Point) -> Self {
        let (w, h) = (width as f32, height as f32);
        // Slack keeps e.g. 0.7 * 600 at 420 despite f32 representation error.
        let snap = |f: f32, size: f32| (f * size + ANCHOR_SLACK).floor();
        Self {
            width,
            height,
            left_eye: Point::new(snap(left.x, w), snap(left.y, h)),
            right_eye: Point::new(snap(right.x, w), snap(right.y, h)),
        }
    }

    /// Corners and edge midpoints, clockwise from the top-left corner.
    pub fn boundary_points(&self) -> [Point; NUM_BOUNDARY_POINTS] {
        let (w, h) = (self.width as f32, self.height as f32);
        [
            Point::new(0.0, 0.0),
            Point::new(w / 2.0, 0.0),
            Point::new(w - 1.0, 0.0),
            Point::new(w - 1.0, h / 2.0),
            Point::new(w - 1.0, h - 1.0),
            Point::new(w / 2.0, h - 1.0),
            Point::new(0.0, h - 1.0),
            Point::new(0.0, h / 2.0),
        ]
    }

    /// Total points per normalized set: landmarks plus boundary points.
    pub fn num_points(&self) -> usize {
        crate::landmarks::NUM_LANDMARKS + NUM_BOUNDARY_POINTS
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(600, 600)
    }
}

/// One face mapped into the canonical canvas.
#[derive(Debug, Clone)]
pub struct NormalizedFace {
    /// Similarity transform from source image to canvas.
    pub transform: Affine2,
    /// 68 transformed landmarks followed by the 8 boundary points.
    pub points: PointSet,
}

/// Compute the similarity transform of one face and apply it to its landmarks.
///
/// `image` is the caller's index, used only for error reporting. A landmark
/// with a non-finite coordinate fails the face with `NonFiniteLandmark`.
pub fn normalize_face(
    landmarks: &LandmarkSet,
    canvas: &Canvas,
    image: usize,
) -> Result<NormalizedFace> {
    if let Some(index) = landmarks.points().iter().position(|p| !p.is_finite()) {
        return Err(Error::NonFiniteLandmark { image, index });
    }
    let transform = similarity_transform(landmarks.eye_corners(), [canvas.left_eye, canvas.right_eye])
        .ok_or(Error::DegenerateTransform { image })?;

    let mut points = PointSet::with_capacity(canvas.num_points());
    points
        .points
        .extend(landmarks.points().iter().map(|p| transform.apply(*p)));
    points.points.extend_from_slice(&canvas.boundary_points());

    Ok(NormalizedFace { transform, points })
}

/// Componentwise mean of the normalized point sets.
///
/// Requires at least two sets of identical length.
pub fn average_points(sets: &[&PointSet]) -> Result<PointSet> {
    if sets.len() < 2 {
        return Err(Error::too_few_images(sets.len()));
    }
    let n = sets[0].len();
    if let Some((i, bad)) = sets.iter().enumerate().find(|(_, s)| s.len() != n) {
        return Err(Error::InsufficientPoints {
            image: Some(i),
            reason: format!("point set has {} points, expected {}", bad.len(), n),
        });
    }

    let mut avg = PointSet::zeros(n);
    for set in sets {
        avg.accumulate(set);
    }
    avg.scale(1.0 / sets.len() as f32);

    debug!("averaged {} point sets of {} points", sets.len(), n);
    Ok(avg)
}

/// Resample a source image into the canvas through its similarity transform.
pub fn align_image<I: ImageAccess>(image: &I, transform: &Affine2, canvas: &Canvas) -> FloatImage {
    warp_affine(image, transform, canvas.width, canvas.height, Border::Zero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::tests::synthetic_face;
    use crate::landmarks::{LEFT_EYE_CORNER, NUM_LANDMARKS, RIGHT_EYE_CORNER};

    fn face_with(f: impl Fn(Point) -> Point) -> LandmarkSet {
        LandmarkSet::new(synthetic_face().into_iter().map(f).collect()).unwrap()
    }

    #[test]
    fn default_canvas_anchors() {
        let canvas = Canvas::default();
        assert_eq!(canvas.left_eye, Point::new(180.0, 200.0));
        assert_eq!(canvas.right_eye, Point::new(420.0, 200.0));
        assert_eq!(canvas.num_points(), 76);
    }

    #[test]
    fn anchors_truncate_to_whole_pixels() {
        let canvas = Canvas::new(301, 500);
        assert_eq!(canvas.left_eye, Point::new(90.0, 166.0));
        assert_eq!(canvas.right_eye, Point::new(210.0, 166.0));
    }

    #[test]
    fn non_finite_landmark_fails_the_face() {
        let mut points = synthetic_face();
        points[5] = Point::new(f32::NAN, 10.0);
        let face = LandmarkSet::new(points).unwrap();

        let err = normalize_face(&face, &Canvas::default(), 2).unwrap_err();
        assert!(matches!(err, Error::NonFiniteLandmark { image: 2, index: 5 }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn boundary_points_lie_on_border() {
        let canvas = Canvas::new(600, 400);
        let pts = canvas.boundary_points();
        assert_eq!(pts[0], Point::new(0.0, 0.0));
        assert_eq!(pts[4], Point::new(599.0, 399.0));
        for p in pts {
            assert!(p.x == 0.0 || p.x == 599.0 || p.y == 0.0 || p.y == 399.0);
        }
    }

    #[test]
    fn eye_corners_land_on_canvas_anchors() {
        let canvas = Canvas::default();
        let face = face_with(|p| Point::new(p.x * 1.7 + 40.0, p.y * 1.7 + 13.0));
        let norm = normalize_face(&face, &canvas, 0).unwrap();

        assert_eq!(norm.points.len(), 76);
        assert!(norm.points[LEFT_EYE_CORNER].distance(&canvas.left_eye) < 1e-2);
        assert!(norm.points[RIGHT_EYE_CORNER].distance(&canvas.right_eye) < 1e-2);
        for (k, b) in canvas.boundary_points().iter().enumerate() {
            assert_eq!(norm.points[NUM_LANDMARKS + k], *b);
        }
    }

    #[test]
    fn coincident_eyes_are_degenerate() {
        let mut points = synthetic_face();
        points[RIGHT_EYE_CORNER] = points[LEFT_EYE_CORNER];
        let face = LandmarkSet::new(points).unwrap();

        let err = normalize_face(&face, &Canvas::default(), 4).unwrap_err();
        assert!(matches!(err, Error::DegenerateTransform { image: 4 }));
    }

    #[test]
    fn average_is_componentwise_mean() {
        let a = PointSet::new(vec![Point::new(0.0, 0.0), Point::new(10.0, 4.0)]);
        let b = PointSet::new(vec![Point::new(2.0, 6.0), Point::new(20.0, 8.0)]);
        let c = PointSet::new(vec![Point::new(4.0, 3.0), Point::new(0.0, 0.0)]);
        let avg = average_points(&[&a, &b, &c]).unwrap();

        assert!((avg[0].x - 2.0).abs() < 1e-5);
        assert!((avg[0].y - 3.0).abs() < 1e-5);
        assert!((avg[1].x - 10.0).abs() < 1e-5);
        assert!((avg[1].y - 4.0).abs() < 1e-5);
    }

    #[test]
    fn average_requires_two_sets() {
        let a = PointSet::zeros(76);
        assert!(matches!(
            average_points(&[&a]),
            Err(Error::InsufficientPoints { image: None, .. })
        ));
    }

    #[test]
    fn average_rejects_mismatched_lengths() {
        let a = PointSet::zeros(76);
        let b = PointSet::zeros(75);
        assert!(matches!(
            average_points(&[&a, &b]),
            Err(Error::InsufficientPoints { image: Some(1), .. })
        ));
    }

    #[test]
    fn boundary_points_survive_averaging() {
        let canvas = Canvas::default();
        let n1 = normalize_face(&face_with(|p| p), &canvas, 0).unwrap();
        let n2 = normalize_face(&face_with(|p| Point::new(p.x * 0.8, p.y * 1.1)), &canvas, 1).unwrap();
        let avg = average_points(&[&n1.points, &n2.points]).unwrap();

        for (k, b) in canvas.boundary_points().iter().enumerate() {
            assert!(avg[NUM_LANDMARKS + k].distance(b) < 1e-4);
        }
    }

    #[test]
    fn aligned_image_places_eye_pixels_at_anchors() {
        let canvas = Canvas::new(120, 120);
        let face = LandmarkSet::new(synthetic_face()).unwrap();
        let norm = normalize_face(&face, &canvas, 0).unwrap();

        // Bright pixel at the source left eye corner (48, 66).
        let src = FloatImage::from_fn(200, 200, |x, y| {
            if (x as i32 - 48).abs() <= 2 && (y as i32 - 66).abs() <= 2 {
                [1.0; 3]
            } else {
                [0.0; 3]
            }
        });
        let aligned = align_image(&src, &norm.transform, &canvas);
        let anchor = canvas.left_eye;
        assert!(aligned.pixel(anchor.x as u32, anchor.y as u32)[0] > 0.9);
    }
}
