//! The 68-point facial landmark scheme.
//!
//! Landmark sets arrive from an external detector using the iBUG 68-point
//! annotation order. This module validates them and names the anatomical
//! regions of that order.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{Point, PointSet};

/// Number of landmarks per detected face.
pub const NUM_LANDMARKS: usize = 68;

/// Outer corner of the first eye (image left).
pub const LEFT_EYE_CORNER: usize = 36;

/// Outer corner of the second eye (image right).
pub const RIGHT_EYE_CORNER: usize = 45;

/// Anatomical regions of the 68-point scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Jaw,
    RightBrow,
    LeftBrow,
    NoseBridge,
    NoseBottom,
    RightEye,
    LeftEye,
    OuterMouth,
    InnerMouth,
}

impl Region {
    pub const ALL: [Region; 9] = [
        Region::Jaw,
        Region::RightBrow,
        Region::LeftBrow,
        Region::NoseBridge,
        Region::NoseBottom,
        Region::RightEye,
        Region::LeftEye,
        Region::OuterMouth,
        Region::InnerMouth,
    ];

    /// Landmark indices covered by the region.
    pub fn indices(&self) -> RangeInclusive<usize> {
        match self {
            Region::Jaw => 0..=16,
            Region::RightBrow => 17..=21,
            Region::LeftBrow => 22..=26,
            Region::NoseBridge => 27..=30,
            Region::NoseBottom => 31..=35,
            Region::RightEye => 36..=41,
            Region::LeftEye => 42..=47,
            Region::OuterMouth => 48..=59,
            Region::InnerMouth => 60..=67,
        }
    }
}

/// One detected face: exactly [`NUM_LANDMARKS`] points in scheme order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Point>", into = "Vec<Point>")]
pub struct LandmarkSet {
    points: Vec<Point>,
}

impl LandmarkSet {
    /// Validate a detector output.
    ///
    /// Fails with `InsufficientPoints` unless there are exactly 68 points.
    pub fn new(points: Vec<Point>) -> Result<Self> {
        if points.len() != NUM_LANDMARKS {
            return Err(Error::InsufficientPoints {
                image: None,
                reason: format!(
                    "landmark set has {} points, expected {}",
                    points.len(),
                    NUM_LANDMARKS
                ),
            });
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// The two anchors used for similarity normalization.
    pub fn eye_corners(&self) -> [Point; 2] {
        [self.points[LEFT_EYE_CORNER], self.points[RIGHT_EYE_CORNER]]
    }

    pub fn region(&self, region: Region) -> &[Point] {
        &self.points[region.indices()]
    }

    pub fn to_point_set(&self) -> PointSet {
        PointSet::new(self.points.clone())
    }
}

impl TryFrom<Vec<Point>> for LandmarkSet {
    type Error = Error;

    fn try_from(points: Vec<Point>) -> Result<Self> {
        LandmarkSet::new(points)
    }
}

impl From<LandmarkSet> for Vec<Point> {
    fn from(set: LandmarkSet) -> Self {
        set.points
    }
}

impl std::ops::Index<usize> for LandmarkSet {
    type Output = Point;

    fn index(&self, idx: usize) -> &Self::Output {
        &self.points[idx]
    }
}

/// Calculate the area of a polygon using the shoelace formula.
pub fn polygon_area(points: &[Point]) -> f32 {
    if points.len() < 3 {
        return 0.0;
    }

    let mut area = 0.0;
    let n = points.len();

    for i in 0..n {
        let j = (i + 1) % n;
        area += points[i].x * points[j].y;
        area -= points[j].x * points[i].y;
    }

    (area / 2.0).abs()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A plausible frontal face in a 200x200 frame, eyes at (48,66) and (152,66).
    pub(crate) fn synthetic_face() -> Vec<Point> {
        let normalized = [
            (0.10, 0.35), (0.11, 0.45), (0.12, 0.55), (0.14, 0.65), (0.18, 0.73),
            (0.24, 0.80), (0.32, 0.85), (0.41, 0.88), (0.50, 0.89), (0.59, 0.88),
            (0.68, 0.85), (0.76, 0.80), (0.82, 0.73), (0.86, 0.65), (0.88, 0.55),
            (0.89, 0.45), (0.90, 0.35),
            (0.20, 0.26), (0.25, 0.22), (0.32, 0.21), (0.38, 0.23), (0.43, 0.27),
            (0.57, 0.27), (0.62, 0.23), (0.68, 0.21), (0.75, 0.22), (0.80, 0.26),
            (0.50, 0.32), (0.50, 0.40), (0.50, 0.48), (0.50, 0.55),
            (0.40, 0.58), (0.45, 0.60), (0.50, 0.62), (0.55, 0.60), (0.60, 0.58),
            (0.24, 0.33), (0.28, 0.29), (0.34, 0.29), (0.38, 0.33), (0.34, 0.35),
            (0.28, 0.35),
            (0.62, 0.33), (0.66, 0.29), (0.72, 0.29), (0.76, 0.33), (0.72, 0.35),
            (0.66, 0.35),
            (0.32, 0.72), (0.38, 0.68), (0.44, 0.66), (0.50, 0.67), (0.56, 0.66),
            (0.62, 0.68), (0.68, 0.72), (0.62, 0.78), (0.56, 0.80), (0.50, 0.81),
            (0.44, 0.80), (0.38, 0.78),
            (0.36, 0.72), (0.44, 0.70), (0.50, 0.70), (0.56, 0.70), (0.64, 0.72),
            (0.56, 0.74), (0.50, 0.75), (0.44, 0.74),
        ];
        normalized
            .iter()
            .map(|&(x, y)| Point::new(x * 200.0, y * 200.0))
            .collect()
    }

    #[test]
    fn accepts_exactly_68_points() {
        let set = LandmarkSet::new(synthetic_face()).unwrap();
        assert_eq!(set.points().len(), NUM_LANDMARKS);
        assert_eq!(set.eye_corners()[0], set[LEFT_EYE_CORNER]);
        assert_eq!(set.eye_corners()[1], set[RIGHT_EYE_CORNER]);
    }

    #[test]
    fn rejects_wrong_landmark_count() {
        let mut points = synthetic_face();
        points.pop();
        let err = LandmarkSet::new(points).unwrap_err();
        assert!(matches!(err, Error::InsufficientPoints { .. }));
    }

    #[test]
    fn regions_partition_the_scheme() {
        let total: usize = Region::ALL.iter().map(|r| r.indices().count()).sum();
        assert_eq!(total, NUM_LANDMARKS);

        let set = LandmarkSet::new(synthetic_face()).unwrap();
        assert_eq!(set.region(Region::Jaw).len(), 17);
        assert_eq!(set.region(Region::InnerMouth).len(), 8);
        assert!(Region::RightEye.indices().contains(&LEFT_EYE_CORNER));
        assert!(Region::LeftEye.indices().contains(&RIGHT_EYE_CORNER));
    }

    #[test]
    fn deserializes_from_point_list() {
        let json = serde_json::to_string(&synthetic_face()).unwrap();
        let set: LandmarkSet = serde_json::from_str(&json).unwrap();
        assert_eq!(set.points().len(), NUM_LANDMARKS);

        let short = serde_json::to_string(&synthetic_face()[..10]).unwrap();
        assert!(serde_json::from_str::<LandmarkSet>(&short).is_err());
    }

    #[test]
    fn test_polygon_area_triangle() {
        let triangle = vec![
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(2.0, 3.0),
        ];
        // Area = 0.5 * base * height = 0.5 * 4 * 3 = 6
        assert!((polygon_area(&triangle) - 6.0).abs() < 0.01);
    }

    #[test]
    fn test_polygon_area_square() {
        let square = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        assert!((polygon_area(&square) - 100.0).abs() < 0.01);
    }
}
