use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::types::Triangle;

/// Pipeline stage an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Normalize,
    Average,
    Triangulate,
    Warp,
    Composite,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Normalize => "normalize",
            Stage::Average => "average",
            Stage::Triangulate => "triangulate",
            Stage::Warp => "warp",
            Stage::Composite => "composite",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image codec error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Degenerate transform for image {image}: eye anchors coincide")]
    DegenerateTransform { image: usize },

    #[error("Landmark {index} of image {image} is not a finite coordinate")]
    NonFiniteLandmark { image: usize, index: usize },

    #[error("Insufficient points: {reason}")]
    InsufficientPoints {
        image: Option<usize>,
        reason: String,
    },

    #[error("Triangulation vertex {index} matches no known point")]
    IndexMatchFailure { index: usize },

    #[error("Zero-area triangle ({}, {}, {})", triangle.a, triangle.b, triangle.c)]
    ZeroAreaTriangle { triangle: Triangle },

    #[error("No triangles survived filtering against the canvas")]
    EmptyTriangleList,

    #[error("Warp of image {image} exceeded its budget of {budget:?}")]
    WarpTimeout { image: usize, budget: Duration },
}

impl Error {
    /// Stage that produced the error, if it is a pipeline error.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::DegenerateTransform { .. } | Error::NonFiniteLandmark { .. } => {
                Some(Stage::Normalize)
            }
            Error::InsufficientPoints { image: Some(_), .. } => Some(Stage::Normalize),
            Error::InsufficientPoints { image: None, .. } => Some(Stage::Average),
            Error::IndexMatchFailure { .. } | Error::EmptyTriangleList => {
                Some(Stage::Triangulate)
            }
            Error::ZeroAreaTriangle { .. } | Error::WarpTimeout { .. } => Some(Stage::Warp),
            Error::Io(_) | Error::Json(_) | Error::Image(_) | Error::InvalidConfig(_) => None,
        }
    }

    /// Index of the offending input image, when the failure is tied to one.
    pub fn image(&self) -> Option<usize> {
        match self {
            Error::DegenerateTransform { image }
            | Error::NonFiniteLandmark { image, .. }
            | Error::WarpTimeout { image, .. } => Some(*image),
            Error::InsufficientPoints { image, .. } => *image,
            _ => None,
        }
    }

    /// Per-image failures exclude that image; everything else aborts the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::DegenerateTransform { .. }
                | Error::NonFiniteLandmark { .. }
                | Error::WarpTimeout { .. }
                | Error::ZeroAreaTriangle { .. }
        )
    }

    pub(crate) fn too_few_images(usable: usize) -> Self {
        Error::InsufficientPoints {
            image: None,
            reason: format!("{usable} usable image(s), at least 2 are required"),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_image_failures_are_recoverable() {
        let err = Error::DegenerateTransform { image: 3 };
        assert!(err.is_recoverable());
        assert_eq!(err.stage(), Some(Stage::Normalize));
        assert_eq!(err.image(), Some(3));

        let err = Error::WarpTimeout {
            image: 1,
            budget: Duration::from_millis(5),
        };
        assert!(err.is_recoverable());
        assert_eq!(err.stage(), Some(Stage::Warp));

        let err = Error::NonFiniteLandmark { image: 2, index: 5 };
        assert!(err.is_recoverable());
        assert_eq!(err.stage(), Some(Stage::Normalize));
        assert_eq!(err.image(), Some(2));
    }

    #[test]
    fn run_wide_failures_abort() {
        assert!(!Error::EmptyTriangleList.is_recoverable());
        assert!(!Error::IndexMatchFailure { index: 7 }.is_recoverable());

        let err = Error::too_few_images(1);
        assert!(!err.is_recoverable());
        assert_eq!(err.stage(), Some(Stage::Average));
        assert_eq!(err.image(), None);
        assert!(err.to_string().contains("at least 2"));
    }
}
