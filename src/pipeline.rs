use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::time::{Duration, Instant};

use log::{info, warn};
use rayon::prelude::*;
use serde::Serialize;

use crate::composite::average_canvases;
use crate::config::AverageConfig;
use crate::error::{Error, Result, Stage};
use crate::landmarks::LandmarkSet;
use crate::normalize::{align_image, average_points, normalize_face, Canvas, NormalizedFace};
use crate::raster::FloatImage;
use crate::triangulation::triangulate;
use crate::types::{Point, PointSet, Rect, Triangle};
use crate::warp::warp_face;

/// One usable input: a decoded image and the single face found in it.
#[derive(Debug, Clone)]
pub struct FaceInput {
    pub image: FloatImage,
    pub landmarks: LandmarkSet,
}

impl FaceInput {
    pub fn new(image: FloatImage, landmarks: LandmarkSet) -> Self {
        Self { image, landmarks }
    }
}

/// An input image left out of the composite.
#[derive(Debug, Clone, Serialize)]
pub struct ImageFailure {
    pub image: usize,
    pub stage: Stage,
    pub reason: String,
}

impl ImageFailure {
    fn from_error(image: usize, err: &Error) -> Self {
        Self {
            image,
            stage: err.stage().unwrap_or(Stage::Normalize),
            reason: err.to_string(),
        }
    }
}

/// Canonical-frame points of one input image.
#[derive(Debug, Clone, Serialize)]
pub struct NormalizedPoints {
    pub image: usize,
    pub points: PointSet,
}

/// Everything one averaging run produced.
///
/// Serializes to the JSON report; the composite itself is left out.
#[derive(Debug, Clone, Serialize)]
pub struct AverageResult {
    #[serde(skip)]
    pub composite: FloatImage,
    pub width: u32,
    pub height: u32,
    pub average_points: PointSet,
    pub normalized: Vec<NormalizedPoints>,
    pub triangles: Vec<Triangle>,
    /// Images that contributed to the composite, in input order.
    pub used: Vec<usize>,
    pub excluded: Vec<ImageFailure>,
}

impl AverageResult {
    pub fn save_report<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

/// Builds an average face from any number of aligned-by-landmark inputs.
///
/// The run has five stages:
/// 1. every face is normalized into the canonical canvas by a similarity
///    transform on its eye corners,
/// 2. the normalized point sets are averaged,
/// 3. the average is Delaunay triangulated once,
/// 4. each image is aligned and piecewise-affine warped onto the average,
/// 5. the warped canvases are summed and divided by their count.
///
/// Stages 1 and 4 run per image on the rayon pool unless the config turns
/// parallelism off. An image whose transform is degenerate or whose warp
/// overruns the budget is excluded; the run fails only when fewer than two
/// images remain or the triangulation itself fails.
///
/// # Usage
///
/// ```ignore
/// let averager = FaceAverager::builder().canvas_size(600, 600).build()?;
/// let result = averager.average(&faces)?;
/// result.composite.to_rgb8().save("average.png")?;
/// ```
#[derive(Debug, Clone)]
pub struct FaceAverager {
    config: AverageConfig,
    canvas: Canvas,
}

impl FaceAverager {
    /// Create an averager from a validated config.
    pub fn new(config: AverageConfig) -> Result<Self> {
        config.validate()?;
        let canvas = config.canvas();
        Ok(Self { config, canvas })
    }

    pub fn builder() -> FaceAveragerBuilder {
        FaceAveragerBuilder::new()
    }

    pub fn config(&self) -> &AverageConfig {
        &self.config
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Run the whole pipeline over `faces`.
    ///
    /// Image indices in the result and in errors refer to positions in `faces`.
    pub fn average(&self, faces: &[FaceInput]) -> Result<AverageResult> {
        let started = Instant::now();
        let canvas = &self.canvas;
        let mut excluded = Vec::new();

        let indexed: Vec<(usize, &FaceInput)> = faces.iter().enumerate().collect();
        let normalized = self.per_image(&indexed, |&(i, face)| {
            (i, normalize_face(&face.landmarks, canvas, i))
        });
        let normalized = keep_usable(normalized, &mut excluded)?;
        if normalized.len() < 2 {
            return Err(Error::too_few_images(normalized.len()));
        }

        let sets: Vec<&PointSet> = normalized.iter().map(|(_, n)| &n.points).collect();
        let average = average_points(&sets)?;
        let triangles = triangulate(&average, Rect::new(0, 0, canvas.width, canvas.height))?;

        let budget = self.config.warp_budget();
        let warped = self.per_image(&normalized, |(i, norm)| {
            (*i, self.warp_one(&faces[*i].image, norm, &average, &triangles, *i, budget))
        });
        let warped = keep_usable(warped, &mut excluded)?;
        let used: Vec<usize> = warped.iter().map(|(i, _)| *i).collect();
        let composite = average_canvases(warped.into_iter().map(|(_, c)| c).collect())?;

        excluded.sort_by_key(|f| f.image);
        info!(
            "averaged {} of {} faces over {} triangles in {:?}",
            used.len(),
            faces.len(),
            triangles.len(),
            started.elapsed()
        );

        Ok(AverageResult {
            composite,
            width: canvas.width,
            height: canvas.height,
            average_points: average,
            normalized: normalized
                .into_iter()
                .map(|(image, n)| NormalizedPoints {
                    image,
                    points: n.points,
                })
                .collect(),
            triangles,
            used,
            excluded,
        })
    }

    fn warp_one(
        &self,
        image: &FloatImage,
        norm: &NormalizedFace,
        average: &PointSet,
        triangles: &[Triangle],
        index: usize,
        budget: Option<Duration>,
    ) -> Result<FloatImage> {
        let aligned = align_image(image, &norm.transform, &self.canvas);
        warp_face(&aligned, &norm.points, average, triangles, index, budget)
    }

    fn per_image<T, R, F>(&self, items: &[T], f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        if self.config.parallel {
            items.par_iter().map(f).collect()
        } else {
            items.iter().map(f).collect()
        }
    }
}

/// Split per-image outcomes into survivors and exclusions. A failure that
/// is not per-image aborts the run.
fn keep_usable<T>(
    outcomes: Vec<(usize, Result<T>)>,
    excluded: &mut Vec<ImageFailure>,
) -> Result<Vec<(usize, T)>> {
    let mut kept = Vec::with_capacity(outcomes.len());
    for (i, outcome) in outcomes {
        match outcome {
            Ok(value) => kept.push((i, value)),
            Err(err) if err.is_recoverable() => {
                warn!("excluding image {i}: {err}");
                excluded.push(ImageFailure::from_error(i, &err));
            }
            Err(err) => return Err(err),
        }
    }
    Ok(kept)
}

/// Builder for [`FaceAverager`].
pub struct FaceAveragerBuilder {
    config: AverageConfig,
}

impl FaceAveragerBuilder {
    pub fn new() -> Self {
        Self {
            config: AverageConfig::default(),
        }
    }

    /// Start from an existing config, e.g. one loaded from disk.
    pub fn config(mut self, config: AverageConfig) -> Self {
        self.config = config;
        self
    }

    pub fn canvas_size(mut self, width: u32, height: u32) -> Self {
        self.config.width = width;
        self.config.height = height;
        self
    }

    /// Eye-corner anchors as fractions of the canvas size.
    pub fn eye_anchors(mut self, left: Point, right: Point) -> Self {
        self.config.left_eye_anchor = left;
        self.config.right_eye_anchor = right;
        self
    }

    /// Per-image warp budget; `None` disables it.
    pub fn warp_timeout(mut self, budget: Option<Duration>) -> Self {
        self.config.warp_timeout_ms = budget.map(|d| d.as_millis() as u64);
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.config.parallel = parallel;
        self
    }

    pub fn build(self) -> Result<FaceAverager> {
        FaceAverager::new(self.config)
    }
}

impl Default for FaceAveragerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
