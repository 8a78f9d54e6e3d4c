//! CLI application for building an average face.
//!
//! Usage:
//!   mean-face a.jpg b.jpg c.jpg                 # Writes average_face.png
//!   mean-face *.jpg -o mean.png --report r.json # Also writes a JSON report
//!   mean-face *.jpg --config average.json       # Settings from a file
//!
//! Every image needs a landmark sidecar next to it, `<image>.landmarks.json`,
//! holding a list of faces where each face is a list of 68 `{"x", "y"}` points.

use std::path::{Path, PathBuf};

use clap::Parser;
use log::{debug, info, warn};
use mean_face::{AverageConfig, AverageResult, FaceAverager, FaceInput, FloatImage, LandmarkSet, Point};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "mean-face")]
#[command(author, version, about = "Average face compositing from facial landmarks", long_about = None)]
struct Args {
    /// Input image files
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Output image file
    #[arg(short, long, default_value = "average_face.png")]
    output: PathBuf,

    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Canvas width (overrides config)
    #[arg(long)]
    width: Option<u32>,

    /// Canvas height (overrides config)
    #[arg(long)]
    height: Option<u32>,

    /// Per-image warp budget in milliseconds, 0 disables it (overrides config)
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Write a JSON report of points, triangles and excluded images
    #[arg(long)]
    report: Option<PathBuf>,

    /// Print the summary as JSON
    #[arg(short, long)]
    json: bool,

    /// Show verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Summary printed after a run.
#[derive(Serialize)]
struct Summary {
    output: String,
    width: u32,
    height: u32,
    images_given: usize,
    images_loaded: usize,
    images_used: Vec<String>,
    skipped: Vec<Skipped>,
    triangles: usize,
}

#[derive(Serialize)]
struct Skipped {
    image: String,
    reason: String,
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = build_config(args)?;
    let averager = FaceAverager::new(config)?;

    let mut faces = Vec::new();
    let mut sources = Vec::new();
    let mut skipped = Vec::new();

    for path in &args.images {
        match load_face(path) {
            Ok(face) => {
                faces.push(face);
                sources.push(path.clone());
            }
            Err(LoadError::Skip(reason)) => {
                warn!("skipping {}: {}", path.display(), reason);
                skipped.push(Skipped {
                    image: path.display().to_string(),
                    reason,
                });
            }
            Err(LoadError::Fatal(e)) => {
                return Err(format!("{}: {}", path.display(), e).into());
            }
        }
    }
    info!("loaded {} of {} images", faces.len(), args.images.len());

    let result = averager.average(&faces)?;

    result.composite.to_rgb8().save(&args.output)?;
    info!("composite written to {}", args.output.display());

    if let Some(ref path) = args.report {
        result.save_report(path)?;
        info!("report written to {}", path.display());
    }

    let summary = summarize(args, &result, &sources, skipped);
    let text = if args.json {
        serde_json::to_string_pretty(&summary)?
    } else {
        format_human_readable(&summary)
    };
    println!("{}", text);

    Ok(())
}

fn build_config(args: &Args) -> mean_face::Result<AverageConfig> {
    let mut config = match args.config {
        Some(ref path) => AverageConfig::load(path)?,
        None => AverageConfig::default(),
    };
    if let Some(width) = args.width {
        config.width = width;
    }
    if let Some(height) = args.height {
        config.height = height;
    }
    if let Some(ms) = args.timeout_ms {
        config.warp_timeout_ms = (ms > 0).then_some(ms);
    }
    config.validate()?;
    debug!("using config {:?}", config);
    Ok(config)
}

/// Path of the landmark sidecar for an image.
fn sidecar_path(image: &Path) -> PathBuf {
    let mut name = image.as_os_str().to_owned();
    name.push(".landmarks.json");
    PathBuf::from(name)
}

/// Why an input could not be loaded.
#[derive(Debug)]
enum LoadError {
    /// The image is left out and the run continues.
    Skip(String),
    /// The landmark data is malformed; the whole run stops.
    Fatal(mean_face::Error),
}

/// Decode an image and its single face. Missing files, undecodable images
/// and sidecars without exactly one face are skips; a face with the wrong
/// number of landmarks aborts the run.
fn load_face(path: &Path) -> Result<FaceInput, LoadError> {
    let sidecar = sidecar_path(path);
    let text = std::fs::read_to_string(&sidecar).map_err(|e| {
        LoadError::Skip(format!("cannot read {}: {}", sidecar.display(), e))
    })?;
    let mut detected: Vec<Vec<Point>> = serde_json::from_str(&text)
        .map_err(|e| LoadError::Skip(format!("bad landmark file: {}", e)))?;

    if detected.len() != 1 {
        return Err(LoadError::Skip(format!(
            "expected exactly one face, found {}",
            detected.len()
        )));
    }
    let points = detected.pop().unwrap_or_default();
    let landmarks = LandmarkSet::new(points).map_err(LoadError::Fatal)?;

    let img = image::open(path).map_err(|e| LoadError::Skip(e.to_string()))?;
    debug!("loaded {} ({}x{})", path.display(), img.width(), img.height());
    let image = FloatImage::from_rgb8(&img.to_rgb8());

    Ok(FaceInput::new(image, landmarks))
}

fn summarize(
    args: &Args,
    result: &AverageResult,
    sources: &[PathBuf],
    mut skipped: Vec<Skipped>,
) -> Summary {
    let name = |i: usize| sources[i].display().to_string();
    skipped.extend(result.excluded.iter().map(|f| Skipped {
        image: name(f.image),
        reason: format!("{} stage: {}", f.stage, f.reason),
    }));

    Summary {
        output: args.output.display().to_string(),
        width: result.width,
        height: result.height,
        images_given: args.images.len(),
        images_loaded: sources.len(),
        images_used: result.used.iter().map(|&i| name(i)).collect(),
        skipped,
        triangles: result.triangles.len(),
    }
}

fn format_human_readable(summary: &Summary) -> String {
    let mut s = String::new();

    s.push_str(&format!(
        "Average face: {} ({}x{})\n",
        summary.output, summary.width, summary.height
    ));
    s.push_str(&format!(
        "Images: {} used, {} loaded, {} given\n",
        summary.images_used.len(),
        summary.images_loaded,
        summary.images_given
    ));
    s.push_str(&format!("Triangles: {}\n", summary.triangles));

    if !summary.skipped.is_empty() {
        s.push_str("\nSkipped:\n");
        for skip in &summary.skipped {
            s.push_str(&format!("  {}: {}\n", skip.image, skip.reason));
        }
    }

    s
}
