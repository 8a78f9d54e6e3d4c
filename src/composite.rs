//! Reduction of per-face canvases into the final composite.

use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::raster::FloatImage;

/// Sum the canvases and divide by their count.
///
/// The canvases are folded pairwise in parallel; each one is owned by the
/// reduction so no shared accumulator exists. All canvases must share the
/// same dimensions.
pub fn average_canvases(canvases: Vec<FloatImage>) -> Result<FloatImage> {
    let count = canvases.len();
    if count < 2 {
        return Err(Error::too_few_images(count));
    }

    let mut sum = canvases
        .into_par_iter()
        .reduce_with(|mut acc, canvas| {
            acc.add_assign(&canvas);
            acc
        })
        .ok_or_else(|| Error::too_few_images(0))?;

    sum.scale(1.0 / count as f32);
    Ok(sum)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_three_canvases() {
        let canvases = vec![
            FloatImage::from_fn(4, 3, |x, _| [x as f32 * 0.1, 0.0, 1.0]),
            FloatImage::from_fn(4, 3, |_, y| [0.0, y as f32 * 0.3, 1.0]),
            FloatImage::from_fn(4, 3, |_, _| [0.3, 0.3, 1.0]),
        ];
        let avg = average_canvases(canvases).unwrap();

        let px = avg.pixel(3, 2);
        assert!((px[0] - 0.2).abs() < 1e-6);
        assert!((px[1] - 0.3).abs() < 1e-6);
        assert!((px[2] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn single_canvas_is_rejected() {
        let err = average_canvases(vec![FloatImage::new(2, 2)]).unwrap_err();
        assert!(matches!(err, Error::InsufficientPoints { image: None, .. }));
    }

    #[test]
    fn reduction_is_order_insensitive_within_tolerance() {
        let make = |k: u32| FloatImage::from_fn(8, 8, move |x, y| [((x * y + k) % 7) as f32 / 7.0; 3]);
        let forward = average_canvases((0..6).map(make).collect()).unwrap();
        let backward = average_canvases((0..6).rev().map(make).collect()).unwrap();

        for (a, b) in forward.pixels().iter().zip(backward.pixels()) {
            assert!((a[0] - b[0]).abs() < 1e-5);
        }
    }
}
