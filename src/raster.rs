//! Floating-point RGB raster and resampling.

use image::RgbImage;

use crate::similarity::Affine2;
use crate::types::Rect;

/// An RGB pixel with channels in `[0, 1]`.
pub type Rgb = [f32; 3];

/// Trait for accessing pixel intensities from an image.
pub trait ImageAccess {
    /// Get the RGB intensity at (x, y). Returns black for out-of-bounds pixels.
    fn get_pixel(&self, x: i32, y: i32) -> Rgb;

    /// Image dimensions.
    fn width(&self) -> u32;
    fn height(&self) -> u32;
}

/// How samples outside the source are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Border {
    /// Out-of-range samples are black.
    Zero,
    /// Mirror about the edge pixel without repeating it: `gfedcb|abcdefgh|gfedcba`.
    Reflect101,
}

/// A width x height grid of RGB pixels, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct FloatImage {
    data: Vec<Rgb>,
    width: u32,
    height: u32,
}

impl FloatImage {
    /// A black image.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            data: vec![[0.0; 3]; (width as usize) * (height as usize)],
            width,
            height,
        }
    }

    /// Wrap a row-major pixel buffer.
    ///
    /// # Panics
    ///
    /// Panics if `data.len()` is not `width * height`.
    pub fn from_data(data: Vec<Rgb>, width: u32, height: u32) -> Self {
        assert_eq!(
            data.len(),
            (width as usize) * (height as usize),
            "pixel buffer does not match {}x{}",
            width,
            height
        );
        Self {
            data,
            width,
            height,
        }
    }

    pub fn from_fn<F>(width: u32, height: u32, f: F) -> Self
    where
        F: Fn(u32, u32) -> Rgb,
    {
        let mut data = Vec::with_capacity((width as usize) * (height as usize));
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            data,
            width,
            height,
        }
    }

    /// Convert 8-bit RGB to `[0, 1]` floats.
    pub fn from_rgb8(img: &RgbImage) -> Self {
        let data = img
            .pixels()
            .map(|p| {
                [
                    p[0] as f32 / 255.0,
                    p[1] as f32 / 255.0,
                    p[2] as f32 / 255.0,
                ]
            })
            .collect();
        Self::from_data(data, img.width(), img.height())
    }

    /// Quantize to 8-bit RGB, clamping out-of-range intensities.
    pub fn to_rgb8(&self) -> RgbImage {
        let mut raw = Vec::with_capacity(self.data.len() * 3);
        for px in &self.data {
            for c in px {
                raw.push((c.clamp(0.0, 1.0) * 255.0).round() as u8);
            }
        }
        // Buffer length matches width * height * 3 by construction.
        RgbImage::from_raw(self.width, self.height, raw)
            .unwrap_or_else(|| RgbImage::new(self.width, self.height))
    }

    pub fn pixels(&self) -> &[Rgb] {
        &self.data
    }

    pub fn pixels_mut(&mut self) -> &mut [Rgb] {
        &mut self.data
    }

    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Rgb {
        self.data[(y * self.width + x) as usize]
    }

    #[inline]
    pub fn pixel_mut(&mut self, x: u32, y: u32) -> &mut Rgb {
        &mut self.data[(y * self.width + x) as usize]
    }

    /// Copy out the part of `rect` that lies inside the image.
    pub fn crop(&self, rect: Rect) -> FloatImage {
        let x0 = rect.x.clamp(0, self.width as i32) as u32;
        let y0 = rect.y.clamp(0, self.height as i32) as u32;
        let x1 = (rect.x as i64 + rect.width as i64).clamp(0, self.width as i64) as u32;
        let y1 = (rect.y as i64 + rect.height as i64).clamp(0, self.height as i64) as u32;
        let (w, h) = (x1.saturating_sub(x0), y1.saturating_sub(y0));

        let mut data = Vec::with_capacity((w as usize) * (h as usize));
        for y in y0..y0 + h {
            let start = (y * self.width + x0) as usize;
            data.extend_from_slice(&self.data[start..start + w as usize]);
        }
        FloatImage::from_data(data, w, h)
    }

    /// Pixel-wise sum.
    pub fn add_assign(&mut self, other: &FloatImage) {
        debug_assert_eq!((self.width, self.height), (other.width, other.height));
        for (p, q) in self.data.iter_mut().zip(other.data.iter()) {
            p[0] += q[0];
            p[1] += q[1];
            p[2] += q[2];
        }
    }

    pub fn scale(&mut self, factor: f32) {
        for p in &mut self.data {
            p[0] *= factor;
            p[1] *= factor;
            p[2] *= factor;
        }
    }
}

impl ImageAccess for FloatImage {
    fn get_pixel(&self, x: i32, y: i32) -> Rgb {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return [0.0; 3];
        }
        self.data[(y as u32 * self.width + x as u32) as usize]
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

/// Reflect an index into `0..n` without repeating the edge sample.
#[inline]
fn reflect_101(i: i32, n: i32) -> i32 {
    if n <= 1 {
        return 0;
    }
    let period = 2 * (n - 1);
    let m = i.rem_euclid(period);
    if m < n {
        m
    } else {
        period - m
    }
}

#[inline]
fn fetch<I: ImageAccess>(image: &I, x: i32, y: i32, border: Border) -> Rgb {
    match border {
        Border::Zero => image.get_pixel(x, y),
        Border::Reflect101 => image.get_pixel(
            reflect_101(x, image.width() as i32),
            reflect_101(y, image.height() as i32),
        ),
    }
}

/// Sample a pixel with bilinear interpolation for sub-pixel accuracy.
#[inline]
pub fn sample_bilinear<I: ImageAccess>(image: &I, x: f32, y: f32, border: Border) -> Rgb {
    // Get integer coordinates of the four surrounding pixels
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    let x1 = x0 + 1;
    let y1 = y0 + 1;

    // Compute fractional parts
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = fetch(image, x0, y0, border);
    let p10 = fetch(image, x1, y0, border);
    let p01 = fetch(image, x0, y1, border);
    let p11 = fetch(image, x1, y1, border);

    let mut out = [0.0; 3];
    for c in 0..3 {
        let top = p00[c] * (1.0 - fx) + p10[c] * fx;
        let bottom = p01[c] * (1.0 - fx) + p11[c] * fx;
        out[c] = top * (1.0 - fy) + bottom * fy;
    }
    out
}

/// Resample `src` through `transform` into a `width` x `height` image.
///
/// Each output pixel is pulled from the source location given by the
/// inverse transform. A singular transform yields a black image.
pub fn warp_affine<I: ImageAccess>(
    src: &I,
    transform: &Affine2,
    width: u32,
    height: u32,
    border: Border,
) -> FloatImage {
    let mut out = FloatImage::new(width, height);
    if src.width() == 0 || src.height() == 0 {
        return out;
    }
    let Some(inverse) = transform.inverse() else {
        return out;
    };

    for y in 0..height {
        for x in 0..width {
            let (sx, sy) = inverse.apply_f64(x as f64, y as f64);
            *out.pixel_mut(x, y) = sample_bilinear(src, sx as f32, sy as f32, border);
        }
    }
    out
}
