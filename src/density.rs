use crate::core::SourceImage;
use crate::error::{LowpolyError, LowpolyResult};

/// Perceptual luminance weights (ITU-R BT.709) for R, G, B.
pub const LUMA_WEIGHTS: [f32; 3] = [0.2126, 0.7152, 0.0722];

/// Default small/large blur sigmas for the difference-of-Gaussians field.
pub const SIGMA_DETAIL: f32 = 2.0;
pub const SIGMA_BASE: f32 = 30.0;

/// Scalar importance field in [0, 1], biased toward edges and fine detail.
///
/// Built once from the source image as a difference of two Gaussian blurs of
/// the luminance channel; point sampling rejects against these values.
#[derive(Clone, Debug)]
pub struct DensityField {
    width: u32,
    height: u32,
    values: Vec<f32>, // row-major, y * width + x
}

impl DensityField {
    /// Build the field with the default sigmas.
    pub fn from_image(image: &SourceImage) -> LowpolyResult<Self> {
        Self::with_sigmas(image, SIGMA_DETAIL, SIGMA_BASE)
    }

    /// Build the field with explicit blur sigmas.
    ///
    /// Negative difference entries are attenuated (x0.1) rather than
    /// discarded, then the field is compressed with `sqrt(|d| / max(d))`.
    /// A constant input image produces an all-zero (degenerate) field, which
    /// is valid: the sampler will simply accept nothing.
    pub fn with_sigmas(
        image: &SourceImage,
        sigma_detail: f32,
        sigma_base: f32,
    ) -> LowpolyResult<Self> {
        let width = image.width();
        let height = image.height();
        let luma = luminance(image);

        let detail = gaussian_blur(&luma, width, height, sigma_detail)?;
        let base = gaussian_blur(&luma, width, height, sigma_base)?;

        let mut diff: Vec<f32> = detail
            .iter()
            .zip(&base)
            .map(|(d, b)| {
                let v = d - b;
                if v < 0.0 { v * 0.1 } else { v }
            })
            .collect();

        let max = diff.iter().copied().fold(f32::MIN, f32::max);
        // Blurs of a constant image differ only by accumulated f32 rounding
        // noise, so the maximum must clear a floor relative to the luminance
        // scale before it counts as detail.
        let mean_luma = luma.iter().sum::<f32>() / luma.len() as f32;
        if max <= mean_luma * 1e-5 {
            tracing::warn!("density field is degenerate; sampling will accept no points");
            diff.fill(0.0);
            return Ok(Self {
                width,
                height,
                values: diff,
            });
        }

        for v in &mut diff {
            *v = (v.abs() / max).sqrt().clamp(0.0, 1.0);
        }
        Ok(Self {
            width,
            height,
            values: diff,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Density at (x, y). Callers must stay in bounds.
    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.values[(y as usize) * (self.width as usize) + (x as usize)]
    }

    /// True when the whole field is zero (constant input image).
    pub fn is_degenerate(&self) -> bool {
        self.values.iter().all(|&v| v == 0.0)
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }
}

fn luminance(image: &SourceImage) -> Vec<f32> {
    let mut out = Vec::with_capacity(image.width() as usize * image.height() as usize);
    for y in 0..image.height() {
        for x in 0..image.width() {
            let px = image.get(x, y);
            out.push(
                f32::from(px[0]) * LUMA_WEIGHTS[0]
                    + f32::from(px[1]) * LUMA_WEIGHTS[1]
                    + f32::from(px[2]) * LUMA_WEIGHTS[2],
            );
        }
    }
    out
}

/// Separable Gaussian blur with reflecting boundary handling
/// (`d c b a | a b c d`). Kernel support is truncated at 4 sigma.
pub fn gaussian_blur(src: &[f32], width: u32, height: u32, sigma: f32) -> LowpolyResult<Vec<f32>> {
    let expected = (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(|| LowpolyError::input("blur buffer size overflow"))?;
    if src.len() != expected {
        return Err(LowpolyError::input(
            "gaussian_blur expects src matching width*height",
        ));
    }

    let kernel = gaussian_kernel(sigma)?;
    let mut tmp = vec![0.0f32; expected];
    let mut out = vec![0.0f32; expected];
    horizontal_pass(src, &mut tmp, width, height, &kernel);
    vertical_pass(&tmp, &mut out, width, height, &kernel);
    Ok(out)
}

fn gaussian_kernel(sigma: f32) -> LowpolyResult<Vec<f32>> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(LowpolyError::validation("blur sigma must be > 0"));
    }

    let radius = (4.0 * sigma).ceil() as i32;
    let denom = 2.0 * f64::from(sigma) * f64::from(sigma);
    let mut weights = Vec::with_capacity((2 * radius + 1) as usize);
    let mut sum = 0.0f64;
    for i in -radius..=radius {
        let x = f64::from(i);
        let w = (-x * x / denom).exp();
        weights.push(w);
        sum += w;
    }

    Ok(weights.into_iter().map(|w| (w / sum) as f32).collect())
}

fn horizontal_pass(src: &[f32], dst: &mut [f32], width: u32, height: u32, k: &[f32]) {
    let radius = (k.len() / 2) as i64;
    let w = width as i64;
    for y in 0..height as i64 {
        let row = (y * w) as usize;
        for x in 0..w {
            let mut acc = 0.0f32;
            for (ki, &kw) in k.iter().enumerate() {
                let sx = reflect_index(x + ki as i64 - radius, w);
                acc += kw * src[row + sx];
            }
            dst[row + x as usize] = acc;
        }
    }
}

fn vertical_pass(src: &[f32], dst: &mut [f32], width: u32, height: u32, k: &[f32]) {
    let radius = (k.len() / 2) as i64;
    let w = width as i64;
    let h = height as i64;
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0f32;
            for (ki, &kw) in k.iter().enumerate() {
                let sy = reflect_index(y + ki as i64 - radius, h);
                acc += kw * src[sy * (w as usize) + (x as usize)];
            }
            dst[(y * w + x) as usize] = acc;
        }
    }
}

/// Map an out-of-range index into [0, n) by reflection about the array edges,
/// duplicating the edge sample (`d c b a | a b c d`).
fn reflect_index(mut i: i64, n: i64) -> usize {
    debug_assert!(n > 0);
    loop {
        if i < 0 {
            i = -i - 1;
        } else if i >= n {
            i = 2 * n - 1 - i;
        } else {
            return i as usize;
        }
    }
}
