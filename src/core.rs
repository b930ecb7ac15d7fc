use crate::error::{LowpolyError, LowpolyResult};

/// A straight (non-premultiplied) RGB8 pixel.
pub type Rgb8 = [u8; 3];

/// Zero-based frame index within a render job.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Half-open frame range (start inclusive, end exclusive).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FrameRange {
    pub start: FrameIndex,
    pub end: FrameIndex, // exclusive
}

impl FrameRange {
    pub fn new(start: FrameIndex, end: FrameIndex) -> LowpolyResult<Self> {
        if start.0 > end.0 {
            return Err(LowpolyError::validation("FrameRange start must be <= end"));
        }
        Ok(Self { start, end })
    }

    pub fn len_frames(self) -> u64 {
        self.end.0.saturating_sub(self.start.0)
    }

    pub fn is_empty(self) -> bool {
        self.start.0 == self.end.0
    }

    pub fn contains(self, f: FrameIndex) -> bool {
        self.start.0 <= f.0 && f.0 < self.end.0
    }
}

/// Immutable W×H RGB8 source image, shared read-only across frame workers.
#[derive(Clone, Debug)]
pub struct SourceImage {
    width: u32,
    height: u32,
    pixels: Vec<Rgb8>, // row-major, y * width + x
}

impl SourceImage {
    /// Wrap a decoded [`image::RgbImage`].
    pub fn from_rgb(img: &image::RgbImage) -> LowpolyResult<Self> {
        let (width, height) = img.dimensions();
        let pixels = img.pixels().map(|p| p.0).collect();
        Self::new(width, height, pixels)
    }

    /// Build from raw row-major pixels. Dimensions must be non-zero and match.
    pub fn new(width: u32, height: u32, pixels: Vec<Rgb8>) -> LowpolyResult<Self> {
        if width == 0 || height == 0 {
            return Err(LowpolyError::input("source image must be non-empty"));
        }
        let expected = (width as usize)
            .checked_mul(height as usize)
            .ok_or_else(|| LowpolyError::input("source image size overflow"))?;
        if pixels.len() != expected {
            return Err(LowpolyError::input(format!(
                "source pixel count {} does not match {width}x{height}",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel at (x, y). Callers must stay in bounds.
    pub fn get(&self, x: u32, y: u32) -> Rgb8 {
        self.pixels[(y as usize) * (self.width as usize) + (x as usize)]
    }

    /// Component-wise arithmetic mean over all pixels, used as the canvas
    /// background color.
    pub fn mean_rgb(&self) -> Rgb8 {
        let mut sum = [0u64; 3];
        for px in &self.pixels {
            for c in 0..3 {
                sum[c] += u64::from(px[c]);
            }
        }
        let n = self.pixels.len() as u64;
        let mut out = [0u8; 3];
        for c in 0..3 {
            out[c] = ((sum[c] + n / 2) / n) as u8;
        }
        out
    }
}

/// Ordered point set: 4 fixed canvas corners followed by accepted samples.
///
/// Order is significant: the triangulation for frame `i` uses only a prefix of
/// this sequence, so earlier frames see strict prefixes of later ones.
#[derive(Clone, Debug)]
pub struct PointSet {
    points: Vec<(u32, u32)>,
}

impl PointSet {
    /// Build the ordered set for a W×H canvas: corners first, then `samples`
    /// in their original draw order.
    pub fn with_corners(
        width: u32,
        height: u32,
        samples: impl IntoIterator<Item = (u32, u32)>,
    ) -> Self {
        let mut points = vec![
            (0, 0),
            (0, height.saturating_sub(1)),
            (width.saturating_sub(1), 0),
            (width.saturating_sub(1), height.saturating_sub(1)),
        ];
        points.extend(samples);
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of points the triangulation for `frame` uses: the 4 corners plus
    /// `rate` additional samples per detail level, clamped to the available
    /// points (running past the end is not an error).
    pub fn prefix_len(&self, rate: u32, frame: FrameIndex) -> usize {
        let wanted = 4u64
            .saturating_add(u64::from(rate).saturating_mul(frame.0.saturating_add(1)));
        usize::try_from(wanted)
            .unwrap_or(usize::MAX)
            .min(self.points.len())
    }

    /// First `n` points in order.
    pub fn prefix(&self, n: usize) -> &[(u32, u32)] {
        &self.points[..n.min(self.points.len())]
    }

    pub fn as_slice(&self) -> &[(u32, u32)] {
        &self.points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_range_contains_boundaries() {
        let r = FrameRange::new(FrameIndex(2), FrameIndex(5)).unwrap();
        assert!(!r.contains(FrameIndex(1)));
        assert!(r.contains(FrameIndex(2)));
        assert!(r.contains(FrameIndex(4)));
        assert!(!r.contains(FrameIndex(5)));
    }

    #[test]
    fn frame_range_rejects_reversed_bounds() {
        assert!(FrameRange::new(FrameIndex(5), FrameIndex(2)).is_err());
    }

    #[test]
    fn source_image_rejects_mismatched_pixels() {
        assert!(SourceImage::new(2, 2, vec![[0, 0, 0]; 3]).is_err());
        assert!(SourceImage::new(0, 2, Vec::new()).is_err());
    }

    #[test]
    fn mean_rgb_of_two_tone_image() {
        let img = SourceImage::new(2, 1, vec![[0, 0, 0], [255, 255, 255]]).unwrap();
        assert_eq!(img.mean_rgb(), [128, 128, 128]);
    }

    #[test]
    fn point_set_places_corners_first() {
        let set = PointSet::with_corners(100, 50, [(10, 20)]);
        assert_eq!(
            set.as_slice(),
            &[(0, 0), (0, 49), (99, 0), (99, 49), (10, 20)]
        );
    }

    #[test]
    fn prefix_len_grows_monotonically_and_clamps() {
        let set = PointSet::with_corners(10, 10, (0..20).map(|i| (i, i)));
        let mut prev = 0;
        for f in 0..10 {
            let n = set.prefix_len(3, FrameIndex(f));
            assert!(n >= prev);
            assert!(n >= 4);
            assert!(n <= set.len());
            prev = n;
        }
        // rate 3, frame 0 => corners + 3 samples
        assert_eq!(set.prefix_len(3, FrameIndex(0)), 7);
        // far past the end of the set: all points, not an error
        assert_eq!(set.prefix_len(1000, FrameIndex(99)), set.len());
    }

    #[test]
    fn earlier_prefixes_are_strict_prefixes_of_later() {
        let set = PointSet::with_corners(10, 10, (0..50).map(|i| (i % 10, i / 10)));
        let a = set.prefix(set.prefix_len(5, FrameIndex(1))).to_vec();
        let b = set.prefix(set.prefix_len(5, FrameIndex(3)));
        assert!(a.len() < b.len());
        assert_eq!(&b[..a.len()], a.as_slice());
    }
}
