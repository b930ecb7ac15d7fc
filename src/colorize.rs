use kurbo::Point;

use crate::core::{Rgb8, SourceImage};
use crate::delaunay::Triangulation;
use crate::locate::TriangleLocator;

/// Per-triangle mean color over the source pixels located inside it.
///
/// `colors[t]` is `None` when no pixel landed in triangle `t` (possible for
/// slivers thinner than a pixel); such triangles are skipped when drawing.
#[derive(Clone, Debug)]
pub struct ColorAssignment {
    pub colors: Vec<Option<Rgb8>>,
    /// Pixels accumulated into some triangle.
    pub assigned: u64,
    /// Pixels located in no triangle (the "-1 bucket"); excluded from the
    /// color mapping.
    pub unassigned: u64,
}

/// Scan every source pixel once, locate its containing triangle, and average
/// the accumulated colors per triangle.
pub fn average_colors(
    tri: &Triangulation,
    locator: &TriangleLocator<'_>,
    image: &SourceImage,
) -> ColorAssignment {
    let t = tri.triangle_count();
    let mut sums = vec![[0u64; 3]; t];
    let mut counts = vec![0u64; t];
    let mut unassigned = 0u64;

    for y in 0..image.height() {
        for x in 0..image.width() {
            match locator.locate(Point::new(f64::from(x), f64::from(y))) {
                Some(ti) => {
                    let px = image.get(x, y);
                    for c in 0..3 {
                        sums[ti][c] += u64::from(px[c]);
                    }
                    counts[ti] += 1;
                }
                None => unassigned += 1,
            }
        }
    }

    let assigned: u64 = counts.iter().sum();
    let colors = sums
        .into_iter()
        .zip(&counts)
        .map(|(sum, &n)| {
            if n == 0 {
                return None;
            }
            let mut mean = [0u8; 3];
            for c in 0..3 {
                mean[c] = ((sum[c] + n / 2) / n) as u8;
            }
            Some(mean)
        })
        .collect();

    ColorAssignment {
        colors,
        assigned,
        unassigned,
    }
}
