use std::collections::HashSet;

use kurbo::Point;

use crate::error::{LowpolyError, LowpolyResult};

/// A Delaunay triangulation over a fixed point list.
///
/// Triangles are index triples into `points`, normalized to positive signed
/// area. Each frame rebuilds its triangulation from scratch over its own
/// point prefix; there is no incremental reuse across frames.
#[derive(Clone, Debug)]
pub struct Triangulation {
    points: Vec<Point>,
    triangles: Vec<[usize; 3]>,
}

impl Triangulation {
    /// Triangulate integer raster coordinates.
    pub fn delaunay(coords: &[(u32, u32)]) -> LowpolyResult<Self> {
        let points = coords
            .iter()
            .map(|&(x, y)| Point::new(f64::from(x), f64::from(y)))
            .collect();
        Self::delaunay_points(points)
    }

    /// Bowyer-Watson insertion over `points`.
    ///
    /// Duplicate points are skipped (they cannot form new simplices); at least
    /// 3 distinct non-collinear points are required. Exactly cocircular
    /// configurations resolve deterministically: a point on a circumcircle
    /// boundary counts as outside.
    pub fn delaunay_points(points: Vec<Point>) -> LowpolyResult<Self> {
        if points.len() < 3 {
            return Err(LowpolyError::validation(
                "triangulation requires at least 3 points",
            ));
        }

        let (min, max) = bounds(&points);
        let dx = max.x - min.x;
        let dy = max.y - min.y;
        let span = dx.max(dy).max(1.0);
        let cx = (min.x + max.x) / 2.0;
        let cy = (min.y + max.y) / 2.0;

        // Vertices of a super-triangle strictly containing every input point,
        // appended after the real points and stripped again at the end.
        let n = points.len();
        let mut verts = points.clone();
        verts.push(Point::new(cx - 20.0 * span, cy - 10.0 * span));
        verts.push(Point::new(cx + 20.0 * span, cy - 10.0 * span));
        verts.push(Point::new(cx, cy + 20.0 * span));

        let mut triangles = vec![ccw(&verts, [n, n + 1, n + 2])];
        let mut seen = HashSet::with_capacity(n);

        for i in 0..n {
            let p = verts[i];
            if !seen.insert((p.x.to_bits(), p.y.to_bits())) {
                continue;
            }

            // Carve the cavity: triangles whose circumcircle contains p.
            let mut bad = Vec::new();
            for (ti, t) in triangles.iter().enumerate() {
                if circumcircle_contains(verts[t[0]], verts[t[1]], verts[t[2]], p) {
                    bad.push(ti);
                }
            }

            // Directed edges of the cavity whose twin is not in the cavity
            // form its boundary polygon.
            let mut cavity_edges = HashSet::with_capacity(bad.len() * 3);
            for &ti in &bad {
                let [a, b, c] = triangles[ti];
                cavity_edges.insert((a, b));
                cavity_edges.insert((b, c));
                cavity_edges.insert((c, a));
            }
            let boundary: Vec<(usize, usize)> = cavity_edges
                .iter()
                .copied()
                .filter(|&(a, b)| !cavity_edges.contains(&(b, a)))
                .collect();

            for &ti in bad.iter().rev() {
                triangles.swap_remove(ti);
            }
            for (a, b) in boundary {
                triangles.push(ccw(&verts, [a, b, i]));
            }
        }

        // Strip every face touching a super-triangle vertex.
        triangles.retain(|t| t.iter().all(|&v| v < n));
        triangles.sort_unstable();

        Ok(Self { points, triangles })
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Vertex positions of triangle `t`.
    pub fn vertices_of(&self, t: usize) -> [Point; 3] {
        let [a, b, c] = self.triangles[t];
        [self.points[a], self.points[b], self.points[c]]
    }
}

fn bounds(points: &[Point]) -> (Point, Point) {
    let mut min = Point::new(f64::INFINITY, f64::INFINITY);
    let mut max = Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
    for p in points {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
    }
    (min, max)
}

/// Signed twice-area of (a, b, c).
fn orient(a: Point, b: Point, c: Point) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

fn ccw(verts: &[Point], t: [usize; 3]) -> [usize; 3] {
    if orient(verts[t[0]], verts[t[1]], verts[t[2]]) < 0.0 {
        [t[0], t[2], t[1]]
    } else {
        t
    }
}

/// Strict in-circumcircle test via circumcenter and squared radius.
///
/// A degenerate (collinear) triangle contains nothing; a point exactly on the
/// circle counts as outside, which keeps cocircular grids deterministic.
fn circumcircle_contains(a: Point, b: Point, c: Point, p: Point) -> bool {
    let d = 2.0 * (a.x * (b.y - c.y) + b.x * (c.y - a.y) + c.x * (a.y - b.y));
    if d.abs() < f64::EPSILON {
        return false;
    }

    let a2 = a.x * a.x + a.y * a.y;
    let b2 = b.x * b.x + b.y * b.y;
    let c2 = c.x * c.x + c.y * c.y;
    let ux = (a2 * (b.y - c.y) + b2 * (c.y - a.y) + c2 * (a.y - b.y)) / d;
    let uy = (a2 * (c.x - b.x) + b2 * (a.x - c.x) + c2 * (b.x - a.x)) / d;

    let r2 = (a.x - ux).powi(2) + (a.y - uy).powi(2);
    let d2 = (p.x - ux).powi(2) + (p.y - uy).powi(2);
    d2 < r2 * (1.0 - 1e-12)
}
