use kurbo::Point;

use crate::delaunay::Triangulation;

/// Point-location index over a [`Triangulation`].
///
/// A uniform grid buckets triangles by bounding box so that a query only
/// tests the handful of candidates overlapping its cell, instead of every
/// triangle. Queries on a shared edge resolve deterministically to the
/// lowest triangle index.
pub struct TriangleLocator<'a> {
    tri: &'a Triangulation,
    cols: usize,
    rows: usize,
    cell_w: f64,
    cell_h: f64,
    min: Point,
    cells: Vec<Vec<u32>>, // ascending triangle indices per cell
}

impl<'a> TriangleLocator<'a> {
    /// Build the index for a canvas spanning `[0, width) x [0, height)`.
    pub fn new(tri: &'a Triangulation, width: u32, height: u32) -> Self {
        let t = tri.triangle_count();
        let side = ((t as f64).sqrt().ceil() as usize).clamp(1, 256);
        let cols = side;
        let rows = side;
        let min = Point::new(0.0, 0.0);
        let cell_w = (f64::from(width) / cols as f64).max(1e-9);
        let cell_h = (f64::from(height) / rows as f64).max(1e-9);

        let mut cells = vec![Vec::new(); cols * rows];
        for ti in 0..t {
            let [a, b, c] = tri.vertices_of(ti);
            let lo_x = a.x.min(b.x).min(c.x);
            let hi_x = a.x.max(b.x).max(c.x);
            let lo_y = a.y.min(b.y).min(c.y);
            let hi_y = a.y.max(b.y).max(c.y);

            let c0 = clamp_cell((lo_x - min.x) / cell_w, cols);
            let c1 = clamp_cell((hi_x - min.x) / cell_w, cols);
            let r0 = clamp_cell((lo_y - min.y) / cell_h, rows);
            let r1 = clamp_cell((hi_y - min.y) / cell_h, rows);
            for r in r0..=r1 {
                for c in c0..=c1 {
                    cells[r * cols + c].push(ti as u32);
                }
            }
        }

        Self {
            tri,
            cols,
            rows,
            cell_w,
            cell_h,
            min,
            cells,
        }
    }

    /// Index of the triangle containing `p`, or `None` when no triangle does
    /// (the equivalent of the classic "simplex -1" answer).
    pub fn locate(&self, p: Point) -> Option<usize> {
        let c = clamp_cell((p.x - self.min.x) / self.cell_w, self.cols);
        let r = clamp_cell((p.y - self.min.y) / self.cell_h, self.rows);
        for &ti in &self.cells[r * self.cols + c] {
            let [va, vb, vc] = self.tri.vertices_of(ti as usize);
            if point_in_triangle(p, va, vb, vc) {
                return Some(ti as usize);
            }
        }
        None
    }
}

fn clamp_cell(v: f64, n: usize) -> usize {
    if v.is_nan() || v < 0.0 {
        return 0;
    }
    (v as usize).min(n - 1)
}

/// Inclusive point-in-triangle test: points on an edge or vertex count as
/// inside, with a tolerance relative to the magnitudes involved.
fn point_in_triangle(p: Point, a: Point, b: Point, c: Point) -> bool {
    let d1 = cross(p, a, b);
    let d2 = cross(p, b, c);
    let d3 = cross(p, c, a);

    let eps = 1e-9 * (d1.abs() + d2.abs() + d3.abs()).max(1e-12);
    let has_neg = d1 < -eps || d2 < -eps || d3 < -eps;
    let has_pos = d1 > eps || d2 > eps || d3 > eps;
    !(has_neg && has_pos)
}

fn cross(p: Point, a: Point, b: Point) -> f64 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delaunay::Triangulation;

    fn square() -> Triangulation {
        Triangulation::delaunay(&[(0, 0), (0, 9), (9, 0), (9, 9)]).unwrap()
    }

    #[test]
    fn locates_interior_points() {
        let tri = square();
        let loc = TriangleLocator::new(&tri, 10, 10);
        for &(x, y) in &[(1.0, 1.0), (8.0, 8.0), (4.2, 6.9)] {
            assert!(loc.locate(Point::new(x, y)).is_some());
        }
    }

    #[test]
    fn misses_points_outside_the_hull() {
        let tri = square();
        let loc = TriangleLocator::new(&tri, 10, 10);
        assert_eq!(loc.locate(Point::new(-1.0, 4.0)), None);
        assert_eq!(loc.locate(Point::new(20.0, 20.0)), None);
    }

    #[test]
    fn shared_edge_resolves_to_lowest_index() {
        let tri = square();
        let loc = TriangleLocator::new(&tri, 10, 10);
        // The diagonal is shared by both triangles; the tie must resolve to
        // the lower index, and repeatedly so.
        let diag_mid = Point::new(4.5, 4.5);
        assert_eq!(loc.locate(diag_mid), Some(0));
        for _ in 0..10 {
            assert_eq!(loc.locate(diag_mid), Some(0));
        }
    }

    #[test]
    fn every_canvas_pixel_is_located_exactly_once() {
        let tri = Triangulation::delaunay(&[
            (0, 0),
            (0, 19),
            (19, 0),
            (19, 19),
            (7, 3),
            (12, 15),
            (4, 11),
        ])
        .unwrap();
        let loc = TriangleLocator::new(&tri, 20, 20);
        let mut missed = 0;
        for y in 0..20 {
            for x in 0..20 {
                if loc.locate(Point::new(f64::from(x), f64::from(y))).is_none() {
                    missed += 1;
                }
            }
        }
        // Corners span the whole canvas, so the hull covers every pixel.
        assert_eq!(missed, 0);
    }
}
