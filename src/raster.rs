use image::RgbaImage;
use image::imageops::{self, FilterType};
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Stroke, Transform};

use crate::colorize::ColorAssignment;
use crate::core::Rgb8;
use crate::delaunay::Triangulation;
use crate::error::{LowpolyError, LowpolyResult};

/// Supersampling factor applied before rasterization and removed again by the
/// bilinear downsample, to soften aliasing on triangle edges.
pub const DEFAULT_UPSCALE: u32 = 2;

/// Draw the colored triangulation to an RGBA frame at (width, height).
///
/// The canvas starts at `upscale` times the output resolution, pre-filled
/// with `background` (the source image's mean color, covering any sliver a
/// triangle misses). Each colored triangle is drawn as an anti-aliased filled
/// path and then re-stroked in the same color to smooth seams between
/// adjacent fills, the canvas is downsampled with a bilinear filter.
pub fn rasterize_frame(
    tri: &Triangulation,
    assignment: &ColorAssignment,
    background: Rgb8,
    width: u32,
    height: u32,
    upscale: u32,
) -> LowpolyResult<RgbaImage> {
    if upscale == 0 {
        return Err(LowpolyError::validation("upscale must be >= 1"));
    }
    let canvas_w = width
        .checked_mul(upscale)
        .ok_or_else(|| LowpolyError::validation("upscaled canvas width overflow"))?;
    let canvas_h = height
        .checked_mul(upscale)
        .ok_or_else(|| LowpolyError::validation("upscaled canvas height overflow"))?;

    let mut pixmap = Pixmap::new(canvas_w, canvas_h)
        .ok_or_else(|| LowpolyError::raster("failed to allocate raster canvas"))?;
    pixmap.fill(tiny_skia::Color::from_rgba8(
        background[0],
        background[1],
        background[2],
        255,
    ));

    let scale = f64::from(upscale);
    let mut paint = Paint::default();
    paint.anti_alias = true;
    let stroke = Stroke {
        width: 1.0,
        ..Stroke::default()
    };

    for (t, color) in assignment.colors.iter().enumerate() {
        let Some(color) = color else {
            continue;
        };
        let [a, b, c] = tri.vertices_of(t);

        let mut pb = PathBuilder::new();
        pb.move_to((a.x * scale) as f32, (a.y * scale) as f32);
        pb.line_to((b.x * scale) as f32, (b.y * scale) as f32);
        pb.line_to((c.x * scale) as f32, (c.y * scale) as f32);
        pb.close();
        let Some(path) = pb.finish() else {
            // Degenerate (zero-area) path; nothing to draw.
            continue;
        };

        paint.set_color_rgba8(color[0], color[1], color[2], 255);
        pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }

    // Everything drawn is opaque over an opaque background, so the pixmap's
    // premultiplied data is already straight RGBA.
    let canvas = RgbaImage::from_raw(canvas_w, canvas_h, pixmap.take())
        .ok_or_else(|| LowpolyError::raster("raster canvas buffer size mismatch"))?;

    if upscale == 1 {
        return Ok(canvas);
    }
    Ok(imageops::resize(&canvas, width, height, FilterType::Triangle))
}
