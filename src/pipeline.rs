use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Context as _;
use rayon::prelude::*;

use crate::colorize::average_colors;
use crate::core::{FrameIndex, FrameRange, PointSet, Rgb8, SourceImage};
use crate::delaunay::Triangulation;
use crate::error::{LowpolyError, LowpolyResult};
use crate::locate::TriangleLocator;
use crate::raster::{DEFAULT_UPSCALE, rasterize_frame};
use crate::sample::Samples;

/// Shared completion counter for a worker pool.
///
/// Replaces ambient global state: one counter per render job, incremented
/// exactly once per completed frame task (successful or failed) and handed to
/// workers by reference.
pub struct ProgressCounter {
    done: AtomicU64,
    total: u64,
}

impl ProgressCounter {
    pub fn new(total: u64) -> Self {
        Self {
            done: AtomicU64::new(0),
            total,
        }
    }

    /// Record one completed task and return the new completion count.
    pub fn increment(&self) -> u64 {
        self.done.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn done(&self) -> u64 {
        self.done.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u64 {
        self.total
    }
}

/// Everything shared read-only across frame workers: the source image, the
/// ordered point set, and the canvas background color.
#[derive(Clone, Debug)]
pub struct Scene {
    pub image: SourceImage,
    pub points: PointSet,
    pub background: Rgb8,
}

impl Scene {
    /// Assemble the scene from a decoded image and its accepted samples.
    ///
    /// An empty sample set (constant input image) is degenerate but valid:
    /// every frame falls back to the 4-corner two-triangle rendering.
    pub fn new(image: SourceImage, samples: Samples) -> Self {
        if samples.is_empty() {
            tracing::warn!(
                "no sample points accepted; frames will contain only the corner triangulation"
            );
        }
        let points = PointSet::with_corners(image.width(), image.height(), samples.points);
        let background = image.mean_rgb();
        Self {
            image,
            points,
            background,
        }
    }
}

/// Frame production options.
#[derive(Clone, Debug)]
pub struct RenderOpts {
    /// Frame indices to produce (start inclusive, end exclusive).
    pub range: FrameRange,
    /// Points added per detail level; higher rates densify faster.
    pub rate: u32,
    /// Worker pool size.
    pub workers: usize,
    /// Supersampling factor for the rasterizer.
    pub upscale: u32,
    /// Directory receiving `NNNN.png` frames, indexed relative to the range
    /// start.
    pub out_dir: PathBuf,
}

impl Default for RenderOpts {
    fn default() -> Self {
        Self {
            range: FrameRange {
                start: FrameIndex(0),
                end: FrameIndex(100),
            },
            rate: 10,
            workers: 4,
            upscale: DEFAULT_UPSCALE,
            out_dir: PathBuf::from("output"),
        }
    }
}

/// One frame task that did not produce its output file.
#[derive(Clone, Debug)]
pub struct FrameFailure {
    pub frame: FrameIndex,
    pub message: String,
}

/// Outcome of a render job. Failed frames are isolated, not fatal.
#[derive(Clone, Debug, Default)]
pub struct RenderStats {
    pub frames_total: u64,
    pub frames_ok: u64,
    pub failures: Vec<FrameFailure>,
}

/// Produce every frame in `opts.range` across a fixed-size worker pool.
///
/// Frames are embarrassingly parallel: each worker triangulates, colorizes,
/// rasterizes, and saves its frame independently, sharing only read-only
/// scene data and the progress counter. A failure inside one frame task is
/// captured in [`RenderStats::failures`] and does not abort the others.
/// `progress` (if set) observes `(completed, total)` after every task, in
/// completion order.
#[tracing::instrument(skip_all, fields(start = opts.range.start.0, end = opts.range.end.0))]
pub fn render_frames(
    scene: &Scene,
    opts: &RenderOpts,
    progress: Option<&(dyn Fn(u64, u64) + Sync)>,
) -> LowpolyResult<RenderStats> {
    if opts.range.is_empty() {
        return Err(LowpolyError::validation("render range must be non-empty"));
    }
    if opts.rate == 0 {
        return Err(LowpolyError::validation("rate must be >= 1"));
    }
    if opts.workers == 0 {
        return Err(LowpolyError::validation("worker count must be >= 1"));
    }

    std::fs::create_dir_all(&opts.out_dir).with_context(|| {
        format!(
            "failed to create output directory '{}'",
            opts.out_dir.display()
        )
    })?;

    let total = opts.range.len_frames();
    let counter = ProgressCounter::new(total);
    let pool = build_thread_pool(opts.workers)?;

    let results: Vec<(FrameIndex, LowpolyResult<()>)> = pool.install(|| {
        (opts.range.start.0..opts.range.end.0)
            .into_par_iter()
            .map(|f| {
                let frame = FrameIndex(f);
                let result = render_one(scene, opts, frame);
                let done = counter.increment();
                if let Some(cb) = progress {
                    cb(done, total);
                }
                (frame, result)
            })
            .collect()
    });

    let mut stats = RenderStats {
        frames_total: total,
        ..RenderStats::default()
    };
    for (frame, result) in results {
        match result {
            Ok(()) => stats.frames_ok += 1,
            Err(e) => {
                tracing::warn!(frame = frame.0, error = %e, "frame task failed");
                stats.failures.push(FrameFailure {
                    frame,
                    message: e.to_string(),
                });
            }
        }
    }
    Ok(stats)
}

/// Output path for the frame at `rel` positions past the range start.
pub fn frame_path(dir: &Path, rel: u64) -> PathBuf {
    dir.join(format!("{rel:04}.png"))
}

fn render_one(scene: &Scene, opts: &RenderOpts, frame: FrameIndex) -> LowpolyResult<()> {
    let n = scene.points.prefix_len(opts.rate, frame);
    let tri = Triangulation::delaunay(scene.points.prefix(n))?;
    let locator = TriangleLocator::new(&tri, scene.image.width(), scene.image.height());
    let assignment = average_colors(&tri, &locator, &scene.image);
    let rendered = rasterize_frame(
        &tri,
        &assignment,
        scene.background,
        scene.image.width(),
        scene.image.height(),
        opts.upscale,
    )?;

    let rel = frame.0 - opts.range.start.0;
    let path = frame_path(&opts.out_dir, rel);
    rendered
        .save(&path)
        .with_context(|| format!("failed to write frame '{}'", path.display()))?;
    Ok(())
}

fn build_thread_pool(workers: usize) -> LowpolyResult<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| LowpolyError::raster(format!("failed to build worker pool: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = PathBuf::from("target").join("pipeline_tests").join(name);
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    fn checker_scene(w: u32, h: u32) -> Scene {
        let mut px = Vec::new();
        for y in 0..h {
            for x in 0..w {
                px.push(if (x / 4 + y / 4) % 2 == 0 {
                    [230u8, 230, 230]
                } else {
                    [20, 20, 20]
                });
            }
        }
        let image = SourceImage::new(w, h, px).unwrap();
        let samples = Samples {
            points: vec![(5, 5), (10, 3), (3, 12), (13, 13), (8, 8)],
            weights: vec![1.0; 5],
        };
        Scene::new(image, samples)
    }

    #[test]
    fn progress_counter_counts_to_total() {
        let c = ProgressCounter::new(5);
        assert_eq!(c.done(), 0);
        for expected in 1..=5 {
            assert_eq!(c.increment(), expected);
        }
        assert_eq!(c.done(), c.total());
    }

    #[test]
    fn rejects_invalid_options() {
        let scene = checker_scene(16, 16);
        let base = RenderOpts {
            range: FrameRange::new(FrameIndex(0), FrameIndex(1)).unwrap(),
            out_dir: scratch_dir("rejects_invalid"),
            ..RenderOpts::default()
        };

        let empty = RenderOpts {
            range: FrameRange::new(FrameIndex(3), FrameIndex(3)).unwrap(),
            ..base.clone()
        };
        assert!(render_frames(&scene, &empty, None).is_err());

        let zero_rate = RenderOpts {
            rate: 0,
            ..base.clone()
        };
        assert!(render_frames(&scene, &zero_rate, None).is_err());

        let zero_workers = RenderOpts {
            workers: 0,
            ..base
        };
        assert!(render_frames(&scene, &zero_workers, None).is_err());
    }

    #[test]
    fn output_files_are_indexed_relative_to_begin() {
        let scene = checker_scene(16, 16);
        let out_dir = scratch_dir("relative_indexing");
        let opts = RenderOpts {
            range: FrameRange::new(FrameIndex(5), FrameIndex(8)).unwrap(),
            rate: 2,
            workers: 2,
            upscale: 2,
            out_dir: out_dir.clone(),
        };

        let stats = render_frames(&scene, &opts, None).unwrap();
        assert_eq!(stats.frames_total, 3);
        assert_eq!(stats.frames_ok, 3);
        assert!(stats.failures.is_empty());

        for rel in 0..3 {
            assert!(frame_path(&out_dir, rel).is_file(), "missing frame {rel:04}");
        }
        assert!(!frame_path(&out_dir, 3).exists());
    }

    #[test]
    fn progress_reaches_total_exactly_once_per_frame() {
        let scene = checker_scene(16, 16);
        let opts = RenderOpts {
            range: FrameRange::new(FrameIndex(0), FrameIndex(4)).unwrap(),
            rate: 1,
            workers: 4,
            upscale: 1,
            out_dir: scratch_dir("progress"),
        };

        let seen = Mutex::new(Vec::new());
        let cb = |done: u64, total: u64| {
            assert_eq!(total, 4);
            seen.lock().unwrap().push(done);
        };
        render_frames(&scene, &opts, Some(&cb)).unwrap();

        let mut seen = seen.into_inner().unwrap();
        seen.sort_unstable();
        assert_eq!(seen, vec![1, 2, 3, 4]);
    }

    #[test]
    fn one_bad_frame_does_not_abort_the_rest() {
        let scene = checker_scene(16, 16);
        let out_dir = scratch_dir("isolation");
        std::fs::create_dir_all(&out_dir).unwrap();
        // A directory squatting on frame 1's path makes only that save fail.
        std::fs::create_dir_all(frame_path(&out_dir, 1)).unwrap();

        let opts = RenderOpts {
            range: FrameRange::new(FrameIndex(0), FrameIndex(3)).unwrap(),
            rate: 2,
            workers: 2,
            upscale: 1,
            out_dir: out_dir.clone(),
        };
        let stats = render_frames(&scene, &opts, None).unwrap();

        assert_eq!(stats.frames_total, 3);
        assert_eq!(stats.frames_ok, 2);
        assert_eq!(stats.failures.len(), 1);
        assert_eq!(stats.failures[0].frame, FrameIndex(1));
        assert!(frame_path(&out_dir, 0).is_file());
        assert!(frame_path(&out_dir, 2).is_file());
    }

    #[test]
    fn degenerate_scene_still_renders_corner_triangulation() {
        let image = SourceImage::new(16, 16, vec![[99, 99, 99]; 256]).unwrap();
        let scene = Scene::new(image, Samples::default());
        assert_eq!(scene.points.len(), 4);

        let out_dir = scratch_dir("degenerate");
        let opts = RenderOpts {
            range: FrameRange::new(FrameIndex(0), FrameIndex(2)).unwrap(),
            rate: 10,
            workers: 2,
            upscale: 2,
            out_dir: out_dir.clone(),
        };
        let stats = render_frames(&scene, &opts, None).unwrap();
        assert_eq!(stats.frames_ok, 2);

        // Mean color of a constant image is the image color itself, so the
        // two-triangle frame is constant too.
        let frame = image::open(frame_path(&out_dir, 0)).unwrap().to_rgb8();
        assert_eq!(frame.dimensions(), (16, 16));
        let center = frame.get_pixel(8, 8);
        assert_eq!(center.0, [99, 99, 99]);
    }
}
