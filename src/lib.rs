//! Lowpoly turns a raster image into a sequence of progressively more
//! detailed "low-poly" renderings, and optionally assembles them into a
//! video.
//!
//! # Pipeline overview
//!
//! 1. **Density**: source image -> edge-biased importance field
//!    (difference of Gaussians over luminance).
//! 2. **Sample**: seeded rejection sampling over the field -> ordered point
//!    set (4 canvas corners + accepted samples).
//! 3. **Per frame**: Delaunay-triangulate a growing point prefix, average
//!    source colors per triangle via point location, rasterize anti-aliased
//!    triangles at a supersampled resolution, downsample, save PNG.
//! 4. **Encode** (optional): hand the frame sequence to the system `ffmpeg`
//!    binary for MP4 output.
//!
//! Frames are independent of each other, so production is embarrassingly
//! parallel across a fixed-size worker pool; progress is reported through a
//! shared atomic counter.
//!
//! Key design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Deterministic-by-default**: a fixed sampling seed makes repeated runs
//!   over the same image byte-identical.
//! - **Isolated frame failures**: one bad frame is reported, not fatal.
#![forbid(unsafe_code)]

pub mod colorize;
pub mod core;
pub mod delaunay;
pub mod density;
pub mod encode_ffmpeg;
pub mod error;
pub mod locate;
pub mod pipeline;
pub mod raster;
pub mod sample;

pub use colorize::{ColorAssignment, average_colors};
pub use core::{FrameIndex, FrameRange, PointSet, Rgb8, SourceImage};
pub use delaunay::Triangulation;
pub use density::{DensityField, LUMA_WEIGHTS, SIGMA_BASE, SIGMA_DETAIL, gaussian_blur};
pub use encode_ffmpeg::{EncodeConfig, encode_frames_to_mp4, is_ffmpeg_on_path};
pub use error::{LowpolyError, LowpolyResult};
pub use locate::TriangleLocator;
pub use pipeline::{
    FrameFailure, ProgressCounter, RenderOpts, RenderStats, Scene, frame_path, render_frames,
};
pub use raster::{DEFAULT_UPSCALE, rasterize_frame};
pub use sample::{SampleConfig, Samples, sample_density};
