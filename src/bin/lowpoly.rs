use std::io::Write as _;
use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;

use lowpoly::{
    DensityField, EncodeConfig, FrameIndex, FrameRange, RenderOpts, SampleConfig, Scene,
    SourceImage, encode_frames_to_mp4, render_frames, sample_density,
};

/// Create low-poly images and videos from the command line.
#[derive(Parser, Debug)]
#[command(name = "lowpoly", version)]
struct Cli {
    /// Input image.
    image: PathBuf,

    /// Starting frame index (inclusive).
    #[arg(long, default_value_t = 0)]
    begin: u64,

    /// Ending frame index (exclusive).
    #[arg(long, default_value_t = 100)]
    end: u64,

    /// Points added per detail level; higher rates generate more detailed
    /// images with more triangles.
    #[arg(long, default_value_t = 10)]
    rate: u32,

    /// Number of parallel frame workers.
    #[arg(long = "worker_count", default_value_t = 4)]
    worker_count: usize,

    /// Render a video from the frames at the end (requires `ffmpeg` on PATH).
    #[arg(long)]
    video: bool,

    /// Framerate of the rendered video.
    #[arg(long, default_value_t = 24)]
    framerate: u32,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let decoded = image::open(&cli.image)
        .with_context(|| format!("failed to load image '{}'", cli.image.display()))?
        .to_rgb8();
    let image = SourceImage::from_rgb(&decoded)?;

    let field = DensityField::from_image(&image)?;
    let samples = sample_density(&field, &SampleConfig::default());
    eprintln!("accepted {} sample points", samples.len());
    let scene = Scene::new(image, samples);

    let stem = cli
        .image
        .file_stem()
        .context("input image path has no file name")?
        .to_string_lossy()
        .into_owned();
    let out_dir = PathBuf::from("output").join(&stem);

    let opts = RenderOpts {
        range: FrameRange::new(FrameIndex(cli.begin), FrameIndex(cli.end))?,
        rate: cli.rate,
        workers: cli.worker_count,
        out_dir: out_dir.clone(),
        ..RenderOpts::default()
    };

    let progress = |done: u64, total: u64| {
        let percent = done as f64 / total as f64 * 100.0;
        eprint!("\r{done:04}/{total} {percent:.2}%");
        let _ = std::io::stderr().flush();
    };
    let stats = render_frames(&scene, &opts, Some(&progress))?;
    eprintln!();

    for failure in &stats.failures {
        eprintln!("warning: frame {} failed: {}", failure.frame.0, failure.message);
    }
    if stats.frames_ok == 0 {
        anyhow::bail!("no frames were produced");
    }
    eprintln!("finished creating {} images in '{}'", stats.frames_ok, out_dir.display());

    if cli.video {
        let cfg = EncodeConfig {
            frames_dir: out_dir.clone(),
            out_path: out_dir.join(format!("{stem}.mp4")),
            framerate: cli.framerate,
            overwrite: true,
        };
        // Frames are already on disk; a broken encoder should not fail the run.
        match encode_frames_to_mp4(&cfg) {
            Ok(()) => eprintln!("created video '{}'", cfg.out_path.display()),
            Err(e) => eprintln!("warning: video encoding failed: {e}"),
        }
    }

    Ok(())
}
