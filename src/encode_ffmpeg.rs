use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::error::{LowpolyError, LowpolyResult};

/// Options for assembling rendered frames into an MP4 with the system
/// `ffmpeg` binary.
#[derive(Clone, Debug)]
pub struct EncodeConfig {
    /// Directory holding the `NNNN.png` frame sequence.
    pub frames_dir: PathBuf,
    /// Output MP4 file path.
    pub out_path: PathBuf,
    /// Frames per second passed to the encoder.
    pub framerate: u32,
    /// Overwrite the output file if it already exists.
    pub overwrite: bool,
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Encode `frames_dir/%04d.png` into `out_path`.
///
/// The encoder's exit status is checked and a failure is returned as
/// [`LowpolyError::Encode`] with its stderr attached. Callers that consider
/// video assembly optional (the frames are already on disk) should downgrade
/// the error to a warning rather than propagate it.
#[tracing::instrument(skip_all, fields(out = %cfg.out_path.display()))]
pub fn encode_frames_to_mp4(cfg: &EncodeConfig) -> LowpolyResult<()> {
    if cfg.framerate == 0 {
        return Err(LowpolyError::validation("framerate must be >= 1"));
    }
    if !cfg.overwrite && cfg.out_path.exists() {
        return Err(LowpolyError::validation(format!(
            "output file '{}' already exists",
            cfg.out_path.display()
        )));
    }
    if !is_ffmpeg_on_path() {
        return Err(LowpolyError::encode(
            "ffmpeg is required for MP4 encoding, but was not found on PATH",
        ));
    }

    let output = Command::new("ffmpeg")
        .args(encode_args(cfg))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| {
            LowpolyError::encode(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(LowpolyError::encode(format!(
            "ffmpeg exited with status {}: {}",
            output.status,
            stderr.trim()
        )));
    }
    Ok(())
}

fn encode_args(cfg: &EncodeConfig) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();
    args.push(if cfg.overwrite { "-y" } else { "-n" }.into());
    args.push("-loglevel".into());
    args.push("error".into());
    args.push("-framerate".into());
    args.push(cfg.framerate.to_string().into());
    args.push("-i".into());
    args.push(cfg.frames_dir.join("%04d.png").into_os_string());
    args.push(cfg.out_path.clone().into_os_string());
    args
}
