use crate::error::{DepthGenError, DepthGenResult};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

pub const CLIP_SECONDS: u32 = 1;
pub const CLIP_FPS: u32 = 24;

/// Turns one still into a short H.264 clip for CubeVI displays.
#[derive(Clone, Debug)]
pub struct ClipEncoder {
	ffmpeg: PathBuf,
}

impl ClipEncoder {
	/// Prefers an ffmpeg bundled in `binary_dir`, then whatever is on `PATH`.
	pub fn locate(binary_dir: impl AsRef<Path>) -> Self {
		let bundled = binary_dir.as_ref().join(ffmpeg_file_name());
		let ffmpeg = if bundled.is_file() {
			bundled
		} else {
			PathBuf::from("ffmpeg")
		};
		Self { ffmpeg }
	}

	pub fn ffmpeg(&self) -> &Path {
		&self.ffmpeg
	}

	pub fn is_available(&self) -> bool {
		Command::new(&self.ffmpeg)
			.arg("-version")
			.output()
			.map(|output| output.status.success())
			.unwrap_or(false)
	}

	pub fn encode_still(&self, input: &Path, output: &Path) -> DepthGenResult<()> {
		let args = clip_args(input, output);
		debug!("Running {:?} {:?}", self.ffmpeg, args);

		let result = Command::new(&self.ffmpeg).args(&args).output().map_err(|e| {
			DepthGenError::Encode(format!(
				"Failed to run ffmpeg at {:?}: {}. Bundle it under Binary/ or add it to PATH.",
				self.ffmpeg, e
			))
		})?;

		if !result.status.success() {
			let stderr = String::from_utf8_lossy(&result.stderr);
			return Err(DepthGenError::Encode(format!(
				"ffmpeg failed to write {:?}:\n{}",
				output, stderr
			)));
		}

		Ok(())
	}
}

fn clip_args(input: &Path, output: &Path) -> Vec<OsString> {
	let mut args: Vec<OsString> = ["-y", "-loglevel", "error", "-loop", "1", "-i"]
		.iter()
		.map(OsString::from)
		.collect();
	args.push(input.as_os_str().to_os_string());
	for arg in [
		"-t".to_string(),
		CLIP_SECONDS.to_string(),
		"-r".to_string(),
		CLIP_FPS.to_string(),
		"-c:v".to_string(),
		"libx264".to_string(),
		"-preset".to_string(),
		"ultrafast".to_string(),
		"-pix_fmt".to_string(),
		"yuv420p".to_string(),
		// yuv420p needs even dimensions.
		"-vf".to_string(),
		"scale=trunc(iw/2)*2:trunc(ih/2)*2".to_string(),
	] {
		args.push(OsString::from(arg));
	}
	args.push(output.as_os_str().to_os_string());
	args
}

fn ffmpeg_file_name() -> &'static str {
	if cfg!(windows) {
		"ffmpeg.exe"
	} else {
		"ffmpeg"
	}
}
