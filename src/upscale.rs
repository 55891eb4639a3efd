use crate::config::MAX_SR_FACTOR;
use crate::error::DepthGenResult;
use image::imageops::{self, FilterType};
use image::RgbImage;
use tracing::debug;

#[cfg(feature = "onnx")]
use crate::error::DepthGenError;
#[cfg(feature = "onnx")]
use ort::session::{builder::GraphOptimizationLevel, Session};
#[cfg(feature = "onnx")]
use std::path::Path;

/// Integer super-resolution network.
///
/// `upscale` is only called with a square tile and a factor in `2..=4`. The
/// returned image is `factor` times larger on both sides.
pub trait SuperResolution {
	fn upscale(&mut self, tile: &RgbImage, factor: u32) -> DepthGenResult<RgbImage>;

	/// Frees scratch memory held after a job. Called on every job exit path.
	fn release_transient(&mut self) {}
}

/// Runs one cascade pass and hands back an image with the source aspect ratio.
///
/// Factors outside `2..=4` return `image` untouched.
pub fn cascade_upscale(
	upscaler: &mut dyn SuperResolution,
	image: RgbImage,
	factor: u32,
) -> DepthGenResult<RgbImage> {
	if !(2..=MAX_SR_FACTOR).contains(&factor) {
		return Ok(image);
	}

	let (width, height) = image.dimensions();
	let side = width.max(height);
	let tile = imageops::resize(&image, side, side, FilterType::Lanczos3);
	drop(image);

	let upscaled = upscaler.upscale(&tile, factor)?;
	drop(tile);

	let (target_width, target_height) = restore_aspect(upscaled.dimensions(), width, height);
	debug!(
		"Super-resolution x{}: {}x{} -> {}x{}",
		factor, width, height, target_width, target_height
	);

	Ok(imageops::resize(
		&upscaled,
		target_width,
		target_height,
		FilterType::Lanczos3,
	))
}

/// Shrinks the squared side so the result matches `width / height`; the longer
/// source edge keeps a scale of 1.
fn restore_aspect(upscaled: (u32, u32), width: u32, height: u32) -> (u32, u32) {
	let (up_width, up_height) = upscaled;
	let aspect = width as f64 / height as f64;
	let (width_scale, height_scale) = if aspect > 1.0 {
		(1.0, 1.0 / aspect)
	} else {
		(aspect, 1.0)
	};
	(
		((up_width as f64 * width_scale) as u32).max(1),
		((up_height as f64 * height_scale) as u32).max(1),
	)
}

/// Resampling stand-in used when no super-resolution weights are installed.
#[derive(Debug, Default)]
pub struct LanczosUpscaler;

impl SuperResolution for LanczosUpscaler {
	fn upscale(&mut self, tile: &RgbImage, factor: u32) -> DepthGenResult<RgbImage> {
		let (width, height) = tile.dimensions();
		Ok(imageops::resize(
			tile,
			width * factor,
			height * factor,
			FilterType::Lanczos3,
		))
	}
}

/// NinaSR networks exported to ONNX, one session per factor.
#[cfg(feature = "onnx")]
pub struct OnnxUpscaler {
	sessions: Vec<(u32, Session)>,
}

#[cfg(feature = "onnx")]
impl OnnxUpscaler {
	pub fn new(models: &[(u32, std::path::PathBuf)]) -> DepthGenResult<Self> {
		let mut sessions = Vec::with_capacity(models.len());
		for (factor, path) in models {
			sessions.push((*factor, load_session(path)?));
		}
		Ok(Self { sessions })
	}
}

#[cfg(feature = "onnx")]
fn load_session(model_path: &Path) -> DepthGenResult<Session> {
	Session::builder()
		.map_err(|e| DepthGenError::Model(format!("Failed to create session: {}", e)))?
		.with_optimization_level(GraphOptimizationLevel::Level3)
		.map_err(|e| DepthGenError::Model(format!("Failed to set opt level: {}", e)))?
		.commit_from_file(model_path)
		.map_err(|e| {
			DepthGenError::Model(format!(
				"Failed to load super-resolution model {:?}: {}",
				model_path, e
			))
		})
}

#[cfg(feature = "onnx")]
impl SuperResolution for OnnxUpscaler {
	fn upscale(&mut self, tile: &RgbImage, factor: u32) -> DepthGenResult<RgbImage> {
		let session = match self.sessions.iter_mut().find(|(f, _)| *f == factor) {
			Some((_, session)) => session,
			None => return LanczosUpscaler.upscale(tile, factor),
		};

		let (width, height) = tile.dimensions();
		let (w, h) = (width as usize, height as usize);

		let mut input_data = vec![0.0f32; 3 * w * h];
		for (i, pixel) in tile.pixels().enumerate() {
			for c in 0..3 {
				input_data[c * w * h + i] = pixel[c] as f32 / 255.0;
			}
		}

		let input_value = ort::value::Value::from_array(([1usize, 3, h, w], input_data))
			.map_err(|e| DepthGenError::Inference(format!("Failed to create input: {}", e)))?;

		let outputs = session
			.run(ort::inputs![input_value])
			.map_err(|e| DepthGenError::Inference(format!("Super-resolution failed: {}", e)))?;

		let (shape, data) = outputs[0]
			.try_extract_tensor::<f32>()
			.map_err(|e| DepthGenError::Inference(format!("Failed to extract output: {}", e)))?;

		let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
		if dims.len() != 4 || dims[1] != 3 {
			return Err(DepthGenError::Inference(format!(
				"Unexpected super-resolution output shape {:?}",
				dims
			)));
		}
		let (out_h, out_w) = (dims[2], dims[3]);
		let plane = out_h * out_w;
		if data.len() < 3 * plane {
			return Err(DepthGenError::Inference(
				"Super-resolution output smaller than its shape".to_string(),
			));
		}

		let mut rgb = Vec::with_capacity(3 * plane);
		for i in 0..plane {
			for c in 0..3 {
				rgb.push((data[c * plane + i].clamp(0.0, 1.0) * 255.0).round() as u8);
			}
		}

		RgbImage::from_raw(out_w as u32, out_h as u32, rgb).ok_or_else(|| {
			DepthGenError::Inference("Failed to build upscaled image".to_string())
		})
	}
}
