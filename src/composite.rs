use crate::depth::DepthField;
use crate::error::{DepthGenError, DepthGenResult};
use crate::plan::ScalingPlan;
use image::imageops::{self, FilterType};
use image::{GrayImage, RgbImage};
use rayon::prelude::*;
use std::io::Write;
use std::path::Path;

/// Rescales raw depth to 0..=255 against the field's own min and max.
///
/// Depth is not comparable between images. A flat field maps to mid-gray.
pub fn normalize_depth(depth: &DepthField) -> GrayImage {
	let (height, width) = depth.dim();
	let values: Vec<f32> = depth.iter().copied().collect();

	let (min_val, max_val) = values
		.iter()
		.copied()
		.filter(|v| v.is_finite())
		.fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
			(lo.min(v), hi.max(v))
		});
	let range = max_val - min_val;

	let pixels: Vec<u8> = if range.is_finite() && range > 1e-6 {
		values
			.par_iter()
			.map(|&v| {
				let v = if v.is_finite() { v } else { min_val };
				((v - min_val) / range * 255.0).clamp(0.0, 255.0) as u8
			})
			.collect()
	} else {
		vec![128; values.len()]
	};

	GrayImage::from_raw(width as u32, height as u32, pixels)
		.unwrap_or_else(|| GrayImage::new(width as u32, height as u32))
}

/// Copies the single depth channel into all three color channels.
pub fn depth_to_rgb(depth: &GrayImage) -> RgbImage {
	let (width, height) = depth.dimensions();
	let raw: Vec<u8> = depth
		.as_raw()
		.par_iter()
		.flat_map_iter(|&v| [v, v, v])
		.collect();
	RgbImage::from_raw(width, height, raw).unwrap_or_else(|| RgbImage::new(width, height))
}

/// Places `left` and `right` next to each other, left first.
pub fn create_sbs_image(left: &RgbImage, right: &RgbImage) -> DepthGenResult<RgbImage> {
	if left.height() != right.height() {
		return Err(DepthGenError::Encode(format!(
			"Color and depth must have the same height: {} != {}",
			left.height(),
			right.height()
		)));
	}

	let left_width = left.width();
	let mut combined = RgbImage::new(left_width + right.width(), left.height());

	imageops::replace(&mut combined, left, 0, 0);
	imageops::replace(&mut combined, right, left_width as i64, 0);

	Ok(combined)
}

/// Builds the RGB-D export frame.
///
/// Color and depth are each resized to the plan's restored size, then joined
/// with color on the left. The result is twice the restored width.
pub fn compose_rgbd(color: &RgbImage, depth: &DepthField, plan: &ScalingPlan) -> DepthGenResult<RgbImage> {
	let (width, height) = plan.restored_size();

	let color_resized = imageops::resize(color, width, height, FilterType::Lanczos3);

	let depth_rgb = depth_to_rgb(&normalize_depth(depth));
	let depth_resized = imageops::resize(&depth_rgb, width, height, FilterType::Lanczos3);
	drop(depth_rgb);

	create_sbs_image(&color_resized, &depth_resized)
}

/// Writes `image` as JPEG, replacing any existing file.
pub fn save_jpeg(image: &RgbImage, path: &Path, quality: u8) -> DepthGenResult<()> {
	let file = std::fs::File::create(path).map_err(|e| {
		DepthGenError::Encode(format!("Failed to create output file {:?}: {}", path, e))
	})?;
	let mut writer = std::io::BufWriter::new(file);

	image::codecs::jpeg::JpegEncoder::new_with_quality(&mut writer, quality)
		.encode(
			image.as_raw(),
			image.width(),
			image.height(),
			image::ExtendedColorType::Rgb8,
		)
		.map_err(|e| DepthGenError::Encode(format!("Failed to encode JPEG: {}", e)))?;

	writer
		.flush()
		.map_err(|e| DepthGenError::Encode(format!("Failed to write {:?}: {}", path, e)))?;

	Ok(())
}
