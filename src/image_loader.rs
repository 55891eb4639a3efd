use crate::error::{DepthGenError, DepthGenResult};
use crate::tags;
use image::{ImageReader, RgbImage};
use std::path::Path;

/// Decodes a supported still into the 8-bit RGB working format.
pub fn load_image(path: impl AsRef<Path>) -> DepthGenResult<RgbImage> {
	let path = path.as_ref();

	if !path.is_file() {
		return Err(DepthGenError::InvalidInput(format!(
			"Image file not found: {:?}",
			path
		)));
	}

	if !tags::is_supported(path) {
		return Err(DepthGenError::InvalidInput(format!(
			"Unsupported image format: {:?}",
			path
		)));
	}

	let reader = ImageReader::open(path)
		.map_err(|e| DepthGenError::Decode(format!("Failed to open image {:?}: {}", path, e)))?
		.with_guessed_format()
		.map_err(|e| DepthGenError::Decode(format!("Failed to read image {:?}: {}", path, e)))?;

	let img = reader
		.decode()
		.map_err(|e| DepthGenError::Decode(format!("Failed to load image {:?}: {}", path, e)))?;

	Ok(img.to_rgb8())
}
