use crate::error::DepthGenResult;
use image::RgbImage;
use ndarray::Array2;

#[cfg(feature = "onnx")]
use crate::error::DepthGenError;
#[cfg(feature = "onnx")]
use image::{imageops::FilterType, ImageBuffer, Luma};
#[cfg(feature = "onnx")]
use ort::session::{builder::GraphOptimizationLevel, Session};
#[cfg(feature = "onnx")]
use std::path::Path;

/// Raw single-channel depth laid out as `(height, width)`. Its range depends on
/// the image, so it is only meaningful after per-image normalization.
pub type DepthField = Array2<f32>;

/// Monocular depth network.
///
/// `depth_size` sets the network's internal resolution; the returned field
/// always matches the input image. Implementations must be deterministic for a
/// fixed model and input. Errors surface as `DepthGenError::Inference` and are
/// never retried by the caller.
pub trait DepthInference {
	fn infer(&mut self, image: &RgbImage, depth_size: u32) -> DepthGenResult<DepthField>;

	/// Frees scratch memory held after a job. Called on every job exit path.
	fn release_transient(&mut self) {}
}

#[cfg(feature = "onnx")]
const PATCH_SIZE: u32 = 14;
#[cfg(feature = "onnx")]
const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
#[cfg(feature = "onnx")]
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Depth Anything V2 exported to ONNX.
#[cfg(feature = "onnx")]
pub struct OnnxDepthEstimator {
	session: Session,
}

#[cfg(feature = "onnx")]
impl OnnxDepthEstimator {
	pub fn new(model_path: &Path) -> DepthGenResult<Self> {
		let session = Session::builder()
			.map_err(|e| DepthGenError::Model(format!("Failed to create session: {}", e)))?
			.with_optimization_level(GraphOptimizationLevel::Level3)
			.map_err(|e| DepthGenError::Model(format!("Failed to set opt level: {}", e)))?
			.with_intra_threads(4)
			.map_err(|e| DepthGenError::Model(format!("Failed to set threads: {}", e)))?
			.commit_from_file(model_path)
			.map_err(|e| DepthGenError::Model(format!("Failed to load ONNX model: {}", e)))?;

		Ok(Self { session })
	}
}

#[cfg(feature = "onnx")]
impl DepthInference for OnnxDepthEstimator {
	fn infer(&mut self, image: &RgbImage, depth_size: u32) -> DepthGenResult<DepthField> {
		let (orig_width, orig_height) = image.dimensions();

		// The ViT encoder needs a multiple of its patch size.
		let input_size = (depth_size.saturating_add(PATCH_SIZE / 2) / PATCH_SIZE).max(1) * PATCH_SIZE;
		let size = input_size as usize;

		let resized = image::imageops::resize(image, input_size, input_size, FilterType::CatmullRom);

		let mut input_data = vec![0.0f32; 3 * size * size];
		for (i, pixel) in resized.pixels().enumerate() {
			for c in 0..3 {
				let normalized = (pixel[c] as f32 / 255.0 - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
				input_data[c * size * size + i] = normalized;
			}
		}
		drop(resized);

		let input_value = ort::value::Value::from_array(([1usize, 3, size, size], input_data))
			.map_err(|e| DepthGenError::Inference(format!("Failed to create input: {}", e)))?;

		let outputs = self
			.session
			.run(ort::inputs![input_value])
			.map_err(|e| DepthGenError::Inference(format!("Depth inference failed: {}", e)))?;

		let (shape, data) = outputs[0]
			.try_extract_tensor::<f32>()
			.map_err(|e| DepthGenError::Inference(format!("Failed to extract output: {}", e)))?;

		let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
		if dims.len() < 2 {
			return Err(DepthGenError::Inference(format!(
				"Unexpected depth output shape {:?}",
				dims
			)));
		}
		let h = dims[dims.len() - 2];
		let w = dims[dims.len() - 1];

		let plane = data.get(..w * h).ok_or_else(|| {
			DepthGenError::Inference("Depth output smaller than its shape".to_string())
		})?;
		let depth_image: ImageBuffer<Luma<f32>, Vec<f32>> =
			ImageBuffer::from_raw(w as u32, h as u32, plane.to_vec()).ok_or_else(|| {
				DepthGenError::Inference("Depth output does not fit its shape".to_string())
			})?;

		let resized_depth =
			image::imageops::resize(&depth_image, orig_width, orig_height, FilterType::Triangle);

		Array2::from_shape_vec(
			(orig_height as usize, orig_width as usize),
			resized_depth.into_raw(),
		)
		.map_err(|e| DepthGenError::Inference(format!("Failed to reshape depth: {}", e)))
	}
}
