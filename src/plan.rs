use crate::config::{PipelineConfig, EXPORT_UPSCALE, MAX_SR_FACTOR, SCREEN_ASPECT};
use crate::error::{DepthGenError, DepthGenResult};

/// Resolution policy for one job.
///
/// The depth network always works on a `process_size` square. The restore
/// multipliers turn that square back into the source aspect ratio when the
/// export is composited.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScalingPlan {
	pub width_restore: f64,
	pub height_restore: f64,
	pub process_size: u32,
	pub sr_scale_factor: u32,
}

impl ScalingPlan {
	pub fn needs_super_resolution(&self) -> bool {
		self.sr_scale_factor > 1
	}

	/// Size of each half of the exported frame.
	pub fn restored_size(&self) -> (u32, u32) {
		let side = self.process_size as f64;
		let width = (side * self.width_restore) as u32;
		let height = (side * self.height_restore) as u32;
		(width.max(1), height.max(1))
	}
}

pub fn plan_scaling(width: u32, height: u32, config: &PipelineConfig) -> DepthGenResult<ScalingPlan> {
	if width == 0 || height == 0 {
		return Err(DepthGenError::InvalidInput(format!(
			"Image has no pixels ({}x{})",
			width, height
		)));
	}

	let image_aspect = width as f64 / height as f64;
	let upscale_width = config.upscale_width as f64;

	let mut width_restore = 1.0;
	let mut height_restore = 1.0;

	let (scale_factor, process_size) = if image_aspect > SCREEN_ASPECT {
		height_restore = 1.0 / image_aspect;
		(upscale_width / width as f64, EXPORT_UPSCALE)
	} else {
		width_restore = image_aspect;
		(
			(upscale_width / SCREEN_ASPECT) / height as f64,
			(EXPORT_UPSCALE as f64 / SCREEN_ASPECT) as u32,
		)
	};

	let process_size = process_size.min(config.max_texture_size / 2);

	// A factor below 2 leaves the cascade disabled.
	let sr_scale_factor = (scale_factor.floor() as u32).clamp(1, MAX_SR_FACTOR);

	Ok(ScalingPlan {
		width_restore,
		height_restore,
		process_size,
		sr_scale_factor,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::MAX_TEXTURE_SIZE;

	fn config_with_texture(max_texture_size: u32) -> PipelineConfig {
		PipelineConfig {
			max_texture_size,
			..PipelineConfig::default()
		}
	}

	#[test]
	fn wide_image_restores_height() {
		let plan = plan_scaling(4000, 2000, &config_with_texture(MAX_TEXTURE_SIZE)).unwrap();
		assert_eq!(plan.width_restore, 1.0);
		assert_eq!(plan.height_restore, 0.5);
		assert_eq!(plan.process_size, 3840);
		assert_eq!(plan.sr_scale_factor, 1);
		assert!(!plan.needs_super_resolution());
		assert_eq!(plan.restored_size(), (3840, 1920));
	}

	#[test]
	fn tall_image_restores_width() {
		let plan = plan_scaling(1000, 2000, &config_with_texture(MAX_TEXTURE_SIZE)).unwrap();
		assert_eq!(plan.width_restore, 0.5);
		assert_eq!(plan.height_restore, 1.0);
		// 3840 / 1.777 truncates to 2160.
		assert_eq!(plan.process_size, 2160);
		assert_eq!(plan.sr_scale_factor, 1);
	}

	#[test]
	fn process_size_is_capped_by_texture_ceiling() {
		let config = config_with_texture(4096);
		for (w, h) in [(4000, 2000), (1000, 2000), (12000, 500), (64, 64)] {
			let plan = plan_scaling(w, h, &config).unwrap();
			assert!(plan.process_size <= 2048, "{}x{} -> {}", w, h, plan.process_size);
		}
	}

	#[test]
	fn small_images_request_capped_cascade() {
		let config = PipelineConfig::default();
		// (1920 / 1.777) / 100 ~= 10.8, capped at 4.
		let plan = plan_scaling(100, 100, &config).unwrap();
		assert_eq!(plan.sr_scale_factor, 4);
		assert!(plan.needs_super_resolution());

		// 1920 / 800 = 2.4 -> 2.
		let plan = plan_scaling(800, 300, &config).unwrap();
		assert_eq!(plan.sr_scale_factor, 2);

		// (1920 / 1.777) / 360 ~= 3.0 -> 3.
		let plan = plan_scaling(360, 360, &config).unwrap();
		assert_eq!(plan.sr_scale_factor, 3);
	}

	#[test]
	fn factor_always_in_range() {
		let config = PipelineConfig::default();
		for w in [1, 7, 90, 640, 1920, 5000, 20000] {
			for h in [1, 9, 120, 480, 1080, 4000, 15000] {
				let plan = plan_scaling(w, h, &config).unwrap();
				assert!((1..=4).contains(&plan.sr_scale_factor));
			}
		}
	}

	#[test]
	fn restored_size_preserves_aspect() {
		let config = config_with_texture(MAX_TEXTURE_SIZE);
		for (w, h) in [(4000, 2000), (1000, 2000), (1920, 1080), (3000, 3000), (800, 1200), (5000, 1000)] {
			let plan = plan_scaling(w, h, &config).unwrap();
			let (rw, rh) = plan.restored_size();
			let source = w as f64 / h as f64;
			let restored = rw as f64 / rh as f64;
			assert!(
				(source - restored).abs() / source < 0.01,
				"{}x{} restored to {}x{}",
				w,
				h,
				rw,
				rh
			);
		}
	}

	#[test]
	fn zero_dimension_is_rejected() {
		let err = plan_scaling(0, 100, &PipelineConfig::default()).unwrap_err();
		assert!(matches!(err, DepthGenError::InvalidInput(_)));
	}
}
