use crate::composite::{compose_rgbd, save_jpeg};
use crate::config::{ExecutionMode, PipelineConfig, JPEG_QUALITY};
use crate::context::InferenceContext;
use crate::error::{DepthGenError, DepthGenResult};
use crate::image_loader::load_image;
use crate::job::{ExportKind, Job, JobKind};
use crate::plan::plan_scaling;
use crate::upscale::cascade_upscale;
use crate::video::ClipEncoder;
use image::imageops::{self, FilterType};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Converts one input at a time into an artifact in `export_dir`.
#[derive(Clone, Debug)]
pub struct Pipeline {
	config: PipelineConfig,
	export_dir: PathBuf,
	clips: ClipEncoder,
}

impl Pipeline {
	pub fn new(config: PipelineConfig, export_dir: impl Into<PathBuf>) -> Self {
		let clips = ClipEncoder::locate(config.binary_dir());
		Self {
			config,
			export_dir: export_dir.into(),
			clips,
		}
	}

	pub fn config(&self) -> &PipelineConfig {
		&self.config
	}

	pub fn export_dir(&self) -> &Path {
		&self.export_dir
	}

	pub fn clip_encoder(&self) -> &ClipEncoder {
		&self.clips
	}

	pub fn ensure_export_dir(&self) -> DepthGenResult<()> {
		std::fs::create_dir_all(&self.export_dir).map_err(|e| {
			DepthGenError::Io(format!(
				"Failed to create export directory {:?}: {}",
				self.export_dir, e
			))
		})
	}

	/// Runs one job and returns the artifact path.
	///
	/// Tagged inputs are refused only in single-file mode; batch mode filters
	/// them earlier and service mode converts whatever it is sent.
	pub fn generate_depth(
		&self,
		context: &mut InferenceContext,
		input: impl AsRef<Path>,
	) -> DepthGenResult<PathBuf> {
		let input = input.as_ref();
		if input.as_os_str().is_empty() {
			return Err(DepthGenError::InvalidInput("No file to load".to_string()));
		}
		if !input.is_file() {
			return Err(DepthGenError::InvalidInput(format!("Not a file: {:?}", input)));
		}

		let job = Job::new(input, &self.export_dir);
		match job.kind {
			JobKind::Unsupported => {
				return Err(DepthGenError::InvalidInput(format!(
					"Not a supported image: {:?}",
					input
				)));
			}
			JobKind::AlreadyTagged if self.config.mode == ExecutionMode::SingleFile => {
				return Err(DepthGenError::InvalidInput(format!(
					"File already 3D tagged: {:?}",
					input
				)));
			}
			_ => {}
		}

		info!("Attempting to load {:?}", input);

		match job.export {
			ExportKind::Video => {
				debug!("Saving MP4 {:?}", job.output);
				self.clips.encode_still(&job.input, &job.output)?;
			}
			ExportKind::Still => self.convert_still(context, &job)?,
		}

		info!("Generated depth for {:?}", job.output);
		Ok(job.output)
	}

	fn convert_still(&self, context: &mut InferenceContext, job: &Job) -> DepthGenResult<()> {
		let mut scope = context.job_scope();

		let color = load_image(&job.input)?;
		let (width, height) = color.dimensions();
		let plan = plan_scaling(width, height, &self.config)?;
		debug!("Scaling plan for {}x{}: {:?}", width, height, plan);

		let color = if plan.needs_super_resolution() {
			cascade_upscale(scope.upscaler.as_mut(), color, plan.sr_scale_factor)?
		} else {
			color
		};

		let working = imageops::resize(
			&color,
			plan.process_size,
			plan.process_size,
			FilterType::Lanczos3,
		);
		let depth = scope.depth.infer(&working, self.config.depth_size)?;
		drop(working);

		let frame = compose_rgbd(&color, &depth, &plan)?;
		drop(color);
		drop(depth);

		save_jpeg(&frame, &job.output, JPEG_QUALITY)
	}
}
