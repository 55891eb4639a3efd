pub mod batch;
pub mod composite;
pub mod config;
pub mod context;
pub mod depth;
pub mod error;
pub mod image_loader;
pub mod job;
pub mod model;
pub mod pipeline;
pub mod plan;
pub mod service;
pub mod tags;
pub mod upscale;
pub mod video;

pub use batch::{batch_convert, BatchReport};
pub use config::{DepthModel, ExecutionMode, HomeLayout, PipelineConfig, RawOptions};
pub use context::InferenceContext;
pub use depth::{DepthField, DepthInference};
pub use error::{DepthGenError, DepthGenResult};
pub use job::{Job, JobKind};
pub use pipeline::Pipeline;
pub use plan::{plan_scaling, ScalingPlan};
pub use service::{Request, RequestChannel, ServiceOrchestrator, ServiceState, ServiceSummary, ZmqChannel};
pub use upscale::{LanczosUpscaler, SuperResolution};

#[cfg(feature = "onnx")]
pub use depth::OnnxDepthEstimator;
#[cfg(feature = "onnx")]
pub use upscale::OnnxUpscaler;

/// Loads the depth network and any installed super-resolution weights.
///
/// Missing depth weights are downloaded once; missing super-resolution
/// weights fall back to resampling.
#[cfg(feature = "onnx")]
pub async fn load_inference_context(config: &PipelineConfig) -> DepthGenResult<InferenceContext> {
	let layout = config.layout();
	let depth_path = model::ensure_depth_model(&layout.models, config.depth_model).await?;
	let depth = OnnxDepthEstimator::new(&depth_path)?;

	let sr_models = model::find_sr_models(&layout.models);
	let upscaler: Box<dyn SuperResolution> = if sr_models.is_empty() {
		tracing::warn!(
			"No super-resolution weights in {:?}. Using Lanczos resampling.",
			layout.models
		);
		Box::new(LanczosUpscaler)
	} else {
		Box::new(OnnxUpscaler::new(&sr_models)?)
	};

	Ok(InferenceContext::new(Box::new(depth), upscaler))
}

#[cfg(not(feature = "onnx"))]
pub async fn load_inference_context(_config: &PipelineConfig) -> DepthGenResult<InferenceContext> {
	Err(DepthGenError::Config(
		"No depth backend enabled. Build with the 'onnx' feature.".to_string(),
	))
}
