use anyhow::{bail, Context};
use clap::Parser;
use depth_generate::{
	batch_convert, load_inference_context, tags, ExecutionMode, InferenceContext, Pipeline,
	PipelineConfig, RawOptions, ServiceOrchestrator, ZmqChannel,
};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "depth-generate")]
#[command(about = "Convert 2D images into side-by-side RGB-D exports for 3D displays")]
#[command(version)]
struct Cli {
	/// Depth model: 0 (small), 1 (base), 2 (large)
	#[arg(long, allow_hyphen_values = true)]
	model: Option<String>,

	/// Depth network processing size
	#[arg(long, allow_hyphen_values = true)]
	depth: Option<String>,

	/// Target width for super-resolution before depth inference
	#[arg(long, allow_hyphen_values = true)]
	upscale: Option<String>,

	/// Maximum GPU texture size (4096 to 16384)
	#[arg(long, allow_hyphen_values = true)]
	maxsize: Option<String>,

	/// Controller endpoint for service mode, e.g. tcp://127.0.0.1:5555
	#[arg(long)]
	endpoint: Option<String>,

	/// 0 (single file), 1 (batch directory), 2 (service)
	#[arg(long, allow_hyphen_values = true)]
	mode: Option<String>,

	/// Install root; Binary/ may hold a bundled ffmpeg
	#[arg(long)]
	base: Option<PathBuf>,

	/// Data root holding Temp and Models
	#[arg(long)]
	home: Option<PathBuf>,

	/// Image file or directory to convert
	#[arg(long)]
	input: Option<PathBuf>,
}

impl Cli {
	fn into_options(self) -> RawOptions {
		RawOptions {
			model: self.model,
			depth: self.depth,
			upscale: self.upscale,
			maxsize: self.maxsize,
			endpoint: self.endpoint,
			mode: self.mode,
			base: self.base,
			home: self.home,
			input: self.input,
		}
	}
}

fn init_tracing() {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_target(false)
		.init();
}

async fn load_context(pipeline: &Pipeline) -> anyhow::Result<InferenceContext> {
	let config = pipeline.config();
	info!(
		"DepthGenerate started with {} model - depth: {} - upscale: {} - max size: {} - mode: {}",
		config.depth_model.label(),
		config.depth_size,
		config.upscale_width,
		config.max_texture_size,
		config.mode.name()
	);

	if !pipeline.clip_encoder().is_available() {
		warn!(
			"ffmpeg not found at {:?}. CubeVI exports will fail.",
			pipeline.clip_encoder().ffmpeg()
		);
	}

	let context = load_inference_context(config)
		.await
		.context("Failed to load depth model")?;
	info!("Depth model is fully loaded.");
	Ok(context)
}

async fn run_single(config: PipelineConfig) -> anyhow::Result<()> {
	let input = config.input.clone().context("No input given")?;
	if !input.is_file() {
		bail!("Invalid file: {:?}", input);
	}

	let export_dir = config.export_dir()?;
	let pipeline = Pipeline::new(config, export_dir);
	pipeline.ensure_export_dir()?;

	let mut context = load_context(&pipeline).await?;
	let output = pipeline.generate_depth(&mut context, &input)?;

	println!("{}", output.display());
	Ok(())
}

async fn run_batch(config: PipelineConfig) -> anyhow::Result<()> {
	let input = config.input.clone().context("No input given")?;
	if !input.is_dir() || tags::is_export_dir(&input) {
		bail!("Invalid directory: {:?}", input);
	}

	let export_dir = config.export_dir()?;
	let pipeline = Pipeline::new(config, export_dir);
	pipeline.ensure_export_dir()?;

	let mut context = load_context(&pipeline).await?;
	let report = batch_convert(&pipeline, &mut context, &input)?;

	println!(
		"{} converted, {} skipped, {} failed",
		report.converted.len(),
		report.skipped.len(),
		report.failed.len()
	);
	Ok(())
}

async fn run_service(config: PipelineConfig) -> anyhow::Result<()> {
	let endpoint = config
		.endpoint
		.clone()
		.context("Service mode requires --endpoint")?;
	let mut channel = ZmqChannel::connect(&endpoint).await?;

	let export_dir = config.export_dir()?;
	if !export_dir.is_dir() {
		bail!("Temp directory {:?} does not exist", export_dir);
	}

	let pipeline = Pipeline::new(config, export_dir);
	let mut context = load_context(&pipeline).await?;

	ServiceOrchestrator::new(&pipeline, &mut context, &mut channel)
		.run()
		.await?;
	Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	init_tracing();
	let cli = Cli::parse();

	info!("Starting DepthGenerate");
	let config = PipelineConfig::from_options(cli.into_options())?;

	match config.mode {
		ExecutionMode::SingleFile => run_single(config).await,
		ExecutionMode::Batch => run_batch(config).await,
		ExecutionMode::Service => run_service(config).await,
	}
}
