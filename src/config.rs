use crate::error::{DepthGenError, DepthGenResult};
use crate::tags;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Aspect ratio of the target display.
pub const SCREEN_ASPECT: f64 = 1.777;
/// Long edge of the working square when the image is wider than the screen.
pub const EXPORT_UPSCALE: u32 = 3840;
pub const JPEG_QUALITY: u8 = 90;
pub const MAX_SR_FACTOR: u32 = 4;

pub const DEFAULT_DEPTH_SIZE: u32 = 560;
/// Largest depth network input; the working square never exceeds this either.
pub const MAX_DEPTH_SIZE: u32 = MAX_TEXTURE_SIZE / 2;
pub const DEFAULT_UPSCALE_WIDTH: u32 = 1920;
pub const MIN_TEXTURE_SIZE: u32 = 4096;
pub const MAX_TEXTURE_SIZE: u32 = 16384;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DepthModel {
	#[default]
	Small,
	Base,
	Large,
}

impl DepthModel {
	pub fn from_index(index: u32) -> Option<Self> {
		match index {
			0 => Some(DepthModel::Small),
			1 => Some(DepthModel::Base),
			2 => Some(DepthModel::Large),
			_ => None,
		}
	}

	pub fn label(&self) -> &'static str {
		match self {
			DepthModel::Small => "Small",
			DepthModel::Base => "Base",
			DepthModel::Large => "Large",
		}
	}

	pub fn encoder(&self) -> &'static str {
		match self {
			DepthModel::Small => "vits",
			DepthModel::Base => "vitb",
			DepthModel::Large => "vitl",
		}
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExecutionMode {
	#[default]
	SingleFile,
	Batch,
	Service,
}

impl ExecutionMode {
	pub fn from_index(index: u32) -> Option<Self> {
		match index {
			0 => Some(ExecutionMode::SingleFile),
			1 => Some(ExecutionMode::Batch),
			2 => Some(ExecutionMode::Service),
			_ => None,
		}
	}

	pub fn name(&self) -> &'static str {
		match self {
			ExecutionMode::SingleFile => "single",
			ExecutionMode::Batch => "batch",
			ExecutionMode::Service => "service",
		}
	}
}

/// Startup options exactly as the caller supplied them.
#[derive(Clone, Debug, Default)]
pub struct RawOptions {
	pub model: Option<String>,
	pub depth: Option<String>,
	pub upscale: Option<String>,
	pub maxsize: Option<String>,
	pub endpoint: Option<String>,
	pub mode: Option<String>,
	pub base: Option<PathBuf>,
	pub home: Option<PathBuf>,
	pub input: Option<PathBuf>,
}

/// Working directories under the home root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HomeLayout {
	pub temp: PathBuf,
	pub models: PathBuf,
}

impl HomeLayout {
	pub fn new(home: impl AsRef<Path>) -> Self {
		let home = home.as_ref();
		Self {
			temp: home.join("Temp"),
			models: home.join("Models"),
		}
	}
}

#[derive(Clone, Debug)]
pub struct PipelineConfig {
	pub depth_model: DepthModel,
	/// Internal processing resolution of the depth network.
	pub depth_size: u32,
	/// Width the super-resolution pass aims for before depth inference.
	pub upscale_width: u32,
	/// GPU texture ceiling; the depth working square never exceeds half of it.
	pub max_texture_size: u32,
	pub mode: ExecutionMode,
	pub endpoint: Option<String>,
	pub base_dir: PathBuf,
	pub home_dir: PathBuf,
	pub input: Option<PathBuf>,
}

impl Default for PipelineConfig {
	fn default() -> Self {
		Self {
			depth_model: DepthModel::default(),
			depth_size: DEFAULT_DEPTH_SIZE,
			upscale_width: DEFAULT_UPSCALE_WIDTH,
			max_texture_size: MIN_TEXTURE_SIZE,
			mode: ExecutionMode::default(),
			endpoint: None,
			base_dir: default_base_dir(),
			home_dir: default_home_dir(),
			input: None,
		}
	}
}

impl PipelineConfig {
	/// Validates raw options. Bad numeric values never fail: they fall back to
	/// their defaults or are clamped, with a warning.
	pub fn from_options(options: RawOptions) -> DepthGenResult<Self> {
		let model_index = match parse_number(options.model.as_deref()) {
			Parsed::Missing => 0,
			Parsed::Invalid(raw) => {
				warn!("Invalid depth model '{}'. Default to 0.", raw);
				0
			}
			Parsed::Value(v) if !(0..=2).contains(&v) => {
				let clamped = v.clamp(0, 2);
				warn!("Valid depth model 0 to 2. Clamped {} to {}.", v, clamped);
				clamped
			}
			Parsed::Value(v) => v,
		};
		let depth_model = DepthModel::from_index(model_index as u32).unwrap_or_default();

		let mut depth_size = positive_or_default(options.depth.as_deref(), DEFAULT_DEPTH_SIZE, "depth size");
		if depth_size > MAX_DEPTH_SIZE {
			warn!("Depth size {} exceeds {}. Clamped to {}.", depth_size, MAX_DEPTH_SIZE, MAX_DEPTH_SIZE);
			depth_size = MAX_DEPTH_SIZE;
		}
		let upscale_width =
			positive_or_default(options.upscale.as_deref(), DEFAULT_UPSCALE_WIDTH, "upscale size");

		let max_texture_size = match parse_number(options.maxsize.as_deref()) {
			Parsed::Missing => MIN_TEXTURE_SIZE,
			Parsed::Invalid(raw) => {
				warn!("Invalid max texture size '{}'. Default to {}.", raw, MIN_TEXTURE_SIZE);
				MIN_TEXTURE_SIZE
			}
			Parsed::Value(v) => {
				let clamped = v.clamp(MIN_TEXTURE_SIZE as i64, MAX_TEXTURE_SIZE as i64) as u32;
				if clamped as i64 != v {
					warn!(
						"Valid max texture size {} to {}. Clamped {} to {}.",
						MIN_TEXTURE_SIZE, MAX_TEXTURE_SIZE, v, clamped
					);
				}
				clamped
			}
		};

		let requested_mode = match parse_number(options.mode.as_deref()) {
			Parsed::Missing => ExecutionMode::SingleFile,
			Parsed::Invalid(raw) => {
				warn!("Invalid mode '{}'. Default to 0.", raw);
				ExecutionMode::SingleFile
			}
			Parsed::Value(v) => u32::try_from(v)
				.ok()
				.and_then(ExecutionMode::from_index)
				.unwrap_or_else(|| {
					warn!("Valid mode 0 to 2. Default to 0.");
					ExecutionMode::SingleFile
				}),
		};

		let endpoint = options.endpoint.filter(|e| !e.trim().is_empty());
		let mode = resolve_mode(requested_mode, endpoint.is_some(), options.input.as_deref());

		if mode != ExecutionMode::Service && options.input.is_none() {
			return Err(DepthGenError::InvalidInput(
				"Invalid input. Usage '--input Image.jpg'.".to_string(),
			));
		}

		Ok(Self {
			depth_model,
			depth_size,
			upscale_width,
			max_texture_size,
			mode,
			endpoint,
			base_dir: options.base.unwrap_or_else(default_base_dir),
			home_dir: options.home.unwrap_or_else(default_home_dir),
			input: options.input,
		})
	}

	pub fn layout(&self) -> HomeLayout {
		HomeLayout::new(&self.home_dir)
	}

	/// Directory holding bundled helper executables such as ffmpeg.
	pub fn binary_dir(&self) -> PathBuf {
		self.base_dir.join("Binary")
	}

	/// Where artifacts for the configured mode are written.
	pub fn export_dir(&self) -> DepthGenResult<PathBuf> {
		match self.mode {
			ExecutionMode::Service => Ok(self.layout().temp),
			ExecutionMode::Batch => {
				let input = self.require_input()?;
				Ok(tags::export_dir_for(input))
			}
			ExecutionMode::SingleFile => {
				let input = self.require_input()?;
				let parent = input
					.parent()
					.filter(|p| !p.as_os_str().is_empty())
					.unwrap_or_else(|| Path::new("."));
				Ok(tags::export_dir_for(parent))
			}
		}
	}

	fn require_input(&self) -> DepthGenResult<&Path> {
		self.input
			.as_deref()
			.ok_or_else(|| DepthGenError::InvalidInput("No input given".to_string()))
	}
}

/// Service mode wins only when it comes with an endpoint; otherwise the input
/// path decides between single-file and batch.
fn resolve_mode(requested: ExecutionMode, has_endpoint: bool, input: Option<&Path>) -> ExecutionMode {
	if requested == ExecutionMode::Service {
		if has_endpoint {
			return ExecutionMode::Service;
		}
		warn!("Service mode requires an endpoint. Falling back to file mode.");
	}

	match input {
		Some(path) if path.is_file() => ExecutionMode::SingleFile,
		Some(path) if path.is_dir() => ExecutionMode::Batch,
		_ if requested == ExecutionMode::Batch => ExecutionMode::Batch,
		_ => ExecutionMode::SingleFile,
	}
}

enum Parsed {
	Missing,
	Invalid(String),
	Value(i64),
}

fn parse_number(raw: Option<&str>) -> Parsed {
	match raw.map(str::trim) {
		None | Some("") => Parsed::Missing,
		Some(s) => s
			.parse::<i64>()
			.map(Parsed::Value)
			.unwrap_or_else(|_| Parsed::Invalid(s.to_string())),
	}
}

fn positive_or_default(raw: Option<&str>, default: u32, name: &str) -> u32 {
	match parse_number(raw) {
		Parsed::Missing => default,
		Parsed::Value(v) if v > 0 && v <= u32::MAX as i64 => v as u32,
		Parsed::Value(v) => {
			warn!("Invalid {} {}. Default to {}.", name, v, default);
			default
		}
		Parsed::Invalid(s) => {
			warn!("Invalid {} '{}'. Default to {}.", name, s, default);
			default
		}
	}
}

fn default_base_dir() -> PathBuf {
	std::env::current_exe()
		.ok()
		.and_then(|exe| exe.parent().map(Path::to_path_buf))
		.unwrap_or_else(|| PathBuf::from("."))
}

fn default_home_dir() -> PathBuf {
	dirs::home_dir().unwrap_or_default().join(".depth-generate")
}
