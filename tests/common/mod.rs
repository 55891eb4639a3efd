#![allow(dead_code)]

use depth_generate::{
	DepthField, DepthGenError, DepthGenResult, DepthInference, ExecutionMode, InferenceContext,
	LanczosUpscaler, PipelineConfig, Request, RequestChannel, SuperResolution,
};
use image::{Rgb, RgbImage};
use ndarray::Array2;
use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::rc::Rc;

#[derive(Debug, Default)]
pub struct InferenceLog {
	/// `(width, height, depth_size)` per depth call.
	pub depth_calls: Vec<(u32, u32, u32)>,
	/// `(factor, tile width, tile height)` per super-resolution call.
	pub sr_calls: Vec<(u32, u32, u32)>,
	pub releases: usize,
}

/// Produces a horizontal gradient and fails on chosen call indices.
pub struct MockDepth {
	log: Rc<RefCell<InferenceLog>>,
	fail_calls: HashSet<usize>,
	calls: usize,
}

impl DepthInference for MockDepth {
	fn infer(&mut self, image: &RgbImage, depth_size: u32) -> DepthGenResult<DepthField> {
		let call = self.calls;
		self.calls += 1;

		let (width, height) = image.dimensions();
		self.log.borrow_mut().depth_calls.push((width, height, depth_size));

		if self.fail_calls.contains(&call) {
			return Err(DepthGenError::Inference(format!("mock failure on call {}", call)));
		}

		Ok(Array2::from_shape_fn((height as usize, width as usize), |(_, x)| x as f32 * 0.5 + 10.0))
	}

	fn release_transient(&mut self) {
		self.log.borrow_mut().releases += 1;
	}
}

pub struct MockUpscaler {
	log: Rc<RefCell<InferenceLog>>,
}

impl SuperResolution for MockUpscaler {
	fn upscale(&mut self, tile: &RgbImage, factor: u32) -> DepthGenResult<RgbImage> {
		let (width, height) = tile.dimensions();
		self.log.borrow_mut().sr_calls.push((factor, width, height));
		LanczosUpscaler.upscale(tile, factor)
	}
}

pub fn mock_context(fail_calls: &[usize]) -> (InferenceContext, Rc<RefCell<InferenceLog>>) {
	let log = Rc::new(RefCell::new(InferenceLog::default()));
	let depth = MockDepth {
		log: log.clone(),
		fail_calls: fail_calls.iter().copied().collect(),
		calls: 0,
	};
	let upscaler = MockUpscaler { log: log.clone() };
	(InferenceContext::new(Box::new(depth), Box::new(upscaler)), log)
}

/// Small texture ceiling keeps the working square at 128px.
pub fn test_config(mode: ExecutionMode, root: &Path) -> PipelineConfig {
	PipelineConfig {
		max_texture_size: 256,
		mode,
		base_dir: root.join("base"),
		home_dir: root.join("home"),
		..PipelineConfig::default()
	}
}

pub fn write_image(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
	let path = dir.join(name);
	let img = RgbImage::from_fn(width, height, |x, y| {
		Rgb([(x * 7 % 256) as u8, (y * 5 % 256) as u8, 128])
	});
	img.save(&path).unwrap();
	path
}

/// Replays scripted requests and records replies. Receiving while a reply is
/// still owed is reported as a protocol violation.
#[derive(Debug, Default)]
pub struct ScriptedChannel {
	pub requests: VecDeque<Request>,
	pub replies: Vec<String>,
	pub disconnected: bool,
	awaiting_reply: bool,
}

impl ScriptedChannel {
	pub fn new<I, S>(requests: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self::from_requests(requests.into_iter().map(|r| Request::Path(r.into())))
	}

	pub fn from_requests(requests: impl IntoIterator<Item = Request>) -> Self {
		Self {
			requests: requests.into_iter().collect(),
			..Default::default()
		}
	}
}

impl RequestChannel for ScriptedChannel {
	async fn receive(&mut self) -> DepthGenResult<Request> {
		if self.awaiting_reply {
			return Err(DepthGenError::Channel("receive before reply".to_string()));
		}
		let request = self
			.requests
			.pop_front()
			.ok_or_else(|| DepthGenError::Channel("script exhausted".to_string()))?;
		self.awaiting_reply = !request.is_quit();
		Ok(request)
	}

	async fn reply(&mut self, message: &str) -> DepthGenResult<()> {
		if !self.awaiting_reply {
			return Err(DepthGenError::Channel("reply without request".to_string()));
		}
		self.awaiting_reply = false;
		self.replies.push(message.to_string());
		Ok(())
	}

	async fn disconnect(&mut self) -> DepthGenResult<()> {
		self.disconnected = true;
		Ok(())
	}
}
