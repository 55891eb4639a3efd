use crate::depth::DepthInference;
use crate::upscale::{LanczosUpscaler, SuperResolution};
use std::ops::{Deref, DerefMut};

/// Models held for the life of the process, shared by every job.
pub struct InferenceContext {
	pub depth: Box<dyn DepthInference>,
	pub upscaler: Box<dyn SuperResolution>,
}

impl InferenceContext {
	pub fn new(depth: Box<dyn DepthInference>, upscaler: Box<dyn SuperResolution>) -> Self {
		Self { depth, upscaler }
	}

	/// Uses resampling in place of a super-resolution network.
	pub fn with_depth(depth: Box<dyn DepthInference>) -> Self {
		Self::new(depth, Box::new(LanczosUpscaler))
	}

	pub fn release_transient(&mut self) {
		self.upscaler.release_transient();
		self.depth.release_transient();
	}

	/// Borrows the context for one job. Transient memory is released when the
	/// scope drops, whichever way the job ends.
	pub fn job_scope(&mut self) -> JobScope<'_> {
		JobScope { context: self }
	}
}

pub struct JobScope<'a> {
	context: &'a mut InferenceContext,
}

impl Deref for JobScope<'_> {
	type Target = InferenceContext;

	fn deref(&self) -> &Self::Target {
		&*self.context
	}
}

impl DerefMut for JobScope<'_> {
	fn deref_mut(&mut self) -> &mut Self::Target {
		&mut *self.context
	}
}

impl Drop for JobScope<'_> {
	fn drop(&mut self) {
		self.context.release_transient();
	}
}
