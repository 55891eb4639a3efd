use crate::tags;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobKind {
	/// Extension outside the supported image set.
	Unsupported,
	/// Name carries a stereo tag, so it is already pipeline output.
	AlreadyTagged,
	/// Exported as a short video instead of a depth composite.
	CubeVi,
	Normal,
}

impl JobKind {
	/// Works on the name alone so no pixels are decoded for rejected files.
	pub fn classify(path: impl AsRef<Path>) -> Self {
		let path = path.as_ref();
		if !tags::is_supported(path) {
			return JobKind::Unsupported;
		}

		let stem = tags::file_stem(path);
		if tags::is_tagged(&stem) {
			JobKind::AlreadyTagged
		} else if tags::is_cubevi(&stem) {
			JobKind::CubeVi
		} else {
			JobKind::Normal
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportKind {
	Still,
	Video,
}

/// One conversion: an input, where its artifact goes, and how it was classified.
#[derive(Clone, Debug)]
pub struct Job {
	pub input: PathBuf,
	pub output: PathBuf,
	pub kind: JobKind,
	pub export: ExportKind,
}

impl Job {
	pub fn new(input: impl Into<PathBuf>, export_dir: impl AsRef<Path>) -> Self {
		let input = input.into();
		let kind = JobKind::classify(&input);
		let stem = tags::file_stem(&input);

		// Tagged inputs can still be CubeVI when the caller lets them through.
		let export = if tags::is_cubevi(&stem) {
			ExportKind::Video
		} else {
			ExportKind::Still
		};

		let file_name = match export {
			ExportKind::Video => tags::cubevi_file_name(&stem),
			ExportKind::Still => tags::rgbd_file_name(&stem),
		};
		let output = export_dir.as_ref().join(file_name);

		Self {
			input,
			output,
			kind,
			export,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn classification_order() {
		assert_eq!(JobKind::classify("a/clip.mp4"), JobKind::Unsupported);
		assert_eq!(JobKind::classify("a/clip_rgbd.mp4"), JobKind::Unsupported);
		assert_eq!(JobKind::classify("a/beach_rgbd.jpg"), JobKind::AlreadyTagged);
		assert_eq!(JobKind::classify("a/beach_cv_sbs.png"), JobKind::AlreadyTagged);
		assert_eq!(JobKind::classify("a/portrait_cv.PNG"), JobKind::CubeVi);
		assert_eq!(JobKind::classify("a/beach.jpeg"), JobKind::Normal);
	}

	#[test]
	fn outputs_land_in_export_dir() {
		let job = Job::new("/photos/beach.png", "/photos/3D Export");
		assert_eq!(job.output, PathBuf::from("/photos/3D Export/beach_rgbd.jpg"));
		assert_eq!(job.export, ExportKind::Still);

		let job = Job::new("/photos/portrait_cv.jpg", "/tmp/out");
		assert_eq!(job.output, PathBuf::from("/tmp/out/portrait_cv.mp4"));
		assert_eq!(job.export, ExportKind::Video);
		assert_eq!(job.kind, JobKind::CubeVi);
	}

	#[test]
	fn tagged_cubevi_still_routes_to_video() {
		let job = Job::new("/in/portrait_cv_sbs.jpg", "/out");
		assert_eq!(job.kind, JobKind::AlreadyTagged);
		assert_eq!(job.export, ExportKind::Video);
	}
}
