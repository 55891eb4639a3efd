use crate::context::InferenceContext;
use crate::error::{DepthGenError, DepthGenResult};
use crate::pipeline::Pipeline;
use crate::tags;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Outcome of one directory pass. Failures are listed, never raised.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
	pub converted: Vec<PathBuf>,
	pub skipped: Vec<PathBuf>,
	pub failed: Vec<PathBuf>,
}

impl BatchReport {
	pub fn attempted(&self) -> usize {
		self.converted.len() + self.failed.len()
	}
}

/// Converts every file directly inside `dir`.
///
/// Tagged files are skipped and subdirectories are ignored. A failing file is
/// logged and the pass moves on.
pub fn batch_convert(
	pipeline: &Pipeline,
	context: &mut InferenceContext,
	dir: impl AsRef<Path>,
) -> DepthGenResult<BatchReport> {
	let dir = dir.as_ref();
	if dir.as_os_str().is_empty() {
		return Err(DepthGenError::InvalidInput("No directory to load".to_string()));
	}
	if !dir.is_dir() {
		return Err(DepthGenError::InvalidInput(format!(
			"Error loading directory {:?}",
			dir
		)));
	}
	if tags::is_export_dir(dir) {
		return Err(DepthGenError::InvalidInput(format!(
			"Refusing to convert the export directory {:?}",
			dir
		)));
	}

	let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
		.filter_map(|entry| entry.ok().map(|e| e.path()))
		.collect();
	entries.sort();

	let mut report = BatchReport::default();

	for path in entries {
		if !path.is_file() {
			debug!("Skipping non-file entry {:?}", path);
			continue;
		}

		if tags::is_tagged(&tags::file_stem(&path)) {
			info!("Skipping conversion. File already 3D tagged: {:?}", path);
			report.skipped.push(path);
			continue;
		}

		match pipeline.generate_depth(context, &path) {
			Ok(output) => report.converted.push(output),
			Err(e) => {
				warn!("Failed to convert {:?}: {}", path, e);
				report.failed.push(path);
			}
		}
	}

	info!(
		"Generated depth for directory {:?}: {} converted, {} skipped, {} failed",
		dir,
		report.converted.len(),
		report.skipped.len(),
		report.failed.len()
	);

	Ok(report)
}
