use std::path::{Path, PathBuf};

/// Name of the directory that receives generated artifacts.
pub const EXPORT_DIR_NAME: &str = "3D Export";

/// Suffix appended to the stem of every composited still.
pub const RGBD_TAG: &str = "_rgbd";

/// Markers left in file names by stereo exports. A name carrying any of these
/// was produced by a 3D pipeline and must not be converted again.
pub const STEREO_TAGS: [&str; 8] = [
	"_anaglyph",
	"_rgbd",
	"_sbs_half_width",
	"_sbs",
	"_free_view",
	"_qs",
	"_half_2x1",
	"_2x1",
];

pub const CUBEVI_TAGS: [&str; 1] = ["_cv"];

pub const SUPPORTED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "tga", "bmp"];

pub fn is_supported(path: impl AsRef<Path>) -> bool {
	path.as_ref()
		.extension()
		.and_then(|ext| ext.to_str())
		.map(|ext| {
			let ext = ext.to_lowercase();
			SUPPORTED_EXTENSIONS.contains(&ext.as_str())
		})
		.unwrap_or(false)
}

pub fn is_tagged(stem: &str) -> bool {
	STEREO_TAGS.iter().any(|tag| stem.contains(tag))
}

pub fn is_cubevi(stem: &str) -> bool {
	CUBEVI_TAGS.iter().any(|tag| stem.contains(tag))
}

/// File name without directory or extension.
pub fn file_stem(path: impl AsRef<Path>) -> String {
	path.as_ref()
		.file_stem()
		.map(|s| s.to_string_lossy().into_owned())
		.unwrap_or_default()
}

pub fn rgbd_file_name(stem: &str) -> String {
	format!("{}{}.jpg", stem, RGBD_TAG)
}

pub fn cubevi_file_name(stem: &str) -> String {
	format!("{}.mp4", stem)
}

/// Appends the export directory to `dir` unless `dir` already is one.
pub fn export_dir_for(dir: impl AsRef<Path>) -> PathBuf {
	let dir = dir.as_ref();
	if is_export_dir(dir) {
		dir.to_path_buf()
	} else {
		dir.join(EXPORT_DIR_NAME)
	}
}

pub fn is_export_dir(dir: impl AsRef<Path>) -> bool {
	dir.as_ref()
		.components()
		.next_back()
		.map(|last| last.as_os_str() == EXPORT_DIR_NAME)
		.unwrap_or(false)
}
