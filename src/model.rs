use crate::config::DepthModel;
use crate::error::{DepthGenError, DepthGenResult};
use futures_util::StreamExt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Overrides the models directory when set.
pub const MODELS_ENV: &str = "DEPTH_GENERATE_MODELS";

pub const SR_FACTORS: [u32; 3] = [2, 3, 4];

pub fn depth_model_file(model: DepthModel) -> String {
	format!("depth_anything_v2_{}.onnx", model.encoder())
}

pub fn depth_model_url(model: DepthModel) -> &'static str {
	match model {
		DepthModel::Small => {
			"https://huggingface.co/onnx-community/depth-anything-v2-small/resolve/main/onnx/model.onnx"
		}
		DepthModel::Base => {
			"https://huggingface.co/onnx-community/depth-anything-v2-base/resolve/main/onnx/model.onnx"
		}
		DepthModel::Large => {
			"https://huggingface.co/onnx-community/depth-anything-v2-large/resolve/main/onnx/model.onnx"
		}
	}
}

pub fn sr_model_file(factor: u32) -> String {
	format!("ninasr_b0_x{}.onnx", factor)
}

/// Directories searched for weights, in order.
fn search_dirs(models_dir: &Path) -> Vec<PathBuf> {
	let mut dirs = Vec::new();
	if let Ok(env_dir) = std::env::var(MODELS_ENV) {
		dirs.push(PathBuf::from(env_dir));
	}
	dirs.push(models_dir.to_path_buf());
	dirs
}

pub fn find_model_file(models_dir: &Path, file_name: &str) -> Option<PathBuf> {
	search_dirs(models_dir)
		.into_iter()
		.map(|dir| dir.join(file_name))
		.find(|path| path.is_file())
}

/// Installed super-resolution weights keyed by factor.
pub fn find_sr_models(models_dir: &Path) -> Vec<(u32, PathBuf)> {
	SR_FACTORS
		.iter()
		.filter_map(|&factor| {
			find_model_file(models_dir, &sr_model_file(factor)).map(|path| (factor, path))
		})
		.collect()
}

/// Returns the local depth weights, downloading them into `models_dir` first
/// when no copy exists.
pub async fn ensure_depth_model(models_dir: &Path, model: DepthModel) -> DepthGenResult<PathBuf> {
	let file_name = depth_model_file(model);
	if let Some(path) = find_model_file(models_dir, &file_name) {
		debug!("Using depth model {:?}", path);
		return Ok(path);
	}

	tokio::fs::create_dir_all(models_dir).await.map_err(|e| {
		DepthGenError::Model(format!("Failed to create models directory {:?}: {}", models_dir, e))
	})?;

	let dest = models_dir.join(&file_name);
	download_model(depth_model_url(model), &dest).await?;
	Ok(dest)
}

async fn download_model(url: &str, dest: &Path) -> DepthGenResult<()> {
	info!("Downloading {} to {:?}", url, dest);

	let response = reqwest::get(url)
		.await
		.and_then(|r| r.error_for_status())
		.map_err(|e| DepthGenError::Model(format!("Failed to download model from {}: {}", url, e)))?;

	let total = response.content_length();
	let part = dest.with_extension("part");
	let mut file = tokio::fs::File::create(&part)
		.await
		.map_err(|e| DepthGenError::Model(format!("Failed to create {:?}: {}", part, e)))?;

	let mut stream = response.bytes_stream();
	let mut downloaded = 0u64;
	let mut next_report = 10u64;

	while let Some(chunk) = stream.next().await {
		let chunk = chunk
			.map_err(|e| DepthGenError::Model(format!("Download interrupted: {}", e)))?;
		file.write_all(&chunk)
			.await
			.map_err(|e| DepthGenError::Model(format!("Failed to write {:?}: {}", part, e)))?;
		downloaded += chunk.len() as u64;

		if let Some(total) = total.filter(|&t| t > 0) {
			let percent = downloaded * 100 / total;
			if percent >= next_report {
				debug!("Downloaded {}% of {:?}", percent, dest);
				next_report = percent / 10 * 10 + 10;
			}
		}
	}

	file.flush()
		.await
		.map_err(|e| DepthGenError::Model(format!("Failed to write {:?}: {}", part, e)))?;
	drop(file);

	tokio::fs::rename(&part, dest)
		.await
		.map_err(|e| DepthGenError::Model(format!("Failed to move model into place: {}", e)))?;

	info!("Downloaded {} bytes to {:?}", downloaded, dest);
	Ok(())
}
