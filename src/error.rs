use thiserror::Error;

pub type DepthGenResult<T> = Result<T, DepthGenError>;

#[derive(Debug, Error)]
pub enum DepthGenError {
	/// Missing file or directory, unsupported extension, or an already-tagged input.
	#[error("Invalid input: {0}")]
	InvalidInput(String),
	#[error("Decode error: {0}")]
	Decode(String),
	#[error("Inference error: {0}")]
	Inference(String),
	#[error("Encode error: {0}")]
	Encode(String),
	#[error("Model error: {0}")]
	Model(String),
	#[error("Channel error: {0}")]
	Channel(String),
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("I/O error: {0}")]
	Io(String),
}

impl From<std::io::Error> for DepthGenError {
	fn from(e: std::io::Error) -> Self {
		DepthGenError::Io(e.to_string())
	}
}

impl From<image::ImageError> for DepthGenError {
	fn from(e: image::ImageError) -> Self {
		DepthGenError::Decode(e.to_string())
	}
}
