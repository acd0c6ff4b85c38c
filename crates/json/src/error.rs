use knot_codec::CodecError;
use thiserror::Error;

/// Text could not be read as a record sequence.
#[derive(Debug, Error)]
pub enum FormatError {
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("record {index}: {reason}")]
	Shape { index: usize, reason: String },
}

impl FormatError {
	pub(crate) fn shape(index: usize, reason: impl Into<String>) -> Self {
		Self::Shape {
			index,
			reason: reason.into(),
		}
	}
}

#[derive(Debug, Error)]
pub enum Error {
	#[error(transparent)]
	Format(#[from] FormatError),

	#[error(transparent)]
	Codec(#[from] CodecError),
}

pub type Result<T> = std::result::Result<T, Error>;
