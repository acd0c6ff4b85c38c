//! TOML-loadable codec configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::options::{Convention, DeserializeOptions, Limits, Mode, SerializeOptions, UnknownTypes};

/// Errors loading a [`CodecConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),

	#[error("I/O error reading {path}: {error}")]
	Io { path: PathBuf, error: std::io::Error },

	#[error("invalid configuration: {0}")]
	Invalid(String),
}

/// Codec defaults shared by a producer/consumer pair.
///
/// ```toml
/// mode = "lossy"
/// convention = "plain"
/// unknown_types = "preserve"
/// update = true
///
/// [limits]
/// max_depth = 4096
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodecConfig {
	pub mode: Mode,
	pub convention: Convention,
	pub unknown_types: UnknownTypes,
	pub update: bool,
	pub limits: Limits,
}

impl CodecConfig {
	pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(text)?;
		config.validate()?;
		Ok(config)
	}

	pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let text = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		let config = Self::from_toml(&text)?;
		tracing::debug!(path = %path.display(), ?config, "codec.config.load");
		Ok(config)
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.limits.max_depth == 0 {
			return Err(ConfigError::Invalid("limits.max_depth must be positive".into()));
		}
		if self.limits.max_records == 0 {
			return Err(ConfigError::Invalid("limits.max_records must be positive".into()));
		}
		Ok(())
	}

	/// Serialize options carrying this configuration; registry and identity
	/// map are attached by the caller.
	pub fn serialize_options(&self) -> SerializeOptions<'static> {
		SerializeOptions {
			mode: self.mode,
			convention: self.convention,
			limits: self.limits,
			..SerializeOptions::default()
		}
	}

	pub fn deserialize_options(&self) -> DeserializeOptions<'static> {
		DeserializeOptions {
			convention: self.convention,
			update: self.update,
			unknown_types: self.unknown_types,
			limits: self.limits,
			..DeserializeOptions::default()
		}
	}
}

#[cfg(test)]
mod tests;
