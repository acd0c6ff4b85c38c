//! Codec error taxonomy.

use knot_value::ValueType;
use thiserror::Error;

use crate::record::StableId;

/// Errors raised by [`serialize`](crate::serialize) and
/// [`deserialize`](crate::deserialize). Any error aborts the whole call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
	/// A function or symbol was reached in strict mode.
	#[error("cannot serialize a {kind} value in strict mode")]
	TypeConversion {
		/// Type of the rejected leaf.
		kind: ValueType,
	},

	/// A bare stable reference names no bound object.
	#[error("unknown stable identifier {id}")]
	Lookup { id: StableId },

	/// A named kind has no registry entry and no ambient constructor.
	#[error("unknown type {name:?}")]
	UnknownType { name: Box<str> },

	/// A stable identifier is already bound to a different object.
	#[error("stable identifier {id} is already bound")]
	Conflict { id: StableId },

	/// A nominal record was demanded while it was still being built.
	#[error("record {index} ({name}) is part of a cycle through a nominal type")]
	Unsupported { index: usize, name: Box<str> },

	/// The record sequence is structurally invalid.
	#[error("malformed record {index}: {reason}")]
	Malformed { index: usize, reason: String },

	/// Traversal exceeded the configured nesting depth.
	#[error("nesting depth exceeds {limit}")]
	DepthExceeded { limit: usize },

	/// The sequence exceeded the configured record count.
	#[error("record count exceeds {limit}")]
	TooManyRecords { limit: usize },

	/// A registered hook, constructor or ambient type rejected its input.
	#[error("extension {name:?} failed: {message}")]
	Extension { name: Box<str>, message: String },
}

impl CodecError {
	pub fn malformed(index: usize, reason: impl Into<String>) -> Self {
		Self::Malformed {
			index,
			reason: reason.into(),
		}
	}

	pub fn extension(name: impl Into<Box<str>>, message: impl Into<String>) -> Self {
		Self::Extension {
			name: name.into(),
			message: message.into(),
		}
	}
}

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;
