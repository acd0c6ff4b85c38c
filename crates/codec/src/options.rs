//! Per-call options.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::collab::{DescriptorCodec, ErrorCodec, TypeLookup, WellKnownTypes};
use crate::identity::IdentityMap;
use crate::registry::Registry;

/// Handling of values with no data representation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
	/// Functions and symbols are a [`TypeConversion`](crate::CodecError::TypeConversion) error.
	#[default]
	Strict,
	/// Functions and symbols become null, or drop their entry.
	Lossy,
}

/// How nominal values map to records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Convention {
	/// Nominal values keep their fields and type name.
	#[default]
	Structured,
	/// Nominal values go through their plain-data projection and factory.
	Plain,
}

/// Outcome for a named kind that nothing can construct.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownTypes {
	#[default]
	Reject,
	/// Keep field-bearing records as [`Instance`](knot_value::Instance)s.
	Preserve,
}

/// Resource bounds applied by both walkers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
	/// Maximum number of pending frames (nesting depth).
	pub max_depth: usize,
	/// Maximum number of records produced or accepted.
	pub max_records: usize,
}

impl Limits {
	pub const DEFAULT_MAX_DEPTH: usize = 100_000;
	pub const DEFAULT_MAX_RECORDS: usize = 10_000_000;
}

impl Default for Limits {
	fn default() -> Self {
		Self {
			max_depth: Self::DEFAULT_MAX_DEPTH,
			max_records: Self::DEFAULT_MAX_RECORDS,
		}
	}
}

static DESCRIPTOR_CODEC: DescriptorCodec = DescriptorCodec;
static WELL_KNOWN_TYPES: WellKnownTypes = WellKnownTypes;

/// Options for [`serialize`](crate::serialize).
pub struct SerializeOptions<'a> {
	pub mode: Mode,
	pub convention: Convention,
	pub registry: Option<&'a Registry>,
	pub identity: Option<&'a mut IdentityMap>,
	pub error_codec: &'a dyn ErrorCodec,
	pub limits: Limits,
}

impl Default for SerializeOptions<'_> {
	fn default() -> Self {
		Self {
			mode: Mode::default(),
			convention: Convention::default(),
			registry: None,
			identity: None,
			error_codec: &DESCRIPTOR_CODEC,
			limits: Limits::default(),
		}
	}
}

impl<'a> SerializeOptions<'a> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Plain-data convention in lossy mode, as used by text `stringify`.
	pub fn json() -> Self {
		Self::new().plain().lossy()
	}

	pub fn lossy(mut self) -> Self {
		self.mode = Mode::Lossy;
		self
	}

	pub fn plain(mut self) -> Self {
		self.convention = Convention::Plain;
		self
	}

	pub fn with_registry(mut self, registry: &'a Registry) -> Self {
		self.registry = Some(registry);
		self
	}

	pub fn with_identity(mut self, identity: &'a mut IdentityMap) -> Self {
		self.identity = Some(identity);
		self
	}

	pub fn with_error_codec(mut self, codec: &'a dyn ErrorCodec) -> Self {
		self.error_codec = codec;
		self
	}

	pub fn with_limits(mut self, limits: Limits) -> Self {
		self.limits = limits;
		self
	}
}

impl fmt::Debug for SerializeOptions<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SerializeOptions")
			.field("mode", &self.mode)
			.field("convention", &self.convention)
			.field("registry", &self.registry)
			.field("identity", &self.identity.as_ref().map(|map| map.len()))
			.field("limits", &self.limits)
			.finish_non_exhaustive()
	}
}

/// Options for [`deserialize`](crate::deserialize).
pub struct DeserializeOptions<'a> {
	pub convention: Convention,
	pub registry: Option<&'a Registry>,
	pub identity: Option<&'a mut IdentityMap>,
	/// Reuse bound containers in place instead of rejecting their ids.
	pub update: bool,
	pub unknown_types: UnknownTypes,
	pub type_lookup: &'a dyn TypeLookup,
	pub error_codec: &'a dyn ErrorCodec,
	pub limits: Limits,
}

impl Default for DeserializeOptions<'_> {
	fn default() -> Self {
		Self {
			convention: Convention::default(),
			registry: None,
			identity: None,
			update: false,
			unknown_types: UnknownTypes::default(),
			type_lookup: &WELL_KNOWN_TYPES,
			error_codec: &DESCRIPTOR_CODEC,
			limits: Limits::default(),
		}
	}
}

impl<'a> DeserializeOptions<'a> {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn plain(mut self) -> Self {
		self.convention = Convention::Plain;
		self
	}

	pub fn update(mut self) -> Self {
		self.update = true;
		self
	}

	pub fn preserve_unknown(mut self) -> Self {
		self.unknown_types = UnknownTypes::Preserve;
		self
	}

	pub fn with_registry(mut self, registry: &'a Registry) -> Self {
		self.registry = Some(registry);
		self
	}

	pub fn with_identity(mut self, identity: &'a mut IdentityMap) -> Self {
		self.identity = Some(identity);
		self
	}

	pub fn with_type_lookup(mut self, lookup: &'a dyn TypeLookup) -> Self {
		self.type_lookup = lookup;
		self
	}

	pub fn with_error_codec(mut self, codec: &'a dyn ErrorCodec) -> Self {
		self.error_codec = codec;
		self
	}

	pub fn with_limits(mut self, limits: Limits) -> Self {
		self.limits = limits;
		self
	}
}

impl fmt::Debug for DeserializeOptions<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DeserializeOptions")
			.field("convention", &self.convention)
			.field("registry", &self.registry)
			.field("identity", &self.identity.as_ref().map(|map| map.len()))
			.field("update", &self.update)
			.field("unknown_types", &self.unknown_types)
			.field("limits", &self.limits)
			.finish_non_exhaustive()
	}
}
