//! Kind tags shared by both walkers.

use std::fmt;

/// Built-in record kinds with their wire codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Tag {
	Primitive = 0,
	Array = 1,
	Object = 2,
	Date = 3,
	RegExp = 4,
	Map = 5,
	Set = 6,
	Error = 7,
	BigInt = 8,
}

impl Tag {
	pub const fn code(self) -> u8 {
		self as u8
	}

	pub const fn from_code(code: i64) -> Option<Self> {
		Some(match code {
			0 => Self::Primitive,
			1 => Self::Array,
			2 => Self::Object,
			3 => Self::Date,
			4 => Self::RegExp,
			5 => Self::Map,
			6 => Self::Set,
			7 => Self::Error,
			8 => Self::BigInt,
			_ => return None,
		})
	}

	/// Containers whose payload is child refs, allocated before their
	/// children and eligible for update-mode reuse.
	pub const fn is_composite(self) -> bool {
		matches!(self, Self::Array | Self::Object | Self::Map | Self::Set)
	}

	pub const fn name(self) -> &'static str {
		match self {
			Self::Primitive => "primitive",
			Self::Array => "array",
			Self::Object => "object",
			Self::Date => "date",
			Self::RegExp => "regexp",
			Self::Map => "map",
			Self::Set => "set",
			Self::Error => "error",
			Self::BigInt => "bigint",
		}
	}
}

impl fmt::Display for Tag {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// Record discriminator: a built-in tag or a type name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Kind {
	Tag(Tag),
	/// Typed array variant or nominal/extension type name.
	Named(Box<str>),
}

impl Kind {
	pub fn named(name: impl Into<Box<str>>) -> Self {
		Self::Named(name.into())
	}

	pub fn as_tag(&self) -> Option<Tag> {
		match self {
			Self::Tag(tag) => Some(*tag),
			Self::Named(_) => None,
		}
	}

	pub fn as_name(&self) -> Option<&str> {
		match self {
			Self::Tag(_) => None,
			Self::Named(name) => Some(name),
		}
	}
}

impl From<Tag> for Kind {
	fn from(tag: Tag) -> Self {
		Self::Tag(tag)
	}
}

impl fmt::Display for Kind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Tag(tag) => tag.fmt(f),
			Self::Named(name) => f.write_str(name),
		}
	}
}
