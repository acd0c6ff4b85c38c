//! Record sequence model.

use std::fmt;

use knot_value::{Element, Pattern, Value};

use crate::tag::Kind;

/// Out-of-band values that never allocate a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sentinel {
	Void,
	Null,
	True,
	False,
	EmptyString,
}

impl Sentinel {
	pub const fn raw(self) -> i64 {
		match self {
			Self::Void => -1,
			Self::Null => -2,
			Self::True => -3,
			Self::False => -4,
			Self::EmptyString => -5,
		}
	}

	pub const fn from_raw(raw: i64) -> Option<Self> {
		Some(match raw {
			-1 => Self::Void,
			-2 => Self::Null,
			-3 => Self::True,
			-4 => Self::False,
			-5 => Self::EmptyString,
			_ => return None,
		})
	}

	/// Marker for `value`, if it is sentinel-eligible.
	pub fn of(value: &Value) -> Option<Self> {
		match value {
			Value::Undefined => Some(Self::Void),
			Value::Null => Some(Self::Null),
			Value::Bool(true) => Some(Self::True),
			Value::Bool(false) => Some(Self::False),
			Value::String(s) if s.is_empty() => Some(Self::EmptyString),
			_ => None,
		}
	}

	pub fn value(self) -> Value {
		match self {
			Self::Void => Value::Undefined,
			Self::Null => Value::Null,
			Self::True => Value::Bool(true),
			Self::False => Value::Bool(false),
			Self::EmptyString => Value::String(String::new()),
		}
	}
}

/// Reference from a payload to a record index or a sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ref {
	Index(usize),
	Sentinel(Sentinel),
}

impl Ref {
	pub const fn raw(self) -> i64 {
		match self {
			Self::Index(index) => index as i64,
			Self::Sentinel(sentinel) => sentinel.raw(),
		}
	}

	pub fn from_raw(raw: i64) -> Option<Self> {
		if raw >= 0 {
			usize::try_from(raw).ok().map(Self::Index)
		} else {
			Sentinel::from_raw(raw).map(Self::Sentinel)
		}
	}
}

impl From<Sentinel> for Ref {
	fn from(sentinel: Sentinel) -> Self {
		Self::Sentinel(sentinel)
	}
}

/// Opaque identifier binding an object across calls.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StableId(Box<str>);

impl StableId {
	pub fn new(id: impl Into<Box<str>>) -> Self {
		Self(id.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for StableId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for StableId {
	fn from(id: &str) -> Self {
		Self::new(id)
	}
}

/// Inline scalar payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
	Null,
	Bool(bool),
	Number(f64),
	String(String),
}

impl Literal {
	pub fn to_value(&self) -> Value {
		match self {
			Self::Null => Value::Null,
			Self::Bool(val) => Value::Bool(*val),
			Self::Number(val) => Value::Number(*val),
			Self::String(val) => Value::String(val.clone()),
		}
	}
}

/// Plain error description produced by an [`ErrorCodec`](crate::ErrorCodec).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDescriptor {
	pub name: String,
	pub message: String,
	pub stack: Option<String>,
}

/// Kind-dependent record payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
	Literal(Literal),
	/// Array elements, set members.
	Refs(Vec<Ref>),
	/// Object properties, map entries, nominal fields.
	Pairs(Vec<(Ref, Ref)>),
	/// Encode-hook output or plain-data projection of a nominal value.
	Ref(Ref),
	Pattern(Pattern),
	Descriptor(ErrorDescriptor),
	/// Typed array elements.
	Numbers(Vec<Element>),
}

impl Payload {
	/// Short shape name for diagnostics.
	pub const fn shape(&self) -> &'static str {
		match self {
			Self::Literal(_) => "literal",
			Self::Refs(_) => "refs",
			Self::Pairs(_) => "pairs",
			Self::Ref(_) => "ref",
			Self::Pattern(_) => "pattern",
			Self::Descriptor(_) => "descriptor",
			Self::Numbers(_) => "numbers",
		}
	}
}

/// Full record: kind, payload and, when identity tracking is active, the
/// stable identifier introduced by this record.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
	pub kind: Kind,
	pub payload: Payload,
	pub stable_id: Option<StableId>,
}

impl Entry {
	pub fn new(kind: impl Into<Kind>, payload: Payload) -> Self {
		Self {
			kind: kind.into(),
			payload,
			stable_id: None,
		}
	}
}

/// One element of a record sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
	Entry(Entry),
	/// Same identity as introduced in an earlier call.
	Stable(StableId),
	/// Sentinel root; only emitted at index 0.
	Marker(Sentinel),
}

impl Record {
	pub fn entry(&self) -> Option<&Entry> {
		match self {
			Self::Entry(entry) => Some(entry),
			_ => None,
		}
	}

	pub fn is_stable_ref(&self) -> bool {
		matches!(self, Self::Stable(_))
	}
}

impl From<Entry> for Record {
	fn from(entry: Entry) -> Self {
		Self::Entry(entry)
	}
}
