use std::any::Any;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};
use num_bigint::BigInt;

use crate::heap::Heap;
use crate::value::Value;

/// Insertion-ordered string-keyed properties.
pub type Properties = IndexMap<String, Value>;

/// Heap-resident object.
#[derive(Debug, Clone)]
pub enum Node {
	Array(Vec<Value>),
	Object(Properties),
	Map(IndexMap<Value, Value>),
	Set(IndexSet<Value>),
	Date(DateTime<Utc>),
	RegExp(Pattern),
	Error(ErrorValue),
	TypedArray(TypedArray),
	Boxed(Primitive),
	Instance(Instance),
	Host(Arc<dyn HostObject>),
}

impl Node {
	pub fn kind(&self) -> NodeKind {
		match self {
			Self::Array(_) => NodeKind::Array,
			Self::Object(_) => NodeKind::Object,
			Self::Map(_) => NodeKind::Map,
			Self::Set(_) => NodeKind::Set,
			Self::Date(_) => NodeKind::Date,
			Self::RegExp(_) => NodeKind::RegExp,
			Self::Error(_) => NodeKind::Error,
			Self::TypedArray(_) => NodeKind::TypedArray,
			Self::Boxed(_) => NodeKind::Boxed,
			Self::Instance(_) => NodeKind::Instance,
			Self::Host(_) => NodeKind::Host,
		}
	}

	/// Nominal type name, for instances and host objects.
	pub fn type_name(&self) -> Option<&str> {
		match self {
			Self::Instance(instance) => Some(&instance.class),
			Self::Host(host) => Some(host.type_name()),
			_ => None,
		}
	}

	pub fn as_array(&self) -> Option<&Vec<Value>> {
		match self {
			Self::Array(items) => Some(items),
			_ => None,
		}
	}

	pub fn as_object(&self) -> Option<&Properties> {
		match self {
			Self::Object(props) => Some(props),
			_ => None,
		}
	}

	pub fn as_map(&self) -> Option<&IndexMap<Value, Value>> {
		match self {
			Self::Map(entries) => Some(entries),
			_ => None,
		}
	}

	pub fn as_set(&self) -> Option<&IndexSet<Value>> {
		match self {
			Self::Set(items) => Some(items),
			_ => None,
		}
	}

	pub fn as_instance(&self) -> Option<&Instance> {
		match self {
			Self::Instance(instance) => Some(instance),
			_ => None,
		}
	}
}

/// Discriminant of a [`Node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
	Array,
	Object,
	Map,
	Set,
	Date,
	RegExp,
	Error,
	TypedArray,
	Boxed,
	Instance,
	Host,
}

impl NodeKind {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Array => "Array",
			Self::Object => "Object",
			Self::Map => "Map",
			Self::Set => "Set",
			Self::Date => "Date",
			Self::RegExp => "RegExp",
			Self::Error => "Error",
			Self::TypedArray => "TypedArray",
			Self::Boxed => "Boxed",
			Self::Instance => "Instance",
			Self::Host => "Host",
		}
	}
}

impl fmt::Display for NodeKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Regular expression source and flags. Not compiled.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pattern {
	pub source: String,
	pub flags: String,
}

impl Pattern {
	pub fn new(source: impl Into<String>, flags: impl Into<String>) -> Self {
		Self {
			source: source.into(),
			flags: flags.into(),
		}
	}
}

/// Error object: constructor name, message and optional trace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ErrorValue {
	pub name: String,
	pub message: String,
	pub stack: Option<String>,
}

impl ErrorValue {
	pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			message: message.into(),
			stack: None,
		}
	}

	pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
		self.stack = Some(stack.into());
		self
	}
}

/// Primitive held behind an object wrapper (`new Boolean(false)` and friends).
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
	Bool(bool),
	Number(f64),
	String(String),
	BigInt(BigInt),
}

impl Primitive {
	/// Wrapper constructor name.
	pub const fn name(&self) -> &'static str {
		match self {
			Self::Bool(_) => "Boolean",
			Self::Number(_) => "Number",
			Self::String(_) => "String",
			Self::BigInt(_) => "BigInt",
		}
	}

	pub fn to_value(&self) -> Value {
		match self {
			Self::Bool(val) => Value::Bool(*val),
			Self::Number(val) => Value::Number(*val),
			Self::String(val) => Value::String(val.clone()),
			Self::BigInt(val) => Value::BigInt(val.clone()),
		}
	}
}

/// Object of a named class with its own fields.
#[derive(Debug, Clone)]
pub struct Instance {
	pub class: Box<str>,
	pub fields: Properties,
}

impl Instance {
	pub fn new(class: impl Into<Box<str>>, fields: Properties) -> Self {
		Self {
			class: class.into(),
			fields,
		}
	}
}

/// Opaque host value participating in encoding through its type name.
///
/// Encoding a host object goes through the extension registry entry for
/// [`type_name`](Self::type_name), or through [`to_plain`](Self::to_plain)
/// under the plain-data convention.
pub trait HostObject: fmt::Debug + Send + Sync + 'static {
	fn type_name(&self) -> &str;

	/// Canonical plain-data projection, allocated into `heap`.
	fn to_plain(&self, heap: &mut Heap) -> Option<Value> {
		let _ = heap;
		None
	}

	fn as_any(&self) -> &dyn Any;
}

/// Element width and signedness of a typed array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypedArrayKind {
	Int8,
	Uint8,
	Uint8Clamped,
	Int16,
	Uint16,
	Int32,
	Uint32,
	Float32,
	Float64,
	BigInt64,
	BigUint64,
}

impl TypedArrayKind {
	pub const ALL: [Self; 11] = [
		Self::Int8,
		Self::Uint8,
		Self::Uint8Clamped,
		Self::Int16,
		Self::Uint16,
		Self::Int32,
		Self::Uint32,
		Self::Float32,
		Self::Float64,
		Self::BigInt64,
		Self::BigUint64,
	];

	pub const fn name(self) -> &'static str {
		match self {
			Self::Int8 => "Int8Array",
			Self::Uint8 => "Uint8Array",
			Self::Uint8Clamped => "Uint8ClampedArray",
			Self::Int16 => "Int16Array",
			Self::Uint16 => "Uint16Array",
			Self::Int32 => "Int32Array",
			Self::Uint32 => "Uint32Array",
			Self::Float32 => "Float32Array",
			Self::Float64 => "Float64Array",
			Self::BigInt64 => "BigInt64Array",
			Self::BigUint64 => "BigUint64Array",
		}
	}

	pub fn from_name(name: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|kind| kind.name() == name)
	}
}

/// Literal element of a typed array payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Element {
	Int(i64),
	Uint(u64),
	Float(f64),
}

impl Element {
	fn as_i64(self) -> i64 {
		match self {
			Self::Int(val) => val,
			Self::Uint(val) => val as i64,
			Self::Float(val) => val as i64,
		}
	}

	fn as_u64(self) -> u64 {
		match self {
			Self::Int(val) => val as u64,
			Self::Uint(val) => val,
			Self::Float(val) => val as u64,
		}
	}

	fn as_f64(self) -> f64 {
		match self {
			Self::Int(val) => val as f64,
			Self::Uint(val) => val as f64,
			Self::Float(val) => val,
		}
	}

	fn clamped_u8(self) -> u8 {
		match self {
			Self::Float(val) if val.is_nan() => 0,
			Self::Float(val) => val.round_ties_even().clamp(0.0, 255.0) as u8,
			other => other.as_i64().clamp(0, 255) as u8,
		}
	}
}

/// Fixed-width numeric array.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedArray {
	Int8(Vec<i8>),
	Uint8(Vec<u8>),
	Uint8Clamped(Vec<u8>),
	Int16(Vec<i16>),
	Uint16(Vec<u16>),
	Int32(Vec<i32>),
	Uint32(Vec<u32>),
	Float32(Vec<f32>),
	Float64(Vec<f64>),
	BigInt64(Vec<i64>),
	BigUint64(Vec<u64>),
}

impl TypedArray {
	pub fn kind(&self) -> TypedArrayKind {
		match self {
			Self::Int8(_) => TypedArrayKind::Int8,
			Self::Uint8(_) => TypedArrayKind::Uint8,
			Self::Uint8Clamped(_) => TypedArrayKind::Uint8Clamped,
			Self::Int16(_) => TypedArrayKind::Int16,
			Self::Uint16(_) => TypedArrayKind::Uint16,
			Self::Int32(_) => TypedArrayKind::Int32,
			Self::Uint32(_) => TypedArrayKind::Uint32,
			Self::Float32(_) => TypedArrayKind::Float32,
			Self::Float64(_) => TypedArrayKind::Float64,
			Self::BigInt64(_) => TypedArrayKind::BigInt64,
			Self::BigUint64(_) => TypedArrayKind::BigUint64,
		}
	}

	pub fn len(&self) -> usize {
		match self {
			Self::Int8(v) => v.len(),
			Self::Uint8(v) | Self::Uint8Clamped(v) => v.len(),
			Self::Int16(v) => v.len(),
			Self::Uint16(v) => v.len(),
			Self::Int32(v) => v.len(),
			Self::Uint32(v) => v.len(),
			Self::Float32(v) => v.len(),
			Self::Float64(v) => v.len(),
			Self::BigInt64(v) => v.len(),
			Self::BigUint64(v) => v.len(),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn elements(&self) -> Vec<Element> {
		match self {
			Self::Int8(v) => v.iter().map(|&x| Element::Int(x.into())).collect(),
			Self::Uint8(v) | Self::Uint8Clamped(v) => v.iter().map(|&x| Element::Uint(x.into())).collect(),
			Self::Int16(v) => v.iter().map(|&x| Element::Int(x.into())).collect(),
			Self::Uint16(v) => v.iter().map(|&x| Element::Uint(x.into())).collect(),
			Self::Int32(v) => v.iter().map(|&x| Element::Int(x.into())).collect(),
			Self::Uint32(v) => v.iter().map(|&x| Element::Uint(x.into())).collect(),
			Self::Float32(v) => v.iter().map(|&x| Element::Float(x.into())).collect(),
			Self::Float64(v) => v.iter().map(|&x| Element::Float(x)).collect(),
			Self::BigInt64(v) => v.iter().map(|&x| Element::Int(x)).collect(),
			Self::BigUint64(v) => v.iter().map(|&x| Element::Uint(x)).collect(),
		}
	}

	/// Builds an array of `kind`, converting each element with wrapping
	/// integer casts (clamping for `Uint8Clamped`).
	pub fn from_elements(kind: TypedArrayKind, elements: &[Element]) -> Self {
		let iter = elements.iter().copied();
		match kind {
			TypedArrayKind::Int8 => Self::Int8(iter.map(|e| e.as_i64() as i8).collect()),
			TypedArrayKind::Uint8 => Self::Uint8(iter.map(|e| e.as_i64() as u8).collect()),
			TypedArrayKind::Uint8Clamped => Self::Uint8Clamped(iter.map(Element::clamped_u8).collect()),
			TypedArrayKind::Int16 => Self::Int16(iter.map(|e| e.as_i64() as i16).collect()),
			TypedArrayKind::Uint16 => Self::Uint16(iter.map(|e| e.as_i64() as u16).collect()),
			TypedArrayKind::Int32 => Self::Int32(iter.map(|e| e.as_i64() as i32).collect()),
			TypedArrayKind::Uint32 => Self::Uint32(iter.map(|e| e.as_i64() as u32).collect()),
			TypedArrayKind::Float32 => Self::Float32(iter.map(|e| e.as_f64() as f32).collect()),
			TypedArrayKind::Float64 => Self::Float64(iter.map(Element::as_f64).collect()),
			TypedArrayKind::BigInt64 => Self::BigInt64(iter.map(Element::as_i64).collect()),
			TypedArrayKind::BigUint64 => Self::BigUint64(iter.map(Element::as_u64).collect()),
		}
	}
}
