use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use num_bigint::BigInt;

use crate::heap::ObjId;

/// A value stored in a [`Heap`](crate::Heap) slot or held directly.
///
/// Primitives carry no identity. Objects are handles into the heap, so two
/// `Value::Object` with the same [`ObjId`] are the same object.
///
/// Equality and hashing follow SameValueZero: `NaN` equals `NaN`, `+0`
/// equals `-0`, objects compare by handle and opaque values by allocation.
#[derive(Debug, Clone)]
pub enum Value {
	Undefined,
	Null,
	Bool(bool),
	Number(f64),
	String(String),
	BigInt(BigInt),
	Symbol(Opaque),
	Function(Opaque),
	Object(ObjId),
}

impl Value {
	pub fn string(val: impl Into<String>) -> Self {
		Self::String(val.into())
	}

	pub fn symbol(description: impl AsRef<str>) -> Self {
		Self::Symbol(Opaque::new(description))
	}

	pub fn function(name: impl AsRef<str>) -> Self {
		Self::Function(Opaque::new(name))
	}

	pub fn bigint(val: impl Into<BigInt>) -> Self {
		Self::BigInt(val.into())
	}

	pub fn is_undefined(&self) -> bool {
		matches!(self, Self::Undefined)
	}

	pub fn is_null(&self) -> bool {
		matches!(self, Self::Null)
	}

	/// Functions and symbols: values with no data representation.
	pub fn is_non_data(&self) -> bool {
		matches!(self, Self::Symbol(_) | Self::Function(_))
	}

	pub fn as_object(&self) -> Option<ObjId> {
		match self {
			Self::Object(id) => Some(*id),
			_ => None,
		}
	}

	pub fn as_number(&self) -> Option<f64> {
		match self {
			Self::Number(val) => Some(*val),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::String(val) => Some(val),
			_ => None,
		}
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Self::Bool(val) => Some(*val),
			_ => None,
		}
	}

	pub fn get_type(&self) -> ValueType {
		match self {
			Self::Undefined => ValueType::Undefined,
			Self::Null => ValueType::Null,
			Self::Bool(_) => ValueType::Bool,
			Self::Number(_) => ValueType::Number,
			Self::String(_) => ValueType::String,
			Self::BigInt(_) => ValueType::BigInt,
			Self::Symbol(_) => ValueType::Symbol,
			Self::Function(_) => ValueType::Function,
			Self::Object(_) => ValueType::Object,
		}
	}

	/// Coerces the value into a property key string.
	pub fn to_property_key(&self) -> String {
		match self {
			Self::Undefined => "undefined".to_string(),
			Self::Null => "null".to_string(),
			Self::Bool(val) => val.to_string(),
			Self::Number(val) => format_number(*val),
			Self::String(val) => val.clone(),
			Self::BigInt(val) => val.to_string(),
			Self::Symbol(opaque) => format!("Symbol({})", opaque.label()),
			Self::Function(opaque) => format!("function {}", opaque.label()),
			Self::Object(_) => "[object Object]".to_string(),
		}
	}
}

/// Formats a number the way property keys spell it: integral values without
/// a fraction, `-0` as `0`, non-finite values by name.
pub fn format_number(val: f64) -> String {
	if val.is_nan() {
		"NaN".to_string()
	} else if val.is_infinite() {
		let name = if val > 0.0 { "Infinity" } else { "-Infinity" };
		name.to_string()
	} else if val == 0.0 {
		"0".to_string()
	} else {
		format!("{val}")
	}
}

fn number_key(val: f64) -> u64 {
	if val.is_nan() {
		f64::NAN.to_bits()
	} else if val == 0.0 {
		0
	} else {
		val.to_bits()
	}
}

impl PartialEq for Value {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
			(Self::Bool(a), Self::Bool(b)) => a == b,
			(Self::Number(a), Self::Number(b)) => number_key(*a) == number_key(*b),
			(Self::String(a), Self::String(b)) => a == b,
			(Self::BigInt(a), Self::BigInt(b)) => a == b,
			(Self::Symbol(a), Self::Symbol(b)) | (Self::Function(a), Self::Function(b)) => a == b,
			(Self::Object(a), Self::Object(b)) => a == b,
			_ => false,
		}
	}
}

impl Eq for Value {}

impl Hash for Value {
	fn hash<H: Hasher>(&self, state: &mut H) {
		std::mem::discriminant(self).hash(state);
		match self {
			Self::Undefined | Self::Null => {}
			Self::Bool(val) => val.hash(state),
			Self::Number(val) => number_key(*val).hash(state),
			Self::String(val) => val.hash(state),
			Self::BigInt(val) => val.hash(state),
			Self::Symbol(opaque) | Self::Function(opaque) => opaque.hash(state),
			Self::Object(id) => id.hash(state),
		}
	}
}

impl From<bool> for Value {
	fn from(val: bool) -> Self {
		Self::Bool(val)
	}
}

impl From<f64> for Value {
	fn from(val: f64) -> Self {
		Self::Number(val)
	}
}

impl From<i32> for Value {
	fn from(val: i32) -> Self {
		Self::Number(val.into())
	}
}

impl From<&str> for Value {
	fn from(val: &str) -> Self {
		Self::String(val.to_string())
	}
}

impl From<String> for Value {
	fn from(val: String) -> Self {
		Self::String(val)
	}
}

impl From<ObjId> for Value {
	fn from(id: ObjId) -> Self {
		Self::Object(id)
	}
}

/// Identity-bearing label for symbols and functions.
///
/// Two opaques are equal only when they come from the same allocation.
#[derive(Clone)]
pub struct Opaque(Arc<str>);

impl Opaque {
	pub fn new(label: impl AsRef<str>) -> Self {
		Self(Arc::from(label.as_ref()))
	}

	pub fn label(&self) -> &str {
		&self.0
	}
}

impl PartialEq for Opaque {
	fn eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.0, &other.0)
	}
}

impl Eq for Opaque {}

impl Hash for Opaque {
	fn hash<H: Hasher>(&self, state: &mut H) {
		std::ptr::hash(Arc::as_ptr(&self.0).cast::<u8>(), state);
	}
}

impl fmt::Debug for Opaque {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Opaque({:?})", self.label())
	}
}

/// Coarse value type used for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
	Undefined,
	Null,
	Bool,
	Number,
	String,
	BigInt,
	Symbol,
	Function,
	Object,
}

impl ValueType {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Undefined => "undefined",
			Self::Null => "null",
			Self::Bool => "boolean",
			Self::Number => "number",
			Self::String => "string",
			Self::BigInt => "bigint",
			Self::Symbol => "symbol",
			Self::Function => "function",
			Self::Object => "object",
		}
	}
}

impl fmt::Display for ValueType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[cfg(test)]
mod tests;
