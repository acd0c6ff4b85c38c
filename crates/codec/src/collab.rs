//! Collaborators consumed through narrow interfaces: error descriptors and
//! the ambient type lookup.

use knot_value::{BigInt, ErrorValue, Heap, Primitive, Value};
use num_traits::FromPrimitive;

use crate::error::CodecError;
use crate::record::{ErrorDescriptor, Literal, Payload};

/// Converts error objects to and from plain descriptors.
pub trait ErrorCodec {
	fn encode(&self, error: &ErrorValue) -> ErrorDescriptor;
	fn decode(&self, descriptor: &ErrorDescriptor) -> ErrorValue;
}

/// Field-for-field descriptor codec: name, message and optional stack.
#[derive(Debug, Clone, Copy, Default)]
pub struct DescriptorCodec;

impl ErrorCodec for DescriptorCodec {
	fn encode(&self, error: &ErrorValue) -> ErrorDescriptor {
		ErrorDescriptor {
			name: error.name.clone(),
			message: error.message.clone(),
			stack: error.stack.clone(),
		}
	}

	fn decode(&self, descriptor: &ErrorDescriptor) -> ErrorValue {
		ErrorValue {
			name: descriptor.name.clone(),
			message: descriptor.message.clone(),
			stack: descriptor.stack.clone(),
		}
	}
}

/// Builds a value of a well-known type from a raw record payload.
pub type AmbientConstructor = fn(&mut Heap, &Payload) -> Result<Value, CodecError>;

/// Last-resort constructor table consulted for names the registry lacks.
pub trait TypeLookup {
	fn resolve(&self, name: &str) -> Option<AmbientConstructor>;
}

/// Boxed primitive wrappers: `Boolean`, `Number`, `String`, `BigInt`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WellKnownTypes;

impl TypeLookup for WellKnownTypes {
	fn resolve(&self, name: &str) -> Option<AmbientConstructor> {
		Some(match name {
			"Boolean" => boxed_boolean,
			"Number" => boxed_number,
			"String" => boxed_string,
			"BigInt" => boxed_bigint,
			_ => return None,
		})
	}
}

/// Lookup that knows no types.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAmbientTypes;

impl TypeLookup for NoAmbientTypes {
	fn resolve(&self, _name: &str) -> Option<AmbientConstructor> {
		None
	}
}

fn literal<'a>(name: &str, payload: &'a Payload) -> Result<&'a Literal, CodecError> {
	match payload {
		Payload::Literal(literal) => Ok(literal),
		other => Err(CodecError::extension(name, format!("expected a literal, found {}", other.shape()))),
	}
}

fn boxed_boolean(heap: &mut Heap, payload: &Payload) -> Result<Value, CodecError> {
	match literal("Boolean", payload)? {
		Literal::Bool(val) => Ok(heap.boxed(Primitive::Bool(*val))),
		other => Err(CodecError::extension("Boolean", format!("not a boolean: {other:?}"))),
	}
}

fn boxed_number(heap: &mut Heap, payload: &Payload) -> Result<Value, CodecError> {
	match literal("Number", payload)? {
		Literal::Number(val) => Ok(heap.boxed(Primitive::Number(*val))),
		// Non-finite numbers travel as null through plain-data formats.
		Literal::Null => Ok(heap.boxed(Primitive::Number(f64::NAN))),
		other => Err(CodecError::extension("Number", format!("not a number: {other:?}"))),
	}
}

fn boxed_string(heap: &mut Heap, payload: &Payload) -> Result<Value, CodecError> {
	match literal("String", payload)? {
		Literal::String(val) => Ok(heap.boxed(Primitive::String(val.clone()))),
		other => Err(CodecError::extension("String", format!("not a string: {other:?}"))),
	}
}

/// Exact integer value of `val`; `None` for fractions and non-finite numbers.
pub(crate) fn bigint_from_number(val: f64) -> Option<BigInt> {
	if val.fract() != 0.0 {
		return None;
	}
	BigInt::from_f64(val)
}

fn boxed_bigint(heap: &mut Heap, payload: &Payload) -> Result<Value, CodecError> {
	let parsed = match literal("BigInt", payload)? {
		Literal::String(digits) => digits.parse::<BigInt>().ok(),
		Literal::Number(val) => bigint_from_number(*val),
		_ => None,
	};
	match parsed {
		Some(val) => Ok(heap.boxed(Primitive::BigInt(val))),
		None => Err(CodecError::extension("BigInt", "not an integer literal")),
	}
}
