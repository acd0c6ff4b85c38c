//! Arena value model for identity-preserving graph encoding.
//!
//! Objects live in a [`Heap`] and are referenced by [`ObjId`] handles, so
//! shared references and cycles are plain handle equality. Primitives are
//! held inline in [`Value`].

pub mod heap;
pub mod node;
pub mod value;

pub use heap::{Heap, ObjId};
pub use node::{
	Element, ErrorValue, HostObject, Instance, Node, NodeKind, Pattern, Primitive, Properties, TypedArray, TypedArrayKind,
};
pub use num_bigint::BigInt;
pub use value::{Opaque, Value, ValueType, format_number};
