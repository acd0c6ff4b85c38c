use std::ops::{Index, IndexMut};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHashMap;

use crate::node::{ErrorValue, HostObject, Instance, Node, Pattern, Primitive, Properties, TypedArray};
use crate::value::Value;

/// Handle to a heap slot. Object identity is slot equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjId(u32);

impl ObjId {
	pub const fn index(self) -> usize {
		self.0 as usize
	}
}

/// Arena of objects addressed by [`ObjId`].
///
/// Slots are never freed; a heap lives as long as the graph it holds.
#[derive(Debug, Clone, Default)]
pub struct Heap {
	nodes: Vec<Node>,
}

impl Heap {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	pub fn alloc(&mut self, node: Node) -> ObjId {
		let id = u32::try_from(self.nodes.len()).expect("heap exceeds u32::MAX slots");
		self.nodes.push(node);
		ObjId(id)
	}

	pub fn get(&self, id: ObjId) -> Option<&Node> {
		self.nodes.get(id.index())
	}

	pub fn get_mut(&mut self, id: ObjId) -> Option<&mut Node> {
		self.nodes.get_mut(id.index())
	}

	/// Node behind `value`, if it is an object of this heap.
	pub fn node_of(&self, value: &Value) -> Option<&Node> {
		value.as_object().and_then(|id| self.get(id))
	}

	/// Swaps the node stored at `id`, keeping the handle (and every reference
	/// to it) valid.
	pub fn replace(&mut self, id: ObjId, node: Node) -> Node {
		std::mem::replace(&mut self[id], node)
	}

	pub fn insert(&mut self, node: Node) -> Value {
		Value::Object(self.alloc(node))
	}

	pub fn array(&mut self, items: impl IntoIterator<Item = Value>) -> Value {
		self.insert(Node::Array(items.into_iter().collect()))
	}

	pub fn object<K: Into<String>>(&mut self, props: impl IntoIterator<Item = (K, Value)>) -> Value {
		self.insert(Node::Object(props.into_iter().map(|(k, v)| (k.into(), v)).collect()))
	}

	pub fn map(&mut self, entries: impl IntoIterator<Item = (Value, Value)>) -> Value {
		self.insert(Node::Map(entries.into_iter().collect::<IndexMap<_, _>>()))
	}

	pub fn set(&mut self, items: impl IntoIterator<Item = Value>) -> Value {
		self.insert(Node::Set(items.into_iter().collect::<IndexSet<_>>()))
	}

	pub fn date(&mut self, at: DateTime<Utc>) -> Value {
		self.insert(Node::Date(at))
	}

	pub fn regexp(&mut self, source: impl Into<String>, flags: impl Into<String>) -> Value {
		self.insert(Node::RegExp(Pattern::new(source, flags)))
	}

	pub fn error(&mut self, error: ErrorValue) -> Value {
		self.insert(Node::Error(error))
	}

	pub fn typed_array(&mut self, array: TypedArray) -> Value {
		self.insert(Node::TypedArray(array))
	}

	pub fn boxed(&mut self, primitive: Primitive) -> Value {
		self.insert(Node::Boxed(primitive))
	}

	pub fn instance(&mut self, class: impl Into<Box<str>>, fields: Properties) -> Value {
		self.insert(Node::Instance(Instance::new(class, fields)))
	}

	pub fn host(&mut self, host: Arc<dyn HostObject>) -> Value {
		self.insert(Node::Host(host))
	}

	/// Appends to an array. Returns `false` when `id` is not an array.
	pub fn push(&mut self, id: ObjId, value: Value) -> bool {
		match self.get_mut(id) {
			Some(Node::Array(items)) => {
				items.push(value);
				true
			}
			_ => false,
		}
	}

	/// Sets a property on an object or instance. Returns `false` when `id`
	/// carries no properties.
	pub fn set_property(&mut self, id: ObjId, key: impl Into<String>, value: Value) -> bool {
		match self.get_mut(id) {
			Some(Node::Object(props)) => {
				props.insert(key.into(), value);
				true
			}
			Some(Node::Instance(instance)) => {
				instance.fields.insert(key.into(), value);
				true
			}
			_ => false,
		}
	}

	/// Reads a property of an object or instance.
	pub fn property(&self, value: &Value, key: &str) -> Option<&Value> {
		match self.node_of(value)? {
			Node::Object(props) => props.get(key),
			Node::Instance(instance) => instance.fields.get(key),
			_ => None,
		}
	}

	/// Reads an element of an array.
	pub fn element(&self, value: &Value, index: usize) -> Option<&Value> {
		self.node_of(value)?.as_array()?.get(index)
	}

	/// Compares `a` in this heap with `b` in `other`.
	///
	/// Objects match when their nodes match under one consistent bijection of
	/// handles, so aliasing and cycles must have the same shape on both sides.
	/// Host objects match by type name and debug representation.
	pub fn structurally_equal(&self, a: &Value, other: &Heap, b: &Value) -> bool {
		GraphEq {
			left: self,
			right: other,
			forward: FxHashMap::default(),
			backward: FxHashMap::default(),
			pending: Vec::new(),
		}
		.run(a, b)
	}
}

impl Index<ObjId> for Heap {
	type Output = Node;

	fn index(&self, id: ObjId) -> &Node {
		&self.nodes[id.index()]
	}
}

impl IndexMut<ObjId> for Heap {
	fn index_mut(&mut self, id: ObjId) -> &mut Node {
		&mut self.nodes[id.index()]
	}
}

struct GraphEq<'a> {
	left: &'a Heap,
	right: &'a Heap,
	forward: FxHashMap<ObjId, ObjId>,
	backward: FxHashMap<ObjId, ObjId>,
	pending: Vec<(ObjId, ObjId)>,
}

impl GraphEq<'_> {
	fn run(mut self, a: &Value, b: &Value) -> bool {
		if !self.values(a, b) {
			return false;
		}
		let (lheap, rheap) = (self.left, self.right);
		while let Some((l, r)) = self.pending.pop() {
			let (Some(left), Some(right)) = (lheap.get(l), rheap.get(r)) else {
				return false;
			};
			if !self.nodes(left, right) {
				return false;
			}
		}
		true
	}

	/// Compares two values, queueing newly paired objects for a node check.
	fn values(&mut self, a: &Value, b: &Value) -> bool {
		match (a, b) {
			(Value::Object(l), Value::Object(r)) => match (self.forward.get(l), self.backward.get(r)) {
				(Some(mapped), _) => mapped == r,
				(None, Some(_)) => false,
				(None, None) => {
					self.forward.insert(*l, *r);
					self.backward.insert(*r, *l);
					self.pending.push((*l, *r));
					true
				}
			},
			(Value::Symbol(l), Value::Symbol(r)) | (Value::Function(l), Value::Function(r)) => l.label() == r.label(),
			(Value::Object(_), _) | (_, Value::Object(_)) => false,
			_ => a == b,
		}
	}

	fn all<'v>(&mut self, pairs: impl Iterator<Item = (&'v Value, &'v Value)>) -> bool {
		for (a, b) in pairs {
			if !self.values(a, b) {
				return false;
			}
		}
		true
	}

	fn nodes(&mut self, left: &Node, right: &Node) -> bool {
		match (left, right) {
			(Node::Array(l), Node::Array(r)) => l.len() == r.len() && self.all(l.iter().zip(r)),
			(Node::Object(l), Node::Object(r)) => self.properties(l, r),
			(Node::Map(l), Node::Map(r)) => {
				l.len() == r.len() && l.iter().zip(r).all(|((lk, lv), (rk, rv))| self.values(lk, rk) && self.values(lv, rv))
			}
			(Node::Set(l), Node::Set(r)) => l.len() == r.len() && self.all(l.iter().zip(r)),
			(Node::Date(l), Node::Date(r)) => l == r,
			(Node::RegExp(l), Node::RegExp(r)) => l == r,
			(Node::Error(l), Node::Error(r)) => l.name == r.name && l.message == r.message,
			(Node::TypedArray(l), Node::TypedArray(r)) => l == r,
			(Node::Boxed(l), Node::Boxed(r)) => l.to_value() == r.to_value(),
			(Node::Instance(l), Node::Instance(r)) => l.class == r.class && self.properties(&l.fields, &r.fields),
			(Node::Host(l), Node::Host(r)) => l.type_name() == r.type_name() && format!("{l:?}") == format!("{r:?}"),
			_ => false,
		}
	}

	fn properties(&mut self, l: &Properties, r: &Properties) -> bool {
		l.len() == r.len() && l.iter().zip(r).all(|((lk, lv), (rk, rv))| lk == rk && self.values(lv, rv))
	}
}
