//! Record sequence to graph.

use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};
use knot_value::{BigInt, Heap, Instance, Node, NodeKind, ObjId, Properties, TypedArray, TypedArrayKind, Value};
use rustc_hash::FxHashMap;

use crate::collab::{ErrorCodec, TypeLookup, bigint_from_number};
use crate::error::CodecError;
use crate::identity::IdentityMap;
use crate::options::{Convention, DeserializeOptions, Limits, UnknownTypes};
use crate::record::{Entry, Literal, Payload, Record, Ref, StableId};
use crate::registry::{Extension, Registry};
use crate::tag::{Kind, Tag};

/// Rebuilds the graph encoded by `records` into `heap` and returns the root.
///
/// Records are materialized on first demand. Containers exist before their
/// children are filled, so cycles through them resolve; nominal records are
/// constructed only once every child is complete.
///
/// A failed call restores every bound object it overwrote and every identity
/// binding it changed.
pub fn deserialize(heap: &mut Heap, records: &[Record], options: DeserializeOptions<'_>) -> Result<Value, CodecError> {
	if records.is_empty() {
		return Err(CodecError::malformed(0, "empty record sequence"));
	}
	if records.len() > options.limits.max_records {
		return Err(CodecError::TooManyRecords {
			limit: options.limits.max_records,
		});
	}
	if let Record::Marker(sentinel) = &records[0] {
		return Ok(sentinel.value());
	}
	let update = options.update;
	let mut de = Deserializer::new(heap, records, options);
	if let Some(identity) = de.identity.as_deref_mut() {
		identity.begin();
	}
	let result = de.run();
	de.finish(result.is_ok());
	let root = result?;
	tracing::debug!(records = records.len(), update, "codec.deserialize");
	Ok(root)
}

enum Slot {
	Pending,
	/// Nominal record whose children are still being resolved.
	Building,
	Done(Value),
}

/// Pending child resolution of one record.
#[derive(Debug, Clone, Copy)]
enum Frame {
	/// Container already cached; children are inserted as they resolve.
	Fill {
		index: usize,
		target: ObjId,
		tag: Tag,
		cursor: usize,
	},
	/// Nominal record; `seed` receives pair payloads.
	Build {
		index: usize,
		seed: Option<ObjId>,
		cursor: usize,
	},
}

struct Deserializer<'h, 'r, 'o> {
	heap: &'h mut Heap,
	records: &'r [Record],
	slots: Vec<Slot>,
	frames: Vec<Frame>,
	convention: Convention,
	registry: Option<&'o Registry>,
	identity: Option<&'o mut IdentityMap>,
	update: bool,
	unknown_types: UnknownTypes,
	type_lookup: &'o dyn TypeLookup,
	error_codec: &'o dyn ErrorCodec,
	limits: Limits,
	/// Objects allocated before this call have handles below this bound.
	fresh_from: usize,
	/// Prior nodes of pre-existing objects overwritten by this call.
	touched: FxHashMap<ObjId, Node>,
}

impl<'h, 'r, 'o> Deserializer<'h, 'r, 'o> {
	fn new(heap: &'h mut Heap, records: &'r [Record], options: DeserializeOptions<'o>) -> Self {
		let fresh_from = heap.len();
		Self {
			heap,
			records,
			slots: records.iter().map(|_| Slot::Pending).collect(),
			frames: Vec::new(),
			convention: options.convention,
			registry: options.registry,
			identity: options.identity,
			update: options.update,
			unknown_types: options.unknown_types,
			type_lookup: options.type_lookup,
			error_codec: options.error_codec,
			limits: options.limits,
			fresh_from,
			touched: FxHashMap::default(),
		}
	}

	fn run(&mut self) -> Result<Value, CodecError> {
		self.resolve(Ref::Index(0))?;
		self.drain()?;
		match &self.slots[0] {
			Slot::Done(value) => Ok(value.clone()),
			_ => Err(CodecError::malformed(0, "root record did not complete")),
		}
	}

	/// Commits the identity transaction, or undoes every change of the call.
	fn finish(&mut self, succeeded: bool) {
		if succeeded {
			if let Some(identity) = self.identity.as_deref_mut() {
				identity.commit();
			}
			return;
		}
		if let Some(identity) = self.identity.as_deref_mut() {
			identity.rollback();
		}
		for (object, node) in self.touched.drain() {
			self.heap.replace(object, node);
		}
	}

	fn drain(&mut self) -> Result<(), CodecError> {
		while let Some(&frame) = self.frames.last() {
			match frame {
				Frame::Fill {
					index,
					target,
					tag,
					cursor,
				} => self.fill(index, target, tag, cursor)?,
				Frame::Build { index, seed, cursor } => self.build(index, seed, cursor)?,
			}
		}
		Ok(())
	}

	/// Value of `reference`, or `None` when resolving it pushed a frame that
	/// must complete first.
	fn resolve(&mut self, reference: Ref) -> Result<Option<Value>, CodecError> {
		let index = match reference {
			Ref::Sentinel(sentinel) => return Ok(Some(sentinel.value())),
			Ref::Index(index) => index,
		};
		match self.slots.get(index) {
			None => Err(CodecError::malformed(index, "reference past the end of the sequence")),
			Some(Slot::Done(value)) => Ok(Some(value.clone())),
			Some(Slot::Building) => Err(CodecError::Unsupported {
				index,
				name: self.kind_name(index),
			}),
			Some(Slot::Pending) => self.start(index),
		}
	}

	fn kind_name(&self, index: usize) -> Box<str> {
		match self.records.get(index).and_then(Record::entry) {
			Some(entry) => entry.kind.to_string().into(),
			None => "?".into(),
		}
	}

	fn entry(&self, index: usize) -> Result<&'r Entry, CodecError> {
		let records = self.records;
		records
			.get(index)
			.and_then(Record::entry)
			.ok_or_else(|| CodecError::malformed(index, "expected a full record"))
	}

	fn push_frame(&mut self, frame: Frame) -> Result<(), CodecError> {
		if self.frames.len() >= self.limits.max_depth {
			return Err(CodecError::DepthExceeded {
				limit: self.limits.max_depth,
			});
		}
		self.frames.push(frame);
		Ok(())
	}

	fn advance(&mut self) {
		if let Some(Frame::Fill { cursor, .. } | Frame::Build { cursor, .. }) = self.frames.last_mut() {
			*cursor += 1;
		}
	}

	fn done(&mut self, index: usize, value: Value) -> Option<Value> {
		self.slots[index] = Slot::Done(value.clone());
		Some(value)
	}

	/// Starts record `index` on first demand.
	fn start(&mut self, index: usize) -> Result<Option<Value>, CodecError> {
		let records = self.records;
		let entry = match &records[index] {
			Record::Entry(entry) => entry,
			Record::Stable(id) => {
				let object = self
					.identity
					.as_deref()
					.and_then(|identity| identity.object_of(id))
					.ok_or_else(|| CodecError::Lookup { id: id.clone() })?;
				return Ok(self.done(index, Value::Object(object)));
			}
			Record::Marker(sentinel) if index == 0 => return Ok(self.done(index, sentinel.value())),
			Record::Marker(_) => return Err(CodecError::malformed(index, "sentinel marker outside the root")),
		};
		let stable = entry.stable_id.as_ref();
		let tag = match &entry.kind {
			Kind::Tag(tag) => *tag,
			Kind::Named(name) => return self.start_named(index, name, entry),
		};
		let value = match (tag, &entry.payload) {
			(Tag::Primitive, Payload::Literal(literal)) => literal.to_value(),
			(Tag::BigInt, Payload::Literal(literal)) => Value::BigInt(parse_bigint(index, literal)?),
			(Tag::Date, Payload::Literal(Literal::String(text))) => {
				let at = DateTime::parse_from_rfc3339(text)
					.map_err(|err| CodecError::malformed(index, format!("invalid date {text:?}: {err}")))?;
				self.place(Node::Date(at.with_timezone(&Utc)), stable)?
			}
			(Tag::RegExp, Payload::Pattern(pattern)) => self.place(Node::RegExp(pattern.clone()), stable)?,
			(Tag::Error, Payload::Descriptor(descriptor)) => {
				let error = self.error_codec.decode(descriptor);
				self.place(Node::Error(error), stable)?
			}
			(Tag::Array | Tag::Set, Payload::Refs(_)) | (Tag::Object | Tag::Map, Payload::Pairs(_)) => {
				let target = self.container(tag, stable)?;
				self.slots[index] = Slot::Done(Value::Object(target));
				self.push_frame(Frame::Fill {
					index,
					target,
					tag,
					cursor: 0,
				})?;
				return Ok(None);
			}
			(tag, payload) => {
				return Err(CodecError::malformed(
					index,
					format!("{} payload for {tag} record", payload.shape()),
				));
			}
		};
		Ok(self.done(index, value))
	}

	/// Allocates the container for a composite record, or reuses the bound
	/// one in update mode.
	fn container(&mut self, tag: Tag, stable: Option<&StableId>) -> Result<ObjId, CodecError> {
		let node = empty_container(tag);
		if let Some(object) = self.reusable(stable, Some(node.kind()))? {
			if let Some(Node::Array(items)) = self.heap.get_mut(object) {
				items.clear();
			}
			return Ok(object);
		}
		let object = self.heap.alloc(node);
		self.bind_new(object, stable)?;
		Ok(object)
	}

	/// Stores a decoded leaf node, overwriting the object bound to `stable`
	/// in update mode.
	fn place(&mut self, node: Node, stable: Option<&StableId>) -> Result<Value, CodecError> {
		if let Some(object) = self.reusable(stable, Some(node.kind()))? {
			self.heap.replace(object, node);
			return Ok(Value::Object(object));
		}
		let object = self.heap.alloc(node);
		self.bind_new(object, stable)?;
		Ok(Value::Object(object))
	}

	/// Object already bound to `stable`, about to be overwritten.
	///
	/// A bound id is a conflict outside update mode, and so is a bound object
	/// whose kind differs from `kind`.
	fn reusable(&mut self, stable: Option<&StableId>, kind: Option<NodeKind>) -> Result<Option<ObjId>, CodecError> {
		let Some(id) = stable else {
			return Ok(None);
		};
		let Some(object) = self.identity.as_deref().and_then(|identity| identity.object_of(id)) else {
			return Ok(None);
		};
		if !self.update {
			return Err(CodecError::Conflict { id: id.clone() });
		}
		let found = self.heap.get(object).map(Node::kind);
		if let Some(kind) = kind
			&& found != Some(kind)
		{
			return Err(CodecError::Conflict { id: id.clone() });
		}
		self.touch(object);
		tracing::trace!(id = %id, kind = ?found, "codec.deserialize.reuse");
		Ok(Some(object))
	}

	/// Snapshots a pre-existing object before its first overwrite.
	fn touch(&mut self, object: ObjId) {
		if object.index() >= self.fresh_from {
			return;
		}
		if let Some(node) = self.heap.get(object) {
			self.touched.entry(object).or_insert_with(|| node.clone());
		}
	}

	fn bind_new(&mut self, object: ObjId, stable: Option<&StableId>) -> Result<(), CodecError> {
		match (stable, self.identity.as_deref_mut()) {
			(Some(id), Some(identity)) => identity.bind(object, id.clone()),
			_ => Ok(()),
		}
	}

	/// Binds a constructed nominal value. In update mode a freshly built
	/// result moves into the object already bound to its id.
	fn settle(&mut self, value: Value, stable: Option<&StableId>) -> Result<Value, CodecError> {
		let Some(object) = value.as_object() else {
			return Ok(value);
		};
		match self.reusable(stable, None)? {
			None => {
				self.bind_new(object, stable)?;
				Ok(value)
			}
			Some(bound) if bound == object => Ok(value),
			Some(bound) if object.index() >= self.fresh_from => {
				let node = self.heap.replace(object, Node::Object(Properties::new()));
				self.heap.replace(bound, node);
				Ok(Value::Object(bound))
			}
			Some(_) => {
				if let (Some(id), Some(identity)) = (stable, self.identity.as_deref_mut()) {
					identity.rebind(object, id.clone());
				}
				Ok(value)
			}
		}
	}

	fn start_named(&mut self, index: usize, name: &str, entry: &'r Entry) -> Result<Option<Value>, CodecError> {
		if let Some(kind) = TypedArrayKind::from_name(name) {
			let Payload::Numbers(elements) = &entry.payload else {
				return Err(CodecError::malformed(
					index,
					format!("{} payload for {name} record", entry.payload.shape()),
				));
			};
			let node = Node::TypedArray(TypedArray::from_elements(kind, elements));
			let value = self.place(node, entry.stable_id.as_ref())?;
			return Ok(self.done(index, value));
		}

		let registered = self.registry.is_some_and(|registry| registry.contains(name));
		let ambient = !registered && self.type_lookup.resolve(name).is_some();
		let preserve = self.unknown_types == UnknownTypes::Preserve && matches!(entry.payload, Payload::Pairs(_));
		if !registered && !ambient && !preserve {
			return Err(CodecError::UnknownType { name: name.into() });
		}

		match &entry.payload {
			Payload::Pairs(_) => {
				let seed = match self.reusable(entry.stable_id.as_ref(), None)? {
					Some(object) => {
						self.heap.replace(object, Node::Object(Properties::new()));
						object
					}
					None => self.heap.alloc(Node::Object(Properties::new())),
				};
				self.slots[index] = Slot::Building;
				self.push_frame(Frame::Build {
					index,
					seed: Some(seed),
					cursor: 0,
				})?;
				Ok(None)
			}
			Payload::Ref(_) => {
				self.slots[index] = Slot::Building;
				self.push_frame(Frame::Build {
					index,
					seed: None,
					cursor: 0,
				})?;
				Ok(None)
			}
			Payload::Literal(literal) => {
				let value = self.construct(index, name, entry, literal.to_value())?;
				Ok(self.done(index, value))
			}
			_ if ambient => {
				let value = self.construct(index, name, entry, Value::Undefined)?;
				Ok(self.done(index, value))
			}
			payload => Err(CodecError::malformed(
				index,
				format!("{} payload for {name} record", payload.shape()),
			)),
		}
	}

	fn fill(&mut self, index: usize, target: ObjId, tag: Tag, cursor: usize) -> Result<(), CodecError> {
		let entry = self.entry(index)?;
		match &entry.payload {
			Payload::Refs(refs) => {
				let Some(&reference) = refs.get(cursor) else {
					self.frames.pop();
					return Ok(());
				};
				let Some(value) = self.resolve(reference)? else {
					return Ok(());
				};
				match self.heap.get_mut(target) {
					Some(Node::Array(items)) => items.push(value),
					Some(Node::Set(items)) => {
						items.insert(value);
					}
					_ => return Err(CodecError::malformed(index, format!("{tag} container was replaced"))),
				}
			}
			Payload::Pairs(pairs) => {
				let Some(&(key, value)) = pairs.get(cursor) else {
					self.frames.pop();
					return Ok(());
				};
				let Some(key) = self.resolve(key)? else {
					return Ok(());
				};
				let Some(value) = self.resolve(value)? else {
					return Ok(());
				};
				match self.heap.get_mut(target) {
					Some(Node::Object(props)) => {
						props.insert(key.to_property_key(), value);
					}
					Some(Node::Map(entries)) => {
						entries.insert(key, value);
					}
					_ => return Err(CodecError::malformed(index, format!("{tag} container was replaced"))),
				}
			}
			payload => return Err(CodecError::malformed(index, format!("{} payload for {tag} record", payload.shape()))),
		}
		self.advance();
		Ok(())
	}

	fn build(&mut self, index: usize, seed: Option<ObjId>, cursor: usize) -> Result<(), CodecError> {
		let entry = self.entry(index)?;
		let Some(name) = entry.kind.as_name() else {
			return Err(CodecError::malformed(index, "nominal frame on a built-in kind"));
		};
		let input = match (&entry.payload, seed) {
			(Payload::Pairs(pairs), Some(seed)) => {
				if let Some(&(key, value)) = pairs.get(cursor) {
					let Some(key) = self.resolve(key)? else {
						return Ok(());
					};
					let Some(value) = self.resolve(value)? else {
						return Ok(());
					};
					self.heap.set_property(seed, key.to_property_key(), value);
					self.advance();
					return Ok(());
				}
				Value::Object(seed)
			}
			(Payload::Ref(reference), None) => match self.resolve(*reference)? {
				Some(value) => value,
				None => return Ok(()),
			},
			(payload, _) => {
				return Err(CodecError::malformed(
					index,
					format!("{} payload for {name} record", payload.shape()),
				));
			}
		};
		self.frames.pop();
		let value = self.construct(index, name, entry, input)?;
		self.done(index, value);
		Ok(())
	}

	/// Runs the constructor for a nominal record whose children are complete.
	fn construct(&mut self, index: usize, name: &str, entry: &Entry, seed: Value) -> Result<Value, CodecError> {
		let value = match self.registry.and_then(|registry| registry.get(name)) {
			Some(Extension::Hooks(hooks)) => (hooks.decode)(&mut *self.heap, seed)?,
			Some(Extension::Class(class)) => {
				let plain = self.convention == Convention::Plain;
				(class.builder(plain))(&mut *self.heap, seed)?
			}
			None => match self.type_lookup.resolve(name) {
				Some(ambient) => ambient(&mut *self.heap, &entry.payload)?,
				None => match (self.unknown_types, seed.as_object()) {
					(UnknownTypes::Preserve, Some(object)) => {
						let fields = match self.heap.get_mut(object) {
							Some(Node::Object(props)) => std::mem::take(props),
							_ => return Err(CodecError::UnknownType { name: name.into() }),
						};
						self.heap.replace(object, Node::Instance(Instance::new(name, fields)));
						tracing::trace!(record = index, name, "codec.deserialize.preserve");
						seed
					}
					_ => return Err(CodecError::UnknownType { name: name.into() }),
				},
			},
		};
		self.settle(value, entry.stable_id.as_ref())
	}
}

fn empty_container(tag: Tag) -> Node {
	match tag {
		Tag::Array => Node::Array(Vec::new()),
		Tag::Map => Node::Map(IndexMap::new()),
		Tag::Set => Node::Set(IndexSet::new()),
		_ => Node::Object(Properties::new()),
	}
}

fn parse_bigint(index: usize, literal: &Literal) -> Result<BigInt, CodecError> {
	match literal {
		Literal::String(digits) => digits
			.parse()
			.map_err(|_| CodecError::malformed(index, format!("invalid bigint {digits:?}"))),
		Literal::Number(val) => {
			bigint_from_number(*val).ok_or_else(|| CodecError::malformed(index, format!("invalid bigint {val}")))
		}
		other => Err(CodecError::malformed(index, format!("invalid bigint {other:?}"))),
	}
}

#[cfg(test)]
mod tests;
