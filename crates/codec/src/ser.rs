//! Graph to record sequence.

use std::sync::Arc;

use chrono::SecondsFormat;
use knot_value::{ErrorValue, Heap, HostObject, Node, ObjId, Primitive, Value};
use rustc_hash::FxHashMap;

use crate::collab::ErrorCodec;
use crate::error::CodecError;
use crate::identity::IdentityMap;
use crate::options::{Convention, Limits, Mode, SerializeOptions};
use crate::record::{Entry, Literal, Payload, Record, Ref, Sentinel, StableId};
use crate::registry::{Extension, Registry};
use crate::tag::{Kind, Tag};

/// Serializes the graph reachable from `value` into a record sequence whose
/// element 0 is the root.
///
/// Shared references and cycles are encoded as refs to the record that first
/// introduced the object. With an identity map attached, objects bound by an
/// earlier call are emitted as bare stable references. A failed call leaves
/// the identity map as it found it.
pub fn serialize(heap: &mut Heap, value: &Value, options: SerializeOptions<'_>) -> Result<Vec<Record>, CodecError> {
	let mut ser = Serializer::new(heap, options);
	if let Some(identity) = ser.identity.as_deref_mut() {
		identity.begin();
	}
	let walked = ser.walk(value);
	if let Some(identity) = ser.identity.as_deref_mut() {
		match walked {
			Ok(_) => identity.commit(),
			Err(_) => identity.rollback(),
		}
	}
	if let Ref::Sentinel(sentinel) = walked? {
		return Ok(vec![Record::Marker(sentinel)]);
	}
	tracing::debug!(records = ser.records.len(), lossy = ser.mode == Mode::Lossy, "codec.serialize");
	Ok(ser.records)
}

/// Pending child walk of a record already in the output.
enum Frame {
	/// Array elements and set members.
	Items {
		index: usize,
		items: std::vec::IntoIter<Value>,
		filter: bool,
	},
	/// Object properties, map entries and instance fields.
	Entries {
		index: usize,
		entries: std::vec::IntoIter<(Value, Value)>,
		filter: bool,
		/// Key already visited, value not yet.
		pending: Option<(Ref, Value)>,
	},
}

struct Serializer<'h, 'o> {
	heap: &'h mut Heap,
	mode: Mode,
	convention: Convention,
	registry: Option<&'o Registry>,
	identity: Option<&'o mut IdentityMap>,
	error_codec: &'o dyn ErrorCodec,
	limits: Limits,
	records: Vec<Record>,
	seen: FxHashMap<Value, usize>,
	frames: Vec<Frame>,
	/// Hook and projection outputs currently being visited.
	nesting: usize,
}

impl<'h, 'o> Serializer<'h, 'o> {
	fn new(heap: &'h mut Heap, options: SerializeOptions<'o>) -> Self {
		Self {
			heap,
			mode: options.mode,
			convention: options.convention,
			registry: options.registry,
			identity: options.identity,
			error_codec: options.error_codec,
			limits: options.limits,
			records: Vec::new(),
			seen: FxHashMap::default(),
			frames: Vec::new(),
			nesting: 0,
		}
	}

	fn walk(&mut self, value: &Value) -> Result<Ref, CodecError> {
		let root = self.visit(value)?;
		if let Ref::Index(_) = root {
			self.drain()?;
		}
		Ok(root)
	}

	fn drain(&mut self) -> Result<(), CodecError> {
		while let Some(top) = self.frames.len().checked_sub(1) {
			match &mut self.frames[top] {
				Frame::Items { index, items, filter } => {
					let Some(item) = items.next() else {
						self.frames.pop();
						continue;
					};
					if *filter && item.is_non_data() {
						tracing::trace!(record = *index, kind = %item.get_type(), "codec.serialize.drop");
						continue;
					}
					let index = *index;
					let child = self.visit(&item)?;
					if let Some(Record::Entry(Entry {
						payload: Payload::Refs(refs),
						..
					})) = self.records.get_mut(index)
					{
						refs.push(child);
					}
				}
				Frame::Entries {
					index,
					entries,
					filter,
					pending,
				} => {
					let index = *index;
					if let Some((key, value)) = pending.take() {
						let value = self.visit(&value)?;
						if let Some(Record::Entry(Entry {
							payload: Payload::Pairs(pairs),
							..
						})) = self.records.get_mut(index)
						{
							pairs.push((key, value));
						}
						continue;
					}
					let Some((key, value)) = entries.next() else {
						self.frames.pop();
						continue;
					};
					if *filter && (key.is_non_data() || value.is_non_data()) {
						tracing::trace!(record = index, "codec.serialize.drop");
						continue;
					}
					let key = self.visit(&key)?;
					if let Frame::Entries { pending, .. } = &mut self.frames[top] {
						*pending = Some((key, value));
					}
				}
			}
		}
		Ok(())
	}

	/// Reserves the record for `value` (or returns the existing one) and
	/// queues its children.
	fn visit(&mut self, value: &Value) -> Result<Ref, CodecError> {
		if let Some(sentinel) = Sentinel::of(value) {
			return Ok(sentinel.into());
		}
		if value.is_non_data() {
			return match self.mode {
				Mode::Strict => Err(CodecError::TypeConversion { kind: value.get_type() }),
				Mode::Lossy => {
					tracing::trace!(kind = %value.get_type(), "codec.serialize.null");
					Ok(Sentinel::Null.into())
				}
			};
		}
		if let Some(&index) = self.seen.get(value) {
			return Ok(Ref::Index(index));
		}
		match value {
			Value::Number(val) => self.leaf(value, Tag::Primitive, Payload::Literal(Literal::Number(*val))),
			Value::String(val) => self.leaf(value, Tag::Primitive, Payload::Literal(Literal::String(val.clone()))),
			Value::BigInt(val) => self.leaf(value, Tag::BigInt, Payload::Literal(Literal::String(val.to_string()))),
			Value::Object(id) => self.visit_object(*id),
			_ => Ok(Sentinel::Null.into()),
		}
	}

	fn leaf(&mut self, value: &Value, tag: Tag, payload: Payload) -> Result<Ref, CodecError> {
		let index = self.push(value, Entry::new(tag, payload).into())?;
		Ok(Ref::Index(index))
	}

	fn push(&mut self, value: &Value, record: Record) -> Result<usize, CodecError> {
		if self.records.len() >= self.limits.max_records {
			return Err(CodecError::TooManyRecords {
				limit: self.limits.max_records,
			});
		}
		let index = self.records.len();
		self.records.push(record);
		self.seen.insert(value.clone(), index);
		Ok(index)
	}

	fn push_frame(&mut self, frame: Frame) -> Result<(), CodecError> {
		if self.frames.len() + self.nesting >= self.limits.max_depth {
			return Err(CodecError::DepthExceeded {
				limit: self.limits.max_depth,
			});
		}
		self.frames.push(frame);
		Ok(())
	}

	/// Identifier for a full record of `id`: the bound one, or a fresh one
	/// when identity tracking is active.
	fn stable_id(&mut self, id: ObjId, bound: Option<StableId>) -> Option<StableId> {
		bound.or_else(|| self.identity.as_deref_mut().map(|identity| identity.mint(id)))
	}

	fn entry(&mut self, id: ObjId, bound: Option<StableId>, kind: impl Into<Kind>, payload: Payload) -> Result<usize, CodecError> {
		let stable_id = self.stable_id(id, bound);
		let entry = Entry {
			kind: kind.into(),
			payload,
			stable_id,
		};
		self.push(&Value::Object(id), entry.into())
	}

	fn visit_object(&mut self, id: ObjId) -> Result<Ref, CodecError> {
		let value = Value::Object(id);
		let mut bound = None;
		if let Some(identity) = self.identity.as_deref_mut()
			&& let Some(stable) = identity.id_of(id).cloned()
		{
			if !identity.take_changed(id) {
				tracing::trace!(id = %stable, "codec.serialize.stable_ref");
				let index = self.push(&value, Record::Stable(stable))?;
				return Ok(Ref::Index(index));
			}
			tracing::trace!(id = %stable, "codec.serialize.changed");
			bound = Some(stable);
		}

		let Some(node) = self.heap.get(id) else {
			return Err(CodecError::malformed(self.records.len(), "dangling object handle"));
		};
		let lossy = self.mode == Mode::Lossy;
		let index = match node {
			Node::Array(items) => {
				let items = items.clone();
				let index = self.entry(id, bound, Tag::Array, Payload::Refs(Vec::with_capacity(items.len())))?;
				self.push_frame(Frame::Items {
					index,
					items: items.into_iter(),
					filter: false,
				})?;
				index
			}
			Node::Set(items) => {
				let items: Vec<Value> = items.iter().cloned().collect();
				let index = self.entry(id, bound, Tag::Set, Payload::Refs(Vec::with_capacity(items.len())))?;
				self.push_frame(Frame::Items {
					index,
					items: items.into_iter(),
					filter: lossy,
				})?;
				index
			}
			Node::Object(props) => {
				let entries = props.iter().map(|(k, v)| (Value::String(k.clone()), v.clone())).collect();
				self.pairs(id, bound, Tag::Object.into(), entries)?
			}
			Node::Map(map) => {
				let entries = map.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
				self.pairs(id, bound, Tag::Map.into(), entries)?
			}
			Node::Date(at) => {
				let text = at.to_rfc3339_opts(SecondsFormat::Millis, true);
				self.entry(id, bound, Tag::Date, Payload::Literal(Literal::String(text)))?
			}
			Node::RegExp(pattern) => {
				let payload = Payload::Pattern(pattern.clone());
				self.entry(id, bound, Tag::RegExp, payload)?
			}
			Node::Error(error) => {
				let payload = Payload::Descriptor(self.error_codec.encode(error));
				self.entry(id, bound, Tag::Error, payload)?
			}
			Node::TypedArray(array) => {
				let kind = Kind::named(array.kind().name());
				let payload = Payload::Numbers(array.elements());
				self.entry(id, bound, kind, payload)?
			}
			Node::Boxed(primitive) => {
				let kind = Kind::named(primitive.name());
				let literal = match primitive {
					Primitive::Bool(val) => Literal::Bool(*val),
					Primitive::Number(val) => Literal::Number(*val),
					Primitive::String(val) => Literal::String(val.clone()),
					Primitive::BigInt(val) => Literal::String(val.to_string()),
				};
				self.entry(id, bound, kind, Payload::Literal(literal))?
			}
			Node::Instance(instance) => {
				let name = instance.class.clone();
				let fields: Vec<(Value, Value)> = instance
					.fields
					.iter()
					.map(|(k, v)| (Value::String(k.clone()), v.clone()))
					.collect();
				return self.visit_nominal(id, bound, name, None, fields);
			}
			Node::Host(host) => {
				let name: Box<str> = host.type_name().into();
				let host = Arc::clone(host);
				return self.visit_nominal(id, bound, name, Some(host), Vec::new());
			}
		};
		Ok(Ref::Index(index))
	}

	fn pairs(
		&mut self,
		id: ObjId,
		bound: Option<StableId>,
		kind: Kind,
		entries: Vec<(Value, Value)>,
	) -> Result<usize, CodecError> {
		let index = self.entry(id, bound, kind, Payload::Pairs(Vec::with_capacity(entries.len())))?;
		self.push_frame(Frame::Entries {
			index,
			entries: entries.into_iter(),
			filter: self.mode == Mode::Lossy,
			pending: None,
		})?;
		Ok(index)
	}

	/// Instances and host objects, dispatched by type name: registry hooks,
	/// then the plain-data projection, then own fields.
	fn visit_nominal(
		&mut self,
		id: ObjId,
		bound: Option<StableId>,
		name: Box<str>,
		host: Option<Arc<dyn HostObject>>,
		fields: Vec<(Value, Value)>,
	) -> Result<Ref, CodecError> {
		let registry = self.registry;
		let extension = registry.and_then(|registry| registry.get(&name));

		if let Some(Extension::Hooks(hooks)) = extension {
			let index = self.entry(id, bound, Kind::Named(name), Payload::Ref(Sentinel::Void.into()))?;
			let output = (hooks.encode)(&mut *self.heap, id)?;
			self.wrap(index, &output)?;
			return Ok(Ref::Index(index));
		}

		if self.convention == Convention::Plain {
			let class = extension.and_then(Extension::as_class);
			let projected = match class.and_then(|class| class.projection.as_ref()) {
				Some(projection) => Some(projection(&mut *self.heap, id)?),
				None => host.as_ref().and_then(|host| host.to_plain(&mut *self.heap)),
			};
			if let Some(projected) = projected {
				if class.is_some() {
					let index = self.entry(id, bound, Kind::Named(name), Payload::Ref(Sentinel::Void.into()))?;
					self.wrap(index, &projected)?;
					return Ok(Ref::Index(index));
				}
				let child = self.nested(&projected)?;
				if let Ref::Index(index) = child {
					self.seen.insert(Value::Object(id), index);
				}
				return Ok(child);
			}
		}

		if let Some(host) = host {
			let error = ErrorValue::new(host.type_name(), format!("{host:?}"));
			let payload = Payload::Descriptor(self.error_codec.encode(&error));
			let index = self.entry(id, bound, Tag::Error, payload)?;
			return Ok(Ref::Index(index));
		}

		let index = self.pairs(id, bound, Kind::Named(name), fields)?;
		Ok(Ref::Index(index))
	}

	/// Visits `output` as the single child of the wrapper record at `index`.
	fn wrap(&mut self, index: usize, output: &Value) -> Result<(), CodecError> {
		let child = self.nested(output)?;
		if let Some(Record::Entry(entry)) = self.records.get_mut(index) {
			entry.payload = Payload::Ref(child);
		}
		Ok(())
	}

	fn nested(&mut self, value: &Value) -> Result<Ref, CodecError> {
		if self.frames.len() + self.nesting >= self.limits.max_depth {
			return Err(CodecError::DepthExceeded {
				limit: self.limits.max_depth,
			});
		}
		self.nesting += 1;
		let result = self.visit(value);
		self.nesting -= 1;
		result
	}
}
