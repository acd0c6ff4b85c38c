//! Per-call extension registry: nominal type name to class entry or hook pair.

use std::fmt;
use std::sync::Arc;

use knot_value::{Heap, Instance, Node, ObjId, Value};
use rustc_hash::FxHashMap as HashMap;

use crate::error::CodecError;

/// Builds a nominal value from its resolved seed.
pub type Constructor = Arc<dyn Fn(&mut Heap, Value) -> Result<Value, CodecError> + Send + Sync>;

/// Replaces a nominal value with the value actually serialized in its place.
pub type EncodeHook = Arc<dyn Fn(&mut Heap, ObjId) -> Result<Value, CodecError> + Send + Sync>;

/// Rebuilds a nominal value from the decoded encode-hook output.
pub type DecodeHook = Constructor;

/// Canonical plain-data form of a nominal value.
pub type Projection = EncodeHook;

/// Nominal class registration.
#[derive(Clone)]
pub struct ClassEntry {
	/// Receives the fully resolved seed.
	pub constructor: Constructor,
	/// Alternative builder used under the plain-data convention.
	pub factory: Option<Constructor>,
	/// Plain-data projection used when serializing under the plain-data convention.
	pub projection: Option<Projection>,
}

impl ClassEntry {
	pub fn new(constructor: impl Fn(&mut Heap, Value) -> Result<Value, CodecError> + Send + Sync + 'static) -> Self {
		Self {
			constructor: Arc::new(constructor),
			factory: None,
			projection: None,
		}
	}

	/// Entry whose constructor converts a plain seed object into an
	/// [`Instance`] of `name`, keeping the seed's handle.
	pub fn instance(name: impl Into<Box<str>>) -> Self {
		let name: Box<str> = name.into();
		Self::new(move |heap, seed| {
			let Some(id) = seed.as_object() else {
				return Err(CodecError::extension(&*name, "seed is not an object"));
			};
			let fields = match heap.get_mut(id) {
				Some(Node::Object(props)) => std::mem::take(props),
				Some(Node::Instance(instance)) => std::mem::take(&mut instance.fields),
				_ => return Err(CodecError::extension(&*name, "seed is not a plain object")),
			};
			heap.replace(id, Node::Instance(Instance::new(name.clone(), fields)));
			Ok(seed)
		})
	}

	pub fn with_factory(
		mut self,
		factory: impl Fn(&mut Heap, Value) -> Result<Value, CodecError> + Send + Sync + 'static,
	) -> Self {
		self.factory = Some(Arc::new(factory));
		self
	}

	pub fn with_projection(
		mut self,
		projection: impl Fn(&mut Heap, ObjId) -> Result<Value, CodecError> + Send + Sync + 'static,
	) -> Self {
		self.projection = Some(Arc::new(projection));
		self
	}

	/// Builder to run for `plain` (the plain-data convention) or the
	/// structured convention.
	pub(crate) fn builder(&self, plain: bool) -> &Constructor {
		match &self.factory {
			Some(factory) if plain => factory,
			_ => &self.constructor,
		}
	}
}

/// Encode/decode hook registration.
#[derive(Clone)]
pub struct HookPair {
	pub encode: EncodeHook,
	pub decode: DecodeHook,
}

impl HookPair {
	pub fn new(
		encode: impl Fn(&mut Heap, ObjId) -> Result<Value, CodecError> + Send + Sync + 'static,
		decode: impl Fn(&mut Heap, Value) -> Result<Value, CodecError> + Send + Sync + 'static,
	) -> Self {
		Self {
			encode: Arc::new(encode),
			decode: Arc::new(decode),
		}
	}
}

#[derive(Clone)]
pub enum Extension {
	Class(ClassEntry),
	Hooks(HookPair),
}

impl Extension {
	pub fn as_class(&self) -> Option<&ClassEntry> {
		match self {
			Self::Class(entry) => Some(entry),
			Self::Hooks(_) => None,
		}
	}

	pub fn as_hooks(&self) -> Option<&HookPair> {
		match self {
			Self::Hooks(hooks) => Some(hooks),
			Self::Class(_) => None,
		}
	}
}

/// Name-keyed extension table, built by the caller and borrowed by one call.
///
/// Registering a name twice replaces the earlier entry.
#[derive(Clone, Default)]
pub struct Registry {
	entries: HashMap<Box<str>, Extension>,
}

impl Registry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register(&mut self, name: impl Into<Box<str>>, extension: Extension) -> &mut Self {
		let name = name.into();
		tracing::trace!(name = %name, "registry.register");
		self.entries.insert(name, extension);
		self
	}

	pub fn register_class(&mut self, name: impl Into<Box<str>>, entry: ClassEntry) -> &mut Self {
		self.register(name, Extension::Class(entry))
	}

	/// Registers `name` with the default [`ClassEntry::instance`] constructor.
	pub fn register_instance_class(&mut self, name: impl Into<Box<str>>) -> &mut Self {
		let name = name.into();
		let entry = ClassEntry::instance(name.clone());
		self.register_class(name, entry)
	}

	pub fn register_hooks(&mut self, name: impl Into<Box<str>>, hooks: HookPair) -> &mut Self {
		self.register(name, Extension::Hooks(hooks))
	}

	pub fn get(&self, name: &str) -> Option<&Extension> {
		self.entries.get(name)
	}

	pub fn contains(&self, name: &str) -> bool {
		self.entries.contains_key(name)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Registered names in sorted order.
	pub fn names(&self) -> Vec<&str> {
		let mut names: Vec<&str> = self.entries.keys().map(|name| &**name).collect();
		names.sort_unstable();
		names
	}
}

impl fmt::Debug for Registry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut map = f.debug_map();
		for name in self.names() {
			let kind = match self.entries.get(name) {
				Some(Extension::Class(_)) => "class",
				Some(Extension::Hooks(_)) => "hooks",
				None => continue,
			};
			map.entry(&name, &kind);
		}
		map.finish()
	}
}
