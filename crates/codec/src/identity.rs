//! Caller-owned stable identity map spanning serialize/deserialize calls.

use knot_value::ObjId;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::CodecError;
use crate::record::StableId;

/// Bidirectional `ObjId <-> StableId` table.
///
/// A map belongs to the heap whose handles it stores; producer and consumer
/// each keep their own. Identifiers minted here read `@<n>`.
///
/// Codec calls run inside a transaction: every change made during a failed
/// call is rolled back, so the map never holds bindings the peer did not
/// receive.
#[derive(Debug, Clone, Default)]
pub struct IdentityMap {
	by_object: FxHashMap<ObjId, StableId>,
	by_id: FxHashMap<StableId, ObjId>,
	changed: FxHashSet<ObjId>,
	next: u64,
	/// Undo log of the open transaction.
	journal: Option<Vec<Undo>>,
}

/// Previous state of one touched table entry.
#[derive(Debug, Clone)]
enum Undo {
	Object(ObjId, Option<StableId>),
	Id(StableId, Option<ObjId>),
	Changed(ObjId),
	Next(u64),
}

impl IdentityMap {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn id_of(&self, object: ObjId) -> Option<&StableId> {
		self.by_object.get(&object)
	}

	pub fn object_of(&self, id: &StableId) -> Option<ObjId> {
		self.by_id.get(id).copied()
	}

	/// Binds `object` to a fresh identifier and returns it.
	///
	/// An object that is already bound keeps its identifier.
	pub fn mint(&mut self, object: ObjId) -> StableId {
		if let Some(id) = self.by_object.get(&object) {
			return id.clone();
		}
		let start = self.next;
		let id = loop {
			let candidate = StableId::new(format!("@{}", self.next));
			self.next += 1;
			if !self.by_id.contains_key(&candidate) {
				break candidate;
			}
		};
		self.log(Undo::Next(start));
		self.put_object(object, Some(id.clone()));
		self.put_id(id.clone(), Some(object));
		id
	}

	/// Binds `object` to `id`.
	///
	/// Rebinding the same pair is a no-op; an `id` held by another object or
	/// an `object` held under another id is a [`CodecError::Conflict`].
	pub fn bind(&mut self, object: ObjId, id: StableId) -> Result<(), CodecError> {
		match (self.by_id.get(&id), self.by_object.get(&object)) {
			(Some(bound), _) if *bound != object => Err(CodecError::Conflict { id }),
			(_, Some(existing)) if *existing != id => Err(CodecError::Conflict { id }),
			(Some(_), Some(_)) => Ok(()),
			_ => {
				self.put_object(object, Some(id.clone()));
				self.put_id(id, Some(object));
				Ok(())
			}
		}
	}

	/// Moves `id` onto `object`, dropping whatever it was bound to.
	pub(crate) fn rebind(&mut self, object: ObjId, id: StableId) {
		if let Some(previous) = self.object_of(&id)
			&& previous != object
		{
			self.put_object(previous, None);
			self.unmark(previous);
		}
		if let Some(old) = self.by_object.get(&object).cloned()
			&& old != id
		{
			self.put_id(old, None);
		}
		self.put_id(id.clone(), Some(object));
		self.put_object(object, Some(id));
	}

	/// Forgets the binding of `object`; the next serialize call introduces it
	/// again under a fresh identifier.
	pub fn release(&mut self, object: ObjId) -> Option<StableId> {
		let id = self.by_object.get(&object).cloned()?;
		self.put_object(object, None);
		self.put_id(id.clone(), None);
		self.unmark(object);
		Some(id)
	}

	/// Requests that the next serialize call re-emit `object` as a full
	/// record carrying its existing identifier. Returns `false` when `object`
	/// is unbound.
	pub fn mark_changed(&mut self, object: ObjId) -> bool {
		if !self.by_object.contains_key(&object) {
			return false;
		}
		self.changed.insert(object);
		true
	}

	pub fn is_changed(&self, object: ObjId) -> bool {
		self.changed.contains(&object)
	}

	/// Consumes the change mark of `object`.
	pub(crate) fn take_changed(&mut self, object: ObjId) -> bool {
		self.unmark(object)
	}

	pub fn clear(&mut self) {
		self.by_object.clear();
		self.by_id.clear();
		self.changed.clear();
		self.journal = None;
	}

	pub fn len(&self) -> usize {
		self.by_object.len()
	}

	pub fn is_empty(&self) -> bool {
		self.by_object.is_empty()
	}

	/// Opens a transaction; changes are journaled until [`commit`](Self::commit)
	/// or [`rollback`](Self::rollback).
	pub(crate) fn begin(&mut self) {
		self.journal = Some(Vec::new());
	}

	pub(crate) fn commit(&mut self) {
		self.journal = None;
	}

	/// Restores the state the map had when the transaction opened.
	pub(crate) fn rollback(&mut self) {
		let Some(journal) = self.journal.take() else {
			return;
		};
		for undo in journal.into_iter().rev() {
			match undo {
				Undo::Object(object, Some(id)) => {
					self.by_object.insert(object, id);
				}
				Undo::Object(object, None) => {
					self.by_object.remove(&object);
				}
				Undo::Id(id, Some(object)) => {
					self.by_id.insert(id, object);
				}
				Undo::Id(id, None) => {
					self.by_id.remove(&id);
				}
				Undo::Changed(object) => {
					self.changed.insert(object);
				}
				Undo::Next(next) => self.next = next,
			}
		}
	}

	fn log(&mut self, undo: Undo) {
		if let Some(journal) = &mut self.journal {
			journal.push(undo);
		}
	}

	fn put_object(&mut self, object: ObjId, id: Option<StableId>) {
		let previous = match id {
			Some(id) => self.by_object.insert(object, id),
			None => self.by_object.remove(&object),
		};
		self.log(Undo::Object(object, previous));
	}

	fn put_id(&mut self, id: StableId, object: Option<ObjId>) {
		let previous = match object {
			Some(object) => self.by_id.insert(id.clone(), object),
			None => self.by_id.remove(&id),
		};
		self.log(Undo::Id(id, previous));
	}

	fn unmark(&mut self, object: ObjId) -> bool {
		let removed = self.changed.remove(&object);
		if removed {
			self.log(Undo::Changed(object));
		}
		removed
	}
}

#[cfg(test)]
mod tests;
