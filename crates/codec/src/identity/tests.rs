use knot_value::{Heap, Node};
use pretty_assertions::assert_eq;

use super::*;

fn objects(n: usize) -> Vec<ObjId> {
	let mut heap = Heap::new();
	(0..n).map(|_| heap.alloc(Node::Array(Vec::new()))).collect()
}

#[test]
fn mint_is_stable_per_object() {
	let ids = objects(2);
	let mut map = IdentityMap::new();
	let first = map.mint(ids[0]);
	assert_eq!(first.as_str(), "@0");
	assert_eq!(map.mint(ids[0]), first);
	assert_eq!(map.mint(ids[1]).as_str(), "@1");
	assert_eq!(map.object_of(&first), Some(ids[0]));
	assert_eq!(map.len(), 2);
}

#[test]
fn mint_skips_identifiers_bound_by_hand() {
	let ids = objects(2);
	let mut map = IdentityMap::new();
	map.bind(ids[0], StableId::from("@0")).unwrap();
	assert_eq!(map.mint(ids[1]).as_str(), "@1");
}

#[test]
fn bind_conflicts() {
	let ids = objects(2);
	let mut map = IdentityMap::new();
	map.bind(ids[0], "a".into()).unwrap();
	map.bind(ids[0], "a".into()).unwrap();

	let err = map.bind(ids[1], "a".into()).unwrap_err();
	assert_eq!(err, CodecError::Conflict { id: "a".into() });
	let err = map.bind(ids[0], "b".into()).unwrap_err();
	assert_eq!(err, CodecError::Conflict { id: "b".into() });
}

#[test]
fn rebind_moves_identifier() {
	let ids = objects(2);
	let mut map = IdentityMap::new();
	map.bind(ids[0], "a".into()).unwrap();
	map.rebind(ids[1], "a".into());
	assert_eq!(map.object_of(&"a".into()), Some(ids[1]));
	assert_eq!(map.id_of(ids[0]), None);
	assert_eq!(map.len(), 1);
}

#[test]
fn release_and_change_marks() {
	let ids = objects(2);
	let mut map = IdentityMap::new();
	assert!(!map.mark_changed(ids[0]));

	let id = map.mint(ids[0]);
	assert!(map.mark_changed(ids[0]));
	assert!(map.is_changed(ids[0]));
	assert!(map.take_changed(ids[0]));
	assert!(!map.take_changed(ids[0]));

	map.mark_changed(ids[0]);
	assert_eq!(map.release(ids[0]), Some(id.clone()));
	assert!(!map.is_changed(ids[0]));
	assert_eq!(map.object_of(&id), None);
	assert!(map.is_empty());
	assert_ne!(map.mint(ids[0]), id);

	map.clear();
	assert!(map.is_empty());
}

#[test]
fn rollback_restores_the_open_transaction() {
	let ids = objects(3);
	let mut map = IdentityMap::new();
	let kept = map.mint(ids[0]);
	map.bind(ids[1], "b".into()).unwrap();
	map.mark_changed(ids[0]);

	map.begin();
	map.mint(ids[2]);
	assert!(map.take_changed(ids[0]));
	map.rebind(ids[2], "b".into());
	map.release(ids[0]);
	map.rollback();

	assert_eq!(map.len(), 2);
	assert_eq!(map.id_of(ids[0]), Some(&kept));
	assert_eq!(map.object_of(&"b".into()), Some(ids[1]));
	assert_eq!(map.id_of(ids[2]), None);
	assert!(map.is_changed(ids[0]));
	assert_eq!(map.mint(ids[2]).as_str(), "@1");
}

#[test]
fn commit_keeps_changes() {
	let ids = objects(1);
	let mut map = IdentityMap::new();
	map.begin();
	let id = map.mint(ids[0]);
	map.commit();
	map.rollback();
	assert_eq!(map.id_of(ids[0]), Some(&id));
}
