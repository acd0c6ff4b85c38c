use knot_value::{Element, Primitive};
use pretty_assertions::assert_eq;
use rstest::rstest;

use super::*;
use crate::collab::NoAmbientTypes;
use crate::record::{ErrorDescriptor, Sentinel};
use crate::registry::{ClassEntry, HookPair};

fn record(kind: impl Into<Kind>, payload: Payload) -> Record {
	Entry::new(kind, payload).into()
}

fn with_id(kind: impl Into<Kind>, payload: Payload, id: &str) -> Record {
	Record::Entry(Entry {
		kind: kind.into(),
		payload,
		stable_id: Some(id.into()),
	})
}

fn string(val: &str) -> Record {
	record(Tag::Primitive, Payload::Literal(Literal::String(val.into())))
}

fn number(val: f64) -> Record {
	record(Tag::Primitive, Payload::Literal(Literal::Number(val)))
}

fn idx(index: usize) -> Ref {
	Ref::Index(index)
}

#[test]
fn marker_root_and_sentinel_refs() {
	let mut heap = Heap::new();
	let root = deserialize(&mut heap, &[Record::Marker(Sentinel::True)], DeserializeOptions::new()).unwrap();
	assert_eq!(root, Value::Bool(true));

	let records = [record(
		Tag::Array,
		Payload::Refs(vec![Sentinel::Void.into(), Sentinel::EmptyString.into()]),
	)];
	let root = deserialize(&mut heap, &records, DeserializeOptions::new()).unwrap();
	assert_eq!(
		heap.node_of(&root).and_then(Node::as_array),
		Some(&vec![Value::Undefined, Value::from("")])
	);
}

#[test]
fn cycle_through_container() {
	let mut heap = Heap::new();
	let records = [record(Tag::Object, Payload::Pairs(vec![(idx(1), idx(0))])), string("me")];
	let root = deserialize(&mut heap, &records, DeserializeOptions::new()).unwrap();
	assert_eq!(heap.property(&root, "me"), Some(&root));
}

#[test]
fn map_and_set_keep_identity_keys() {
	let mut heap = Heap::new();
	let records = [
		record(Tag::Map, Payload::Pairs(vec![(idx(1), idx(2))])),
		record(Tag::Set, Payload::Refs(vec![idx(2), idx(2)])),
		number(7.0),
	];
	let root = deserialize(&mut heap, &records, DeserializeOptions::new()).unwrap();
	let map = heap.node_of(&root).and_then(Node::as_map).unwrap();
	let (key, value) = map.first().unwrap();
	assert_eq!(value, &Value::Number(7.0));
	assert_eq!(heap.node_of(key).and_then(Node::as_set).map(|set| set.len()), Some(1));
}

#[test]
fn nominal_children_complete_before_construction() {
	let mut registry = Registry::new();
	registry.register_class(
		"Sum",
		ClassEntry::new(|heap, seed| {
			let items = heap.property(&seed, "items").cloned().unwrap_or(Value::Null);
			let total: f64 = heap
				.node_of(&items)
				.and_then(Node::as_array)
				.map(|items| items.iter().filter_map(Value::as_number).sum())
				.unwrap_or_default();
			Ok(Value::Number(total))
		}),
	);
	let records = [
		record(Kind::named("Sum"), Payload::Pairs(vec![(idx(1), idx(2))])),
		string("items"),
		record(Tag::Array, Payload::Refs(vec![idx(3), idx(4)])),
		number(2.0),
		number(5.0),
	];
	let mut heap = Heap::new();
	let root = deserialize(&mut heap, &records, DeserializeOptions::new().with_registry(&registry)).unwrap();
	assert_eq!(root, Value::Number(7.0));
}

#[test]
fn cycle_through_nominal_is_unsupported() {
	let mut registry = Registry::new();
	registry.register_instance_class("Node");
	let records = [
		record(Kind::named("Node"), Payload::Pairs(vec![(idx(1), idx(0))])),
		string("next"),
	];
	let mut heap = Heap::new();
	let err = deserialize(&mut heap, &records, DeserializeOptions::new().with_registry(&registry)).unwrap_err();
	assert_eq!(
		err,
		CodecError::Unsupported {
			index: 0,
			name: "Node".into()
		}
	);
}

#[test]
fn decode_hook_wins_over_ambient_type() {
	let mut registry = Registry::new();
	registry.register_hooks(
		"Number",
		HookPair::new(|_, id| Ok(Value::Object(id)), |_, seed| Ok(Value::string(format!("hooked {seed:?}")))),
	);
	let records = [record(Kind::named("Number"), Payload::Literal(Literal::Number(1.0)))];

	let mut heap = Heap::new();
	let root = deserialize(&mut heap, &records, DeserializeOptions::new().with_registry(&registry)).unwrap();
	assert_eq!(root, Value::from("hooked Number(1.0)"));

	let root = deserialize(&mut heap, &records, DeserializeOptions::new()).unwrap();
	assert!(matches!(heap.node_of(&root), Some(Node::Boxed(Primitive::Number(n))) if *n == 1.0));
}

#[test]
fn wrapped_payload_uses_factory_under_plain_convention() {
	let mut registry = Registry::new();
	registry.register_class(
		"Celsius",
		ClassEntry::new(|_, value| Ok(value)).with_factory(|_, value| {
			let degrees = value.as_number().unwrap_or_default();
			Ok(Value::Number(degrees * 10.0))
		}),
	);
	let records = [record(Kind::named("Celsius"), Payload::Ref(idx(1))), number(2.0)];
	let mut heap = Heap::new();
	let structured = deserialize(&mut heap, &records, DeserializeOptions::new().with_registry(&registry)).unwrap();
	assert_eq!(structured, Value::Number(2.0));
	let plain = deserialize(&mut heap, &records, DeserializeOptions::new().plain().with_registry(&registry)).unwrap();
	assert_eq!(plain, Value::Number(20.0));
}

#[test]
fn unknown_type_is_rejected_unless_preserved() {
	let records = [
		record(Kind::named("Mystery"), Payload::Pairs(vec![(idx(1), idx(2))])),
		string("k"),
		number(1.0),
	];
	let mut heap = Heap::new();
	let err = deserialize(&mut heap, &records, DeserializeOptions::new()).unwrap_err();
	assert_eq!(err, CodecError::UnknownType { name: "Mystery".into() });

	let root = deserialize(&mut heap, &records, DeserializeOptions::new().preserve_unknown()).unwrap();
	let instance = heap.node_of(&root).and_then(Node::as_instance).unwrap();
	assert_eq!(&*instance.class, "Mystery");
	assert_eq!(instance.fields.get("k"), Some(&Value::Number(1.0)));

	let literal = [record(Kind::named("Mystery"), Payload::Literal(Literal::Null))];
	let err = deserialize(&mut heap, &literal, DeserializeOptions::new().preserve_unknown()).unwrap_err();
	assert!(matches!(err, CodecError::UnknownType { .. }));
}

#[test]
fn ambient_lookup_can_be_disabled() {
	let records = [record(Kind::named("Boolean"), Payload::Literal(Literal::Bool(true)))];
	let mut heap = Heap::new();
	let err = deserialize(&mut heap, &records, DeserializeOptions::new().with_type_lookup(&NoAmbientTypes)).unwrap_err();
	assert_eq!(err, CodecError::UnknownType { name: "Boolean".into() });
}

#[test]
fn leaf_kinds() {
	let records = [
		record(Tag::Array, Payload::Refs(vec![idx(1), idx(2), idx(3), idx(4), idx(5)])),
		record(Tag::Date, Payload::Literal(Literal::String("2024-01-02T03:04:05.678Z".into()))),
		record(Tag::RegExp, Payload::Pattern(knot_value::Pattern::new("x", "g"))),
		record(
			Tag::Error,
			Payload::Descriptor(ErrorDescriptor {
				name: "RangeError".into(),
				message: "m".into(),
				stack: None,
			}),
		),
		record(Kind::named("Int8Array"), Payload::Numbers(vec![Element::Int(-1), Element::Int(300)])),
		record(Tag::BigInt, Payload::Literal(Literal::String("123456789012345678901234567890".into()))),
	];
	let mut heap = Heap::new();
	let root = deserialize(&mut heap, &records, DeserializeOptions::new()).unwrap();
	let items = heap.node_of(&root).and_then(Node::as_array).unwrap().clone();

	let Some(Node::Date(at)) = heap.node_of(&items[0]) else {
		panic!("date");
	};
	assert_eq!(at.timestamp_millis(), 1_704_164_645_678);
	assert!(matches!(heap.node_of(&items[1]), Some(Node::RegExp(p)) if p.flags == "g"));
	assert!(matches!(heap.node_of(&items[2]), Some(Node::Error(e)) if e.name == "RangeError"));
	assert!(matches!(heap.node_of(&items[3]), Some(Node::TypedArray(TypedArray::Int8(v))) if *v == vec![-1, 44]));
	assert_eq!(items[4], Value::BigInt("123456789012345678901234567890".parse().unwrap()));
}

#[rstest]
#[case::empty(vec![], 0)]
#[case::dangling(vec![record(Tag::Array, Payload::Refs(vec![Ref::Index(9)]))], 9)]
#[case::shape(vec![record(Tag::Array, Payload::Pairs(vec![]))], 0)]
#[case::date(vec![record(Tag::Date, Payload::Literal(Literal::String("yesterday".into())))], 0)]
#[case::marker(vec![record(Tag::Array, Payload::Refs(vec![Ref::Index(1)])), Record::Marker(Sentinel::Null)], 1)]
#[case::typed(vec![record(Kind::named("Uint8Array"), Payload::Refs(vec![]))], 0)]
#[case::fractional_bigint(vec![record(Tag::BigInt, Payload::Literal(Literal::Number(1.5)))], 0)]
#[case::infinite_bigint(vec![record(Tag::BigInt, Payload::Literal(Literal::Number(f64::INFINITY)))], 0)]
fn malformed_sequences(#[case] records: Vec<Record>, #[case] at: usize) {
	let mut heap = Heap::new();
	let err = deserialize(&mut heap, &records, DeserializeOptions::new()).unwrap_err();
	assert!(matches!(err, CodecError::Malformed { index, .. } if index == at), "{err}");
}

#[test]
fn stable_reference_requires_binding() {
	let records = [Record::Stable("@0".into())];
	let mut heap = Heap::new();
	let err = deserialize(&mut heap, &records, DeserializeOptions::new()).unwrap_err();
	assert_eq!(err, CodecError::Lookup { id: "@0".into() });

	let mut identity = IdentityMap::new();
	let err = deserialize(&mut heap, &records, DeserializeOptions::new().with_identity(&mut identity)).unwrap_err();
	assert!(matches!(err, CodecError::Lookup { .. }));

	let existing = heap.array([]);
	identity.bind(existing.as_object().unwrap(), "@0".into()).unwrap();
	let root = deserialize(&mut heap, &records, DeserializeOptions::new().with_identity(&mut identity)).unwrap();
	assert_eq!(root, existing);
}

#[test]
fn bound_identifier_conflicts_outside_update_mode() {
	let records = [with_id(Tag::Array, Payload::Refs(vec![]), "@0")];
	let mut heap = Heap::new();
	let mut identity = IdentityMap::new();
	deserialize(&mut heap, &records, DeserializeOptions::new().with_identity(&mut identity)).unwrap();
	let err = deserialize(&mut heap, &records, DeserializeOptions::new().with_identity(&mut identity)).unwrap_err();
	assert_eq!(err, CodecError::Conflict { id: "@0".into() });
}

#[test]
fn update_mode_reuses_containers() {
	let first = [
		with_id(Tag::Object, Payload::Pairs(vec![(idx(1), idx(2))]), "@0"),
		string("a"),
		with_id(Tag::Array, Payload::Refs(vec![idx(3)]), "@1"),
		number(1.0),
	];
	let mut heap = Heap::new();
	let mut identity = IdentityMap::new();
	let root = deserialize(&mut heap, &first, DeserializeOptions::new().with_identity(&mut identity)).unwrap();
	let arr = heap.property(&root, "a").cloned().unwrap();

	let patch = [
		with_id(Tag::Object, Payload::Pairs(vec![(idx(1), idx(2)), (idx(3), idx(4))]), "@0"),
		string("a"),
		with_id(Tag::Array, Payload::Refs(vec![idx(4), idx(4)]), "@1"),
		string("b"),
		number(2.0),
	];
	let patched = deserialize(&mut heap, &patch, DeserializeOptions::new().update().with_identity(&mut identity)).unwrap();
	assert_eq!(patched, root);
	assert_eq!(heap.property(&root, "a"), Some(&arr));
	assert_eq!(heap.property(&root, "b"), Some(&Value::Number(2.0)));
	assert_eq!(heap.node_of(&arr).and_then(Node::as_array).map(Vec::len), Some(2));

	let len = heap.len();
	deserialize(&mut heap, &patch, DeserializeOptions::new().update().with_identity(&mut identity)).unwrap();
	assert_eq!(heap.len(), len);
	assert_eq!(heap.node_of(&arr).and_then(Node::as_array).map(Vec::len), Some(2));
}

#[test]
fn update_mode_rejects_kind_change() {
	let mut heap = Heap::new();
	let mut identity = IdentityMap::new();
	let first = [with_id(Tag::Array, Payload::Refs(vec![]), "@0")];
	deserialize(&mut heap, &first, DeserializeOptions::new().with_identity(&mut identity)).unwrap();
	let second = [with_id(Tag::Map, Payload::Pairs(vec![]), "@0")];
	let err = deserialize(&mut heap, &second, DeserializeOptions::new().update().with_identity(&mut identity)).unwrap_err();
	assert_eq!(err, CodecError::Conflict { id: "@0".into() });
}

#[test]
fn depth_and_record_limits() {
	let records: Vec<Record> = (0..6)
		.map(|i| record(Tag::Array, Payload::Refs(if i < 5 { vec![idx(i + 1)] } else { vec![] })))
		.collect();
	let mut heap = Heap::new();
	let limits = Limits {
		max_depth: 3,
		..Limits::default()
	};
	let err = deserialize(&mut heap, &records, DeserializeOptions::new().with_limits(limits)).unwrap_err();
	assert_eq!(err, CodecError::DepthExceeded { limit: 3 });

	let limits = Limits {
		max_records: 5,
		..Limits::default()
	};
	let err = deserialize(&mut heap, &records, DeserializeOptions::new().with_limits(limits)).unwrap_err();
	assert_eq!(err, CodecError::TooManyRecords { limit: 5 });
}

fn apply_update(heap: &mut Heap, identity: &mut IdentityMap, records: &[Record]) -> Result<Value, CodecError> {
	deserialize(heap, records, DeserializeOptions::new().update().with_identity(identity))
}

#[test]
fn update_mode_overwrites_leaf_objects_in_place() {
	let records = [
		with_id(Tag::Array, Payload::Refs(vec![idx(1), idx(4)]), "@0"),
		with_id(Tag::Set, Payload::Refs(vec![idx(2), idx(3)]), "@1"),
		with_id(Tag::Date, Payload::Literal(Literal::String("2024-01-02T03:04:05.678Z".into())), "@2"),
		with_id(Tag::RegExp, Payload::Pattern(knot_value::Pattern::new("a", "g")), "@3"),
		with_id(Tag::Map, Payload::Pairs(vec![(idx(2), idx(5))]), "@4"),
		number(1.0),
	];
	let mut fresh = Heap::new();
	let expected = deserialize(&mut fresh, &records, DeserializeOptions::new()).unwrap();

	let mut heap = Heap::new();
	let mut identity = IdentityMap::new();
	let once = apply_update(&mut heap, &mut identity, &records).unwrap();
	let len = heap.len();
	let twice = apply_update(&mut heap, &mut identity, &records).unwrap();

	assert_eq!(once, twice);
	assert_eq!(heap.len(), len);
	let set = heap.element(&twice, 0).unwrap();
	assert_eq!(heap.node_of(set).and_then(Node::as_set).map(|set| set.len()), Some(2));
	let map = heap.element(&twice, 1).unwrap();
	assert_eq!(heap.node_of(map).and_then(Node::as_map).map(|map| map.len()), Some(1));
	assert!(fresh.structurally_equal(&expected, &heap, &twice));
}

#[test]
fn update_mode_moves_constructed_values_into_bound_objects() {
	let records = [
		with_id(Tag::Set, Payload::Refs(vec![idx(1)]), "@0"),
		with_id(Kind::named("Number"), Payload::Literal(Literal::Number(4.0)), "@1"),
	];
	let mut heap = Heap::new();
	let mut identity = IdentityMap::new();
	let root = apply_update(&mut heap, &mut identity, &records).unwrap();
	let boxed = heap.node_of(&root).and_then(Node::as_set).and_then(|set| set.first().cloned()).unwrap();
	apply_update(&mut heap, &mut identity, &records).unwrap();

	let members: Vec<Value> = heap.node_of(&root).and_then(Node::as_set).unwrap().iter().cloned().collect();
	assert_eq!(members, vec![boxed.clone()]);
	assert_eq!(identity.object_of(&"@1".into()), boxed.as_object());
	assert!(matches!(heap.node_of(&boxed), Some(Node::Boxed(Primitive::Number(n))) if *n == 4.0));
}

#[test]
fn update_mode_rejects_leaf_kind_change() {
	let mut heap = Heap::new();
	let mut identity = IdentityMap::new();
	let date = [with_id(Tag::Date, Payload::Literal(Literal::String("2024-01-02T03:04:05Z".into())), "@0")];
	apply_update(&mut heap, &mut identity, &date).unwrap();
	let regexp = [with_id(Tag::RegExp, Payload::Pattern(knot_value::Pattern::new("a", "")), "@0")];
	let err = apply_update(&mut heap, &mut identity, &regexp).unwrap_err();
	assert_eq!(err, CodecError::Conflict { id: "@0".into() });
}

#[test]
fn failed_update_restores_containers_and_bindings() {
	let first = [
		with_id(Tag::Object, Payload::Pairs(vec![(idx(1), idx(2))]), "@0"),
		string("a"),
		with_id(Tag::Array, Payload::Refs(vec![idx(3)]), "@1"),
		number(1.0),
	];
	let mut heap = Heap::new();
	let mut identity = IdentityMap::new();
	let root = apply_update(&mut heap, &mut identity, &first).unwrap();

	let broken = [
		with_id(Tag::Object, Payload::Pairs(vec![(idx(1), idx(2)), (idx(4), idx(5)), (idx(6), idx(7))]), "@0"),
		string("a"),
		with_id(Tag::Array, Payload::Refs(vec![idx(3)]), "@1"),
		string("x"),
		string("c"),
		with_id(Tag::Object, Payload::Pairs(vec![]), "@5"),
		string("b"),
		Record::Stable("@9".into()),
	];
	let err = apply_update(&mut heap, &mut identity, &broken).unwrap_err();
	assert_eq!(err, CodecError::Lookup { id: "@9".into() });

	assert_eq!(identity.len(), 2);
	assert_eq!(identity.object_of(&"@5".into()), None);
	let arr = heap.property(&root, "a").unwrap();
	assert_eq!(heap.node_of(arr).and_then(Node::as_array), Some(&vec![Value::Number(1.0)]));
	assert_eq!(heap.property(&root, "c"), None);
	let keys: Vec<&String> = heap.node_of(&root).and_then(Node::as_object).unwrap().keys().collect();
	assert_eq!(keys, ["a"]);
}

#[test]
fn numeric_bigint_beyond_i64_is_exact() {
	let records = [record(Tag::BigInt, Payload::Literal(Literal::Number(2f64.powi(70))))];
	let mut heap = Heap::new();
	let root = deserialize(&mut heap, &records, DeserializeOptions::new()).unwrap();
	assert_eq!(root, Value::BigInt("1180591620717411303424".parse().unwrap()));
}
