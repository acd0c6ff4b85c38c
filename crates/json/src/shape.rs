//! Record <-> JSON value mapping.
//!
//! A record is a bare string (stable reference), a negative integer (root
//! sentinel marker) or `[kind, payload]` / `[kind, payload, stableId]`.
//! Built-in kinds are their tag codes, named kinds are strings. Named payload
//! shapes are told apart by their JSON form.

use knot_codec::{Entry, ErrorDescriptor, Kind, Literal, Payload, Record, Ref, Sentinel, StableId, Tag};
use knot_value::{Element, Pattern, TypedArrayKind};
use serde_json::{Map, Number, Value as Json, json};

use crate::error::FormatError;

/// Integral floats up to this magnitude are written without a fraction.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Names whose payload is always a literal.
const BOXED: [&str; 4] = ["Boolean", "Number", "String", "BigInt"];

pub fn record_to_json(record: &Record) -> Json {
	match record {
		Record::Stable(id) => Json::String(id.as_str().to_owned()),
		Record::Marker(sentinel) => Json::from(sentinel.raw()),
		Record::Entry(entry) => {
			let kind = match &entry.kind {
				Kind::Tag(tag) => Json::from(tag.code()),
				Kind::Named(name) => Json::String(name.to_string()),
			};
			let mut tuple = vec![kind, payload_to_json(&entry.payload)];
			if let Some(id) = &entry.stable_id {
				tuple.push(Json::String(id.as_str().to_owned()));
			}
			Json::Array(tuple)
		}
	}
}

fn payload_to_json(payload: &Payload) -> Json {
	match payload {
		Payload::Literal(literal) => literal_to_json(literal),
		Payload::Refs(refs) => refs.iter().map(|r| Json::from(r.raw())).collect(),
		Payload::Pairs(pairs) => pairs.iter().map(|(k, v)| json!([k.raw(), v.raw()])).collect(),
		Payload::Ref(reference) => Json::from(reference.raw()),
		Payload::Pattern(pattern) => json!({ "source": pattern.source, "flags": pattern.flags }),
		Payload::Descriptor(descriptor) => {
			let mut object = Map::new();
			object.insert("name".into(), Json::String(descriptor.name.clone()));
			object.insert("message".into(), Json::String(descriptor.message.clone()));
			if let Some(stack) = &descriptor.stack {
				object.insert("stack".into(), Json::String(stack.clone()));
			}
			Json::Object(object)
		}
		Payload::Numbers(elements) => elements
			.iter()
			.map(|element| match *element {
				Element::Int(val) => Json::from(val),
				Element::Uint(val) => Json::from(val),
				Element::Float(val) => number_to_json(val),
			})
			.collect(),
	}
}

fn literal_to_json(literal: &Literal) -> Json {
	match literal {
		Literal::Null => Json::Null,
		Literal::Bool(val) => Json::Bool(*val),
		Literal::Number(val) => number_to_json(*val),
		Literal::String(val) => Json::String(val.clone()),
	}
}

/// Non-finite numbers have no JSON form and become `null`.
fn number_to_json(val: f64) -> Json {
	if val.fract() == 0.0 && val.abs() <= MAX_SAFE_INTEGER && !(val == 0.0 && val.is_sign_negative()) {
		return Json::from(val as i64);
	}
	Number::from_f64(val).map_or(Json::Null, Json::Number)
}

pub fn record_from_json(index: usize, json: &Json) -> Result<Record, FormatError> {
	match json {
		Json::String(id) => Ok(Record::Stable(StableId::new(id.as_str()))),
		Json::Number(_) => {
			let sentinel = json
				.as_i64()
				.and_then(Sentinel::from_raw)
				.ok_or_else(|| FormatError::shape(index, format!("{json} is not a sentinel marker")))?;
			Ok(Record::Marker(sentinel))
		}
		Json::Array(tuple) if (2..=3).contains(&tuple.len()) => {
			let kind = kind_from_json(index, &tuple[0])?;
			let payload = payload_from_json(index, &kind, &tuple[1])?;
			let stable_id = match tuple.get(2) {
				None => None,
				Some(Json::String(id)) => Some(StableId::new(id.as_str())),
				Some(other) => return Err(FormatError::shape(index, format!("stable id {other} is not a string"))),
			};
			Ok(Record::Entry(Entry {
				kind,
				payload,
				stable_id,
			}))
		}
		other => Err(FormatError::shape(index, format!("unexpected record {other}"))),
	}
}

fn kind_from_json(index: usize, json: &Json) -> Result<Kind, FormatError> {
	match json {
		Json::String(name) => Ok(Kind::named(name.as_str())),
		_ => json
			.as_i64()
			.and_then(Tag::from_code)
			.map(Kind::Tag)
			.ok_or_else(|| FormatError::shape(index, format!("unknown kind {json}"))),
	}
}

fn payload_from_json(index: usize, kind: &Kind, json: &Json) -> Result<Payload, FormatError> {
	let tag = match kind {
		Kind::Tag(tag) => *tag,
		Kind::Named(name) => return named_payload(index, name, json),
	};
	Ok(match tag {
		Tag::Primitive | Tag::BigInt | Tag::Date => Payload::Literal(literal_from_json(index, json)?),
		Tag::Array | Tag::Set => Payload::Refs(refs(index, json)?),
		Tag::Object | Tag::Map => Payload::Pairs(pairs(index, json)?),
		Tag::RegExp => Payload::Pattern(Pattern::new(field(index, json, "source")?, field(index, json, "flags")?)),
		Tag::Error => Payload::Descriptor(ErrorDescriptor {
			name: field(index, json, "name")?,
			message: field(index, json, "message")?,
			stack: json.get("stack").and_then(Json::as_str).map(str::to_owned),
		}),
	})
}

fn named_payload(index: usize, name: &str, json: &Json) -> Result<Payload, FormatError> {
	if TypedArrayKind::from_name(name).is_some() {
		let Json::Array(items) = json else {
			return Err(FormatError::shape(index, format!("{name} payload is not an array")));
		};
		return items.iter().map(|item| element(index, item)).collect::<Result<_, _>>().map(Payload::Numbers);
	}
	if BOXED.contains(&name) {
		return literal_from_json(index, json).map(Payload::Literal);
	}
	match json {
		Json::Array(_) => pairs(index, json).map(Payload::Pairs),
		Json::Number(_) => reference(index, json).map(Payload::Ref),
		Json::Object(_) => Err(FormatError::shape(index, format!("unexpected object payload for {name}"))),
		_ => literal_from_json(index, json).map(Payload::Literal),
	}
}

fn literal_from_json(index: usize, json: &Json) -> Result<Literal, FormatError> {
	Ok(match json {
		Json::Null => Literal::Null,
		Json::Bool(val) => Literal::Bool(*val),
		Json::Number(val) => Literal::Number(val.as_f64().unwrap_or(f64::NAN)),
		Json::String(val) => Literal::String(val.clone()),
		other => return Err(FormatError::shape(index, format!("{other} is not a literal"))),
	})
}

fn element(index: usize, json: &Json) -> Result<Element, FormatError> {
	match json {
		Json::Null => Ok(Element::Float(f64::NAN)),
		Json::Number(number) => Ok(match (number.as_i64(), number.as_u64()) {
			(Some(val), _) => Element::Int(val),
			(None, Some(val)) => Element::Uint(val),
			_ => Element::Float(number.as_f64().unwrap_or(f64::NAN)),
		}),
		other => Err(FormatError::shape(index, format!("{other} is not a number"))),
	}
}

fn reference(index: usize, json: &Json) -> Result<Ref, FormatError> {
	json.as_i64()
		.and_then(Ref::from_raw)
		.ok_or_else(|| FormatError::shape(index, format!("{json} is not a reference")))
}

fn refs(index: usize, json: &Json) -> Result<Vec<Ref>, FormatError> {
	let Json::Array(items) = json else {
		return Err(FormatError::shape(index, "expected an array of references"));
	};
	items.iter().map(|item| reference(index, item)).collect()
}

fn pairs(index: usize, json: &Json) -> Result<Vec<(Ref, Ref)>, FormatError> {
	let Json::Array(items) = json else {
		return Err(FormatError::shape(index, "expected an array of pairs"));
	};
	items
		.iter()
		.map(|item| match item.as_array().map(Vec::as_slice) {
			Some([key, value]) => Ok((reference(index, key)?, reference(index, value)?)),
			_ => Err(FormatError::shape(index, format!("{item} is not a pair"))),
		})
		.collect()
}

fn field(index: usize, json: &Json, name: &str) -> Result<String, FormatError> {
	json.get(name)
		.and_then(Json::as_str)
		.map(str::to_owned)
		.ok_or_else(|| FormatError::shape(index, format!("missing string field {name:?}")))
}
