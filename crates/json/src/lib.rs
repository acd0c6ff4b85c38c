//! JSON text format for knot record sequences.
//!
//! [`stringify`] serializes a value under the plain-data convention in lossy
//! mode and writes the records as compact JSON; [`parse`] reads them back.
//! Shared references and cycles survive the trip, unlike plain JSON.

mod error;
mod shape;

use knot_codec::{DeserializeOptions, Record, SerializeOptions};
use knot_value::{Heap, Value};
use serde_json::Value as Json;

pub use error::{Error, FormatError, Result};

pub fn to_json(records: &[Record]) -> Json {
	records.iter().map(shape::record_to_json).collect()
}

pub fn from_json(json: &Json) -> std::result::Result<Vec<Record>, FormatError> {
	let Json::Array(items) = json else {
		return Err(FormatError::Shape {
			index: 0,
			reason: "record sequence is not an array".into(),
		});
	};
	items
		.iter()
		.enumerate()
		.map(|(index, item)| shape::record_from_json(index, item))
		.collect()
}

pub fn to_string(records: &[Record]) -> String {
	to_json(records).to_string()
}

pub fn from_str(text: &str) -> std::result::Result<Vec<Record>, FormatError> {
	let json: Json = serde_json::from_str(text)?;
	from_json(&json)
}

/// Serializes `value` with [`SerializeOptions::json`] into JSON text.
pub fn stringify(heap: &mut Heap, value: &Value) -> Result<String> {
	stringify_with(heap, value, SerializeOptions::json())
}

pub fn stringify_with(heap: &mut Heap, value: &Value, options: SerializeOptions<'_>) -> Result<String> {
	let records = knot_codec::serialize(heap, value, options)?;
	let text = to_string(&records);
	tracing::trace!(records = records.len(), bytes = text.len(), "json.stringify");
	Ok(text)
}

/// Parses JSON text produced by [`stringify`] into `heap`.
pub fn parse(heap: &mut Heap, text: &str) -> Result<Value> {
	parse_with(heap, text, DeserializeOptions::default())
}

pub fn parse_with(heap: &mut Heap, text: &str, options: DeserializeOptions<'_>) -> Result<Value> {
	let records = from_str(text)?;
	tracing::trace!(records = records.len(), bytes = text.len(), "json.parse");
	Ok(knot_codec::deserialize(heap, &records, options)?)
}
