use std::collections::HashSet;

use super::*;

#[test]
fn same_value_zero_numbers() {
	assert_eq!(Value::Number(f64::NAN), Value::Number(f64::NAN));
	assert_eq!(Value::Number(0.0), Value::Number(-0.0));
	assert_ne!(Value::Number(1.0), Value::Number(2.0));
	assert_ne!(Value::Number(1.0), Value::string("1"));
}

#[test]
fn hashing_agrees_with_equality() {
	let mut seen = HashSet::new();
	assert!(seen.insert(Value::Number(f64::NAN)));
	assert!(!seen.insert(Value::Number(f64::NAN)));
	assert!(seen.insert(Value::Number(0.0)));
	assert!(!seen.insert(Value::Number(-0.0)));
	assert!(seen.insert(Value::string("a")));
	assert!(!seen.insert(Value::string("a")));
}

#[test]
fn opaque_values_compare_by_allocation() {
	let sym = Value::symbol("tag");
	assert_eq!(sym, sym.clone());
	assert_ne!(sym, Value::symbol("tag"));
	assert!(sym.is_non_data());
	assert!(Value::function("f").is_non_data());
	assert!(!Value::Null.is_non_data());
}

#[test]
fn property_keys() {
	assert_eq!(Value::Number(1.0).to_property_key(), "1");
	assert_eq!(Value::Number(1.5).to_property_key(), "1.5");
	assert_eq!(Value::Number(-0.0).to_property_key(), "0");
	assert_eq!(Value::Number(f64::INFINITY).to_property_key(), "Infinity");
	assert_eq!(Value::Bool(true).to_property_key(), "true");
	assert_eq!(Value::Undefined.to_property_key(), "undefined");
	assert_eq!(Value::bigint(12).to_property_key(), "12");
	assert_eq!(Value::string("k").to_property_key(), "k");
}

#[test]
fn type_names() {
	assert_eq!(Value::Undefined.get_type().to_string(), "undefined");
	assert_eq!(Value::function("f").get_type(), ValueType::Function);
	assert_eq!(Value::symbol("s").get_type().as_str(), "symbol");
}
