use pretty_assertions::assert_eq;

use super::*;

#[test]
fn empty_config_is_default() {
	let config = CodecConfig::from_toml("").unwrap();
	assert_eq!(config, CodecConfig::default());
	assert_eq!(config.limits.max_depth, Limits::DEFAULT_MAX_DEPTH);
}

#[test]
fn parses_every_field() {
	let config = CodecConfig::from_toml(
		r#"
mode = "lossy"
convention = "plain"
unknown_types = "preserve"
update = true

[limits]
max_depth = 64
"#,
	)
	.unwrap();
	assert_eq!(config.mode, Mode::Lossy);
	assert_eq!(config.convention, Convention::Plain);
	assert_eq!(config.unknown_types, UnknownTypes::Preserve);
	assert!(config.update);
	assert_eq!(config.limits.max_depth, 64);
	assert_eq!(config.limits.max_records, Limits::DEFAULT_MAX_RECORDS);

	let ser = config.serialize_options();
	assert_eq!(ser.mode, Mode::Lossy);
	assert_eq!(ser.limits.max_depth, 64);
	let de = config.deserialize_options();
	assert!(de.update);
	assert_eq!(de.unknown_types, UnknownTypes::Preserve);
}

#[test]
fn rejects_unknown_fields_and_values() {
	assert!(matches!(CodecConfig::from_toml("strict = true"), Err(ConfigError::Toml(_))));
	assert!(matches!(CodecConfig::from_toml(r#"mode = "loose""#), Err(ConfigError::Toml(_))));
	assert!(matches!(
		CodecConfig::from_toml("[limits]\nmax_records = 0"),
		Err(ConfigError::Invalid(_))
	));
}

#[test]
fn load_reads_file() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("codec.toml");
	std::fs::write(&path, "convention = \"plain\"\n").unwrap();
	assert_eq!(CodecConfig::load(&path).unwrap().convention, Convention::Plain);

	let missing = dir.path().join("missing.toml");
	assert!(matches!(CodecConfig::load(&missing), Err(ConfigError::Io { .. })));
}
