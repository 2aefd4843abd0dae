//! Full pipeline: schema-aware documents crossing both wire formats.

use datawire::{
    cbor_from_slice, cbor_to_vec, data_item_factory, json_from_str, json_to_string,
    schema_definition, DecodeStatus, ItemType,
};

const DEVICE_SCHEMA: &str = r#"{
    "title": "device-report",
    "definitions": {
        "percent": {"type": "integer", "minValue": 0, "maxValue": 100}
    },
    "root": {
        "type": "structure",
        "records": {
            "status": {
                "type": "enumerated",
                "index": 0,
                "required": true,
                "values": {"ok": 1, "degraded": 2, "down": 3},
                "default": "ok"
            },
            "load": {"type": "percent", "index": 1, "required": true},
            "fingerprint": {"type": "encoded", "index": 2, "maxLength": 16},
            "temperature": {"type": "number", "index": 3, "precision": "half"}
        }
    }
}"#;

#[test]
fn report_travels_tokenized_over_cbor_and_expands_back() {
    let schema_doc = json_from_str(DEVICE_SCHEMA).unwrap();
    let schema = schema_definition(&schema_doc, None).unwrap();
    assert_eq!(schema.title(), "device-report");

    // A human-readable report arrives as JSON.
    let report = json_from_str(
        r#"{
            "status": "degraded",
            "load": 87,
            "fingerprint": "3q2-7w",
            "temperature": 41.5
        }"#,
    )
    .unwrap();
    assert!(schema.validate(&report, false));

    // Tokenise for the wire: identifiers become tokens, the record becomes
    // a positional array, the fingerprint becomes raw bytes.
    let tokenized = schema.tokenize(&report);
    assert_eq!(tokenized.decode_status(), DecodeStatus::Tokenized);
    let slots = tokenized.as_array().unwrap();
    assert_eq!(slots[0].as_integer(), Some(2));
    assert_eq!(slots[1].as_integer(), Some(87));
    assert_eq!(slots[2].as_bytes(), Some([0xde, 0xad, 0xbe, 0xef].as_slice()));
    assert_eq!(slots[3].item_type(), ItemType::FloatHalf);

    // Across the binary format and back.
    let wire = cbor_to_vec(&tokenized).unwrap();
    let received = cbor_from_slice(&wire).unwrap();
    assert_eq!(received.decode_status(), DecodeStatus::Translatable);
    assert!(schema.validate(&received, true));

    // Expand for the reader.
    let expanded = schema.expand(&received);
    assert_eq!(expanded.decode_status(), DecodeStatus::Expanded);
    let entries = expanded.as_named_map().unwrap();
    assert_eq!(entries["status"].as_text(), Some("degraded"));
    assert_eq!(entries["load"].as_integer(), Some(87));
    assert_eq!(entries["temperature"].as_double(), Some(41.5));
    // Expanded byte strings stay binary in the model; the JSON encoder
    // carries them as Base64-URL text.
    assert_eq!(entries["fingerprint"].item_type(), ItemType::ByteString);

    let text = json_to_string(&expanded, false).unwrap();
    assert!(text.contains("\"fingerprint\":\"3q2-7w\""));
    assert!(text.contains("\"status\":\"degraded\""));
}

#[test]
fn tokenized_report_survives_json_carriage() {
    let schema = schema_definition(&json_from_str(DEVICE_SCHEMA).unwrap(), None).unwrap();

    let report = json_from_str(r#"{"status": "ok", "load": 5}"#).unwrap();
    let tokenized = schema.tokenize(&report);

    // Tokenised documents can also travel as JSON; absent optionals ride
    // along as null and still validate on the far side.
    let text = json_to_string(&tokenized, false).unwrap();
    let received = json_from_str(&text).unwrap();
    assert!(schema.validate(&received, true));

    let expanded = schema.expand(&received);
    let entries = expanded.as_named_map().unwrap();
    assert_eq!(entries["status"].as_text(), Some("ok"));
    assert_eq!(entries["load"].as_integer(), Some(5));
    assert!(!entries.contains_key("fingerprint"));
}

#[test]
fn schema_default_materialises_and_validates() {
    let schema = schema_definition(&json_from_str(DEVICE_SCHEMA).unwrap(), None).unwrap();

    let minimal = schema.create_default(false);
    assert!(schema.validate(&minimal, false));
    let entries = minimal.as_named_map().unwrap();
    assert_eq!(entries["status"].as_text(), Some("ok"));
    assert_eq!(entries["load"].as_integer(), Some(0));
    assert!(!entries.contains_key("temperature"));

    let full = schema.create_default(true);
    assert!(schema.validate(&full, false));
    assert!(full.as_named_map().unwrap().contains_key("temperature"));

    // Defaults tokenize cleanly too.
    let tokenized = schema.tokenize(&full);
    assert!(schema.validate(&tokenized, true));
}

#[test]
fn invalid_reports_are_rejected_with_failed_schema() {
    let schema = schema_definition(&json_from_str(DEVICE_SCHEMA).unwrap(), None).unwrap();

    // Out-of-range load.
    let report = json_from_str(r#"{"status": "ok", "load": 150}"#).unwrap();
    assert!(!schema.validate(&report, false));
    let failed = schema.tokenize(&report);
    assert_eq!(failed.decode_status(), DecodeStatus::FailedSchema);
    assert!(failed.decode_status().is_failure());
    assert_eq!(failed.as_integer(), None);

    // Required record missing.
    let report = json_from_str(r#"{"status": "ok"}"#).unwrap();
    assert!(!schema.validate(&report, false));
}

#[test]
fn factory_documents_mix_with_decoded_ones() {
    let schema = schema_definition(&json_from_str(DEVICE_SCHEMA).unwrap(), None).unwrap();
    let factory = data_item_factory();

    let mut report = factory.named_map(&[], false);
    report
        .named_map_insert("status".into(), factory.text_string("down", &[]))
        .unwrap();
    report
        .named_map_insert("load".into(), factory.integer(100, &[]))
        .unwrap();
    report
        .named_map_insert(
            "fingerprint".into(),
            factory.byte_string(vec![1, 2, 3], &[]),
        )
        .unwrap();
    assert!(schema.validate(&report, false));

    let tokenized = schema.tokenize(&report);
    let slots = tokenized.as_array().unwrap();
    assert_eq!(slots[0].as_integer(), Some(3));
    assert_eq!(slots[2].as_bytes(), Some([1u8, 2, 3].as_slice()));
}
