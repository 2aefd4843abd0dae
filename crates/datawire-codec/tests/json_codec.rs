//! JSON codec round-trips and cross-checks against serde_json.

use datawire_codec::{json_from_str, json_to_string};
use datawire_core::{DataItem, DataItemFactory, DecodeStatus, ItemType};

fn roundtrip(item: &DataItem) -> DataItem {
    let text = json_to_string(item, false).expect("encode");
    let back = json_from_str(&text).expect("decode");
    assert!(
        !back.decode_status().is_failure(),
        "decode failed for {text:?}"
    );
    back
}

#[test]
fn json_expressible_scalars_roundtrip() {
    let factory = DataItemFactory::new();
    for item in [
        factory.integer(0, &[]),
        factory.integer(-42, &[]),
        factory.integer(i64::MAX, &[]),
        factory.boolean(true, &[]),
        factory.boolean(false, &[]),
        factory.text_string("with \"quotes\" and \\ slashes", &[]),
        factory.text_string("tabs\tand\nnewlines", &[]),
    ] {
        assert_eq!(roundtrip(&item), item);
    }
}

#[test]
fn floats_parse_back_as_double() {
    let factory = DataItemFactory::new();
    // Half and single precision encode losslessly but return as double.
    let back = roundtrip(&factory.float_half(1.5, &[]));
    assert_eq!(back.item_type(), ItemType::FloatDouble);
    assert_eq!(back.as_double(), Some(1.5));

    let back = roundtrip(&factory.float_standard(0.25, &[]));
    assert_eq!(back.as_double(), Some(0.25));

    let back = roundtrip(&factory.float_double(3.14159, &[]));
    assert_eq!(back.as_double(), Some(3.14159));

    // Integral doubles keep their decimal point.
    let back = roundtrip(&factory.float_double(100.0, &[]));
    assert_eq!(back.item_type(), ItemType::FloatDouble);
    assert_eq!(back.as_double(), Some(100.0));
}

#[test]
fn null_carries_nonfinite_floats() {
    let factory = DataItemFactory::new();
    assert_eq!(
        json_to_string(&factory.float_double(f64::INFINITY, &[]), false).unwrap(),
        "null"
    );
    assert_eq!(
        json_to_string(&factory.float_half(f32::NAN, &[]), false).unwrap(),
        "null"
    );
}

#[test]
fn byte_strings_decode_as_text_without_schema() {
    let factory = DataItemFactory::new();
    let item = factory.byte_string(b"datawire".to_vec(), &[]);
    let text = json_to_string(&item, false).unwrap();
    assert_eq!(text, "\"ZGF0YXdpcmU\"");
    // Raw JSON decode has no schema knowledge; the carriage stays text.
    let back = json_from_str(&text).unwrap();
    assert_eq!(back.item_type(), ItemType::TextString);
    assert_eq!(back.as_text(), Some("ZGF0YXdpcmU"));
}

#[test]
fn containers_roundtrip() {
    let factory = DataItemFactory::new();
    let mut array = factory.array(&[], false);
    array.array_push(factory.integer(1, &[])).unwrap();
    array.array_push(factory.null(&[])).unwrap();
    let mut map = factory.named_map(&[], false);
    map.named_map_insert("list".into(), array).unwrap();
    map.named_map_insert("flag".into(), factory.boolean(false, &[]))
        .unwrap();
    let back = roundtrip(&map);
    let entries = back.as_named_map().unwrap();
    assert_eq!(entries["flag"].as_boolean(), Some(false));
    assert_eq!(entries["list"].as_array().unwrap().len(), 2);
}

#[test]
fn empty_object_decodes_as_empty_map() {
    let back = json_from_str("{}").unwrap();
    assert_eq!(back.item_type(), ItemType::EmptyMap);
    assert_eq!(back.decode_status(), DecodeStatus::Translatable);
}

#[test]
fn pretty_output_is_reparseable_and_tab_indented() {
    let factory = DataItemFactory::new();
    let mut inner = factory.named_map(&[], false);
    inner
        .named_map_insert("x".into(), factory.float_double(0.5, &[]))
        .unwrap();
    let mut outer = factory.named_map(&[], false);
    outer.named_map_insert("inner".into(), inner).unwrap();

    let pretty = json_to_string(&outer, true).unwrap();
    assert!(pretty.contains("\n\t\"inner\" : {\n\t\t\"x\" : 0.5\n\t}"));
    assert!(pretty.ends_with('\n'));
    let back = json_from_str(&pretty).unwrap();
    assert_eq!(back, json_from_str(&json_to_string(&outer, false).unwrap()).unwrap());
}

#[test]
fn serde_json_parses_our_compact_output() {
    let factory = DataItemFactory::new();
    let mut map = factory.named_map(&[], false);
    map.named_map_insert("n".into(), factory.integer(7, &[]))
        .unwrap();
    map.named_map_insert("f".into(), factory.float_double(2.5, &[]))
        .unwrap();
    map.named_map_insert("s".into(), factory.text_string("a\nb", &[]))
        .unwrap();
    let text = json_to_string(&map, false).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).expect("valid JSON");
    assert_eq!(value["n"], serde_json::json!(7));
    assert_eq!(value["f"], serde_json::json!(2.5));
    assert_eq!(value["s"], serde_json::json!("a\nb"));
}

#[test]
fn serde_json_output_decodes_on_our_side() {
    let value = serde_json::json!({
        "k": ["x", 1, -2, true, null, {"nested": "v"}]
    });
    let text = serde_json::to_string_pretty(&value).unwrap();
    let item = json_from_str(&text).unwrap();
    let list = item.as_named_map().unwrap()["k"].as_array().unwrap();
    assert_eq!(list[0].as_text(), Some("x"));
    assert_eq!(list[1].as_integer(), Some(1));
    assert_eq!(list[2].as_integer(), Some(-2));
    assert_eq!(list[3].as_boolean(), Some(true));
    assert_eq!(list[4].item_type(), ItemType::Null);
    assert_eq!(
        list[5].as_named_map().unwrap()["nested"].as_text(),
        Some("v")
    );
}

#[test]
fn cross_format_translation() {
    // CBOR -> item -> JSON -> item -> CBOR for a JSON-expressible document.
    let factory = DataItemFactory::new();
    let mut doc = factory.named_map(&[], false);
    doc.named_map_insert("id".into(), factory.integer(17, &[]))
        .unwrap();
    doc.named_map_insert("name".into(), factory.text_string("probe", &[]))
        .unwrap();

    let cbor = datawire_codec::cbor_to_vec(&doc).unwrap();
    let from_cbor = datawire_codec::cbor_from_slice(&cbor).unwrap();
    let json = json_to_string(&from_cbor, false).unwrap();
    let from_json = json_from_str(&json).unwrap();
    let cbor_again = datawire_codec::cbor_to_vec(&from_json).unwrap();
    assert_eq!(cbor, cbor_again);
}
