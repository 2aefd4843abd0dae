//! Structured data in two interchangeable wire formats.
//!
//! One value model ([`DataItem`]), two codecs (binary CBOR and text JSON)
//! and a schema engine that validates documents, materialises defaults and
//! transforms between the compact tokenised shape and the readable expanded
//! shape. The service surface mirrors the three subsystems:
//!
//! - [`data_item_factory`] constructs items with the variant invariants
//!   enforced;
//! - [`data_streamer`] encodes and decodes items over caller-owned streams;
//! - [`schema_definition`] parses a schema document (itself a data item)
//!   into a reusable [`SchemaDefinition`].
//!
//! ```
//! use datawire::{data_item_factory, data_streamer, schema_definition};
//!
//! let factory = data_item_factory();
//! let streamer = data_streamer();
//!
//! let mut doc = factory.named_map(&[], false);
//! doc.named_map_insert("answer".into(), factory.integer(42, &[])).unwrap();
//!
//! let mut cbor = Vec::new();
//! streamer.encode_cbor(&doc, &mut cbor).unwrap();
//! let back = streamer.decode_cbor(&mut cbor.as_slice()).unwrap();
//! assert_eq!(back.as_named_map().unwrap()["answer"].as_integer(), Some(42));
//! ```

pub use datawire_base64::{from_base64_url, to_base64_url, Base64Error};
pub use datawire_codec::{
    cbor_from_slice, cbor_to_vec, json_from_str, json_to_string, DataStreamer,
};
pub use datawire_core::{
    DataItem, DataItemFactory, DecodeStatus, ItemType, MutationError, SimpleValueError,
    StatusError, Tags, Value,
};
pub use datawire_schema::{
    schema_definition, InvalidSchema, SchemaDataType, SchemaDefinition, SchemaNode, TracingSink,
    WarningSink,
};

/// The data-item construction surface.
pub fn data_item_factory() -> DataItemFactory {
    DataItemFactory::new()
}

/// The stream codec surface.
pub fn data_streamer() -> DataStreamer {
    DataStreamer::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_surface_round_trips_across_formats() {
        let factory = data_item_factory();
        let streamer = data_streamer();

        let mut doc = factory.named_map(&[], false);
        doc.named_map_insert("name".into(), factory.text_string("datawire", &[]))
            .unwrap();
        doc.named_map_insert("version".into(), factory.integer(1, &[]))
            .unwrap();

        let mut cbor = Vec::new();
        streamer.encode_cbor(&doc, &mut cbor).unwrap();
        let from_cbor = streamer.decode_cbor(&mut cbor.as_slice()).unwrap();
        assert_eq!(from_cbor, doc);

        let mut json = Vec::new();
        streamer.encode_json(&from_cbor, &mut json, false).unwrap();
        let from_json = streamer.decode_json(&mut json.as_slice()).unwrap();
        assert_eq!(from_json, doc);
    }

    #[test]
    fn schema_surface_is_reachable() {
        let schema = json_from_str(
            r#"{
                "title": "smoke",
                "root": {"type": "integer", "default": 3}
            }"#,
        )
        .unwrap();
        let definition = schema_definition(&schema, None).unwrap();
        assert_eq!(definition.title(), "smoke");
        assert_eq!(definition.create_default(true).as_integer(), Some(3));
    }
}
