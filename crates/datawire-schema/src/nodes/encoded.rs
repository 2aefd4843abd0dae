//! Byte string ("encoded") schema node.
//!
//! Byte payloads may arrive in binary form or as Base64-URL text (the JSON
//! carriage). Text inputs are transparently decoded to byte form before
//! length validation, so the three operations all accept either shape.

use std::collections::BTreeMap;

use datawire_core::{DataItem, DataItemFactory, DecodeStatus, ItemType, Tags, Value};

use crate::builder::{field_integer, schema_err};
use crate::error::InvalidSchema;
use crate::node::{warn, NodeBase};
use crate::sink::WarningSink;

#[derive(Debug, Clone)]
pub struct EncodedNode {
    default_value: Vec<u8>,
    min_length: u64,
    max_length: u64,
}

/// Normalises an item to byte form. Binary inputs pass through; text inputs
/// are Base64-decoded into a fresh byte string carrying `result_status`.
fn auto_decode(
    item: &DataItem,
    result_status: DecodeStatus,
    sink: Option<&dyn WarningSink>,
    path: &str,
) -> DataItem {
    match item.item_type() {
        ItemType::ByteString | ItemType::ByteStringList => item.clone(),
        ItemType::TextString | ItemType::TextStringList => {
            let text = item.text_content().unwrap_or_default();
            match datawire_base64::from_base64_url(&text) {
                Ok(bytes) => DataItem::decoded(
                    Value::ByteString(bytes),
                    Tags::from_slice(item.tags()),
                    false,
                    result_status,
                ),
                Err(_) => {
                    warn(sink, path, "Base64 decoding failed for supplied text string");
                    DataItem::invalid(DecodeStatus::Invalid)
                }
            }
        }
        _ => {
            warn(sink, path, "no valid data type detected during byte string decoding");
            DataItem::invalid(DecodeStatus::FailedSchema)
        }
    }
}

fn byte_length(item: &DataItem) -> Option<u64> {
    match item.as_bytes() {
        Some(bytes) => Some(bytes.len() as u64),
        None => item
            .as_byte_segments()
            .map(|segments| segments.iter().map(|s| s.len() as u64).sum()),
    }
}

impl EncodedNode {
    pub(crate) fn build(
        map: &BTreeMap<String, DataItem>,
        path: &str,
    ) -> Result<EncodedNode, InvalidSchema> {
        let default_value = match map.get("default") {
            None => Vec::new(),
            Some(item) => {
                let decoded = auto_decode(item, DecodeStatus::Original, None, path);
                match decoded.byte_content() {
                    Some(bytes) => bytes,
                    None => return Err(schema_err(path, "'default' field not valid")),
                }
            }
        };
        let max_length = field_integer(map, "maxLength", path)?.unwrap_or(i32::MAX as i64);
        let min_length = field_integer(map, "minLength", path)?.unwrap_or(0);
        if min_length < 0 || max_length < min_length || max_length > i32::MAX as i64 {
            return Err(schema_err(
                path,
                "'minLength' and 'maxLength' fields not valid",
            ));
        }
        let (min_length, max_length) = (min_length as u64, max_length as u64);
        let default_length = default_value.len() as u64;
        if default_length < min_length || default_length > max_length {
            return Err(schema_err(path, "'default' field not a valid length"));
        }
        Ok(EncodedNode {
            default_value,
            min_length,
            max_length,
        })
    }

    pub(crate) fn create_default(&self, base: &NodeBase) -> DataItem {
        DataItemFactory::new().byte_string(self.default_value.clone(), &base.tag_values)
    }

    fn check_length(&self, item: &DataItem, sink: Option<&dyn WarningSink>, path: &str) -> bool {
        let Some(length) = byte_length(item) else {
            warn(sink, path, "source data is not a valid byte string");
            return false;
        };
        if length < self.min_length || length > self.max_length {
            warn(
                sink,
                path,
                &format!(
                    "byte string length {length} is outside range {} to {}",
                    self.min_length, self.max_length
                ),
            );
            return false;
        }
        true
    }

    pub(crate) fn validate(
        &self,
        item: &DataItem,
        sink: Option<&dyn WarningSink>,
        path: &str,
    ) -> bool {
        let decoded = auto_decode(item, item.decode_status(), sink, path);
        !decoded.decode_status().is_failure() && self.check_length(&decoded, sink, path)
    }

    pub(crate) fn expand(
        &self,
        item: &DataItem,
        sink: Option<&dyn WarningSink>,
        path: &str,
    ) -> DataItem {
        self.transform(item, DecodeStatus::Expanded, sink, path)
    }

    pub(crate) fn tokenize(
        &self,
        item: &DataItem,
        sink: Option<&dyn WarningSink>,
        path: &str,
    ) -> DataItem {
        self.transform(item, DecodeStatus::Tokenized, sink, path)
    }

    fn transform(
        &self,
        item: &DataItem,
        result_status: DecodeStatus,
        sink: Option<&dyn WarningSink>,
        path: &str,
    ) -> DataItem {
        let decoded = auto_decode(item, result_status, sink, path);
        if decoded.decode_status().is_failure() || !self.check_length(&decoded, sink, path) {
            return DataItem::invalid(DecodeStatus::FailedSchema);
        }
        decoded
    }
}
