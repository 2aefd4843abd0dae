//! Data-item construction.
//!
//! The factory is the application-facing way to build items: everything it
//! produces is mutable (where the variant has anything to mutate) and starts
//! with status `Original`. Variant invariants are enforced here, notably the
//! simple value domain and Base64 decoding when a byte string is built from
//! text.

use std::collections::BTreeMap;

use smallvec::SmallVec;
use thiserror::Error;

use crate::f16;
use crate::item::{DataItem, Tags, Value};
use crate::status::DecodeStatus;

/// Error raised for a simple value in the reserved range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("simple value {0} is not in the RFC 7049 unassigned range")]
pub struct SimpleValueError(pub u32);

/// Constructs [`DataItem`]s, enforcing the per-variant invariants.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataItemFactory;

fn tags_from(tags: &[u32]) -> Tags {
    SmallVec::from_slice(tags)
}

impl DataItemFactory {
    pub fn new() -> DataItemFactory {
        DataItemFactory
    }

    /// An invalid item carrying the given failure status.
    pub fn invalid(&self, status: DecodeStatus) -> DataItem {
        DataItem::invalid(status)
    }

    pub fn boolean(&self, value: bool, tags: &[u32]) -> DataItem {
        DataItem::fresh(Value::Boolean(value), tags_from(tags), false)
    }

    pub fn null(&self, tags: &[u32]) -> DataItem {
        DataItem::fresh(Value::Null, tags_from(tags), false)
    }

    pub fn undefined(&self, tags: &[u32]) -> DataItem {
        DataItem::fresh(Value::Undefined, tags_from(tags), false)
    }

    /// A CBOR simple value. The domain is `{0..19} ∪ {32..255}`; the
    /// reserved values `{20..31}` are rejected.
    pub fn simple(&self, value: u32, tags: &[u32]) -> Result<DataItem, SimpleValueError> {
        if value > 255 || (20..=31).contains(&value) {
            return Err(SimpleValueError(value));
        }
        Ok(DataItem::fresh(
            Value::Simple(value as u8),
            tags_from(tags),
            false,
        ))
    }

    pub fn integer(&self, value: i64, tags: &[u32]) -> DataItem {
        DataItem::fresh(Value::Integer(value), tags_from(tags), false)
    }

    /// A half-precision float; the value is converted to its binary16
    /// pattern on construction, so out-of-range magnitudes become ±Inf.
    pub fn float_half(&self, value: f32, tags: &[u32]) -> DataItem {
        DataItem::fresh(
            Value::FloatHalf(f16::encode_f16(value)),
            tags_from(tags),
            false,
        )
    }

    /// A half-precision float from a raw binary16 bit pattern.
    pub fn float_half_from_bits(&self, bits: u16, tags: &[u32]) -> DataItem {
        DataItem::fresh(Value::FloatHalf(bits), tags_from(tags), false)
    }

    pub fn float_standard(&self, value: f32, tags: &[u32]) -> DataItem {
        DataItem::fresh(Value::FloatStandard(value), tags_from(tags), false)
    }

    pub fn float_double(&self, value: f64, tags: &[u32]) -> DataItem {
        DataItem::fresh(Value::FloatDouble(value), tags_from(tags), false)
    }

    pub fn text_string(&self, value: impl Into<String>, tags: &[u32]) -> DataItem {
        DataItem::fresh(Value::TextString(value.into()), tags_from(tags), false)
    }

    /// An empty text-string list; always indefinite-length.
    pub fn text_string_list(&self, tags: &[u32]) -> DataItem {
        DataItem::fresh(Value::TextStringList(Vec::new()), tags_from(tags), true)
    }

    pub fn byte_string(&self, value: Vec<u8>, tags: &[u32]) -> DataItem {
        DataItem::fresh(Value::ByteString(value), tags_from(tags), false)
    }

    /// A byte string from Base64 / Base64-URL text. Decode failure yields an
    /// item with status `Invalid` rather than an error, mirroring the
    /// wire-format failure convention.
    pub fn byte_string_from_text(&self, encoded: &str, tags: &[u32]) -> DataItem {
        match datawire_base64::from_base64_url(encoded) {
            Ok(bytes) => self.byte_string(bytes, tags),
            Err(_) => DataItem::invalid(DecodeStatus::Invalid),
        }
    }

    /// An empty byte-string list; always indefinite-length.
    pub fn byte_string_list(&self, tags: &[u32]) -> DataItem {
        DataItem::fresh(Value::ByteStringList(Vec::new()), tags_from(tags), true)
    }

    pub fn array(&self, tags: &[u32], indefinite_length: bool) -> DataItem {
        DataItem::fresh(Value::Array(Vec::new()), tags_from(tags), indefinite_length)
    }

    /// A pre-populated mutable array.
    pub fn array_from(
        &self,
        items: Vec<DataItem>,
        tags: &[u32],
        indefinite_length: bool,
    ) -> DataItem {
        DataItem::fresh(Value::Array(items), tags_from(tags), indefinite_length)
    }

    /// A pre-populated mutable named map.
    pub fn named_map_from(
        &self,
        entries: BTreeMap<String, DataItem>,
        tags: &[u32],
        indefinite_length: bool,
    ) -> DataItem {
        DataItem::fresh(Value::NamedMap(entries), tags_from(tags), indefinite_length)
    }

    /// A pre-populated mutable indexed map.
    pub fn indexed_map_from(
        &self,
        entries: BTreeMap<i64, DataItem>,
        tags: &[u32],
        indefinite_length: bool,
    ) -> DataItem {
        DataItem::fresh(Value::IndexedMap(entries), tags_from(tags), indefinite_length)
    }

    pub fn named_map(&self, tags: &[u32], indefinite_length: bool) -> DataItem {
        DataItem::fresh(
            Value::NamedMap(Default::default()),
            tags_from(tags),
            indefinite_length,
        )
    }

    pub fn indexed_map(&self, tags: &[u32], indefinite_length: bool) -> DataItem {
        DataItem::fresh(
            Value::IndexedMap(Default::default()),
            tags_from(tags),
            indefinite_length,
        )
    }
}
