//! The data-item value model.
//!
//! A [`DataItem`] is the uniform in-memory form shared by the CBOR and JSON
//! codecs and consumed by the schema engine. It couples a sixteen-variant
//! payload ([`Value`]) with a small header: the CBOR tag stack, a mutability
//! flag, the indefinite-length flag and the [`DecodeStatus`].
//!
//! Items built through the [factory](crate::DataItemFactory) are mutable;
//! items produced by a decoder are frozen and reject mutation. Payload
//! accessors return `None` once the status is a failure.

use std::collections::BTreeMap;

use smallvec::SmallVec;
use thiserror::Error;

use crate::f16;
use crate::status::DecodeStatus;

/// CBOR tag stack. Almost always zero or one entry, so one tag is stored
/// inline.
pub type Tags = SmallVec<[u32; 1]>;

static EMPTY_NAMED: BTreeMap<String, DataItem> = BTreeMap::new();
static EMPTY_INDEXED: BTreeMap<i64, DataItem> = BTreeMap::new();

/// Payload-free discriminant for the sixteen data-item variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemType {
    Integer,
    FloatHalf,
    FloatStandard,
    FloatDouble,
    Boolean,
    Null,
    Undefined,
    Simple,
    TextString,
    TextStringList,
    ByteString,
    ByteStringList,
    Array,
    NamedMap,
    IndexedMap,
    EmptyMap,
}

/// Payload of a data item.
///
/// Half-precision floats are stored as their binary16 bit pattern so that
/// encode/decode round trips preserve NaN payloads exactly.
#[derive(Debug, Clone)]
pub enum Value {
    Integer(i64),
    FloatHalf(u16),
    FloatStandard(f32),
    FloatDouble(f64),
    Boolean(bool),
    Null,
    Undefined,
    Simple(u8),
    TextString(String),
    TextStringList(Vec<String>),
    ByteString(Vec<u8>),
    ByteStringList(Vec<Vec<u8>>),
    Array(Vec<DataItem>),
    NamedMap(BTreeMap<String, DataItem>),
    IndexedMap(BTreeMap<i64, DataItem>),
    /// Decoder-side representation of a map that decoded with zero entries;
    /// the key kind is unknowable, so neither named nor indexed applies.
    EmptyMap,
}

impl Value {
    pub fn item_type(&self) -> ItemType {
        match self {
            Value::Integer(_) => ItemType::Integer,
            Value::FloatHalf(_) => ItemType::FloatHalf,
            Value::FloatStandard(_) => ItemType::FloatStandard,
            Value::FloatDouble(_) => ItemType::FloatDouble,
            Value::Boolean(_) => ItemType::Boolean,
            Value::Null => ItemType::Null,
            Value::Undefined => ItemType::Undefined,
            Value::Simple(_) => ItemType::Simple,
            Value::TextString(_) => ItemType::TextString,
            Value::TextStringList(_) => ItemType::TextStringList,
            Value::ByteString(_) => ItemType::ByteString,
            Value::ByteStringList(_) => ItemType::ByteStringList,
            Value::Array(_) => ItemType::Array,
            Value::NamedMap(_) => ItemType::NamedMap,
            Value::IndexedMap(_) => ItemType::IndexedMap,
            Value::EmptyMap => ItemType::EmptyMap,
        }
    }
}

// Floats compare by bit pattern so round-trip equality covers NaN and the
// sign of zero; everything else compares structurally.
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::FloatHalf(a), Value::FloatHalf(b)) => a == b,
            (Value::FloatStandard(a), Value::FloatStandard(b)) => a.to_bits() == b.to_bits(),
            (Value::FloatDouble(a), Value::FloatDouble(b)) => a.to_bits() == b.to_bits(),
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::Undefined, Value::Undefined) => true,
            (Value::Simple(a), Value::Simple(b)) => a == b,
            (Value::TextString(a), Value::TextString(b)) => a == b,
            (Value::TextStringList(a), Value::TextStringList(b)) => a == b,
            (Value::ByteString(a), Value::ByteString(b)) => a == b,
            (Value::ByteStringList(a), Value::ByteStringList(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::NamedMap(a), Value::NamedMap(b)) => a == b,
            (Value::IndexedMap(a), Value::IndexedMap(b)) => a == b,
            (Value::EmptyMap, Value::EmptyMap) => true,
            _ => false,
        }
    }
}

/// Error raised when a failure decode status would be replaced by a
/// non-failure one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("decode status has previously been assigned a failure condition")]
pub struct StatusError;

/// Error raised by mutating operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MutationError {
    /// The item was produced by a decoder and is frozen.
    #[error("data item is immutable")]
    Frozen,
    /// The operation does not apply to the item's variant.
    #[error("operation does not apply to this data item variant")]
    TypeMismatch,
}

/// A tagged data item: payload plus tags, mutability, indefinite-length flag
/// and decode status.
#[derive(Debug, Clone)]
pub struct DataItem {
    tags: Tags,
    mutable: bool,
    indefinite: bool,
    status: DecodeStatus,
    value: Value,
}

// Status and mutability are bookkeeping, not identity: equality covers the
// payload, the tag stack and the indefinite-length flag.
impl PartialEq for DataItem {
    fn eq(&self, other: &DataItem) -> bool {
        self.value == other.value
            && self.tags == other.tags
            && self.indefinite == other.indefinite
    }
}

impl DataItem {
    /// Builds a mutable item with status `Original`. This is the factory
    /// construction path.
    pub(crate) fn fresh(value: Value, tags: Tags, indefinite: bool) -> DataItem {
        DataItem {
            tags,
            mutable: true,
            indefinite,
            status: DecodeStatus::Original,
            value,
        }
    }

    /// Builds a frozen item carrying a decoder-assigned status. Decoders and
    /// the schema engine construct results through this path.
    pub fn decoded(value: Value, tags: Tags, indefinite: bool, status: DecodeStatus) -> DataItem {
        DataItem {
            tags,
            mutable: false,
            indefinite,
            status,
            value,
        }
    }

    /// Builds the carrier for a failed decode or schema operation.
    pub fn invalid(status: DecodeStatus) -> DataItem {
        debug_assert!(status.is_failure());
        DataItem {
            tags: Tags::new(),
            mutable: false,
            indefinite: false,
            status,
            value: Value::Null,
        }
    }

    pub fn item_type(&self) -> ItemType {
        self.value.item_type()
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn tags(&self) -> &[u32] {
        &self.tags
    }

    pub fn is_mutable(&self) -> bool {
        self.mutable
    }

    pub fn is_indefinite_length(&self) -> bool {
        self.indefinite
    }

    pub fn decode_status(&self) -> DecodeStatus {
        self.status
    }

    /// Reassigns the decode status. A failure status is sticky: replacing it
    /// with a non-failure status is an illegal state transition, while
    /// replacing one failure by another is permitted.
    pub fn set_decode_status(&mut self, status: DecodeStatus) -> Result<(), StatusError> {
        if self.status.is_failure() && !status.is_failure() {
            return Err(StatusError);
        }
        self.status = status;
        Ok(())
    }

    /// Builder form of [`set_decode_status`](Self::set_decode_status): an
    /// illegal transition keeps the existing failure status.
    #[must_use]
    pub fn with_status(mut self, status: DecodeStatus) -> DataItem {
        let _ = self.set_decode_status(status);
        self
    }

    // ---------------------------------------------------------------- reads

    fn readable(&self) -> bool {
        !self.status.is_failure()
    }

    pub fn as_integer(&self) -> Option<i64> {
        match &self.value {
            Value::Integer(v) if self.readable() => Some(*v),
            _ => None,
        }
    }

    /// Boolean view: `Null` and `Undefined` read as `false`.
    pub fn as_boolean(&self) -> Option<bool> {
        if !self.readable() {
            return None;
        }
        match &self.value {
            Value::Boolean(v) => Some(*v),
            Value::Null | Value::Undefined => Some(false),
            _ => None,
        }
    }

    pub fn as_simple(&self) -> Option<u8> {
        match &self.value {
            Value::Simple(v) if self.readable() => Some(*v),
            _ => None,
        }
    }

    /// Half-precision payload widened to `f32`.
    pub fn as_half(&self) -> Option<f32> {
        match &self.value {
            Value::FloatHalf(bits) if self.readable() => Some(f16::decode_f16(*bits)),
            _ => None,
        }
    }

    /// Raw binary16 bit pattern of a half-precision payload.
    pub fn half_bits(&self) -> Option<u16> {
        match &self.value {
            Value::FloatHalf(bits) if self.readable() => Some(*bits),
            _ => None,
        }
    }

    pub fn as_single(&self) -> Option<f32> {
        match &self.value {
            Value::FloatStandard(v) if self.readable() => Some(*v),
            _ => None,
        }
    }

    /// Any numeric payload widened to `f64`.
    pub fn as_double(&self) -> Option<f64> {
        if !self.readable() {
            return None;
        }
        match &self.value {
            Value::FloatHalf(bits) => Some(f64::from(f16::decode_f16(*bits))),
            Value::FloatStandard(v) => Some(f64::from(*v)),
            Value::FloatDouble(v) => Some(*v),
            Value::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.value {
            Value::TextString(v) if self.readable() => Some(v),
            _ => None,
        }
    }

    pub fn as_text_segments(&self) -> Option<&[String]> {
        match &self.value {
            Value::TextStringList(v) if self.readable() => Some(v),
            _ => None,
        }
    }

    /// Text content of a string or string-list item, list segments
    /// concatenated.
    pub fn text_content(&self) -> Option<String> {
        if !self.readable() {
            return None;
        }
        match &self.value {
            Value::TextString(v) => Some(v.clone()),
            Value::TextStringList(segments) => Some(segments.concat()),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.value {
            Value::ByteString(v) if self.readable() => Some(v),
            _ => None,
        }
    }

    pub fn as_byte_segments(&self) -> Option<&[Vec<u8>]> {
        match &self.value {
            Value::ByteStringList(v) if self.readable() => Some(v),
            _ => None,
        }
    }

    /// Byte content of a byte-string or byte-string-list item, list segments
    /// concatenated.
    pub fn byte_content(&self) -> Option<Vec<u8>> {
        if !self.readable() {
            return None;
        }
        match &self.value {
            Value::ByteString(v) => Some(v.clone()),
            Value::ByteStringList(segments) => Some(segments.concat()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[DataItem]> {
        match &self.value {
            Value::Array(v) if self.readable() => Some(v),
            _ => None,
        }
    }

    /// Named-map view. A decoded `EmptyMap` reads as an empty named map.
    pub fn as_named_map(&self) -> Option<&BTreeMap<String, DataItem>> {
        if !self.readable() {
            return None;
        }
        match &self.value {
            Value::NamedMap(v) => Some(v),
            Value::EmptyMap => Some(&EMPTY_NAMED),
            _ => None,
        }
    }

    /// Indexed-map view. A decoded `EmptyMap` reads as an empty indexed map.
    pub fn as_indexed_map(&self) -> Option<&BTreeMap<i64, DataItem>> {
        if !self.readable() {
            return None;
        }
        match &self.value {
            Value::IndexedMap(v) => Some(v),
            Value::EmptyMap => Some(&EMPTY_INDEXED),
            _ => None,
        }
    }

    // ------------------------------------------------------------ mutation

    fn check_mutable(&self) -> Result<(), MutationError> {
        if self.mutable {
            Ok(())
        } else {
            Err(MutationError::Frozen)
        }
    }

    /// Appends an element to a mutable array item.
    pub fn array_push(&mut self, item: DataItem) -> Result<(), MutationError> {
        self.check_mutable()?;
        match &mut self.value {
            Value::Array(v) => {
                v.push(item);
                Ok(())
            }
            _ => Err(MutationError::TypeMismatch),
        }
    }

    /// Inserts into a mutable named map. An existing binding is replaced.
    pub fn named_map_insert(&mut self, key: String, item: DataItem) -> Result<(), MutationError> {
        self.check_mutable()?;
        match &mut self.value {
            Value::NamedMap(v) => {
                v.insert(key, item);
                Ok(())
            }
            _ => Err(MutationError::TypeMismatch),
        }
    }

    /// Inserts into a mutable indexed map. An existing binding is replaced.
    pub fn indexed_map_insert(&mut self, key: i64, item: DataItem) -> Result<(), MutationError> {
        self.check_mutable()?;
        match &mut self.value {
            Value::IndexedMap(v) => {
                v.insert(key, item);
                Ok(())
            }
            _ => Err(MutationError::TypeMismatch),
        }
    }

    /// Appends a segment to a mutable text-string list.
    pub fn push_text_segment(&mut self, segment: String) -> Result<(), MutationError> {
        self.check_mutable()?;
        match &mut self.value {
            Value::TextStringList(v) => {
                v.push(segment);
                Ok(())
            }
            _ => Err(MutationError::TypeMismatch),
        }
    }

    /// Appends a segment to a mutable byte-string list.
    pub fn push_byte_segment(&mut self, segment: Vec<u8>) -> Result<(), MutationError> {
        self.check_mutable()?;
        match &mut self.value {
            Value::ByteStringList(v) => {
                v.push(segment);
                Ok(())
            }
            _ => Err(MutationError::TypeMismatch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::DataItemFactory;

    #[test]
    fn failure_status_is_sticky() {
        let mut item = DataItem::invalid(DecodeStatus::Invalid);
        assert_eq!(
            item.set_decode_status(DecodeStatus::Translatable),
            Err(StatusError)
        );
        // Failure to failure is idempotent.
        assert_eq!(item.set_decode_status(DecodeStatus::Unsupported), Ok(()));
        assert_eq!(item.decode_status(), DecodeStatus::Unsupported);
    }

    #[test]
    fn with_status_keeps_failure() {
        let item = DataItem::invalid(DecodeStatus::FailedSchema)
            .with_status(DecodeStatus::Translatable);
        assert_eq!(item.decode_status(), DecodeStatus::FailedSchema);
    }

    #[test]
    fn failed_items_do_not_expose_payloads() {
        let item = DataItem::invalid(DecodeStatus::Invalid);
        assert_eq!(item.as_boolean(), None);
        assert_eq!(item.as_integer(), None);
        assert_eq!(item.as_named_map(), None);
    }

    #[test]
    fn null_and_undefined_read_as_false() {
        let factory = DataItemFactory::new();
        assert_eq!(factory.null(&[]).as_boolean(), Some(false));
        assert_eq!(factory.undefined(&[]).as_boolean(), Some(false));
    }

    #[test]
    fn decoded_containers_are_frozen() {
        let mut item = DataItem::decoded(
            Value::Array(vec![]),
            Tags::new(),
            false,
            DecodeStatus::Translatable,
        );
        let factory = DataItemFactory::new();
        assert_eq!(
            item.array_push(factory.integer(1, &[])),
            Err(MutationError::Frozen)
        );
    }

    #[test]
    fn mutation_requires_matching_variant() {
        let factory = DataItemFactory::new();
        let mut item = factory.array(&[], false);
        assert_eq!(
            item.named_map_insert("k".into(), factory.integer(1, &[])),
            Err(MutationError::TypeMismatch)
        );
        assert!(item.array_push(factory.integer(1, &[])).is_ok());
        assert_eq!(item.as_array().unwrap().len(), 1);
    }

    #[test]
    fn empty_map_reads_as_both_map_kinds() {
        let item = DataItem::decoded(
            Value::EmptyMap,
            Tags::new(),
            false,
            DecodeStatus::Translatable,
        );
        assert!(item.as_named_map().unwrap().is_empty());
        assert!(item.as_indexed_map().unwrap().is_empty());
    }

    #[test]
    fn equality_ignores_status_but_not_tags() {
        let factory = DataItemFactory::new();
        let a = factory.integer(7, &[2]);
        let b = factory.integer(7, &[2]).with_status(DecodeStatus::Translatable);
        let c = factory.integer(7, &[3]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn float_equality_uses_bit_patterns() {
        let factory = DataItemFactory::new();
        assert_eq!(
            factory.float_double(f64::NAN, &[]),
            factory.float_double(f64::NAN, &[])
        );
        assert_ne!(
            factory.float_double(0.0, &[]),
            factory.float_double(-0.0, &[])
        );
    }

    #[test]
    fn as_double_widens_every_numeric_variant() {
        let factory = DataItemFactory::new();
        assert_eq!(factory.integer(3, &[]).as_double(), Some(3.0));
        assert_eq!(factory.float_half(1.5, &[]).as_double(), Some(1.5));
        assert_eq!(factory.float_standard(2.5, &[]).as_double(), Some(2.5));
        assert_eq!(factory.float_double(4.5, &[]).as_double(), Some(4.5));
        assert_eq!(factory.boolean(true, &[]).as_double(), None);
    }

    #[test]
    fn text_content_concatenates_segments() {
        let factory = DataItemFactory::new();
        let mut list = factory.text_string_list(&[]);
        list.push_text_segment("Hello".into()).unwrap();
        list.push_text_segment("World".into()).unwrap();
        assert_eq!(list.text_content().unwrap(), "HelloWorld");
        assert!(list.is_indefinite_length());
    }
}
