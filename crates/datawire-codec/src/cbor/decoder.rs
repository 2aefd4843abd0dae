//! CBOR decoder.
//!
//! Recursive, one fully-materialised item per [`CborDecoder::decode`] call.
//! Wire-format violations never raise errors: they are reported through the
//! returned item's decode status (`Invalid` for RFC violations and truncated
//! input, `Unsupported` for values beyond implementation limits,
//! `WellFormed` for parseable but dubious data). Only genuine stream
//! failures surface as `io::Error`.

use std::collections::BTreeMap;
use std::io::{self, Read};

use datawire_core::{DataItem, DecodeStatus, Tags, Value};

use super::constants::*;

pub struct CborDecoder<R: Read> {
    reader: R,
}

/// Map builder that commits to a key kind on the first entry.
enum MapShape {
    Undecided,
    Named(BTreeMap<String, DataItem>),
    Indexed(BTreeMap<i64, DataItem>),
}

impl<R: Read> CborDecoder<R> {
    pub fn new(reader: R) -> CborDecoder<R> {
        CborDecoder { reader }
    }

    /// Decodes a single data item from the stream.
    ///
    /// Truncated input yields an item with status `Invalid`; other I/O
    /// failures propagate.
    pub fn decode(&mut self) -> io::Result<DataItem> {
        match self.read_item() {
            Ok(item) => Ok(item),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                Ok(DataItem::invalid(DecodeStatus::Invalid))
            }
            Err(e) => Err(e),
        }
    }

    fn read_u8(&mut self) -> io::Result<u8> {
        let mut buf = [0u8; 1];
        self.reader.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    /// Reads the primary data value selected by the additional-info field.
    /// `None` marks the reserved values 28..30 and the indefinite/break
    /// marker 31.
    fn read_primary(&mut self, initial: u8) -> io::Result<Option<u64>> {
        match initial & MINOR_MASK {
            minor @ 0..=23 => Ok(Some(u64::from(minor))),
            24 => Ok(Some(u64::from(self.read_u8()?))),
            25 => {
                let mut buf = [0u8; 2];
                self.reader.read_exact(&mut buf)?;
                Ok(Some(u64::from(u16::from_be_bytes(buf))))
            }
            26 => {
                let mut buf = [0u8; 4];
                self.reader.read_exact(&mut buf)?;
                Ok(Some(u64::from(u32::from_be_bytes(buf))))
            }
            27 => {
                let mut buf = [0u8; 8];
                self.reader.read_exact(&mut buf)?;
                Ok(Some(u64::from_be_bytes(buf)))
            }
            _ => Ok(None),
        }
    }

    fn read_item(&mut self) -> io::Result<DataItem> {
        let initial = self.read_u8()?;
        self.read_item_from(initial)
    }

    fn read_item_from(&mut self, mut initial: u8) -> io::Result<DataItem> {
        // Consume the leading tag stack. Tag values are limited to the
        // non-negative 31-bit range.
        let mut tags = Tags::new();
        while initial >> 5 == MAJOR_TAG {
            let Some(primary) = self.read_primary(initial)? else {
                return Ok(DataItem::invalid(DecodeStatus::Invalid));
            };
            if primary >= MAX_LENGTH {
                return Ok(DataItem::invalid(DecodeStatus::Unsupported));
            }
            tags.push(primary as u32);
            initial = self.read_u8()?;
        }

        let indefinite = initial & MINOR_MASK == MINOR_INDEFINITE;
        match initial >> 5 {
            MAJOR_UIN | MAJOR_NIN => {
                let Some(primary) = self.read_primary(initial)? else {
                    return Ok(DataItem::invalid(DecodeStatus::Invalid));
                };
                if primary > i64::MAX as u64 {
                    return Ok(DataItem::invalid(DecodeStatus::Unsupported));
                }
                // Negative values carry the one's complement of the payload.
                let value = if initial >> 5 == MAJOR_NIN {
                    !(primary as i64)
                } else {
                    primary as i64
                };
                Ok(DataItem::decoded(
                    Value::Integer(value),
                    tags,
                    false,
                    DecodeStatus::Translatable,
                ))
            }
            major @ (MAJOR_BIN | MAJOR_STR) => {
                if indefinite {
                    self.read_indefinite_string(major, tags)
                } else {
                    self.read_fixed_string(major, initial, tags)
                }
            }
            MAJOR_ARR => {
                if indefinite {
                    self.read_array(None, tags)
                } else {
                    let Some(primary) = self.read_primary(initial)? else {
                        return Ok(DataItem::invalid(DecodeStatus::Invalid));
                    };
                    if primary >= MAX_LENGTH {
                        return Ok(DataItem::invalid(DecodeStatus::Unsupported));
                    }
                    self.read_array(Some(primary), tags)
                }
            }
            MAJOR_MAP => {
                if indefinite {
                    self.read_map(None, tags)
                } else {
                    let Some(primary) = self.read_primary(initial)? else {
                        return Ok(DataItem::invalid(DecodeStatus::Invalid));
                    };
                    if primary >= MAX_LENGTH {
                        return Ok(DataItem::invalid(DecodeStatus::Unsupported));
                    }
                    self.read_map(Some(primary), tags)
                }
            }
            _ => self.read_extension(initial, tags),
        }
    }

    fn read_fixed_string(&mut self, major: u8, initial: u8, tags: Tags) -> io::Result<DataItem> {
        let Some(primary) = self.read_primary(initial)? else {
            return Ok(DataItem::invalid(DecodeStatus::Invalid));
        };
        if primary >= MAX_LENGTH {
            return Ok(DataItem::invalid(DecodeStatus::Unsupported));
        }
        let mut bytes = vec![0u8; primary as usize];
        self.reader.read_exact(&mut bytes)?;
        if major == MAJOR_BIN {
            Ok(DataItem::decoded(
                Value::ByteString(bytes),
                tags,
                false,
                DecodeStatus::Translatable,
            ))
        } else {
            match String::from_utf8(bytes) {
                Ok(text) => Ok(DataItem::decoded(
                    Value::TextString(text),
                    tags,
                    false,
                    DecodeStatus::Translatable,
                )),
                Err(_) => Ok(DataItem::invalid(DecodeStatus::Invalid)),
            }
        }
    }

    /// Reads the segments of an indefinite-length string. Each segment must
    /// be a definite-length item of the same major type.
    fn read_indefinite_string(&mut self, major: u8, tags: Tags) -> io::Result<DataItem> {
        let mut segments: Vec<Vec<u8>> = Vec::new();
        loop {
            let initial = self.read_u8()?;
            if initial == CBOR_END {
                break;
            }
            let Some(primary) = self.read_primary(initial)? else {
                // Nested indefinite segments are forbidden.
                return Ok(DataItem::invalid(DecodeStatus::Invalid));
            };
            if initial >> 5 != major {
                return Ok(DataItem::invalid(DecodeStatus::Invalid));
            }
            if primary >= MAX_LENGTH {
                return Ok(DataItem::invalid(DecodeStatus::Unsupported));
            }
            let mut bytes = vec![0u8; primary as usize];
            self.reader.read_exact(&mut bytes)?;
            segments.push(bytes);
        }
        if major == MAJOR_BIN {
            Ok(DataItem::decoded(
                Value::ByteStringList(segments),
                tags,
                true,
                DecodeStatus::Translatable,
            ))
        } else {
            let mut texts = Vec::with_capacity(segments.len());
            for segment in segments {
                match String::from_utf8(segment) {
                    Ok(text) => texts.push(text),
                    Err(_) => return Ok(DataItem::invalid(DecodeStatus::Invalid)),
                }
            }
            Ok(DataItem::decoded(
                Value::TextStringList(texts),
                tags,
                true,
                DecodeStatus::Translatable,
            ))
        }
    }

    /// Reads array members; `count` of `None` means until-break.
    fn read_array(&mut self, count: Option<u64>, tags: Tags) -> io::Result<DataItem> {
        let mut status = DecodeStatus::Translatable;
        let mut items = Vec::new();
        let indefinite = count.is_none();
        match count {
            Some(count) => {
                for _ in 0..count {
                    let child = self.read_item()?;
                    status = status.join(child.decode_status());
                    if status.is_failure() {
                        return Ok(DataItem::invalid(status));
                    }
                    items.push(child);
                }
            }
            None => loop {
                let initial = self.read_u8()?;
                if initial == CBOR_END {
                    break;
                }
                let child = self.read_item_from(initial)?;
                status = status.join(child.decode_status());
                if status.is_failure() {
                    return Ok(DataItem::invalid(status));
                }
                items.push(child);
            },
        }
        Ok(DataItem::decoded(
            Value::Array(items),
            tags,
            indefinite,
            status,
        ))
    }

    /// Reads map entries; `count` of `None` means until-break. The first key
    /// decides the map shape; later keys of the other kind are unsupported,
    /// and duplicate keys keep the first binding while downgrading the
    /// status to `WellFormed`.
    fn read_map(&mut self, count: Option<u64>, tags: Tags) -> io::Result<DataItem> {
        let mut status = DecodeStatus::Translatable;
        let mut shape = MapShape::Undecided;
        let indefinite = count.is_none();
        let mut remaining = count;
        loop {
            let key_initial = match remaining {
                Some(0) => break,
                Some(ref mut n) => {
                    *n -= 1;
                    self.read_u8()?
                }
                None => {
                    let initial = self.read_u8()?;
                    if initial == CBOR_END {
                        break;
                    }
                    initial
                }
            };
            let key = self.read_item_from(key_initial)?;
            status = status.join(key.decode_status());
            if status.is_failure() {
                return Ok(DataItem::invalid(status));
            }
            if matches!(shape, MapShape::Undecided) {
                shape = match key.value() {
                    Value::TextString(_) => MapShape::Named(BTreeMap::new()),
                    Value::Integer(_) => MapShape::Indexed(BTreeMap::new()),
                    _ => return Ok(DataItem::invalid(DecodeStatus::Unsupported)),
                };
            }
            let value = self.read_item()?;
            status = status.join(value.decode_status());
            if status.is_failure() {
                return Ok(DataItem::invalid(status));
            }
            match &mut shape {
                MapShape::Named(map) => match key.value() {
                    Value::TextString(text) => {
                        if map.contains_key(text) {
                            status = status.join(DecodeStatus::WellFormed);
                        } else {
                            map.insert(text.clone(), value);
                        }
                    }
                    _ => return Ok(DataItem::invalid(DecodeStatus::Unsupported)),
                },
                MapShape::Indexed(map) => match key.value() {
                    Value::Integer(index) => {
                        if map.contains_key(index) {
                            status = status.join(DecodeStatus::WellFormed);
                        } else {
                            map.insert(*index, value);
                        }
                    }
                    _ => return Ok(DataItem::invalid(DecodeStatus::Unsupported)),
                },
                MapShape::Undecided => unreachable!(),
            }
        }
        let value = match shape {
            MapShape::Undecided => Value::EmptyMap,
            MapShape::Named(map) => Value::NamedMap(map),
            MapShape::Indexed(map) => Value::IndexedMap(map),
        };
        Ok(DataItem::decoded(value, tags, indefinite, status))
    }

    /// Major type 7: booleans, null, undefined, floats, simple values and
    /// the break stop code.
    fn read_extension(&mut self, initial: u8, tags: Tags) -> io::Result<DataItem> {
        let minor = initial & MINOR_MASK;
        let Some(primary) = self.read_primary(initial)? else {
            // Reserved additional info, or a break outside any
            // indefinite-length context.
            return Ok(DataItem::invalid(DecodeStatus::Invalid));
        };
        let item = match minor {
            TKN_FALSE => DataItem::decoded(
                Value::Boolean(false),
                tags,
                false,
                DecodeStatus::Translatable,
            ),
            TKN_TRUE => {
                DataItem::decoded(Value::Boolean(true), tags, false, DecodeStatus::Translatable)
            }
            TKN_NULL => DataItem::decoded(Value::Null, tags, false, DecodeStatus::Translatable),
            TKN_UNDEFINED => {
                DataItem::decoded(Value::Undefined, tags, false, DecodeStatus::Translatable)
            }
            TKN_F16 => DataItem::decoded(
                Value::FloatHalf(primary as u16),
                tags,
                false,
                DecodeStatus::Translatable,
            ),
            TKN_F32 => DataItem::decoded(
                Value::FloatStandard(f32::from_bits(primary as u32)),
                tags,
                false,
                DecodeStatus::Translatable,
            ),
            TKN_F64 => DataItem::decoded(
                Value::FloatDouble(f64::from_bits(primary)),
                tags,
                false,
                DecodeStatus::Translatable,
            ),
            // Unassigned simple values decode as well formed but are not
            // translatable to JSON.
            _ => DataItem::decoded(
                Value::Simple(primary as u8),
                tags,
                false,
                DecodeStatus::WellFormed,
            ),
        };
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datawire_core::ItemType;

    fn decode(bytes: &[u8]) -> DataItem {
        CborDecoder::new(bytes).decode().unwrap()
    }

    #[test]
    fn integers() {
        assert_eq!(decode(&[0x00]).as_integer(), Some(0));
        assert_eq!(decode(&[0x17]).as_integer(), Some(23));
        assert_eq!(decode(&[0x18, 0x18]).as_integer(), Some(24));
        assert_eq!(decode(&[0x20]).as_integer(), Some(-1));
        assert_eq!(decode(&[0x38, 0x63]).as_integer(), Some(-100));
        assert_eq!(
            decode(&[0x1b, 0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]).as_integer(),
            Some(i64::MAX)
        );
        assert_eq!(
            decode(&[0x3b, 0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]).as_integer(),
            Some(i64::MIN)
        );
    }

    #[test]
    fn out_of_range_integers_are_unsupported() {
        // 2^63 as an unsigned integer exceeds the signed 64-bit domain.
        let item = decode(&[0x1b, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
        assert_eq!(item.decode_status(), DecodeStatus::Unsupported);
        // Negative whose one's complement exceeds the domain likewise.
        let item = decode(&[0x3b, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
        assert_eq!(item.decode_status(), DecodeStatus::Unsupported);
    }

    #[test]
    fn strings() {
        let item = decode(&[0x64, b'I', b'E', b'T', b'F']);
        assert_eq!(item.as_text(), Some("IETF"));
        assert_eq!(item.decode_status(), DecodeStatus::Translatable);
        let item = decode(&[0x44, 1, 2, 3, 4]);
        assert_eq!(item.as_bytes(), Some([1u8, 2, 3, 4].as_slice()));
    }

    #[test]
    fn invalid_utf8_text() {
        let item = decode(&[0x62, 0xff, 0xfe]);
        assert_eq!(item.decode_status(), DecodeStatus::Invalid);
    }

    #[test]
    fn indefinite_text_string() {
        let mut bytes = vec![0x7f, 0x65];
        bytes.extend_from_slice(b"Hello");
        bytes.push(0x65);
        bytes.extend_from_slice(b"World");
        bytes.push(0xff);
        let item = decode(&bytes);
        assert_eq!(item.item_type(), ItemType::TextStringList);
        assert!(item.is_indefinite_length());
        assert_eq!(item.decode_status(), DecodeStatus::Translatable);
        assert_eq!(
            item.as_text_segments().unwrap(),
            ["Hello".to_string(), "World".to_string()]
        );
    }

    #[test]
    fn nested_indefinite_segment_is_invalid() {
        let item = decode(&[0x7f, 0x7f, 0x60, 0xff, 0xff]);
        assert_eq!(item.decode_status(), DecodeStatus::Invalid);
    }

    #[test]
    fn mismatched_segment_major_type_is_invalid() {
        let item = decode(&[0x7f, 0x41, 0x61, 0xff]);
        assert_eq!(item.decode_status(), DecodeStatus::Invalid);
    }

    #[test]
    fn arrays() {
        let item = decode(&[0x83, 0x01, 0x02, 0x03]);
        let children = item.as_array().unwrap();
        assert_eq!(children.len(), 3);
        assert_eq!(children[2].as_integer(), Some(3));

        let item = decode(&[0x9f, 0x01, 0x02, 0xff]);
        assert!(item.is_indefinite_length());
        assert_eq!(item.as_array().unwrap().len(), 2);
    }

    #[test]
    fn map_key_discrimination() {
        let item = decode(&[0xa2, 0x01, 0x02, 0x03, 0x04]);
        assert_eq!(item.item_type(), ItemType::IndexedMap);
        let map = item.as_indexed_map().unwrap();
        assert_eq!(map[&1].as_integer(), Some(2));
        assert_eq!(map[&3].as_integer(), Some(4));

        let item = decode(&[0xa2, 0x61, b'a', 0x01, 0x61, b'b', 0x02]);
        assert_eq!(item.item_type(), ItemType::NamedMap);
        let map = item.as_named_map().unwrap();
        assert_eq!(map["a"].as_integer(), Some(1));
        assert_eq!(map["b"].as_integer(), Some(2));

        // Mixed key kinds are unsupported.
        let item = decode(&[0xa2, 0x01, 0x02, 0x61, b'a', 0x03]);
        assert_eq!(item.decode_status(), DecodeStatus::Unsupported);
    }

    #[test]
    fn zero_entry_map_decodes_as_empty_map() {
        assert_eq!(decode(&[0xa0]).item_type(), ItemType::EmptyMap);
        assert_eq!(decode(&[0xbf, 0xff]).item_type(), ItemType::EmptyMap);
    }

    #[test]
    fn duplicate_map_keys_downgrade_to_well_formed() {
        let item = decode(&[0xa2, 0x61, b'a', 0x01, 0x61, b'a', 0x02]);
        assert_eq!(item.decode_status(), DecodeStatus::WellFormed);
        // First binding wins.
        assert_eq!(item.as_named_map().unwrap()["a"].as_integer(), Some(1));
    }

    #[test]
    fn child_status_joins_into_containers() {
        // Array containing an unassigned simple value is only well formed.
        let item = decode(&[0x82, 0x01, 0xf8, 0x20]);
        assert_eq!(item.decode_status(), DecodeStatus::WellFormed);
    }

    #[test]
    fn extension_values() {
        assert_eq!(decode(&[0xf4]).as_boolean(), Some(false));
        assert_eq!(decode(&[0xf5]).as_boolean(), Some(true));
        assert_eq!(decode(&[0xf6]).item_type(), ItemType::Null);
        assert_eq!(decode(&[0xf7]).item_type(), ItemType::Undefined);
        let item = decode(&[0xf8, 0x20]);
        assert_eq!(item.as_simple(), Some(32));
        assert_eq!(item.decode_status(), DecodeStatus::WellFormed);
        let item = decode(&[0xf0]);
        assert_eq!(item.as_simple(), Some(16));
    }

    #[test]
    fn floats() {
        assert_eq!(decode(&[0xf9, 0x3c, 0x00]).as_half(), Some(1.0));
        assert_eq!(
            decode(&[0xfa, 0x47, 0xc3, 0x50, 0x00]).as_single(),
            Some(100_000.0)
        );
        assert_eq!(
            decode(&[0xfb, 0x3f, 0xf1, 0x99, 0x99, 0x99, 0x99, 0x99, 0x9a]).as_double(),
            Some(1.1)
        );
    }

    #[test]
    fn tags_accumulate_in_order() {
        let item = decode(&[0xd5, 0xc2, 0x05]);
        assert_eq!(item.tags(), &[21, 2]);
        assert_eq!(item.as_integer(), Some(5));
    }

    #[test]
    fn oversized_tag_is_unsupported() {
        let item = decode(&[0xda, 0x80, 0x00, 0x00, 0x00, 0x01]);
        assert_eq!(item.decode_status(), DecodeStatus::Unsupported);
    }

    #[test]
    fn stray_break_is_invalid() {
        assert_eq!(decode(&[0xff]).decode_status(), DecodeStatus::Invalid);
    }

    #[test]
    fn reserved_additional_info_is_invalid() {
        assert_eq!(decode(&[0x1c]).decode_status(), DecodeStatus::Invalid);
        assert_eq!(decode(&[0xfc]).decode_status(), DecodeStatus::Invalid);
    }

    #[test]
    fn truncated_input_is_invalid() {
        assert_eq!(decode(&[]).decode_status(), DecodeStatus::Invalid);
        assert_eq!(decode(&[0x18]).decode_status(), DecodeStatus::Invalid);
        assert_eq!(decode(&[0x64, b'I']).decode_status(), DecodeStatus::Invalid);
        assert_eq!(decode(&[0x82, 0x01]).decode_status(), DecodeStatus::Invalid);
    }
}
