//! CBOR encoder.
//!
//! Writes one data item per [`CborEncoder::encode`] call, strictly
//! sequentially, to the caller's output stream. Heads use the shortest of
//! the 1/2/3/5/9 byte encodings that fits; the tag stack is emitted in list
//! order ahead of the payload head, so the rightmost tag binds innermost.

use std::io::{self, Write};

use datawire_core::{DataItem, Value};

use super::constants::*;

pub struct CborEncoder<W: Write> {
    writer: W,
}

impl<W: Write> CborEncoder<W> {
    pub fn new(writer: W) -> CborEncoder<W> {
        CborEncoder { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Encodes a single data item, including its tag stack.
    pub fn encode(&mut self, item: &DataItem) -> io::Result<()> {
        self.write_item(item)
    }

    fn write_item(&mut self, item: &DataItem) -> io::Result<()> {
        self.write_tags(item.tags())?;
        match item.value() {
            Value::Integer(v) => {
                if *v >= 0 {
                    self.write_head(OVERLAY_UIN, *v as u64)
                } else {
                    // CBOR negative integers carry the one's complement.
                    self.write_head(OVERLAY_NIN, !*v as u64)
                }
            }
            Value::FloatHalf(bits) => {
                self.writer.write_all(&[OVERLAY_TKN | TKN_F16])?;
                self.writer.write_all(&bits.to_be_bytes())
            }
            Value::FloatStandard(v) => {
                self.writer.write_all(&[OVERLAY_TKN | TKN_F32])?;
                self.writer.write_all(&v.to_bits().to_be_bytes())
            }
            Value::FloatDouble(v) => {
                self.writer.write_all(&[OVERLAY_TKN | TKN_F64])?;
                self.writer.write_all(&v.to_bits().to_be_bytes())
            }
            Value::Boolean(v) => {
                let minor = if *v { TKN_TRUE } else { TKN_FALSE };
                self.writer.write_all(&[OVERLAY_TKN | minor])
            }
            Value::Null => self.writer.write_all(&[OVERLAY_TKN | TKN_NULL]),
            Value::Undefined => self.writer.write_all(&[OVERLAY_TKN | TKN_UNDEFINED]),
            Value::Simple(v) => {
                if *v < 20 {
                    self.writer.write_all(&[OVERLAY_TKN | *v])
                } else {
                    self.writer.write_all(&[OVERLAY_TKN | TKN_SIMPLE, *v])
                }
            }
            Value::TextString(s) => {
                self.write_head(OVERLAY_STR, s.len() as u64)?;
                self.writer.write_all(s.as_bytes())
            }
            Value::TextStringList(segments) => {
                self.writer.write_all(&[OVERLAY_STR | MINOR_INDEFINITE])?;
                for segment in segments {
                    self.write_head(OVERLAY_STR, segment.len() as u64)?;
                    self.writer.write_all(segment.as_bytes())?;
                }
                self.writer.write_all(&[CBOR_END])
            }
            Value::ByteString(bytes) => {
                self.write_head(OVERLAY_BIN, bytes.len() as u64)?;
                self.writer.write_all(bytes)
            }
            Value::ByteStringList(segments) => {
                self.writer.write_all(&[OVERLAY_BIN | MINOR_INDEFINITE])?;
                for segment in segments {
                    self.write_head(OVERLAY_BIN, segment.len() as u64)?;
                    self.writer.write_all(segment)?;
                }
                self.writer.write_all(&[CBOR_END])
            }
            Value::Array(items) => {
                if item.is_indefinite_length() {
                    self.writer.write_all(&[OVERLAY_ARR | MINOR_INDEFINITE])?;
                    for child in items {
                        self.write_item(child)?;
                    }
                    self.writer.write_all(&[CBOR_END])
                } else {
                    self.write_head(OVERLAY_ARR, items.len() as u64)?;
                    for child in items {
                        self.write_item(child)?;
                    }
                    Ok(())
                }
            }
            Value::NamedMap(map) => {
                if item.is_indefinite_length() {
                    self.writer.write_all(&[OVERLAY_MAP | MINOR_INDEFINITE])?;
                    for (key, value) in map {
                        self.write_head(OVERLAY_STR, key.len() as u64)?;
                        self.writer.write_all(key.as_bytes())?;
                        self.write_item(value)?;
                    }
                    self.writer.write_all(&[CBOR_END])
                } else {
                    self.write_head(OVERLAY_MAP, map.len() as u64)?;
                    for (key, value) in map {
                        self.write_head(OVERLAY_STR, key.len() as u64)?;
                        self.writer.write_all(key.as_bytes())?;
                        self.write_item(value)?;
                    }
                    Ok(())
                }
            }
            Value::IndexedMap(map) => {
                if item.is_indefinite_length() {
                    self.writer.write_all(&[OVERLAY_MAP | MINOR_INDEFINITE])?;
                    for (key, value) in map {
                        self.write_integer_key(*key)?;
                        self.write_item(value)?;
                    }
                    self.writer.write_all(&[CBOR_END])
                } else {
                    self.write_head(OVERLAY_MAP, map.len() as u64)?;
                    for (key, value) in map {
                        self.write_integer_key(*key)?;
                        self.write_item(value)?;
                    }
                    Ok(())
                }
            }
            Value::EmptyMap => {
                if item.is_indefinite_length() {
                    self.writer
                        .write_all(&[OVERLAY_MAP | MINOR_INDEFINITE, CBOR_END])
                } else {
                    self.write_head(OVERLAY_MAP, 0)
                }
            }
        }
    }

    fn write_integer_key(&mut self, key: i64) -> io::Result<()> {
        if key >= 0 {
            self.write_head(OVERLAY_UIN, key as u64)
        } else {
            self.write_head(OVERLAY_NIN, !key as u64)
        }
    }

    fn write_tags(&mut self, tags: &[u32]) -> io::Result<()> {
        for tag in tags {
            self.write_head(OVERLAY_TAG, u64::from(*tag))?;
        }
        Ok(())
    }

    /// Writes a head for `value` under the given major-type overlay using
    /// the shortest encoding that fits.
    fn write_head(&mut self, overlay: u8, value: u64) -> io::Result<()> {
        if value < 24 {
            self.writer.write_all(&[overlay | value as u8])
        } else if value <= 0xff {
            self.writer.write_all(&[overlay | 24, value as u8])
        } else if value <= 0xffff {
            self.writer.write_all(&[overlay | 25])?;
            self.writer.write_all(&(value as u16).to_be_bytes())
        } else if value <= 0xffff_ffff {
            self.writer.write_all(&[overlay | 26])?;
            self.writer.write_all(&(value as u32).to_be_bytes())
        } else {
            self.writer.write_all(&[overlay | 27])?;
            self.writer.write_all(&value.to_be_bytes())
        }
    }
}
