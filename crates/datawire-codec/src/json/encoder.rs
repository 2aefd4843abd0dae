//! JSON encoder.
//!
//! Produces RFC 8259 text with the two datawire extensions: byte strings
//! become unpadded Base64-URL inside quotes, and values with no JSON
//! representation (non-finite floats, simple values, null, undefined) become
//! `null`. Pretty mode indents with one tab per depth level and separates
//! map keys from values with `" : "`.

use std::io::{self, Write};

use datawire_core::{decode_f16, DataItem, Value};

pub struct JsonEncoder<W: Write> {
    writer: W,
}

impl<W: Write> JsonEncoder<W> {
    pub fn new(writer: W) -> JsonEncoder<W> {
        JsonEncoder { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Encodes a single data item. In pretty mode a trailing newline is
    /// appended after the document.
    pub fn encode(&mut self, item: &DataItem, prettify: bool) -> io::Result<()> {
        self.write_item(item, if prettify { Some(0) } else { None })?;
        if prettify {
            self.writer.write_all(b"\n")?;
        }
        Ok(())
    }

    fn write_item(&mut self, item: &DataItem, depth: Option<usize>) -> io::Result<()> {
        match item.value() {
            Value::Integer(v) => write!(self.writer, "{v}"),
            Value::FloatHalf(bits) => self.write_f64(f64::from(decode_f16(*bits))),
            Value::FloatStandard(v) => self.write_f64(f64::from(*v)),
            Value::FloatDouble(v) => self.write_f64(*v),
            Value::Boolean(v) => self.writer.write_all(if *v { b"true" } else { b"false" }),
            // No JSON representation.
            Value::Null | Value::Undefined | Value::Simple(_) => self.writer.write_all(b"null"),
            Value::TextString(s) => {
                self.writer.write_all(b"\"")?;
                self.write_escaped(s)?;
                self.writer.write_all(b"\"")
            }
            Value::TextStringList(segments) => {
                self.writer.write_all(b"\"")?;
                for segment in segments {
                    self.write_escaped(segment)?;
                }
                self.writer.write_all(b"\"")
            }
            Value::ByteString(bytes) => self.write_base64(bytes),
            Value::ByteStringList(segments) => self.write_base64(&segments.concat()),
            Value::Array(items) => {
                if items.is_empty() {
                    return self.writer.write_all(b"[]");
                }
                let layout = Layout::at(depth);
                self.writer.write_all(b"[")?;
                for (index, child) in items.iter().enumerate() {
                    if index > 0 {
                        self.writer.write_all(b",")?;
                    }
                    layout.entry(&mut self.writer)?;
                    self.write_item(child, layout.child_depth())?;
                }
                layout.close(&mut self.writer)?;
                self.writer.write_all(b"]")
            }
            Value::NamedMap(map) => {
                if map.is_empty() {
                    return self.writer.write_all(b"{}");
                }
                let layout = Layout::at(depth);
                self.writer.write_all(b"{")?;
                for (index, (key, child)) in map.iter().enumerate() {
                    if index > 0 {
                        self.writer.write_all(b",")?;
                    }
                    layout.entry(&mut self.writer)?;
                    self.writer.write_all(b"\"")?;
                    self.write_escaped(key)?;
                    self.writer.write_all(b"\"")?;
                    layout.separator(&mut self.writer)?;
                    self.write_item(child, layout.child_depth())?;
                }
                layout.close(&mut self.writer)?;
                self.writer.write_all(b"}")
            }
            // Integer keys have no JSON form; emit their decimal strings so
            // the schema engine can recover them on the way back in.
            Value::IndexedMap(map) => {
                if map.is_empty() {
                    return self.writer.write_all(b"{}");
                }
                let layout = Layout::at(depth);
                self.writer.write_all(b"{")?;
                for (index, (key, child)) in map.iter().enumerate() {
                    if index > 0 {
                        self.writer.write_all(b",")?;
                    }
                    layout.entry(&mut self.writer)?;
                    write!(self.writer, "\"{key}\"")?;
                    layout.separator(&mut self.writer)?;
                    self.write_item(child, layout.child_depth())?;
                }
                layout.close(&mut self.writer)?;
                self.writer.write_all(b"}")
            }
            Value::EmptyMap => self.writer.write_all(b"{}"),
        }
    }

    fn write_f64(&mut self, value: f64) -> io::Result<()> {
        if !value.is_finite() {
            return self.writer.write_all(b"null");
        }
        // Keep a decimal point on integral values so they parse back as
        // floating point rather than integers.
        if value.fract() == 0.0 && value.abs() < 1.0e16 {
            write!(self.writer, "{value:.1}")
        } else {
            write!(self.writer, "{value}")
        }
    }

    fn write_base64(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut text = String::new();
        datawire_base64::append_base64_url(&mut text, bytes);
        self.writer.write_all(b"\"")?;
        self.writer.write_all(text.as_bytes())?;
        self.writer.write_all(b"\"")
    }

    fn write_escaped(&mut self, text: &str) -> io::Result<()> {
        let mut buf = [0u8; 4];
        for c in text.chars() {
            match c {
                '"' => self.writer.write_all(b"\\\"")?,
                '\\' => self.writer.write_all(b"\\\\")?,
                '\u{8}' => self.writer.write_all(b"\\b")?,
                '\u{c}' => self.writer.write_all(b"\\f")?,
                '\n' => self.writer.write_all(b"\\n")?,
                '\r' => self.writer.write_all(b"\\r")?,
                '\t' => self.writer.write_all(b"\\t")?,
                _ => self.writer.write_all(c.encode_utf8(&mut buf).as_bytes())?,
            }
        }
        Ok(())
    }
}

/// Container layout strings for one nesting depth: compact mode writes no
/// whitespace at all, pretty mode breaks lines and indents with tabs.
struct Layout {
    depth: Option<usize>,
}

impl Layout {
    fn at(depth: Option<usize>) -> Layout {
        Layout { depth }
    }

    fn child_depth(&self) -> Option<usize> {
        self.depth.map(|d| d + 1)
    }

    /// Written after the opening bracket and after each comma.
    fn entry<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        if let Some(depth) = self.depth {
            writer.write_all(b"\n")?;
            for _ in 0..=depth {
                writer.write_all(b"\t")?;
            }
        }
        Ok(())
    }

    /// Map key/value separator.
    fn separator<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(if self.depth.is_some() { b" : " } else { b":" })
    }

    /// Written before the closing bracket.
    fn close<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        if let Some(depth) = self.depth {
            writer.write_all(b"\n")?;
            for _ in 0..depth {
                writer.write_all(b"\t")?;
            }
        }
        Ok(())
    }
}
