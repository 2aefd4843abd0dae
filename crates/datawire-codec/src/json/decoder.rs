//! JSON decoder.
//!
//! Single-pass recursive descent over the caller's byte stream, read one
//! UTF-8 character at a time. Beyond RFC 8259 the decoder discards `//` and
//! `/* */` comments anywhere whitespace is legal, and tolerates duplicate
//! object keys (first binding wins, status downgraded to `WellFormed`).
//! Lexical violations yield an item with status `Invalid`; only stream
//! failures raise `io::Error`.

use std::collections::BTreeMap;
use std::io::{self, Read};

use datawire_core::{DataItem, DecodeStatus, Tags, Value};

pub struct JsonDecoder<R: Read> {
    reader: R,
    current: Option<char>,
}

fn invalid() -> DataItem {
    DataItem::invalid(DecodeStatus::Invalid)
}

impl<R: Read> JsonDecoder<R> {
    pub fn new(reader: R) -> JsonDecoder<R> {
        JsonDecoder {
            reader,
            current: None,
        }
    }

    /// Decodes a single document from the stream.
    pub fn decode(&mut self) -> io::Result<DataItem> {
        self.advance_skipping()?;
        self.read_value()
    }

    // ------------------------------------------------------- char reading

    fn next_byte(&mut self) -> io::Result<Option<u8>> {
        let mut buf = [0u8; 1];
        loop {
            match self.reader.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(buf[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Reads one UTF-8 encoded character. Malformed sequences decode as the
    /// replacement character, as a lenient text reader would.
    fn read_char(&mut self) -> io::Result<Option<char>> {
        let Some(first) = self.next_byte()? else {
            return Ok(None);
        };
        if first < 0x80 {
            return Ok(Some(first as char));
        }
        let extra = match first {
            0xc0..=0xdf => 1,
            0xe0..=0xef => 2,
            0xf0..=0xf7 => 3,
            _ => return Ok(Some(char::REPLACEMENT_CHARACTER)),
        };
        let mut bytes = [first, 0, 0, 0];
        for slot in bytes.iter_mut().take(extra + 1).skip(1) {
            match self.next_byte()? {
                Some(b) if b & 0xc0 == 0x80 => *slot = b,
                _ => return Ok(Some(char::REPLACEMENT_CHARACTER)),
            }
        }
        match std::str::from_utf8(&bytes[..=extra]) {
            Ok(s) => Ok(s.chars().next()),
            Err(_) => Ok(Some(char::REPLACEMENT_CHARACTER)),
        }
    }

    fn advance(&mut self) -> io::Result<()> {
        self.current = self.read_char()?;
        Ok(())
    }

    // ------------------------------------------------ whitespace, comments

    /// Skips whitespace and comments starting at the current character,
    /// leaving the first significant character in `current`.
    fn skip_trivia_from_current(&mut self) -> io::Result<()> {
        loop {
            match self.current {
                Some('/') => self.skip_comment()?,
                Some(c) if c.is_whitespace() => self.advance()?,
                _ => return Ok(()),
            }
        }
    }

    /// Advances past the current character, then skips trivia.
    fn advance_skipping(&mut self) -> io::Result<()> {
        self.advance()?;
        self.skip_trivia_from_current()
    }

    fn skip_comment(&mut self) -> io::Result<()> {
        self.advance()?;
        match self.current {
            Some('/') => {
                // Line comment: discard up to and including end of line.
                loop {
                    self.advance()?;
                    match self.current {
                        None | Some('\n') => break,
                        _ => {}
                    }
                }
                Ok(())
            }
            Some('*') => {
                // Block comment: discard until "*/".
                self.advance()?;
                let mut last = '\0';
                loop {
                    match self.current {
                        None => return Ok(()),
                        Some(c) => {
                            if last == '*' && c == '/' {
                                break;
                            }
                            last = c;
                            self.advance()?;
                        }
                    }
                }
                self.advance()
            }
            // A lone '/' is never valid JSON; poison the stream position.
            _ => {
                self.current = None;
                Ok(())
            }
        }
    }

    // ------------------------------------------------------------- values

    /// Dispatches on the current character. On return, `current` holds the
    /// first character after the parsed value.
    fn read_value(&mut self) -> io::Result<DataItem> {
        match self.current {
            None => Ok(invalid()),
            Some('[') => self.read_array(),
            Some('{') => self.read_object(),
            Some('"') => self.read_string(),
            Some('n') => self.read_keyword("ull", Value::Null),
            Some('t') => self.read_keyword("rue", Value::Boolean(true)),
            Some('f') => self.read_keyword("alse", Value::Boolean(false)),
            Some(_) => self.read_number(),
        }
    }

    fn read_keyword(&mut self, rest: &str, value: Value) -> io::Result<DataItem> {
        for expected in rest.chars() {
            if self.read_char()? != Some(expected) {
                return Ok(invalid());
            }
        }
        self.advance()?;
        Ok(DataItem::decoded(
            value,
            Tags::new(),
            false,
            DecodeStatus::Translatable,
        ))
    }

    fn read_array(&mut self) -> io::Result<DataItem> {
        let mut status = DecodeStatus::Translatable;
        self.advance_skipping()?;
        if self.current == Some(']') {
            self.advance()?;
            return Ok(DataItem::decoded(
                Value::Array(Vec::new()),
                Tags::new(),
                false,
                status,
            ));
        }
        let mut items = Vec::new();
        loop {
            let item = self.read_value()?;
            status = status.join(item.decode_status());
            if status.is_failure() {
                return Ok(DataItem::invalid(status));
            }
            items.push(item);
            self.skip_trivia_from_current()?;
            match self.current {
                Some(']') => {
                    self.advance()?;
                    return Ok(DataItem::decoded(
                        Value::Array(items),
                        Tags::new(),
                        false,
                        status,
                    ));
                }
                Some(',') => self.advance_skipping()?,
                _ => return Ok(invalid()),
            }
        }
    }

    fn read_object(&mut self) -> io::Result<DataItem> {
        let mut status = DecodeStatus::Translatable;
        self.advance_skipping()?;
        if self.current == Some('}') {
            self.advance()?;
            // A zero-entry object has no key kind, same as the binary side.
            return Ok(DataItem::decoded(
                Value::EmptyMap,
                Tags::new(),
                false,
                status,
            ));
        }
        let mut map: BTreeMap<String, DataItem> = BTreeMap::new();
        loop {
            let key_item = self.read_value()?;
            status = status.join(key_item.decode_status());
            if status.is_failure() {
                return Ok(DataItem::invalid(status));
            }
            let Some(key) = key_item.as_text() else {
                return Ok(invalid());
            };
            let key = key.to_owned();
            self.skip_trivia_from_current()?;
            if self.current != Some(':') {
                return Ok(invalid());
            }
            self.advance_skipping()?;
            let value = self.read_value()?;
            status = status.join(value.decode_status());
            if status.is_failure() {
                return Ok(DataItem::invalid(status));
            }
            if map.contains_key(&key) {
                status = status.join(DecodeStatus::WellFormed);
            } else {
                map.insert(key, value);
            }
            self.skip_trivia_from_current()?;
            match self.current {
                Some('}') => {
                    self.advance()?;
                    return Ok(DataItem::decoded(
                        Value::NamedMap(map),
                        Tags::new(),
                        false,
                        status,
                    ));
                }
                Some(',') => self.advance_skipping()?,
                _ => return Ok(invalid()),
            }
        }
    }

    fn read_string(&mut self) -> io::Result<DataItem> {
        let mut text = String::new();
        loop {
            let Some(c) = self.read_char()? else {
                return Ok(invalid());
            };
            match c {
                '"' => break,
                '\\' => match self.read_escape()? {
                    Some(decoded) => text.push(decoded),
                    None => return Ok(invalid()),
                },
                _ => text.push(c),
            }
        }
        self.advance()?;
        Ok(DataItem::decoded(
            Value::TextString(text),
            Tags::new(),
            false,
            DecodeStatus::Translatable,
        ))
    }

    /// Decodes the character after a backslash. Returns `None` on an
    /// unrecognised escape or a malformed `\uXXXX` sequence.
    fn read_escape(&mut self) -> io::Result<Option<char>> {
        let Some(c) = self.read_char()? else {
            return Ok(None);
        };
        let decoded = match c {
            '"' | '\\' | '/' => c,
            'b' => '\u{8}',
            'f' => '\u{c}',
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            'u' => {
                let Some(unit) = self.read_hex4()? else {
                    return Ok(None);
                };
                match unit {
                    // A high surrogate must be followed by an escaped low
                    // surrogate; the pair combines to one code point.
                    0xd800..=0xdbff => {
                        if self.read_char()? != Some('\\') || self.read_char()? != Some('u') {
                            return Ok(None);
                        }
                        let Some(low) = self.read_hex4()? else {
                            return Ok(None);
                        };
                        if !(0xdc00..=0xdfff).contains(&low) {
                            return Ok(None);
                        }
                        let combined =
                            0x10000 + ((u32::from(unit) - 0xd800) << 10) + (u32::from(low) - 0xdc00);
                        match char::from_u32(combined) {
                            Some(c) => c,
                            None => return Ok(None),
                        }
                    }
                    0xdc00..=0xdfff => return Ok(None),
                    _ => match char::from_u32(u32::from(unit)) {
                        Some(c) => c,
                        None => return Ok(None),
                    },
                }
            }
            _ => return Ok(None),
        };
        Ok(Some(decoded))
    }

    fn read_hex4(&mut self) -> io::Result<Option<u16>> {
        let mut unit: u32 = 0;
        for _ in 0..4 {
            let Some(c) = self.read_char()? else {
                return Ok(None);
            };
            let Some(digit) = c.to_digit(16) else {
                return Ok(None);
            };
            unit = (unit << 4) | digit;
        }
        Ok(Some(unit as u16))
    }

    fn read_number(&mut self) -> io::Result<DataItem> {
        let mut negative = false;
        let mut integral = true;
        let mut mantissa: i64 = 0;
        let mut overflowed = false;
        let mut float_mantissa: f64 = 0.0;
        let mut fraction_length: i32 = 0;
        let mut exponent: i32 = 0;

        if self.current == Some('-') {
            negative = true;
            self.advance()?;
        }
        if !matches!(self.current, Some(c) if c.is_ascii_digit()) {
            return Ok(invalid());
        }
        while let Some(digit) = self.current.and_then(|c| c.to_digit(10)) {
            if !overflowed {
                match mantissa
                    .checked_mul(10)
                    .and_then(|m| m.checked_add(i64::from(digit)))
                {
                    Some(m) => mantissa = m,
                    None => overflowed = true,
                }
            }
            float_mantissa = float_mantissa * 10.0 + f64::from(digit);
            self.advance()?;
        }
        if self.current == Some('.') {
            integral = false;
            self.advance()?;
            while let Some(digit) = self.current.and_then(|c| c.to_digit(10)) {
                float_mantissa = float_mantissa * 10.0 + f64::from(digit);
                fraction_length += 1;
                self.advance()?;
            }
        }
        if matches!(self.current, Some('e') | Some('E')) {
            integral = false;
            self.advance()?;
            let mut exponent_negative = false;
            match self.current {
                Some('-') => {
                    exponent_negative = true;
                    self.advance()?;
                }
                Some('+') => self.advance()?,
                _ => {}
            }
            while let Some(digit) = self.current.and_then(|c| c.to_digit(10)) {
                exponent = exponent.saturating_mul(10).saturating_add(digit as i32);
                self.advance()?;
            }
            if exponent_negative {
                exponent = -exponent;
            }
        }

        // No fraction and no exponent: an integer, provided it fits the
        // signed 64-bit domain; otherwise fall through to double precision.
        if integral && !overflowed {
            let value = if negative { -mantissa } else { mantissa };
            return Ok(DataItem::decoded(
                Value::Integer(value),
                Tags::new(),
                false,
                DecodeStatus::Translatable,
            ));
        }
        let mut value = float_mantissa;
        if negative {
            value = -value;
        }
        // Dividing by an exactly-representable power of ten keeps short
        // decimals correctly rounded; multiplying by the rounded negative
        // power would drift by an ulp.
        let scale = exponent.saturating_sub(fraction_length);
        if scale > 0 {
            value *= 10f64.powi(scale);
        } else if scale < 0 {
            value /= 10f64.powi(scale.saturating_neg());
        }
        Ok(DataItem::decoded(
            Value::FloatDouble(value),
            Tags::new(),
            false,
            DecodeStatus::Translatable,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datawire_core::ItemType;

    fn decode(text: &str) -> DataItem {
        JsonDecoder::new(text.as_bytes()).decode().unwrap()
    }

    #[test]
    fn keywords() {
        assert_eq!(decode("null").item_type(), ItemType::Null);
        assert_eq!(decode("true").as_boolean(), Some(true));
        assert_eq!(decode("false").as_boolean(), Some(false));
        assert_eq!(decode("nul").decode_status(), DecodeStatus::Invalid);
        assert_eq!(decode("tru").decode_status(), DecodeStatus::Invalid);
    }

    #[test]
    fn numbers() {
        assert_eq!(decode("0").as_integer(), Some(0));
        assert_eq!(decode("42").as_integer(), Some(42));
        assert_eq!(decode("-7").as_integer(), Some(-7));
        // Leading zeros are tolerated.
        assert_eq!(decode("007").as_integer(), Some(7));
        assert_eq!(decode("1.5").item_type(), ItemType::FloatDouble);
        assert_eq!(decode("1.5").as_double(), Some(1.5));
        assert_eq!(decode("-0.25").as_double(), Some(-0.25));
        assert_eq!(decode("1e3").as_double(), Some(1000.0));
        assert_eq!(decode("1E+3").as_double(), Some(1000.0));
        assert_eq!(decode("25e-2").as_double(), Some(0.25));
        assert_eq!(decode("314.159e-2").as_double(), Some(3.14159));
        assert_eq!(decode("-x").decode_status(), DecodeStatus::Invalid);
    }

    #[test]
    fn huge_integer_literals_fall_back_to_double() {
        let item = decode("123456789012345678901234567890");
        assert_eq!(item.item_type(), ItemType::FloatDouble);
        let value = item.as_double().unwrap();
        let expected = 1.2345678901234568e29;
        assert!((value - expected).abs() / expected < 1e-12, "got {value}");
    }

    #[test]
    fn strings_and_escapes() {
        assert_eq!(decode("\"hello\"").as_text(), Some("hello"));
        assert_eq!(decode(r#""a\nb\tc""#).as_text(), Some("a\nb\tc"));
        assert_eq!(decode(r#""Aé""#).as_text(), Some("Aé"));
        assert_eq!(decode(r#""\/slash""#).as_text(), Some("/slash"));
        assert_eq!(decode(r#""bad \x""#).decode_status(), DecodeStatus::Invalid);
        assert_eq!(decode("\"open").decode_status(), DecodeStatus::Invalid);
    }

    #[test]
    fn surrogate_pairs_combine() {
        assert_eq!(decode(r#""😀""#).as_text(), Some("😀"));
        assert_eq!(
            decode(r#""\ud83d alone""#).decode_status(),
            DecodeStatus::Invalid
        );
        assert_eq!(
            decode(r#""\ude00""#).decode_status(),
            DecodeStatus::Invalid
        );
    }

    #[test]
    fn arrays() {
        let item = decode("[1, 2, 3]");
        let children = item.as_array().unwrap();
        assert_eq!(children.len(), 3);
        assert_eq!(children[0].as_integer(), Some(1));
        assert_eq!(decode("[]").as_array().unwrap().len(), 0);
        assert_eq!(decode("[1, 2").decode_status(), DecodeStatus::Invalid);
        assert_eq!(decode("[1 2]").decode_status(), DecodeStatus::Invalid);
    }

    #[test]
    fn objects() {
        let item = decode("{\"a\": 1, \"b\": [true, null]}");
        let map = item.as_named_map().unwrap();
        assert_eq!(map["a"].as_integer(), Some(1));
        assert_eq!(map["b"].as_array().unwrap().len(), 2);
        assert_eq!(decode("{}").item_type(), ItemType::EmptyMap);
        assert_eq!(decode("{\"a\" 1}").decode_status(), DecodeStatus::Invalid);
        assert_eq!(decode("{1: 2}").decode_status(), DecodeStatus::Invalid);
    }

    #[test]
    fn duplicate_keys_keep_first_and_downgrade() {
        let item = decode("{\"a\": 1, \"a\": 2}");
        assert_eq!(item.decode_status(), DecodeStatus::WellFormed);
        assert_eq!(item.as_named_map().unwrap()["a"].as_integer(), Some(1));
    }

    #[test]
    fn comments_are_discarded() {
        assert_eq!(decode("// leading\n 42").as_integer(), Some(42));
        assert_eq!(decode("/* block */ 42").as_integer(), Some(42));
        let item = decode("[1, // one\n 2, /* two */ 3]");
        assert_eq!(item.as_array().unwrap().len(), 3);
        let item = decode("{\"a\" /* key */ : /* value */ 1}");
        assert_eq!(item.as_named_map().unwrap()["a"].as_integer(), Some(1));
    }

    #[test]
    fn unterminated_input_is_invalid() {
        assert_eq!(decode("").decode_status(), DecodeStatus::Invalid);
        assert_eq!(decode("   ").decode_status(), DecodeStatus::Invalid);
        assert_eq!(decode("{\"a\":").decode_status(), DecodeStatus::Invalid);
    }

    #[test]
    fn whitespace_tolerance() {
        assert_eq!(decode("  \t\n 42 ").as_integer(), Some(42));
        let item = decode(" { \"k\" : [ 1 , 2 ] } ");
        assert_eq!(item.as_named_map().unwrap()["k"].as_array().unwrap().len(), 2);
    }
}
