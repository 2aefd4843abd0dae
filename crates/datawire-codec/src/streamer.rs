//! Stream codec façade.
//!
//! [`DataStreamer`] bundles the four encode/decode entry points over
//! caller-owned streams. The streamer never closes or buffers the streams it
//! is handed; cancellation is the caller closing the stream, which surfaces
//! here as an `io::Error`.

use std::io::{self, Read, Write};

use datawire_core::DataItem;

use crate::cbor::{CborDecoder, CborEncoder};
use crate::json::{JsonDecoder, JsonEncoder};

#[derive(Debug, Clone, Copy, Default)]
pub struct DataStreamer;

impl DataStreamer {
    pub fn new() -> DataStreamer {
        DataStreamer
    }

    /// Encodes `item` as CBOR onto `writer`.
    pub fn encode_cbor<W: Write>(&self, item: &DataItem, writer: &mut W) -> io::Result<()> {
        CborEncoder::new(&mut *writer).encode(item)
    }

    /// Decodes one CBOR item from `reader`.
    pub fn decode_cbor<R: Read>(&self, reader: &mut R) -> io::Result<DataItem> {
        CborDecoder::new(&mut *reader).decode()
    }

    /// Encodes `item` as JSON onto `writer`, optionally pretty-printed.
    pub fn encode_json<W: Write>(
        &self,
        item: &DataItem,
        writer: &mut W,
        prettify: bool,
    ) -> io::Result<()> {
        JsonEncoder::new(&mut *writer).encode(item, prettify)?;
        writer.flush()
    }

    /// Decodes one JSON document from `reader`.
    pub fn decode_json<R: Read>(&self, reader: &mut R) -> io::Result<DataItem> {
        JsonDecoder::new(&mut *reader).decode()
    }
}

/// Encodes a data item to a CBOR byte vector.
pub fn cbor_to_vec(item: &DataItem) -> io::Result<Vec<u8>> {
    let mut out = Vec::new();
    DataStreamer::new().encode_cbor(item, &mut out)?;
    Ok(out)
}

/// Decodes a data item from a CBOR byte slice.
pub fn cbor_from_slice(mut bytes: &[u8]) -> io::Result<DataItem> {
    DataStreamer::new().decode_cbor(&mut bytes)
}

/// Encodes a data item to a JSON string.
pub fn json_to_string(item: &DataItem, prettify: bool) -> io::Result<String> {
    let mut out = Vec::new();
    DataStreamer::new().encode_json(item, &mut out, prettify)?;
    String::from_utf8(out).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Decodes a data item from a JSON string.
pub fn json_from_str(text: &str) -> io::Result<DataItem> {
    DataStreamer::new().decode_json(&mut text.as_bytes())
}
