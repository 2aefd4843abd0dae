//! Stream codecs for the datawire data-item model.
//!
//! Two interchangeable wire formats over one value model: the binary CBOR
//! codec ([`cbor`]) and the text JSON codec ([`json`]), plus the
//! [`DataStreamer`] façade bundling both. Codecs run to completion on the
//! caller's thread and block only on the streams the caller provides.

pub mod cbor;
pub mod json;

mod streamer;

pub use streamer::{
    cbor_from_slice, cbor_to_vec, json_from_str, json_to_string, DataStreamer,
};
