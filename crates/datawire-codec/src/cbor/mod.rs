//! Binary CBOR codec (RFC 7049).

pub mod constants;

mod decoder;
mod encoder;

pub use decoder::CborDecoder;
pub use encoder::CborEncoder;
