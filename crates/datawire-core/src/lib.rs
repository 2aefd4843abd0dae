//! Core value model for the datawire serialisation stack.
//!
//! Defines the [`DataItem`] tree that both wire formats decode into and
//! encode from, the [`DecodeStatus`] lattice that tracks how cleanly an item
//! was produced, the [`DataItemFactory`] construction surface, and the
//! half-precision bit conversions the CBOR codec relies on.

mod f16;
mod factory;
mod item;
mod status;

pub use f16::{decode_f16, encode_f16};
pub use factory::{DataItemFactory, SimpleValueError};
pub use item::{DataItem, ItemType, MutationError, StatusError, Tags, Value};
pub use status::DecodeStatus;
