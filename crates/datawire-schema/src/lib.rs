//! Schema engine for datawire documents.
//!
//! Schemas are documents in the same data-item model they describe. A parsed
//! [`SchemaDefinition`] validates documents, materialises defaults and
//! transforms between the compact tokenised shape (integer tokens,
//! positional arrays) and the readable expanded shape (text identifiers,
//! named maps). The engine never touches the codecs: it transforms item
//! trees produced by either of them.

mod builder;
mod definition;
mod error;
mod node;
mod nodes;
mod sink;

pub use builder::schema_definition;
pub use definition::SchemaDefinition;
pub use error::InvalidSchema;
pub use node::{SchemaDataType, SchemaNode, MAX_INTEGER_VALUE, MIN_INTEGER_VALUE};
pub use sink::{TracingSink, WarningSink};
