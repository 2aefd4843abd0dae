//! Schema node tree.
//!
//! A schema is a tree of [`SchemaNode`]s: a variant-specific payload
//! ([`NodeKind`], twelve shapes) next to a common attribute block
//! ([`NodeBase`]) that the *parent* context assigns after building: the
//! property name, the integer token or positional index, and whether the
//! node is optional at its site. Payload tables are shared behind `Arc`, so
//! duplicating a prototype from the `definitions` section is cheap and
//! per-site attribute overrides never leak back into siblings.

use datawire_core::{DataItem, Tags};

use crate::nodes::array::ArrayNode;
use crate::nodes::boolean::BooleanNode;
use crate::nodes::encoded::EncodedNode;
use crate::nodes::enumerated::EnumeratedNode;
use crate::nodes::integer::IntegerNode;
use crate::nodes::map::MapNode;
use crate::nodes::number::NumberNode;
use crate::nodes::object::ObjectNode;
use crate::nodes::selection::SelectionNode;
use crate::nodes::structure::StructureNode;
use crate::nodes::text::TextNode;
use crate::sink::WarningSink;

/// Integer domain accepted by schema-constrained integers, limited to the
/// range exactly representable in an IEEE 754 double.
pub const MAX_INTEGER_VALUE: i64 = 1 << 53;
pub const MIN_INTEGER_VALUE: i64 = -(1 << 53);

/// Largest finite half-precision magnitude.
pub const MAX_HALF_PRECISION: f64 = 65504.0;

/// The twelve schema data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaDataType {
    Boolean,
    Integer,
    Number,
    TextString,
    ByteString,
    Enumerated,
    Array,
    Map,
    StandardObject,
    TokenizableObject,
    Structure,
    Selection,
}

/// Common attributes shared by every schema node.
///
/// `name`, `token_value` and `optional` are assigned by the enclosing
/// object/structure/selection builder; `description`, `type_name` and
/// `tag_values` come from the node's own document entry.
#[derive(Debug, Clone)]
pub struct NodeBase {
    pub(crate) name: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) type_name: Option<String>,
    pub(crate) tag_values: Tags,
    pub(crate) token_value: Option<i64>,
    pub(crate) optional: bool,
}

impl Default for NodeBase {
    fn default() -> NodeBase {
        NodeBase {
            name: None,
            description: None,
            type_name: None,
            tag_values: Tags::new(),
            token_value: None,
            optional: true,
        }
    }
}

impl NodeBase {
    /// Site-assigned member name; empty for the document root.
    pub(crate) fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }
}

/// Variant payload of a schema node.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Boolean(BooleanNode),
    Integer(IntegerNode),
    Number(NumberNode),
    Text(TextNode),
    Encoded(EncodedNode),
    Enumerated(EnumeratedNode),
    Array(ArrayNode),
    Map(MapNode),
    StandardObject(ObjectNode),
    TokenizableObject(ObjectNode),
    Structure(StructureNode),
    Selection(SelectionNode),
}

/// One node of a schema tree.
#[derive(Debug, Clone)]
pub struct SchemaNode {
    pub(crate) base: NodeBase,
    pub(crate) kind: NodeKind,
}

impl SchemaNode {
    pub(crate) fn new(kind: NodeKind) -> SchemaNode {
        SchemaNode {
            base: NodeBase::default(),
            kind,
        }
    }

    pub fn schema_data_type(&self) -> SchemaDataType {
        match &self.kind {
            NodeKind::Boolean(_) => SchemaDataType::Boolean,
            NodeKind::Integer(_) => SchemaDataType::Integer,
            NodeKind::Number(_) => SchemaDataType::Number,
            NodeKind::Text(_) => SchemaDataType::TextString,
            NodeKind::Encoded(_) => SchemaDataType::ByteString,
            NodeKind::Enumerated(_) => SchemaDataType::Enumerated,
            NodeKind::Array(_) => SchemaDataType::Array,
            NodeKind::Map(_) => SchemaDataType::Map,
            NodeKind::StandardObject(_) => SchemaDataType::StandardObject,
            NodeKind::TokenizableObject(_) => SchemaDataType::TokenizableObject,
            NodeKind::Structure(_) => SchemaDataType::Structure,
            NodeKind::Selection(_) => SchemaDataType::Selection,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.base.name.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.base.description.as_deref()
    }

    pub fn type_name(&self) -> Option<&str> {
        self.base.type_name.as_deref()
    }

    pub fn token_value(&self) -> Option<i64> {
        self.base.token_value
    }

    pub fn is_optional(&self) -> bool {
        self.base.optional
    }

    /// Synthesises a value satisfying this schema. Optional object and
    /// structure members are included only when `include_all` is set.
    pub fn create_default(&self, include_all: bool) -> DataItem {
        match &self.kind {
            NodeKind::Boolean(node) => node.create_default(&self.base),
            NodeKind::Integer(node) => node.create_default(&self.base),
            NodeKind::Number(node) => node.create_default(&self.base),
            NodeKind::Text(node) => node.create_default(&self.base),
            NodeKind::Encoded(node) => node.create_default(&self.base),
            NodeKind::Enumerated(node) => node.create_default(&self.base),
            NodeKind::Array(node) => node.create_default(&self.base, include_all),
            NodeKind::Map(node) => node.create_default(&self.base),
            NodeKind::StandardObject(node) | NodeKind::TokenizableObject(node) => {
                node.create_default(&self.base, include_all)
            }
            NodeKind::Structure(node) => node.create_default(&self.base, include_all),
            NodeKind::Selection(node) => node.create_default(&self.base, include_all),
        }
    }

    /// Structural check of `item` against this schema.
    pub(crate) fn validate_at(
        &self,
        item: &DataItem,
        tokenized: bool,
        recursive: bool,
        sink: Option<&dyn WarningSink>,
        path: &str,
    ) -> bool {
        match &self.kind {
            NodeKind::Boolean(node) => node.validate(item, sink, path),
            NodeKind::Integer(node) => node.validate(item, sink, path),
            NodeKind::Number(node) => node.validate(item, sink, path),
            NodeKind::Text(node) => node.validate(item, sink, path),
            NodeKind::Encoded(node) => node.validate(item, sink, path),
            NodeKind::Enumerated(node) => node.validate(item, tokenized, sink, path),
            NodeKind::Array(node) => node.validate(item, tokenized, recursive, sink, path),
            NodeKind::Map(node) => node.validate(item, tokenized, recursive, sink, path),
            NodeKind::StandardObject(node) => {
                node.validate_named(item, tokenized, recursive, sink, path)
            }
            NodeKind::TokenizableObject(node) => {
                node.validate_tokenizable(item, tokenized, recursive, sink, path)
            }
            NodeKind::Structure(node) => node.validate(item, tokenized, recursive, sink, path),
            NodeKind::Selection(node) => node.validate(item, tokenized, recursive, sink, path),
        }
    }

    /// Converts tokenised form to expanded form, validating on the way.
    pub(crate) fn expand_at(
        &self,
        item: &DataItem,
        sink: Option<&dyn WarningSink>,
        path: &str,
    ) -> DataItem {
        match &self.kind {
            NodeKind::Boolean(node) => node.expand(item, sink, path),
            NodeKind::Integer(node) => node.expand(item, sink, path),
            NodeKind::Number(node) => node.expand(item, sink, path),
            NodeKind::Text(node) => node.expand(item, sink, path),
            NodeKind::Encoded(node) => node.expand(item, sink, path),
            NodeKind::Enumerated(node) => node.expand(item, sink, path),
            NodeKind::Array(node) => node.expand(item, sink, path),
            NodeKind::Map(node) => node.expand(item, sink, path),
            NodeKind::StandardObject(node) => node.expand_named(item, sink, path),
            NodeKind::TokenizableObject(node) => node.expand_tokenizable(item, sink, path),
            NodeKind::Structure(node) => node.expand(item, sink, path),
            NodeKind::Selection(node) => node.expand(item, sink, path),
        }
    }

    /// Converts expanded form to tokenised form, validating on the way.
    pub(crate) fn tokenize_at(
        &self,
        item: &DataItem,
        sink: Option<&dyn WarningSink>,
        path: &str,
    ) -> DataItem {
        match &self.kind {
            NodeKind::Boolean(node) => node.tokenize(item, sink, path),
            NodeKind::Integer(node) => node.tokenize(item, sink, path),
            NodeKind::Number(node) => node.tokenize(item, sink, path),
            NodeKind::Text(node) => node.tokenize(item, sink, path),
            NodeKind::Encoded(node) => node.tokenize(item, sink, path),
            NodeKind::Enumerated(node) => node.tokenize(item, sink, path),
            NodeKind::Array(node) => node.tokenize(item, sink, path),
            NodeKind::Map(node) => node.tokenize(item, sink, path),
            NodeKind::StandardObject(node) => node.tokenize_named(item, sink, path),
            NodeKind::TokenizableObject(node) => node.tokenize_tokenizable(item, sink, path),
            NodeKind::Structure(node) => node.tokenize(item, sink, path),
            NodeKind::Selection(node) => node.tokenize(item, sink, path),
        }
    }
}

/// Reports a validation warning when a sink is attached.
pub(crate) fn warn(sink: Option<&dyn WarningSink>, path: &str, message: &str) {
    if let Some(sink) = sink {
        sink.warn(path, message);
    }
}

/// Dotted member path (`root.records.alpha`).
pub(crate) fn member_path(path: &str, name: &str) -> String {
    format!("{path}.{name}")
}

/// Indexed element path (`root.entries[3]`).
pub(crate) fn element_path(path: &str, index: usize) -> String {
    format!("{path}[{index}]")
}
