//! Schema document parsing.
//!
//! A schema document is itself a data item: a named map with a `title`, a
//! `root` node definition and an optional `definitions` map of reusable
//! prototype nodes. Parsing is a recursive descent on each node's `type`
//! field; a reference to a user-defined type substitutes a duplicate of its
//! prototype, so per-site attribute assignments never leak between uses.

use std::collections::BTreeMap;
use std::sync::Arc;

use datawire_core::{DataItem, Tags};

use crate::definition::SchemaDefinition;
use crate::error::InvalidSchema;
use crate::node::{NodeKind, SchemaNode};
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

/// Build context threaded through the recursive descent.
pub(crate) struct BuildCtx<'a> {
    pub definitions: Option<&'a BTreeMap<String, SchemaNode>>,
}

pub(crate) fn schema_err(path: &str, message: impl Into<String>) -> InvalidSchema {
    InvalidSchema::new(path, message)
}

// ------------------------------------------------------- field extraction

pub(crate) fn field_text(
    map: &BTreeMap<String, DataItem>,
    key: &str,
    path: &str,
) -> Result<Option<String>, InvalidSchema> {
    match map.get(key) {
        None => Ok(None),
        Some(item) => match item.as_text() {
            Some(text) => Ok(Some(text.to_owned())),
            None => Err(schema_err(path, format!("'{key}' field not valid"))),
        },
    }
}

pub(crate) fn field_integer(
    map: &BTreeMap<String, DataItem>,
    key: &str,
    path: &str,
) -> Result<Option<i64>, InvalidSchema> {
    match map.get(key) {
        None => Ok(None),
        Some(item) => match item.as_integer() {
            Some(value) => Ok(Some(value)),
            None => Err(schema_err(path, format!("'{key}' field not valid"))),
        },
    }
}

pub(crate) fn field_boolean(
    map: &BTreeMap<String, DataItem>,
    key: &str,
    path: &str,
) -> Result<Option<bool>, InvalidSchema> {
    match map.get(key) {
        None => Ok(None),
        Some(item) => match item.value() {
            datawire_core::Value::Boolean(value) => Ok(Some(*value)),
            _ => Err(schema_err(path, format!("'{key}' field not valid"))),
        },
    }
}

pub(crate) fn field_named_map<'a>(
    map: &'a BTreeMap<String, DataItem>,
    key: &str,
    path: &str,
) -> Result<Option<&'a BTreeMap<String, DataItem>>, InvalidSchema> {
    match map.get(key) {
        None => Ok(None),
        Some(item) => match item.as_named_map() {
            Some(entries) => Ok(Some(entries)),
            None => Err(schema_err(path, format!("'{key}' field not valid"))),
        },
    }
}

// ------------------------------------------------------ recursive descent

/// Builds a schema node from a data item that must be a named map.
pub(crate) fn build_node_item(
    item: &DataItem,
    ctx: &BuildCtx<'_>,
    path: &str,
) -> Result<SchemaNode, InvalidSchema> {
    let Some(map) = item.as_named_map() else {
        return Err(schema_err(path, "schema node must be a named map"));
    };
    build_node_map(map, ctx, path)
}

/// Builds a schema node from its named-map fields.
pub(crate) fn build_node_map(
    map: &BTreeMap<String, DataItem>,
    ctx: &BuildCtx<'_>,
    path: &str,
) -> Result<SchemaNode, InvalidSchema> {
    let Some(type_name) = field_text(map, "type", path)? else {
        return Err(schema_err(path, "'type' field not valid"));
    };

    let mut node = match type_name.as_str() {
        "boolean" => SchemaNode::new(NodeKind::Boolean(BooleanNode::build(map, path)?)),
        "integer" => SchemaNode::new(NodeKind::Integer(IntegerNode::build(map, path)?)),
        "number" => SchemaNode::new(NodeKind::Number(NumberNode::build(map, path)?)),
        "string" => SchemaNode::new(NodeKind::Text(TextNode::build(map, path)?)),
        "encoded" => SchemaNode::new(NodeKind::Encoded(EncodedNode::build(map, path)?)),
        "enumerated" => SchemaNode::new(NodeKind::Enumerated(EnumeratedNode::build(map, path)?)),
        "array" => SchemaNode::new(NodeKind::Array(ArrayNode::build(map, ctx, path)?)),
        "map" => SchemaNode::new(NodeKind::Map(MapNode::build(map, ctx, path)?)),
        "structure" => SchemaNode::new(NodeKind::Structure(StructureNode::build(map, ctx, path)?)),
        "selection" => SchemaNode::new(NodeKind::Selection(SelectionNode::build(map, ctx, path)?)),
        "object" => {
            // The tokenize flag selects between the two object flavours.
            let tokenizable = field_boolean(map, "tokenize", path)?.unwrap_or(false);
            let object = ObjectNode::build(map, ctx, path, tokenizable)?;
            if tokenizable {
                SchemaNode::new(NodeKind::TokenizableObject(object))
            } else {
                SchemaNode::new(NodeKind::StandardObject(object))
            }
        }
        // Anything else refers to a prototype from the definitions table;
        // the reference site gets its own duplicate.
        _ => match ctx.definitions.and_then(|defs| defs.get(&type_name)) {
            Some(prototype) => prototype.clone(),
            None => {
                return Err(schema_err(
                    path,
                    format!("'type' field has unknown value '{type_name}'"),
                ));
            }
        },
    };

    node.base.type_name = Some(type_name);
    apply_common_options(map, path, &mut node)?;
    Ok(node)
}

/// Options every node accepts: `description` and `tagValues`.
fn apply_common_options(
    map: &BTreeMap<String, DataItem>,
    path: &str,
    node: &mut SchemaNode,
) -> Result<(), InvalidSchema> {
    if let Some(description) = field_text(map, "description", path)? {
        node.base.description = Some(description);
    }
    if let Some(tags_item) = map.get("tagValues") {
        let Some(entries) = tags_item.as_array() else {
            return Err(schema_err(path, "'tagValues' field not valid"));
        };
        let mut tags = Tags::new();
        for entry in entries {
            match entry.as_integer() {
                Some(tag) if (0..=i64::from(u32::MAX >> 1)).contains(&tag) => {
                    tags.push(tag as u32);
                }
                _ => return Err(schema_err(path, "'tagValues' field not valid")),
            }
        }
        node.base.tag_values = tags;
    }
    Ok(())
}

// -------------------------------------------------------------- top level

/// Parses a schema document into a reusable [`SchemaDefinition`].
///
/// The document must be a named map carrying a text `title` and a `root`
/// node definition; an optional `definitions` map introduces user types for
/// later `type` references. Diagnostics from the resulting definition's
/// operations go to `sink` when one is supplied.
pub fn schema_definition(
    item: &DataItem,
    sink: Option<Arc<dyn WarningSink>>,
) -> Result<SchemaDefinition, InvalidSchema> {
    let Some(document) = item.as_named_map() else {
        return Err(schema_err("", "schema toplevel node must be a named map"));
    };

    let Some(title) = field_text(document, "title", "")? else {
        return Err(schema_err("", "schema toplevel 'title' field not present"));
    };

    // Prototype definitions build without visibility of each other.
    let mut definitions: Option<BTreeMap<String, SchemaNode>> = None;
    if let Some(definition_items) = field_named_map(document, "definitions", "")? {
        let mut built = BTreeMap::new();
        for (name, definition_item) in definition_items {
            let definition_path = format!("definitions.{name}");
            let ctx = BuildCtx { definitions: None };
            let node = build_node_item(definition_item, &ctx, &definition_path)?;
            built.insert(name.clone(), node);
        }
        definitions = Some(built);
    }

    let Some(root_item) = document.get("root") else {
        return Err(schema_err("", "schema toplevel 'root' field not present"));
    };
    let ctx = BuildCtx {
        definitions: definitions.as_ref(),
    };
    let root = build_node_item(root_item, &ctx, "root")?;
    Ok(SchemaDefinition::new(title, root, sink))
}
