//! Object schema nodes.
//!
//! Named-property records in two flavours sharing one payload. A standard
//! object keeps a named map in both tokenised and expanded positions. A
//! tokenizable object swaps property names for per-property integer tokens
//! in tokenised position: an indexed map on the binary side, or a named map
//! whose keys are strict decimal strings when the document travelled through
//! JSON (which has no integer keys).

use std::collections::BTreeMap;
use std::sync::Arc;

use datawire_core::{DataItem, DataItemFactory, DecodeStatus, ItemType, Tags, Value};

use crate::builder::{build_node_map, field_boolean, field_named_map, schema_err, BuildCtx};
use crate::error::InvalidSchema;
use crate::node::{member_path, warn, NodeBase, SchemaNode};
use crate::sink::WarningSink;

#[derive(Debug, Clone)]
pub struct ObjectNode {
    properties: Arc<[SchemaNode]>,
    schema_final: bool,
}

/// Strict decimal integer parse for tokenised keys carried as JSON text: no
/// leading `+`, no negative zero, so every integer has exactly one
/// representation.
pub(crate) fn strict_parse_i64(source: &str) -> Option<i64> {
    if source.starts_with('+') {
        return None;
    }
    let value = source.parse::<i64>().ok()?;
    if value == 0 && source.starts_with('-') {
        return None;
    }
    Some(value)
}

impl ObjectNode {
    /// Builds the shared property list; `tokenizable` additionally requires
    /// a unique `token` on every property.
    pub(crate) fn build(
        map: &BTreeMap<String, DataItem>,
        ctx: &BuildCtx<'_>,
        path: &str,
        tokenizable: bool,
    ) -> Result<ObjectNode, InvalidSchema> {
        let schema_final = field_boolean(map, "final", path)?.unwrap_or(false);
        let Some(source_properties) = field_named_map(map, "properties", path)? else {
            return Err(schema_err(path, "'properties' field not valid"));
        };

        let mut properties = Vec::with_capacity(source_properties.len());
        let mut seen_tokens = BTreeMap::new();
        for (name, property_item) in source_properties {
            let Some(property_map) = property_item.as_named_map() else {
                return Err(schema_err(
                    path,
                    format!("object property '{name}' is not valid"),
                ));
            };
            let required = field_boolean(property_map, "required", path)?.unwrap_or(false);
            let token = if tokenizable {
                let Some(token_item) = property_map.get("token") else {
                    return Err(schema_err(
                        path,
                        format!("object property '{name}' has no valid 'token' field"),
                    ));
                };
                let Some(token) = token_item.as_integer() else {
                    return Err(schema_err(
                        path,
                        format!("object property '{name}' has no valid 'token' field"),
                    ));
                };
                if seen_tokens.insert(token, name.clone()).is_some() {
                    return Err(schema_err(
                        path,
                        format!("object property '{name}' has a duplicate 'token' value"),
                    ));
                }
                Some(token)
            } else {
                None
            };

            let mut property =
                build_node_map(property_map, ctx, &member_path(&format!("{path}.properties"), name))?;
            property.base.name = Some(name.clone());
            property.base.optional = !required;
            property.base.token_value = token;
            properties.push(property);
        }
        Ok(ObjectNode {
            properties: properties.into(),
            schema_final,
        })
    }

    pub(crate) fn create_default(&self, base: &NodeBase, include_all: bool) -> DataItem {
        let mut entries = BTreeMap::new();
        for property in self.properties.iter() {
            if include_all || !property.is_optional() {
                entries.insert(
                    property.base.name().to_owned(),
                    property.create_default(include_all),
                );
            }
        }
        DataItemFactory::new().named_map_from(entries, &base.tag_values, true)
    }

    // ------------------------------------------------------ standard form

    /// Standard objects keep named maps in both forms.
    pub(crate) fn validate_named(
        &self,
        item: &DataItem,
        tokenized: bool,
        recursive: bool,
        sink: Option<&dyn WarningSink>,
        path: &str,
    ) -> bool {
        let Some(entries) = item.as_named_map() else {
            warn(sink, path, "source data is not a named map");
            return false;
        };
        let mut matched = 0usize;
        for property in self.properties.iter() {
            let name = property.base.name();
            match entries.get(name) {
                None => {
                    if !property.is_optional() {
                        warn(
                            sink,
                            path,
                            &format!("required property '{name}' is not present"),
                        );
                        return false;
                    }
                }
                Some(value) => {
                    if recursive {
                        let property_path = member_path(path, name);
                        if !property.validate_at(value, tokenized, true, sink, &property_path) {
                            return false;
                        }
                    }
                    matched += 1;
                }
            }
        }
        if self.schema_final && matched != entries.len() {
            warn(sink, path, "unknown property for 'final' object schema");
            return false;
        }
        true
    }

    pub(crate) fn expand_named(
        &self,
        item: &DataItem,
        sink: Option<&dyn WarningSink>,
        path: &str,
    ) -> DataItem {
        if !self.validate_named(item, true, false, sink, path) {
            return DataItem::invalid(DecodeStatus::FailedSchema);
        }
        match self.transform_named(item, sink, path, Mode::Expand) {
            Ok(entries) => DataItem::decoded(
                Value::NamedMap(entries),
                Tags::from_slice(item.tags()),
                false,
                DecodeStatus::Expanded,
            ),
            Err(failure) => failure,
        }
    }

    pub(crate) fn tokenize_named(
        &self,
        item: &DataItem,
        sink: Option<&dyn WarningSink>,
        path: &str,
    ) -> DataItem {
        if !self.validate_named(item, false, false, sink, path) {
            return DataItem::invalid(DecodeStatus::FailedSchema);
        }
        match self.transform_named(item, sink, path, Mode::Tokenize) {
            Ok(entries) => DataItem::decoded(
                Value::NamedMap(entries),
                Tags::from_slice(item.tags()),
                false,
                DecodeStatus::Tokenized,
            ),
            Err(failure) => failure,
        }
    }

    fn transform_named(
        &self,
        item: &DataItem,
        sink: Option<&dyn WarningSink>,
        path: &str,
        mode: Mode,
    ) -> Result<BTreeMap<String, DataItem>, DataItem> {
        let source = item.as_named_map();
        let mut entries = BTreeMap::new();
        for property in self.properties.iter() {
            let name = property.base.name();
            let Some(original) = source.and_then(|map| map.get(name)) else {
                continue;
            };
            let property_path = member_path(path, name);
            let result = match mode {
                Mode::Expand => property.expand_at(original, sink, &property_path),
                Mode::Tokenize => property.tokenize_at(original, sink, &property_path),
            };
            if result.decode_status().is_failure() {
                return Err(result);
            }
            entries.insert(name.to_owned(), result);
        }
        Ok(entries)
    }

    // --------------------------------------------------- tokenizable form

    pub(crate) fn validate_tokenizable(
        &self,
        item: &DataItem,
        tokenized: bool,
        recursive: bool,
        sink: Option<&dyn WarningSink>,
        path: &str,
    ) -> bool {
        if tokenized {
            match self.indexed_view(item, sink, path) {
                Some(view) => self.validate_indexed(&view, recursive, sink, path),
                None => false,
            }
        } else {
            self.validate_named(item, tokenized, recursive, sink, path)
        }
    }

    pub(crate) fn expand_tokenizable(
        &self,
        item: &DataItem,
        sink: Option<&dyn WarningSink>,
        path: &str,
    ) -> DataItem {
        let Some(view) = self.indexed_view(item, sink, path) else {
            return DataItem::invalid(DecodeStatus::FailedSchema);
        };
        if !self.validate_indexed(&view, false, sink, path) {
            return DataItem::invalid(DecodeStatus::FailedSchema);
        }
        let mut entries = BTreeMap::new();
        for property in self.properties.iter() {
            let Some(token) = property.token_value() else {
                continue;
            };
            let Some(original) = view.get(&token).copied() else {
                continue;
            };
            let property_path = member_path(path, property.base.name());
            let result = property.expand_at(original, sink, &property_path);
            if result.decode_status().is_failure() {
                return result;
            }
            entries.insert(property.base.name().to_owned(), result);
        }
        DataItem::decoded(
            Value::NamedMap(entries),
            Tags::from_slice(item.tags()),
            false,
            DecodeStatus::Expanded,
        )
    }

    pub(crate) fn tokenize_tokenizable(
        &self,
        item: &DataItem,
        sink: Option<&dyn WarningSink>,
        path: &str,
    ) -> DataItem {
        if !self.validate_named(item, false, false, sink, path) {
            return DataItem::invalid(DecodeStatus::FailedSchema);
        }
        let source = item.as_named_map();
        let mut entries = BTreeMap::new();
        for property in self.properties.iter() {
            let name = property.base.name();
            let Some(original) = source.and_then(|map| map.get(name)) else {
                continue;
            };
            let Some(token) = property.token_value() else {
                continue;
            };
            let property_path = member_path(path, name);
            let result = property.tokenize_at(original, sink, &property_path);
            if result.decode_status().is_failure() {
                return result;
            }
            entries.insert(token, result);
        }
        DataItem::decoded(
            Value::IndexedMap(entries),
            Tags::from_slice(item.tags()),
            false,
            DecodeStatus::Tokenized,
        )
    }

    /// Tokenised position accepts an indexed map directly, or a named map
    /// whose keys are strict decimal token strings (JSON carriage).
    fn indexed_view<'a>(
        &self,
        item: &'a DataItem,
        sink: Option<&dyn WarningSink>,
        path: &str,
    ) -> Option<BTreeMap<i64, &'a DataItem>> {
        match item.item_type() {
            ItemType::IndexedMap | ItemType::EmptyMap => Some(
                item.as_indexed_map()?
                    .iter()
                    .map(|(token, value)| (*token, value))
                    .collect(),
            ),
            ItemType::NamedMap => {
                let mut view = BTreeMap::new();
                for (key, value) in item.as_named_map()? {
                    let Some(token) = strict_parse_i64(key) else {
                        warn(
                            sink,
                            path,
                            &format!("key '{key}' is not a strict decimal token"),
                        );
                        return None;
                    };
                    view.insert(token, value);
                }
                Some(view)
            }
            _ => {
                warn(sink, path, "a valid tokenized map was not specified");
                None
            }
        }
    }

    fn validate_indexed(
        &self,
        view: &BTreeMap<i64, &DataItem>,
        recursive: bool,
        sink: Option<&dyn WarningSink>,
        path: &str,
    ) -> bool {
        let mut matched = 0usize;
        for property in self.properties.iter() {
            let Some(token) = property.token_value() else {
                continue;
            };
            match view.get(&token).copied() {
                None => {
                    if !property.is_optional() {
                        warn(
                            sink,
                            path,
                            &format!(
                                "required property '{}' is not present",
                                property.base.name()
                            ),
                        );
                        return false;
                    }
                }
                Some(value) => {
                    if recursive {
                        let property_path = member_path(path, property.base.name());
                        if !property.validate_at(value, true, true, sink, &property_path) {
                            return false;
                        }
                    }
                    matched += 1;
                }
            }
        }
        if self.schema_final && matched != view.len() {
            warn(sink, path, "unknown property for 'final' object schema");
            return false;
        }
        true
    }
}

#[derive(Clone, Copy)]
enum Mode {
    Expand,
    Tokenize,
}
