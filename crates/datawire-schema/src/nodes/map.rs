//! Map schema node.
//!
//! Free-form named maps: keys are opaque and never tokenised, values all
//! conform to the single `entries` schema.

use std::collections::BTreeMap;
use std::sync::Arc;

use datawire_core::{DataItem, DataItemFactory, DecodeStatus, Tags, Value};

use crate::builder::{build_node_map, field_named_map, schema_err, BuildCtx};
use crate::error::InvalidSchema;
use crate::node::{member_path, warn, NodeBase, SchemaNode};
use crate::sink::WarningSink;

#[derive(Debug, Clone)]
pub struct MapNode {
    values_schema: Arc<SchemaNode>,
}

impl MapNode {
    pub(crate) fn build(
        map: &BTreeMap<String, DataItem>,
        ctx: &BuildCtx<'_>,
        path: &str,
    ) -> Result<MapNode, InvalidSchema> {
        let Some(entries) = field_named_map(map, "entries", path)? else {
            return Err(schema_err(path, "'entries' field not valid"));
        };
        let values_schema = build_node_map(entries, ctx, &format!("{path}.entries"))?;
        Ok(MapNode {
            values_schema: Arc::new(values_schema),
        })
    }

    pub(crate) fn create_default(&self, base: &NodeBase) -> DataItem {
        DataItemFactory::new().named_map(&base.tag_values, false)
    }

    pub(crate) fn validate(
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
        if recursive {
            for (key, value) in entries {
                let entry_path = member_path(path, key);
                if !self
                    .values_schema
                    .validate_at(value, tokenized, true, sink, &entry_path)
                {
                    return false;
                }
            }
        }
        true
    }

    pub(crate) fn expand(
        &self,
        item: &DataItem,
        sink: Option<&dyn WarningSink>,
        path: &str,
    ) -> DataItem {
        if !self.validate(item, true, false, sink, path) {
            return DataItem::invalid(DecodeStatus::FailedSchema);
        }
        let mut expanded = BTreeMap::new();
        for (key, value) in item.as_named_map().into_iter().flatten() {
            let entry_path = member_path(path, key);
            let result = self.values_schema.expand_at(value, sink, &entry_path);
            if result.decode_status().is_failure() {
                return result;
            }
            expanded.insert(key.clone(), result);
        }
        DataItem::decoded(
            Value::NamedMap(expanded),
            Tags::from_slice(item.tags()),
            false,
            DecodeStatus::Expanded,
        )
    }

    pub(crate) fn tokenize(
        &self,
        item: &DataItem,
        sink: Option<&dyn WarningSink>,
        path: &str,
    ) -> DataItem {
        if !self.validate(item, false, false, sink, path) {
            return DataItem::invalid(DecodeStatus::FailedSchema);
        }
        let mut tokenized = BTreeMap::new();
        for (key, value) in item.as_named_map().into_iter().flatten() {
            let entry_path = member_path(path, key);
            let result = self.values_schema.tokenize_at(value, sink, &entry_path);
            if result.decode_status().is_failure() {
                return result;
            }
            tokenized.insert(key.clone(), result);
        }
        DataItem::decoded(
            Value::NamedMap(tokenized),
            Tags::from_slice(item.tags()),
            false,
            DecodeStatus::Tokenized,
        )
    }
}
