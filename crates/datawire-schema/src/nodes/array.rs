//! Array schema node.
//!
//! Homogeneous sequences: a single `entries` schema applies to every
//! element. The `length` shorthand pins both bounds to one value.

use std::collections::BTreeMap;
use std::sync::Arc;

use datawire_core::{DataItem, DataItemFactory, DecodeStatus, Tags, Value};

use crate::builder::{build_node_map, field_integer, field_named_map, schema_err, BuildCtx};
use crate::error::InvalidSchema;
use crate::node::{element_path, warn, NodeBase, SchemaNode};
use crate::sink::WarningSink;

#[derive(Debug, Clone)]
pub struct ArrayNode {
    values_schema: Arc<SchemaNode>,
    min_length: usize,
    max_length: usize,
}

impl ArrayNode {
    pub(crate) fn build(
        map: &BTreeMap<String, DataItem>,
        ctx: &BuildCtx<'_>,
        path: &str,
    ) -> Result<ArrayNode, InvalidSchema> {
        let Some(entries) = field_named_map(map, "entries", path)? else {
            return Err(schema_err(path, "'entries' field not valid"));
        };
        let values_schema = build_node_map(entries, ctx, &format!("{path}.entries"))?;

        // A fixed length pins both bounds; otherwise the explicit bounds
        // apply, defaulting to unconstrained.
        let (min_length, max_length) = match field_integer(map, "length", path)? {
            Some(length) => (length, length),
            None => (
                field_integer(map, "minLength", path)?.unwrap_or(0),
                field_integer(map, "maxLength", path)?.unwrap_or(i32::MAX as i64),
            ),
        };
        if min_length < 0 || max_length < min_length || max_length > i32::MAX as i64 {
            return Err(schema_err(
                path,
                "'length', 'minLength' or 'maxLength' fields not valid",
            ));
        }
        Ok(ArrayNode {
            values_schema: Arc::new(values_schema),
            min_length: min_length as usize,
            max_length: max_length as usize,
        })
    }

    pub(crate) fn create_default(&self, base: &NodeBase, include_all: bool) -> DataItem {
        // Empty by default; a non-zero minimum length is met by replicating
        // the element default.
        let entries = (0..self.min_length)
            .map(|_| self.values_schema.create_default(include_all))
            .collect();
        DataItemFactory::new().array_from(entries, &base.tag_values, true)
    }

    pub(crate) fn validate(
        &self,
        item: &DataItem,
        tokenized: bool,
        recursive: bool,
        sink: Option<&dyn WarningSink>,
        path: &str,
    ) -> bool {
        let Some(entries) = item.as_array() else {
            warn(sink, path, "source data is not an array");
            return false;
        };
        if entries.len() < self.min_length || entries.len() > self.max_length {
            warn(
                sink,
                path,
                &format!(
                    "array length {} is outside range {} to {}",
                    entries.len(),
                    self.min_length,
                    self.max_length
                ),
            );
            return false;
        }
        if recursive {
            for (index, entry) in entries.iter().enumerate() {
                let entry_path = element_path(path, index);
                if !self
                    .values_schema
                    .validate_at(entry, tokenized, true, sink, &entry_path)
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
        let entries = item.as_array().unwrap_or_default();
        let mut expanded = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            let entry_path = element_path(path, index);
            let result = self.values_schema.expand_at(entry, sink, &entry_path);
            if result.decode_status().is_failure() {
                return result;
            }
            expanded.push(result);
        }
        DataItem::decoded(
            Value::Array(expanded),
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
        let entries = item.as_array().unwrap_or_default();
        let mut tokenized = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            let entry_path = element_path(path, index);
            let result = self.values_schema.tokenize_at(entry, sink, &entry_path);
            if result.decode_status().is_failure() {
                return result;
            }
            tokenized.push(result);
        }
        DataItem::decoded(
            Value::Array(tokenized),
            Tags::from_slice(item.tags()),
            false,
            DecodeStatus::Tokenized,
        )
    }
}
