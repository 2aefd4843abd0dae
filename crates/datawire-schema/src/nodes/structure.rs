//! Structure schema node.
//!
//! A record whose tokenised form is a positional array: each record entry
//! carries a dense `index` and the indices form a permutation of `[0, N)`.
//! Extensible structures accept longer arrays than the record count for
//! forward compatibility, and short arrays have their missing trailing
//! positions treated as absent. A positional slot holding null or undefined
//! stands for an absent optional record.

use std::collections::BTreeMap;
use std::sync::Arc;

use datawire_core::{DataItem, DataItemFactory, DecodeStatus, ItemType, Tags, Value};

use crate::builder::{build_node_map, field_boolean, field_named_map, schema_err, BuildCtx};
use crate::error::InvalidSchema;
use crate::node::{member_path, warn, NodeBase, SchemaNode};
use crate::sink::WarningSink;

#[derive(Debug, Clone)]
pub struct StructureNode {
    /// Records ordered by their positional index.
    records: Arc<[SchemaNode]>,
    schema_final: bool,
}

fn is_absent(item: &DataItem) -> bool {
    matches!(item.item_type(), ItemType::Null | ItemType::Undefined)
}

impl StructureNode {
    pub(crate) fn build(
        map: &BTreeMap<String, DataItem>,
        ctx: &BuildCtx<'_>,
        path: &str,
    ) -> Result<StructureNode, InvalidSchema> {
        let schema_final = field_boolean(map, "final", path)?.unwrap_or(false);
        let Some(source_records) = field_named_map(map, "records", path)? else {
            return Err(schema_err(path, "'records' field not valid"));
        };

        let count = source_records.len();
        let mut records: Vec<Option<SchemaNode>> = vec![None; count];
        for (name, record_item) in source_records {
            let Some(record_map) = record_item.as_named_map() else {
                return Err(schema_err(
                    path,
                    format!("structure record '{name}' is not valid"),
                ));
            };
            let Some(index) = record_map.get("index").and_then(DataItem::as_integer) else {
                return Err(schema_err(
                    path,
                    format!("structure record '{name}' has no valid 'index' field"),
                ));
            };
            // Indices must form a permutation of the record positions.
            if index < 0 || index as usize >= count || records[index as usize].is_some() {
                return Err(schema_err(
                    path,
                    format!("structure record '{name}' has a duplicate or out of range 'index'"),
                ));
            }
            let required = field_boolean(record_map, "required", path)?.unwrap_or(false);

            let mut record =
                build_node_map(record_map, ctx, &member_path(&format!("{path}.records"), name))?;
            record.base.name = Some(name.clone());
            record.base.token_value = Some(index);
            record.base.optional = !required;
            records[index as usize] = Some(record);
        }
        let records: Vec<SchemaNode> = records.into_iter().flatten().collect();
        Ok(StructureNode {
            records: records.into(),
            schema_final,
        })
    }

    pub(crate) fn create_default(&self, base: &NodeBase, include_all: bool) -> DataItem {
        let mut entries = BTreeMap::new();
        for record in self.records.iter() {
            if include_all || !record.is_optional() {
                entries.insert(
                    record.base.name().to_owned(),
                    record.create_default(include_all),
                );
            }
        }
        DataItemFactory::new().named_map_from(entries, &base.tag_values, false)
    }

    pub(crate) fn validate(
        &self,
        item: &DataItem,
        tokenized: bool,
        recursive: bool,
        sink: Option<&dyn WarningSink>,
        path: &str,
    ) -> bool {
        if tokenized {
            self.validate_positional(item, recursive, sink, path)
        } else {
            self.validate_named(item, recursive, sink, path)
        }
    }

    fn validate_positional(
        &self,
        item: &DataItem,
        recursive: bool,
        sink: Option<&dyn WarningSink>,
        path: &str,
    ) -> bool {
        let Some(entries) = item.as_array() else {
            warn(sink, path, "source data is not an array");
            return false;
        };
        // Final structures pin the exact length. Extensible structures
        // accept longer arrays for forward compatibility and shorter ones
        // whenever the missing trailing records are optional, which the
        // per-slot checks below enforce against synthesised absent slots.
        if self.schema_final && entries.len() != self.records.len() {
            warn(
                sink,
                path,
                "incorrect array length for 'final' structure schema",
            );
            return false;
        }
        let absent = DataItemFactory::new().undefined(&[]);
        for (index, record) in self.records.iter().enumerate() {
            // Missing trailing positions stand in as absent slots.
            let slot = entries.get(index).unwrap_or(&absent);
            if is_absent(slot) {
                if !record.is_optional() {
                    warn(sink, path, "a required record was not present");
                    return false;
                }
            } else if recursive {
                let record_path = member_path(path, record.base.name());
                if !record.validate_at(slot, true, true, sink, &record_path) {
                    return false;
                }
            }
        }
        true
    }

    fn validate_named(
        &self,
        item: &DataItem,
        recursive: bool,
        sink: Option<&dyn WarningSink>,
        path: &str,
    ) -> bool {
        let Some(entries) = item.as_named_map() else {
            warn(sink, path, "source data is not a named map");
            return false;
        };
        let mut matched = 0usize;
        for record in self.records.iter() {
            let name = record.base.name();
            match entries.get(name) {
                None => {
                    if !record.is_optional() {
                        warn(
                            sink,
                            path,
                            &format!("required record '{name}' is not present"),
                        );
                        return false;
                    }
                }
                Some(value) => {
                    if recursive {
                        let record_path = member_path(path, name);
                        if !record.validate_at(value, false, true, sink, &record_path) {
                            return false;
                        }
                    }
                    matched += 1;
                }
            }
        }
        if self.schema_final && matched != entries.len() {
            warn(sink, path, "undefined records in 'final' structure");
            return false;
        }
        true
    }

    pub(crate) fn expand(
        &self,
        item: &DataItem,
        sink: Option<&dyn WarningSink>,
        path: &str,
    ) -> DataItem {
        if !self.validate_positional(item, false, sink, path) {
            return DataItem::invalid(DecodeStatus::FailedSchema);
        }
        let entries = item.as_array().unwrap_or_default();
        let absent = DataItemFactory::new().undefined(&[]);
        let mut expanded = BTreeMap::new();
        for (index, record) in self.records.iter().enumerate() {
            let slot = entries.get(index).unwrap_or(&absent);
            // Absent optional records are omitted from the expanded map.
            if is_absent(slot) {
                continue;
            }
            let record_path = member_path(path, record.base.name());
            let result = record.expand_at(slot, sink, &record_path);
            if result.decode_status().is_failure() {
                return result;
            }
            expanded.insert(record.base.name().to_owned(), result);
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
        if !self.validate_named(item, false, sink, path) {
            return DataItem::invalid(DecodeStatus::FailedSchema);
        }
        let entries = item.as_named_map();
        let mut tokenized = Vec::with_capacity(self.records.len());
        for record in self.records.iter() {
            let original = entries.and_then(|map| map.get(record.base.name()));
            match original {
                // Absent optional records hold their position as undefined.
                None => tokenized.push(DataItemFactory::new().undefined(&[])),
                Some(value) if is_absent(value) => {
                    tokenized.push(DataItemFactory::new().undefined(&[]))
                }
                Some(value) => {
                    let record_path = member_path(path, record.base.name());
                    let result = record.tokenize_at(value, sink, &record_path);
                    if result.decode_status().is_failure() {
                        return result;
                    }
                    tokenized.push(result);
                }
            }
        }
        DataItem::decoded(
            Value::Array(tokenized),
            Tags::from_slice(item.tags()),
            false,
            DecodeStatus::Tokenized,
        )
    }
}
