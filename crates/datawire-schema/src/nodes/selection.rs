//! Selection schema node.
//!
//! A discriminated union. Expanded form is a single-entry named map from the
//! format identifier to the value; tokenised form is a two-element array of
//! the format token and the value. The identifier `"unknown"` and token `0`
//! are reserved for the fallback that extensible selections substitute when
//! the discriminator is unrecognised.

use std::collections::BTreeMap;
use std::sync::Arc;

use datawire_core::{DataItem, DataItemFactory, DecodeStatus, ItemType, Tags, Value};

use crate::builder::{build_node_map, field_boolean, field_named_map, field_text, schema_err, BuildCtx};
use crate::error::InvalidSchema;
use crate::node::{member_path, warn, NodeBase, SchemaNode};
use crate::nodes::enumerated::{UNKNOWN_IDENT, UNKNOWN_TOKEN};
use crate::sink::WarningSink;

#[derive(Debug, Clone)]
pub struct SelectionNode {
    formats: Arc<[SchemaNode]>,
    schema_final: bool,
    default_format: String,
}

impl SelectionNode {
    pub(crate) fn build(
        map: &BTreeMap<String, DataItem>,
        ctx: &BuildCtx<'_>,
        path: &str,
    ) -> Result<SelectionNode, InvalidSchema> {
        let schema_final = field_boolean(map, "final", path)?.unwrap_or(false);
        let formats_path = format!("{path}.formats");
        let Some(source_formats) = field_named_map(map, "formats", path)? else {
            return Err(schema_err(path, "'formats' field not valid"));
        };

        let mut formats = Vec::with_capacity(source_formats.len());
        let mut seen_tokens = BTreeMap::new();
        for (ident, format_item) in source_formats {
            let Some(format_map) = format_item.as_named_map() else {
                return Err(schema_err(
                    &formats_path,
                    format!("invalid schema definition for format '{ident}'"),
                ));
            };
            let Some(token) = format_map.get("token").and_then(DataItem::as_integer) else {
                return Err(schema_err(
                    &formats_path,
                    format!("'token' field not valid for format '{ident}'"),
                ));
            };
            if ident == UNKNOWN_IDENT {
                return Err(schema_err(
                    &formats_path,
                    "format identifier 'unknown' is reserved",
                ));
            }
            if token == UNKNOWN_TOKEN {
                return Err(schema_err(
                    &formats_path,
                    format!("token value 0 is reserved, used by format '{ident}'"),
                ));
            }
            if seen_tokens.insert(token, ident.clone()).is_some() {
                return Err(schema_err(
                    &formats_path,
                    format!("token is a duplicate for format '{ident}'"),
                ));
            }

            let mut format = build_node_map(format_map, ctx, &member_path(&formats_path, ident))?;
            format.base.name = Some(ident.clone());
            format.base.token_value = Some(token);
            formats.push(format);
        }

        let Some(default_format) = field_text(map, "default", path)? else {
            return Err(schema_err(path, "'default' field not valid"));
        };
        if !formats
            .iter()
            .any(|format| format.base.name() == default_format)
        {
            return Err(schema_err(path, "'default' field not in defined formats"));
        }
        Ok(SelectionNode {
            formats: formats.into(),
            schema_final,
            default_format,
        })
    }

    fn find_by_ident(&self, ident: &str) -> Option<&SchemaNode> {
        self.formats.iter().find(|f| f.base.name() == ident)
    }

    fn find_by_token(&self, token: i64) -> Option<&SchemaNode> {
        self.formats.iter().find(|f| f.base.token_value == Some(token))
    }

    pub(crate) fn create_default(&self, base: &NodeBase, include_all: bool) -> DataItem {
        let mut entries = BTreeMap::new();
        if let Some(format) = self.find_by_ident(&self.default_format) {
            entries.insert(
                self.default_format.clone(),
                format.create_default(include_all),
            );
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
            let Some(pair) = item.as_array() else {
                warn(sink, path, "source data is not an array");
                return false;
            };
            if pair.len() != 2 {
                warn(sink, path, "source data is not a two entry array");
                return false;
            }
            let Some(token) = pair[0].as_integer() else {
                warn(sink, path, "selection token is not an integer");
                return false;
            };
            match self.find_by_token(token) {
                Some(format) => {
                    if recursive {
                        return format.validate_at(&pair[1], true, true, sink, path);
                    }
                }
                None if self.schema_final => {
                    warn(sink, path, "unknown format in 'final' schema");
                    return false;
                }
                None => {}
            }
        } else {
            if item.item_type() != ItemType::NamedMap {
                warn(sink, path, "source data is not a named map");
                return false;
            }
            let Some(entries) = item.as_named_map() else {
                return false;
            };
            if entries.len() != 1 {
                warn(sink, path, "source data is not a single entry map");
                return false;
            }
            for (ident, value) in entries {
                match self.find_by_ident(ident) {
                    Some(format) => {
                        if recursive {
                            return format.validate_at(value, false, true, sink, path);
                        }
                    }
                    None if self.schema_final => {
                        warn(sink, path, "unknown format in 'final' schema");
                        return false;
                    }
                    None => {}
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
        let Some(pair) = item.as_array().filter(|entries| entries.len() == 2) else {
            return DataItem::invalid(DecodeStatus::FailedSchema);
        };
        let token = pair[0].as_integer().unwrap_or(UNKNOWN_TOKEN);
        let (ident, value) = match self.find_by_token(token) {
            Some(format) => {
                let format_path = member_path(path, format.base.name());
                let expanded = format.expand_at(&pair[1], sink, &format_path);
                if expanded.decode_status().is_failure() {
                    return expanded;
                }
                (format.base.name().to_owned(), expanded)
            }
            // Unknown discriminator on an extensible selection.
            None => (
                UNKNOWN_IDENT.to_owned(),
                DataItem::decoded(Value::Undefined, Tags::new(), false, DecodeStatus::Expanded),
            ),
        };
        let mut entries = BTreeMap::new();
        entries.insert(ident, value);
        DataItem::decoded(
            Value::NamedMap(entries),
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
        let factory = DataItemFactory::new();
        let Some(entries) = item.as_named_map() else {
            return DataItem::invalid(DecodeStatus::FailedSchema);
        };
        let Some((ident, value)) = entries.iter().next() else {
            return DataItem::invalid(DecodeStatus::FailedSchema);
        };
        let (token, tokenized) = match self.find_by_ident(ident) {
            Some(format) => {
                let format_path = member_path(path, format.base.name());
                let result = format.tokenize_at(value, sink, &format_path);
                if result.decode_status().is_failure() {
                    return result;
                }
                (format.base.token_value.unwrap_or(UNKNOWN_TOKEN), result)
            }
            // Unknown discriminator on an extensible selection.
            None => (
                UNKNOWN_TOKEN,
                DataItem::decoded(Value::Undefined, Tags::new(), false, DecodeStatus::Tokenized),
            ),
        };
        let pair = vec![
            factory
                .integer(token, &[])
                .with_status(DecodeStatus::Tokenized),
            tokenized,
        ];
        DataItem::decoded(
            Value::Array(pair),
            Tags::from_slice(item.tags()),
            false,
            DecodeStatus::Tokenized,
        )
    }
}
