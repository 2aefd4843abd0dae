//! Enumerated schema node.
//!
//! A bijection between text identifiers and non-zero integer tokens. Token
//! `0` and the identifier `"unknown"` are reserved as the fallback pair:
//! extensible enumerations map unknown inputs onto them, final enumerations
//! reject unknown inputs outright.

use std::collections::BTreeMap;
use std::sync::Arc;

use datawire_core::{DataItem, DataItemFactory, DecodeStatus};

use crate::builder::{field_boolean, field_named_map, field_text, schema_err};
use crate::error::InvalidSchema;
use crate::node::{warn, NodeBase};
use crate::sink::WarningSink;

pub(crate) const UNKNOWN_IDENT: &str = "unknown";
pub(crate) const UNKNOWN_TOKEN: i64 = 0;

#[derive(Debug)]
pub(crate) struct EnumTable {
    pub to_token: BTreeMap<String, i64>,
    pub to_text: BTreeMap<i64, String>,
}

#[derive(Debug, Clone)]
pub struct EnumeratedNode {
    table: Arc<EnumTable>,
    schema_final: bool,
    default_value: String,
}

impl EnumeratedNode {
    pub(crate) fn build(
        map: &BTreeMap<String, DataItem>,
        path: &str,
    ) -> Result<EnumeratedNode, InvalidSchema> {
        let schema_final = field_boolean(map, "final", path)?.unwrap_or(false);

        let values_path = format!("{path}.values");
        let Some(values) = field_named_map(map, "values", path)? else {
            return Err(schema_err(path, "'values' field not valid"));
        };
        let mut to_token = BTreeMap::new();
        let mut to_text = BTreeMap::new();
        for (ident, token_item) in values {
            let Some(token) = token_item.as_integer() else {
                return Err(schema_err(
                    &values_path,
                    format!("enumeration value not valid for '{ident}'"),
                ));
            };
            if ident == UNKNOWN_IDENT {
                return Err(schema_err(
                    &values_path,
                    "enumeration string 'unknown' is reserved",
                ));
            }
            if token == UNKNOWN_TOKEN {
                return Err(schema_err(
                    &values_path,
                    "enumeration token value 0 is reserved for 'unknown'",
                ));
            }
            if to_text.contains_key(&token) {
                return Err(schema_err(
                    &values_path,
                    format!("enumeration has a duplicate token for '{ident}'"),
                ));
            }
            to_text.insert(token, ident.clone());
            to_token.insert(ident.clone(), token);
        }

        let Some(default_value) = field_text(map, "default", path)? else {
            return Err(schema_err(path, "'default' field not valid"));
        };
        if !to_token.contains_key(&default_value) {
            return Err(schema_err(path, "'default' field not in the enumeration"));
        }
        Ok(EnumeratedNode {
            table: Arc::new(EnumTable { to_token, to_text }),
            schema_final,
            default_value,
        })
    }

    pub(crate) fn create_default(&self, base: &NodeBase) -> DataItem {
        DataItemFactory::new().text_string(self.default_value.clone(), &base.tag_values)
    }

    pub(crate) fn validate(
        &self,
        item: &DataItem,
        tokenized: bool,
        sink: Option<&dyn WarningSink>,
        path: &str,
    ) -> bool {
        if tokenized {
            let Some(token) = item.as_integer() else {
                warn(sink, path, "source data is not an integer token");
                return false;
            };
            if self.schema_final && !self.table.to_text.contains_key(&token) {
                warn(sink, path, "unknown token specified for 'final' schema");
                return false;
            }
        } else {
            let Some(ident) = item.as_text() else {
                warn(sink, path, "source data is not an enumeration string");
                return false;
            };
            if self.schema_final && !self.table.to_token.contains_key(ident) {
                warn(sink, path, "unknown enumeration specified for 'final' schema");
                return false;
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
        if !self.validate(item, true, sink, path) {
            return DataItem::invalid(DecodeStatus::FailedSchema);
        }
        let token = item.as_integer().unwrap_or(UNKNOWN_TOKEN);
        let ident = self
            .table
            .to_text
            .get(&token)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_IDENT);
        DataItemFactory::new()
            .text_string(ident, item.tags())
            .with_status(DecodeStatus::Expanded)
    }

    pub(crate) fn tokenize(
        &self,
        item: &DataItem,
        sink: Option<&dyn WarningSink>,
        path: &str,
    ) -> DataItem {
        if !self.validate(item, false, sink, path) {
            return DataItem::invalid(DecodeStatus::FailedSchema);
        }
        let ident = item.as_text().unwrap_or(UNKNOWN_IDENT);
        let token = self
            .table
            .to_token
            .get(ident)
            .copied()
            .unwrap_or(UNKNOWN_TOKEN);
        DataItemFactory::new()
            .integer(token, item.tags())
            .with_status(DecodeStatus::Tokenized)
    }
}
