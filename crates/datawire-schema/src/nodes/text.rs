//! Text string schema node.
//!
//! Accepts both a plain text string and a segmented text-string list; length
//! bounds apply to the total UTF-8 byte count.

use std::collections::BTreeMap;

use datawire_core::{DataItem, DataItemFactory, DecodeStatus};

use crate::builder::{field_integer, schema_err};
use crate::error::InvalidSchema;
use crate::node::{warn, NodeBase};
use crate::sink::WarningSink;

#[derive(Debug, Clone)]
pub struct TextNode {
    default_value: String,
    min_length: u64,
    max_length: u64,
}

fn utf8_length(item: &DataItem) -> Option<u64> {
    match item.as_text() {
        Some(text) => Some(text.len() as u64),
        None => item
            .as_text_segments()
            .map(|segments| segments.iter().map(|s| s.len() as u64).sum()),
    }
}

impl TextNode {
    pub(crate) fn build(
        map: &BTreeMap<String, DataItem>,
        path: &str,
    ) -> Result<TextNode, InvalidSchema> {
        let (default_value, default_length) = match map.get("default") {
            None => (String::new(), 0),
            Some(item) => match item.text_content() {
                Some(text) => {
                    let length = text.len() as u64;
                    (text, length)
                }
                None => return Err(schema_err(path, "'default' field not valid")),
            },
        };
        let max_length = field_integer(map, "maxLength", path)?.unwrap_or(i32::MAX as i64);
        let min_length = field_integer(map, "minLength", path)?.unwrap_or(0);
        if min_length < 0 || max_length < min_length || max_length > i32::MAX as i64 {
            return Err(schema_err(
                path,
                "'minLength' and 'maxLength' fields not valid",
            ));
        }
        let (min_length, max_length) = (min_length as u64, max_length as u64);
        if default_length < min_length || default_length > max_length {
            return Err(schema_err(path, "'default' field not a valid length"));
        }
        Ok(TextNode {
            default_value,
            min_length,
            max_length,
        })
    }

    pub(crate) fn create_default(&self, base: &NodeBase) -> DataItem {
        DataItemFactory::new().text_string(self.default_value.clone(), &base.tag_values)
    }

    pub(crate) fn validate(
        &self,
        item: &DataItem,
        sink: Option<&dyn WarningSink>,
        path: &str,
    ) -> bool {
        let Some(length) = utf8_length(item) else {
            warn(sink, path, "source data is not a valid text string");
            return false;
        };
        if length < self.min_length || length > self.max_length {
            warn(
                sink,
                path,
                &format!(
                    "text string length {length} is not in valid range {} to {}",
                    self.min_length, self.max_length
                ),
            );
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
        self.pass_through(item, sink, path)
    }

    pub(crate) fn tokenize(
        &self,
        item: &DataItem,
        sink: Option<&dyn WarningSink>,
        path: &str,
    ) -> DataItem {
        self.pass_through(item, sink, path)
    }

    fn pass_through(
        &self,
        item: &DataItem,
        sink: Option<&dyn WarningSink>,
        path: &str,
    ) -> DataItem {
        if self.validate(item, sink, path) {
            item.clone()
        } else {
            DataItem::invalid(DecodeStatus::FailedSchema)
        }
    }
}
