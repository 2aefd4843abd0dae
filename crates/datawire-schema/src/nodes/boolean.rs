//! Boolean schema node.

use std::collections::BTreeMap;

use datawire_core::{DataItem, DataItemFactory, DecodeStatus, ItemType};

use crate::builder::field_boolean;
use crate::error::InvalidSchema;
use crate::node::{warn, NodeBase};
use crate::sink::WarningSink;

#[derive(Debug, Clone)]
pub struct BooleanNode {
    default_value: bool,
}

impl BooleanNode {
    pub(crate) fn build(
        map: &BTreeMap<String, DataItem>,
        path: &str,
    ) -> Result<BooleanNode, InvalidSchema> {
        let default_value = field_boolean(map, "default", path)?.unwrap_or(false);
        Ok(BooleanNode { default_value })
    }

    pub(crate) fn create_default(&self, base: &NodeBase) -> DataItem {
        DataItemFactory::new().boolean(self.default_value, &base.tag_values)
    }

    pub(crate) fn validate(
        &self,
        item: &DataItem,
        sink: Option<&dyn WarningSink>,
        path: &str,
    ) -> bool {
        if item.item_type() != ItemType::Boolean {
            warn(sink, path, "source data is not a boolean value");
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
