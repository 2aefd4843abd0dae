//! Integer schema node.

use std::collections::BTreeMap;

use datawire_core::{DataItem, DataItemFactory, DecodeStatus};

use crate::builder::{field_boolean, field_integer, schema_err};
use crate::error::InvalidSchema;
use crate::node::{warn, NodeBase, MAX_INTEGER_VALUE, MIN_INTEGER_VALUE};
use crate::sink::WarningSink;

#[derive(Debug, Clone)]
pub struct IntegerNode {
    default_value: i64,
    min_value: i64,
    max_value: i64,
}

impl IntegerNode {
    pub(crate) fn build(
        map: &BTreeMap<String, DataItem>,
        path: &str,
    ) -> Result<IntegerNode, InvalidSchema> {
        let default_value = field_integer(map, "default", path)?.unwrap_or(0);

        // Exclusive bounds narrow the inclusive range by one.
        let mut max_value = field_integer(map, "maxValue", path)?.unwrap_or(MAX_INTEGER_VALUE);
        if field_integer(map, "maxValue", path)?.is_some()
            && field_boolean(map, "excludeMax", path)?.unwrap_or(false)
        {
            max_value -= 1;
        }
        let mut min_value = field_integer(map, "minValue", path)?.unwrap_or(MIN_INTEGER_VALUE);
        if field_integer(map, "minValue", path)?.is_some()
            && field_boolean(map, "excludeMin", path)?.unwrap_or(false)
        {
            min_value += 1;
        }

        if max_value > MAX_INTEGER_VALUE {
            return Err(schema_err(
                path,
                "'maxValue' field exceeds the valid integer maximum of 2^53",
            ));
        }
        if min_value < MIN_INTEGER_VALUE {
            return Err(schema_err(
                path,
                "'minValue' field exceeds the valid integer minimum of -2^53",
            ));
        }
        if max_value < min_value {
            return Err(schema_err(
                path,
                "'minValue' and 'maxValue' define an empty range",
            ));
        }
        if default_value < min_value || default_value > max_value {
            return Err(schema_err(
                path,
                "'default' value falls outside the defined range",
            ));
        }
        Ok(IntegerNode {
            default_value,
            min_value,
            max_value,
        })
    }

    pub(crate) fn create_default(&self, base: &NodeBase) -> DataItem {
        DataItemFactory::new().integer(self.default_value, &base.tag_values)
    }

    pub(crate) fn validate(
        &self,
        item: &DataItem,
        sink: Option<&dyn WarningSink>,
        path: &str,
    ) -> bool {
        let Some(value) = item.as_integer() else {
            warn(sink, path, "source data is not an integer value");
            return false;
        };
        if value < self.min_value || value > self.max_value {
            warn(
                sink,
                path,
                &format!(
                    "value {value} is outside range {} to {}",
                    self.min_value, self.max_value
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
