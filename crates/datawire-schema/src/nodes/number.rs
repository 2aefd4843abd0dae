//! Floating-point number schema node.
//!
//! The `precision` option constrains the *encoded* representation: tokenised
//! values and defaults are produced at that precision, while `expand` always
//! widens to double. Range checks run in double precision; a violation maps
//! the value to the matching infinity, which is then rejected as non-finite.

use std::collections::BTreeMap;

use datawire_core::{DataItem, DataItemFactory, DecodeStatus};

use crate::builder::{field_boolean, field_text, schema_err};
use crate::error::InvalidSchema;
use crate::node::{warn, NodeBase, MAX_HALF_PRECISION};
use crate::sink::WarningSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Precision {
    Half,
    Standard,
    Double,
}

impl Precision {
    fn max_magnitude(self) -> f64 {
        match self {
            Precision::Half => MAX_HALF_PRECISION,
            Precision::Standard => f64::from(f32::MAX),
            Precision::Double => f64::MAX,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NumberNode {
    precision: Precision,
    default_value: f64,
    min_value: f64,
    max_value: f64,
    exclude_min: bool,
    exclude_max: bool,
}

fn numeric_field(
    map: &BTreeMap<String, DataItem>,
    key: &str,
    path: &str,
) -> Result<Option<f64>, InvalidSchema> {
    match map.get(key) {
        None => Ok(None),
        Some(item) => match item.as_double() {
            Some(value) if value.is_finite() => Ok(Some(value)),
            _ => Err(schema_err(path, format!("'{key}' field not valid"))),
        },
    }
}

impl NumberNode {
    pub(crate) fn build(
        map: &BTreeMap<String, DataItem>,
        path: &str,
    ) -> Result<NumberNode, InvalidSchema> {
        let precision = match field_text(map, "precision", path)?.as_deref() {
            None | Some("double") => Precision::Double,
            Some("half") => Precision::Half,
            Some("standard") => Precision::Standard,
            Some(_) => return Err(schema_err(path, "'precision' field not valid")),
        };
        let limit = precision.max_magnitude();

        let default_value = numeric_field(map, "default", path)?.unwrap_or(0.0);
        let max_value = numeric_field(map, "maxValue", path)?.unwrap_or(limit);
        let exclude_max = map.get("maxValue").is_some()
            && field_boolean(map, "excludeMax", path)?.unwrap_or(false);
        let min_value = numeric_field(map, "minValue", path)?.unwrap_or(-limit);
        let exclude_min = map.get("minValue").is_some()
            && field_boolean(map, "excludeMin", path)?.unwrap_or(false);

        if max_value > limit {
            return Err(schema_err(
                path,
                "'maxValue' field exceeds the maximum number representation",
            ));
        }
        if min_value < -limit {
            return Err(schema_err(
                path,
                "'minValue' field exceeds the minimum number representation",
            ));
        }
        if max_value < min_value {
            return Err(schema_err(
                path,
                "'minValue' and 'maxValue' define an empty range",
            ));
        }
        let below_min = if exclude_min {
            default_value <= min_value
        } else {
            default_value < min_value
        };
        let above_max = if exclude_max {
            default_value >= max_value
        } else {
            default_value > max_value
        };
        if below_min || above_max {
            return Err(schema_err(
                path,
                "'default' value falls outside the defined range",
            ));
        }
        Ok(NumberNode {
            precision,
            default_value,
            min_value,
            max_value,
            exclude_min,
            exclude_max,
        })
    }

    pub(crate) fn create_default(&self, base: &NodeBase) -> DataItem {
        self.at_precision(self.default_value, &base.tag_values)
    }

    fn at_precision(&self, value: f64, tags: &[u32]) -> DataItem {
        let factory = DataItemFactory::new();
        match self.precision {
            Precision::Half => factory.float_half(value as f32, tags),
            Precision::Standard => factory.float_standard(value as f32, tags),
            Precision::Double => factory.float_double(value, tags),
        }
    }

    /// Widens to double and range-checks. Violations map to the matching
    /// infinity; non-numeric input maps to NaN.
    fn range_check(&self, item: &DataItem, sink: Option<&dyn WarningSink>, path: &str) -> f64 {
        let Some(value) = item.as_double() else {
            warn(sink, path, "source data is not a numeric value");
            return f64::NAN;
        };
        let below_min = if self.exclude_min {
            value <= self.min_value
        } else {
            value < self.min_value
        };
        if below_min {
            warn(
                sink,
                path,
                &format!("value {value} is less than {}", self.min_value),
            );
            return f64::NEG_INFINITY;
        }
        let above_max = if self.exclude_max {
            value >= self.max_value
        } else {
            value > self.max_value
        };
        if above_max {
            warn(
                sink,
                path,
                &format!("value {value} is greater than {}", self.max_value),
            );
            return f64::INFINITY;
        }
        value
    }

    pub(crate) fn validate(
        &self,
        item: &DataItem,
        sink: Option<&dyn WarningSink>,
        path: &str,
    ) -> bool {
        self.range_check(item, sink, path).is_finite()
    }

    pub(crate) fn expand(
        &self,
        item: &DataItem,
        sink: Option<&dyn WarningSink>,
        path: &str,
    ) -> DataItem {
        let value = self.range_check(item, sink, path);
        if !value.is_finite() {
            return DataItem::invalid(DecodeStatus::FailedSchema);
        }
        DataItemFactory::new()
            .float_double(value, item.tags())
            .with_status(DecodeStatus::Expanded)
    }

    pub(crate) fn tokenize(
        &self,
        item: &DataItem,
        sink: Option<&dyn WarningSink>,
        path: &str,
    ) -> DataItem {
        let value = self.range_check(item, sink, path);
        if !value.is_finite() {
            return DataItem::invalid(DecodeStatus::FailedSchema);
        }
        self.at_precision(value, item.tags())
            .with_status(DecodeStatus::Tokenized)
    }
}
