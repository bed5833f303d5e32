use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Measurement name of the per-line check state point.
pub const STATE_MEASUREMENT: &str = "state";

/// Measurement name of the per-label performance-data points.
pub const METRIC_MEASUREMENT: &str = "metric";

/// A single measurement written to the time-series sink.
///
/// Tags and fields are kept in sorted maps so the encoded form of a point
/// is stable across runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementPoint {
    /// Measurement name (e.g., "state", "metric").
    pub measurement: String,

    /// String tags attached to the point.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,

    /// Typed field values.
    pub fields: BTreeMap<String, FieldValue>,

    /// Unix epoch seconds.
    pub timestamp: i64,
}

impl MeasurementPoint {
    /// Create a point without tags or fields.
    pub fn new(measurement: impl Into<String>, timestamp: i64) -> Self {
        Self {
            measurement: measurement.into(),
            tags: BTreeMap::new(),
            fields: BTreeMap::new(),
            timestamp,
        }
    }

    /// Add a tag to this point.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Add multiple tags to this point.
    pub fn with_tags<I, K, V>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.tags
            .extend(tags.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Add a field to this point.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Look up a field by name.
    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// Look up a tag by name.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}

/// Typed field value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    /// Signed integer (written with an `i` suffix in line protocol).
    Integer(i64),

    /// 64-bit float.
    Float(f64),
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

/// An ordered set of points produced from one spool file.
pub type Batch = Vec<MeasurementPoint>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_creation() {
        let point = MeasurementPoint::new(METRIC_MEASUREMENT, 1_000_000_000)
            .with_tag("label", "load")
            .with_tag("host", "web01")
            .with_field("value", 3.5)
            .with_field("warn", 5.0);

        assert_eq!(point.measurement, "metric");
        assert_eq!(point.timestamp, 1_000_000_000);
        assert_eq!(point.tag("label"), Some("load"));
        assert_eq!(point.field("value"), Some(&FieldValue::Float(3.5)));
        assert_eq!(point.field("crit"), None);

        let keys: Vec<&str> = point.tags.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["host", "label"]);
    }

    #[test]
    fn test_with_tags() {
        let point = MeasurementPoint::new(STATE_MEASUREMENT, 0)
            .with_tags([("host", "db01"), ("service", "ping")])
            .with_field("value", 2i64);

        assert_eq!(point.tags.len(), 2);
        assert_eq!(point.field("value"), Some(&FieldValue::Integer(2)));
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(FieldValue::from(42i64), FieldValue::Integer(42));
        assert_eq!(FieldValue::from(2.5), FieldValue::Float(2.5));
    }

    #[test]
    fn test_serialization_shape() {
        let point = MeasurementPoint::new(STATE_MEASUREMENT, 10).with_field("value", 1i64);
        let json = serde_json::to_value(&point).unwrap();

        assert_eq!(json["measurement"], "state");
        assert_eq!(json["fields"]["value"], 1);
        assert!(json.get("tags").is_none());
    }
}
