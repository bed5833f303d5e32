//! Convert parsed line fields into measurement points.

use checkspool_common::{METRIC_MEASUREMENT, MeasurementPoint, STATE_MEASUREMENT};

use crate::error::IngestError;
use crate::parser::FieldSet;
use crate::perfdata::{self, PerfMetric};

pub const STATE_FIELD: &str = "state";
pub const TIMESTAMP_FIELD: &str = "timestamp";
pub const PERFDATA_FIELD: &str = "perfdata";

/// Build the points for one line.
///
/// Produces one `metric` point per decoded performance label, in order,
/// followed by exactly one `state` point. Every other field of the line is
/// attached as a tag to all of them. Fails without producing anything when
/// `state` or `timestamp` is missing or not an integer.
pub fn encode_line(mut fields: FieldSet) -> Result<Vec<MeasurementPoint>, IngestError> {
    let state_raw = fields.remove(STATE_FIELD).unwrap_or_default();
    let state: i64 = state_raw
        .parse()
        .map_err(|_| IngestError::InvalidState { value: state_raw })?;

    let perfdata = fields.remove(PERFDATA_FIELD).unwrap_or_default();

    let timestamp_raw = fields.remove(TIMESTAMP_FIELD).unwrap_or_default();
    let timestamp: i64 = timestamp_raw
        .parse()
        .map_err(|_| IngestError::InvalidTimestamp {
            value: timestamp_raw,
        })?;

    let tags = fields;

    let metrics = perfdata::decode(&perfdata);
    let mut points = Vec::with_capacity(metrics.len() + 1);
    points.extend(
        metrics
            .into_iter()
            .map(|metric| metric_point(metric, &tags, timestamp)),
    );

    points.push(
        MeasurementPoint::new(STATE_MEASUREMENT, timestamp)
            .with_tags(tags)
            .with_field("value", state),
    );

    Ok(points)
}

/// Build the `metric` point for one performance label.
///
/// A passthrough field named `label` replaces the performance label, while a
/// non-empty unit replaces a passthrough `uom`.
fn metric_point(metric: PerfMetric, tags: &FieldSet, timestamp: i64) -> MeasurementPoint {
    let mut point = MeasurementPoint::new(METRIC_MEASUREMENT, timestamp)
        .with_tag("label", metric.label)
        .with_tags(tags.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .with_field("value", metric.value);

    if let Some(unit) = metric.unit {
        point = point.with_tag("uom", unit);
    }

    for (name, value) in [
        ("warn", metric.warn),
        ("crit", metric.crit),
        ("min", metric.min),
        ("max", metric.max),
    ] {
        if let Some(value) = value {
            point = point.with_field(name, value);
        }
    }

    point
}
