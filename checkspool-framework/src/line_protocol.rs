//! InfluxDB line protocol encoding.
//!
//! ```text
//! measurement[,tag=value...] field=value[,field=value...] timestamp
//! ```
//!
//! Tags are written in key order. Tags with an empty key or value are left
//! out, since InfluxDB rejects them. Timestamps are epoch seconds and must be
//! written with `precision=s`.

use std::fmt::Write;

use checkspool_common::{FieldValue, MeasurementPoint};

/// Encode a batch of points, one line per point.
pub fn encode_batch(points: &[MeasurementPoint]) -> String {
    let mut out = String::with_capacity(points.len() * 64);
    for point in points {
        encode_point_into(&mut out, point);
        out.push('\n');
    }
    out
}

/// Encode a single point without a trailing newline.
pub fn encode_point(point: &MeasurementPoint) -> String {
    let mut out = String::new();
    encode_point_into(&mut out, point);
    out
}

fn encode_point_into(out: &mut String, point: &MeasurementPoint) {
    escape_into(out, &point.measurement, &[',', ' ']);

    for (key, value) in &point.tags {
        if key.is_empty() || value.is_empty() {
            continue;
        }
        out.push(',');
        escape_into(out, key, &[',', '=', ' ']);
        out.push('=');
        escape_into(out, value, &[',', '=', ' ']);
    }

    out.push(' ');
    for (i, (key, value)) in point.fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        escape_into(out, key, &[',', '=', ' ']);
        out.push('=');
        // Writing into a String cannot fail.
        let _ = match value {
            FieldValue::Integer(v) => write!(out, "{}i", v),
            FieldValue::Float(v) => write!(out, "{}", v),
        };
    }

    let _ = write!(out, " {}", point.timestamp);
}

fn escape_into(out: &mut String, s: &str, special: &[char]) {
    for c in s.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            c if special.contains(&c) => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_metric_point() {
        let point = MeasurementPoint::new("metric", 1_000_000_000)
            .with_tag("label", "load")
            .with_tag("host", "web01")
            .with_field("value", 3.5)
            .with_field("warn", 5.0)
            .with_field("crit", 10.0);

        assert_eq!(
            encode_point(&point),
            "metric,host=web01,label=load crit=10,value=3.5,warn=5 1000000000"
        );
    }

    #[test]
    fn test_encode_integer_field() {
        let point = MeasurementPoint::new("state", 42).with_field("value", 2i64);
        assert_eq!(encode_point(&point), "state value=2i 42");
    }

    #[test]
    fn test_escaping() {
        let point = MeasurementPoint::new("my metric,x", 1)
            .with_tag("service name", "disk /var=a,b")
            .with_field("value", 1.25);

        assert_eq!(
            encode_point(&point),
            r"my\ metric\,x,service\ name=disk\ /var\=a\,b value=1.25 1"
        );
    }

    #[test]
    fn test_empty_tags_skipped() {
        let point = MeasurementPoint::new("state", 7)
            .with_tag("host", "")
            .with_tag("", "orphan")
            .with_tag("service", "ping")
            .with_field("value", 0i64);

        assert_eq!(encode_point(&point), "state,service=ping value=0i 7");
    }

    #[test]
    fn test_encode_batch() {
        let batch = vec![
            MeasurementPoint::new("metric", 5)
                .with_tag("label", "a")
                .with_field("value", -0.5),
            MeasurementPoint::new("state", 5).with_field("value", 1i64),
        ];

        assert_eq!(
            encode_batch(&batch),
            "metric,label=a value=-0.5 5\nstate value=1i 5\n"
        );
        assert_eq!(encode_batch(&[]), "");
    }
}
