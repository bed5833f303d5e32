//! Performance data decoder.
//!
//! Monitoring plugins report measurements as a sequence of
//!
//! ```text
//! label=value[unit];[warn];[crit];[min];[max]
//! ```
//!
//! segments. The scanner here accepts exactly what the upstream writer's
//! grammar accepts, including its looser corners: a label is anything up to
//! the next `=` (spaces and `;` included), the value is `U` or a run of
//! `0-9 . , -`, and thresholds may carry range syntax (`10:20`, `~:5`, `@3`)
//! that later fails numeric parsing and is dropped.
//!
//! Bad values never fail the whole string. A segment whose value is not a
//! finite number is skipped, a threshold or bound that is not a finite number
//! is left out of its metric.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::IngestError;

/// One decoded performance measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct PerfMetric {
    pub label: String,
    pub value: f64,
    /// Unit of measurement, only set when non-empty.
    pub unit: Option<String>,
    pub warn: Option<f64>,
    pub crit: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Raw text of one matched segment, before numeric parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub label: &'a str,
    pub value: &'a str,
    pub unit: &'a str,
    pub warn: Option<&'a str>,
    pub crit: Option<&'a str>,
    pub min: Option<&'a str>,
    pub max: Option<&'a str>,
}

/// Sentinel for an unknown value.
pub const UNKNOWN_VALUE: &str = "U";

/// Decode a performance data string into metrics, in input order.
pub fn decode(perfdata: &str) -> Vec<PerfMetric> {
    segments(perfdata)
        .filter_map(|segment| match segment.to_metric() {
            Ok(metric) => Some(metric),
            Err(e) => {
                tracing::trace!(error = %e, "Skipping performance metric");
                None
            }
        })
        .collect()
}

/// Iterate over the raw segments of a performance data string.
pub fn segments(perfdata: &str) -> Segments<'_> {
    Segments {
        input: perfdata,
        pos: 0,
    }
}

impl Segment<'_> {
    /// Parse the numeric parts of this segment.
    pub fn to_metric(&self) -> Result<PerfMetric, IngestError> {
        let value = parse_number(self.value).ok_or_else(|| IngestError::MetricValueUnparseable {
            label: self.label.to_string(),
            value: self.value.to_string(),
        })?;

        Ok(PerfMetric {
            label: self.label.to_string(),
            value,
            unit: (!self.unit.is_empty()).then(|| self.unit.to_string()),
            warn: self.warn.and_then(parse_number),
            crit: self.crit.and_then(parse_number),
            min: self.min.and_then(parse_number),
            max: self.max.and_then(parse_number),
        })
    }
}

/// Parse a finite float. `U`, comma decimals and ranges yield `None`.
fn parse_number(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Leftmost-first scanner over performance data segments.
#[derive(Debug, Clone)]
pub struct Segments<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Iterator for Segments<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Segment<'a>> {
        loop {
            let rest = self.input.get(self.pos..)?;
            let eq = self.pos + rest.find('=')?;

            // Labels are non-empty, so no segment starts on an '='.
            if eq == self.pos {
                self.pos += 1;
                continue;
            }

            match self.match_after_label(eq) {
                Some((segment, end)) => {
                    self.pos = end;
                    return Some(segment);
                }
                // Every start up to this '=' would end its label here, so
                // none of them can match either.
                None => self.pos = eq + 1,
            }
        }
    }
}

impl<'a> Segments<'a> {
    /// Match `=value[unit];warn;crit;min;max\s*` at the '=' at byte `eq`,
    /// with the label running from the current position.
    fn match_after_label(&self, eq: usize) -> Option<(Segment<'a>, usize)> {
        let input = self.input;
        let value_start = eq + 1;

        let value_end = if input[value_start..].starts_with(UNKNOWN_VALUE) {
            value_start + UNKNOWN_VALUE.len()
        } else {
            scan(input, value_start, is_value_char)
        };
        if value_end == value_start {
            return None;
        }

        let unit_end = unit_end(input, value_end);
        let mut pos = skip_semicolon(input, unit_end);

        let (warn, next) = optional_run(input, pos, is_threshold_char);
        pos = skip_semicolon(input, next);
        let (crit, next) = optional_run(input, pos, is_threshold_char);
        pos = skip_semicolon(input, next);
        let (min, next) = optional_run(input, pos, is_value_char);
        pos = skip_semicolon(input, next);
        let (max, next) = optional_run(input, pos, is_value_char);
        pos = skip_semicolon(input, next);
        pos = scan(input, pos, is_space);

        let segment = Segment {
            label: &input[self.pos..eq],
            value: &input[value_start..value_end],
            unit: &input[value_end..unit_end],
            warn,
            crit,
            min,
            max,
        };
        Some((segment, pos))
    }
}

/// Advance from byte `start` while `pred` holds, returning the end offset.
fn scan(input: &str, start: usize, pred: impl Fn(char) -> bool) -> usize {
    input[start..]
        .char_indices()
        .find(|&(_, c)| !pred(c))
        .map_or(input.len(), |(i, _)| start + i)
}

/// A non-empty run of `pred` characters at `start`, if any.
fn optional_run(input: &str, start: usize, pred: impl Fn(char) -> bool) -> (Option<&str>, usize) {
    let end = scan(input, start, pred);
    if end == start {
        (None, start)
    } else {
        (Some(&input[start..end]), end)
    }
}

fn skip_semicolon(input: &str, pos: usize) -> usize {
    if input[pos..].starts_with(';') {
        pos + 1
    } else {
        pos
    }
}

fn is_value_char(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '.' | ',' | '-')
}

fn is_threshold_char(c: char) -> bool {
    is_value_char(c) || matches!(c, ':' | '~' | '@')
}

/// Unit run: letters of general category L, `/` and `%`. Letter numbers
/// (`Ⅻ`) and combining marks are not units.
static UNIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\pL/%]*").unwrap());

fn unit_end(input: &str, start: usize) -> usize {
    UNIT_RUN
        .find(&input[start..])
        .map_or(start, |m| start + m.end())
}

fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0c')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(metrics: &[PerfMetric]) -> Vec<&str> {
        metrics.iter().map(|m| m.label.as_str()).collect()
    }

    #[test]
    fn test_full_segment() {
        let metrics = decode("load=3.5;5;10;0;100");

        assert_eq!(
            metrics,
            vec![PerfMetric {
                label: "load".to_string(),
                value: 3.5,
                unit: None,
                warn: Some(5.0),
                crit: Some(10.0),
                min: Some(0.0),
                max: Some(100.0),
            }]
        );
    }

    #[test]
    fn test_multiple_segments_with_units() {
        let metrics = decode("rta=0.041ms;3000;5000;0; pl=0%;80;100;; size=1024B;;;0");

        assert_eq!(labels(&metrics), vec!["rta", "pl", "size"]);

        assert_eq!(metrics[0].unit.as_deref(), Some("ms"));
        assert_eq!(metrics[0].value, 0.041);
        assert_eq!(metrics[0].min, Some(0.0));
        assert_eq!(metrics[0].max, None);

        assert_eq!(metrics[1].unit.as_deref(), Some("%"));
        assert_eq!(metrics[1].crit, Some(100.0));

        assert_eq!(metrics[2].unit.as_deref(), Some("B"));
        assert_eq!(metrics[2].warn, None);
        assert_eq!(metrics[2].crit, None);
        assert_eq!(metrics[2].min, Some(0.0));
    }

    #[test]
    fn test_unknown_value_skipped() {
        let metrics = decode("ok=1;; ; ; bad=U");

        assert_eq!(labels(&metrics), vec!["ok"]);
        let ok = &metrics[0];
        assert_eq!(ok.value, 1.0);
        assert_eq!(ok.warn, None);
        assert_eq!(ok.crit, None);
        assert_eq!(ok.min, None);
        assert_eq!(ok.max, None);
    }

    #[test]
    fn test_label_runs_to_equals_sign() {
        let raw: Vec<Segment<'_>> = segments("ok=1;; ; ; bad=U").collect();

        assert_eq!(raw.len(), 2);
        assert_eq!(raw[0].label, "ok");
        assert_eq!(raw[1].label, "; ; bad");
        assert_eq!(raw[1].value, "U");
    }

    #[test]
    fn test_labels_with_spaces() {
        let metrics = decode("/var/log used=512MB;900;950;0;1000");
        assert_eq!(labels(&metrics), vec!["/var/log used"]);
        assert_eq!(metrics[0].unit.as_deref(), Some("MB"));
    }

    #[test]
    fn test_range_thresholds_dropped() {
        let metrics = decode("temp=21.5C;10:30;@5:35;-40;85");

        assert_eq!(metrics.len(), 1);
        let temp = &metrics[0];
        assert_eq!(temp.unit.as_deref(), Some("C"));
        assert_eq!(temp.warn, None);
        assert_eq!(temp.crit, None);
        assert_eq!(temp.min, Some(-40.0));
        assert_eq!(temp.max, Some(85.0));
    }

    #[test]
    fn test_unit_is_letters_only() {
        let raw: Vec<Segment<'_>> = segments("é=5/ⅫⅫ::").collect();
        assert_eq!(raw.len(), 1);
        assert_eq!(raw[0].label, "é");
        assert_eq!(raw[0].unit, "/");
        assert_eq!(raw[0].warn, None);

        let raw: Vec<Segment<'_>> = segments("a=1\u{0903}ms;2").collect();
        assert_eq!(raw[0].unit, "");
        assert_eq!(raw[0].warn, None);

        let metrics = decode("t=5ñs;1 r=2Ωμ%");
        assert_eq!(metrics[0].unit.as_deref(), Some("ñs"));
        assert_eq!(metrics[0].warn, Some(1.0));
        assert_eq!(metrics[1].unit.as_deref(), Some("Ωμ%"));
    }

    #[test]
    fn test_comma_decimal_is_not_normalized() {
        let raw: Vec<Segment<'_>> = segments("a=3,5;1,5").collect();
        assert_eq!(raw[0].value, "3,5");
        assert_eq!(raw[0].warn, Some("1,5"));

        assert!(decode("a=3,5").is_empty());
        let metrics = decode("a=3;1,5");
        assert_eq!(metrics[0].value, 3.0);
        assert_eq!(metrics[0].warn, None);
    }

    #[test]
    fn test_value_not_numeric_moves_past_equals() {
        // "abc" cannot start a value, so scanning resumes after that '='
        // and the next label swallows the text in between.
        let raw: Vec<Segment<'_>> = segments("a=abc b=2").collect();
        assert_eq!(raw.len(), 1);
        assert_eq!(raw[0].label, "abc b");
        assert_eq!(raw[0].value, "2");
    }

    #[test]
    fn test_bad_segment_only_removes_itself() {
        let good = "a=1 b=2;3 c=4";
        let base = decode(good);
        assert_eq!(base.len(), 3);

        let with_bad = decode(&format!("x=U {}", good));
        assert_eq!(with_bad, base);

        let with_lone_dash = decode(&format!("{} y=-", good));
        assert_eq!(labels(&with_lone_dash), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_empty_and_garbage() {
        assert!(decode("").is_empty());
        assert!(decode("   ").is_empty());
        assert!(decode("no metrics here").is_empty());
        assert!(decode("===").is_empty());
    }

    #[test]
    fn test_leading_equals() {
        let metrics = decode("=5 x=1");
        assert_eq!(labels(&metrics), vec!["5 x"]);
    }

    #[test]
    fn test_unicode_units_and_labels() {
        let metrics = decode("température=20°C;25");
        // '°' is not a letter, so the unit stops before it and the
        // threshold is never reached.
        assert_eq!(metrics[0].label, "température");
        assert_eq!(metrics[0].value, 20.0);
        assert_eq!(metrics[0].unit, None);
        assert_eq!(metrics[0].warn, None);

        let metrics = decode("weight=3kg;5");
        assert_eq!(metrics[0].unit.as_deref(), Some("kg"));
        assert_eq!(metrics[0].warn, Some(5.0));
    }

    #[test]
    fn test_unit_with_slash() {
        let metrics = decode("rate=12.5req/s;100;200");
        assert_eq!(metrics[0].unit.as_deref(), Some("req/s"));
        assert_eq!(metrics[0].crit, Some(200.0));
    }

    #[test]
    fn test_overflowing_value_skipped() {
        let huge = "9".repeat(400);
        let metrics = decode(&format!("big={} small=1", huge));
        assert_eq!(labels(&metrics), vec!["small"]);
    }

    #[test]
    fn test_unparseable_value_error() {
        let segment = segments("bad=U").next().unwrap();
        let err = segment.to_metric().unwrap_err();
        assert!(matches!(
            err,
            IngestError::MetricValueUnparseable { ref label, ref value }
                if label == "bad" && value == "U"
        ));
    }

    #[test]
    fn test_negative_and_fractional_values() {
        let metrics = decode("offset=-0.25s;.5;1.;-1;1");
        let m = &metrics[0];
        assert_eq!(m.value, -0.25);
        assert_eq!(m.warn, Some(0.5));
        assert_eq!(m.crit, Some(1.0));
        assert_eq!(m.min, Some(-1.0));
        assert_eq!(m.max, Some(1.0));
    }
}
