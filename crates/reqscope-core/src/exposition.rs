//! Prometheus text exposition format.
//!
//! `render` serializes gathered families; `parse` reads the same grammar back
//! into samples. Series are rendered sorted by label key so repeated pulls of
//! an unchanged registry produce identical text.

use std::fmt::Write;

use crate::error::{Result, ScopeError};
use crate::labels::{validate_label_name, validate_metric_name, LabelKey};
use crate::metrics::{FamilySnapshot, MetricKind, SeriesValues};

/// Content type of the rendered text.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn escape_help(v: &str) -> String {
    v.replace('\\', "\\\\").replace('\n', "\\n")
}

fn unescape_help(v: &str) -> String {
    let mut out = String::with_capacity(v.len());
    let mut chars = v.chars();
    while let Some(c) = chars.next() {
        match (c, chars.clone().next()) {
            ('\\', Some('n')) => {
                out.push('\n');
                chars.next();
            }
            ('\\', Some('\\')) => {
                out.push('\\');
                chars.next();
            }
            _ => out.push(c),
        }
    }
    out
}

/// Float formatting used for values and `le` bounds.
pub fn format_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".into()
    } else if v.is_infinite() {
        if v > 0.0 { "+Inf".into() } else { "-Inf".into() }
    } else {
        format!("{v}")
    }
}

fn parse_value(tok: &str) -> Option<f64> {
    match tok {
        "+Inf" | "Inf" => Some(f64::INFINITY),
        "-Inf" => Some(f64::NEG_INFINITY),
        "NaN" => Some(f64::NAN),
        _ => tok.parse().ok(),
    }
}

/// `{k="v",...}` with an optional trailing `le`, or nothing at all.
fn label_str(key: &LabelKey, le: Option<&str>) -> String {
    let mut parts: Vec<String> = key
        .pairs()
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
        .collect();
    if let Some(le) = le {
        parts.push(format!("le=\"{le}\""));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!("{{{}}}", parts.join(","))
    }
}

/// Render all families.
pub fn render(families: &[FamilySnapshot]) -> String {
    let mut out = String::new();
    for f in families {
        render_family(f, &mut out);
    }
    out
}

fn render_family(f: &FamilySnapshot, out: &mut String) {
    let name = &f.name;
    let _ = writeln!(out, "# HELP {} {}", name, escape_help(&f.help));
    let _ = writeln!(out, "# TYPE {} {}", name, f.kind().as_str());

    match &f.values {
        SeriesValues::Counter(series) => {
            let mut series: Vec<_> = series.iter().collect();
            series.sort_by(|a, b| a.0.cmp(&b.0));
            for (key, v) in series {
                let _ = writeln!(out, "{}{} {}", name, label_str(key, None), v);
            }
        }
        SeriesValues::Gauge(series) => {
            let mut series: Vec<_> = series.iter().collect();
            series.sort_by(|a, b| a.0.cmp(&b.0));
            for (key, v) in series {
                let _ = writeln!(out, "{}{} {}", name, label_str(key, None), format_value(*v));
            }
        }
        SeriesValues::Histogram(series) => {
            let mut series: Vec<_> = series.iter().collect();
            series.sort_by(|a, b| a.0.cmp(&b.0));
            for (key, h) in series {
                for (bound, count) in h.bounds.iter().zip(&h.buckets) {
                    let le = format_value(*bound);
                    let _ = writeln!(out, "{}_bucket{} {}", name, label_str(key, Some(&le)), count);
                }
                let _ = writeln!(out, "{}_bucket{} {}", name, label_str(key, Some("+Inf")), h.count);

                let plain = label_str(key, None);
                let _ = writeln!(out, "{}_sum{} {}", name, plain, format_value(h.sum));
                let _ = writeln!(out, "{}_count{} {}", name, plain, h.count);
            }
        }
    }
}

/// One data line.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub name: String,
    pub labels: LabelKey,
    pub value: f64,
}

/// Samples grouped under their `# HELP`/`# TYPE` header.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedFamily {
    pub name: String,
    pub help: Option<String>,
    pub kind: Option<MetricKind>,
    pub samples: Vec<Sample>,
}

impl ParsedFamily {
    fn owns(&self, sample: &str) -> bool {
        if sample == self.name {
            return true;
        }
        match self.kind {
            Some(MetricKind::Histogram) => sample
                .strip_prefix(self.name.as_str())
                .is_some_and(|s| matches!(s, "_bucket" | "_sum" | "_count")),
            _ => false,
        }
    }
}

fn perr(line: usize, msg: impl Into<String>) -> ScopeError {
    ScopeError::Parse {
        line,
        msg: msg.into(),
    }
}

/// Parse exposition text back into families and samples.
pub fn parse(text: &str) -> Result<Vec<ParsedFamily>> {
    let mut families: Vec<ParsedFamily> = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let lineno = idx + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(comment) = line.strip_prefix('#') {
            let mut parts = comment.trim_start().splitn(3, ' ');
            let (Some(directive), Some(name)) = (parts.next(), parts.next()) else {
                continue;
            };
            let rest = parts.next().unwrap_or("");
            match directive {
                "HELP" => family_for(&mut families, name).help = Some(unescape_help(rest)),
                "TYPE" => {
                    let kind = match rest.trim() {
                        "counter" => MetricKind::Counter,
                        "gauge" => MetricKind::Gauge,
                        "histogram" => MetricKind::Histogram,
                        other => return Err(perr(lineno, format!("unsupported type {other:?}"))),
                    };
                    family_for(&mut families, name).kind = Some(kind);
                }
                _ => {}
            }
            continue;
        }

        let sample = parse_sample(line, lineno)?;
        match families.last_mut() {
            Some(f) if f.owns(&sample.name) => f.samples.push(sample),
            _ => families.push(ParsedFamily {
                name: sample.name.clone(),
                samples: vec![sample],
                ..Default::default()
            }),
        }
    }

    Ok(families)
}

fn family_for<'a>(families: &'a mut Vec<ParsedFamily>, name: &str) -> &'a mut ParsedFamily {
    let is_current = families.last().is_some_and(|f| f.name == name);
    if !is_current {
        families.push(ParsedFamily {
            name: name.to_string(),
            ..Default::default()
        });
    }
    let last = families.len() - 1;
    &mut families[last]
}

fn parse_sample(line: &str, lineno: usize) -> Result<Sample> {
    let name_end = line
        .find(|c: char| c == '{' || c.is_whitespace())
        .unwrap_or(line.len());
    let name = &line[..name_end];
    validate_metric_name(name).map_err(|e| perr(lineno, e.to_string()))?;

    let mut rest = &line[name_end..];
    let mut pairs = Vec::new();
    if let Some(inner) = rest.strip_prefix('{') {
        let (p, after) = parse_labels(inner, lineno)?;
        pairs = p;
        rest = after;
    }

    let mut fields = rest.split_whitespace();
    let tok = fields.next().ok_or_else(|| perr(lineno, "missing value"))?;
    let value = parse_value(tok).ok_or_else(|| perr(lineno, format!("bad value {tok:?}")))?;
    if let Some(ts) = fields.next() {
        ts.parse::<i64>()
            .map_err(|_| perr(lineno, format!("bad timestamp {ts:?}")))?;
    }
    if fields.next().is_some() {
        return Err(perr(lineno, "trailing tokens"));
    }

    Ok(Sample {
        name: name.to_string(),
        labels: LabelKey::from_pairs(pairs),
        value,
    })
}

/// Parse `k="v",...}` and return the pairs plus the text after `}`.
fn parse_labels(mut rest: &str, lineno: usize) -> Result<(Vec<(String, String)>, &str)> {
    let mut pairs = Vec::new();
    loop {
        rest = rest.trim_start();
        if let Some(after) = rest.strip_prefix('}') {
            return Ok((pairs, after));
        }

        let eq = rest.find('=').ok_or_else(|| perr(lineno, "expected '='"))?;
        let lname = rest[..eq].trim();
        validate_label_name(lname).map_err(|e| perr(lineno, e.to_string()))?;
        rest = rest[eq + 1..].trim_start();
        rest = rest
            .strip_prefix('"')
            .ok_or_else(|| perr(lineno, "expected '\"'"))?;

        let mut value = String::new();
        let mut chars = rest.char_indices();
        let end = loop {
            match chars.next() {
                None => return Err(perr(lineno, "unterminated label value")),
                Some((i, '"')) => break i,
                Some((_, '\\')) => match chars.next() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, '\\')) => value.push('\\'),
                    Some((_, '"')) => value.push('"'),
                    Some((_, c)) => {
                        value.push('\\');
                        value.push(c);
                    }
                    None => return Err(perr(lineno, "dangling escape")),
                },
                Some((_, c)) => value.push(c),
            }
        };
        pairs.push((lname.to_string(), value));

        rest = rest[end + 1..].trim_start();
        if let Some(after) = rest.strip_prefix(',') {
            rest = after;
        } else if !rest.starts_with('}') {
            return Err(perr(lineno, "expected ',' or '}'"));
        }
    }
}
