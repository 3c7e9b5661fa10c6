//! Metric model and Prometheus text exposition rendering.
//!
//! Both exporters build their scrape output from [`MetricFamily`] values:
//! a family carries a fixed label schema, collectors push one labelled
//! [`MetricSample`] per series, and [`render_families`] produces the final
//! exposition text. Rendering by hand (rather than through a client
//! library) lets samples carry their original upstream timestamps.

use std::fmt::Write;

/// A single sample: a value and an optional origin timestamp.
///
/// Timestamps are epoch seconds as reported by the upstream API. The
/// exposition format wants milliseconds; the conversion happens at render
/// time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricSample {
    /// The sample value.
    pub value: f64,
    /// Epoch seconds of the upstream event, if the API reports one.
    pub timestamp: Option<f64>,
}

impl MetricSample {
    /// Create a sample without a timestamp.
    pub fn new(value: f64) -> Self {
        Self {
            value,
            timestamp: None,
        }
    }

    /// Create a sample stamped with an upstream event time in epoch seconds.
    pub fn at(value: f64, epoch_secs: f64) -> Self {
        Self {
            value,
            timestamp: Some(epoch_secs),
        }
    }
}

/// Prometheus metric kind, as written in the `# TYPE` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Gauge,
    Counter,
}

impl MetricKind {
    /// The exposition format name for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
            MetricKind::Counter => "counter",
        }
    }
}

/// A named group of samples sharing one label schema.
#[derive(Debug, Clone)]
pub struct MetricFamily {
    name: &'static str,
    help: &'static str,
    kind: MetricKind,
    label_names: &'static [&'static str],
    samples: Vec<(Vec<String>, MetricSample)>,
}

impl MetricFamily {
    /// Create an empty family.
    pub fn new(
        name: &'static str,
        help: &'static str,
        kind: MetricKind,
        label_names: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            help,
            kind,
            label_names,
            samples: Vec::new(),
        }
    }

    /// The metric name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Append a sample. Label values must match the family's label schema
    /// in count and order.
    pub fn push(&mut self, labels: Vec<String>, sample: MetricSample) {
        debug_assert_eq!(
            labels.len(),
            self.label_names.len(),
            "label arity mismatch for {}",
            self.name
        );
        self.samples.push((labels, sample));
    }

    /// Whether this family holds any samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of samples in this family.
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Render this family into the output buffer.
    ///
    /// A family with no samples renders nothing, not even its headers.
    fn render_into(&self, out: &mut String) {
        if self.samples.is_empty() {
            return;
        }

        writeln!(out, "# HELP {} {}", self.name, self.help).ok();
        writeln!(out, "# TYPE {} {}", self.name, self.kind.as_str()).ok();

        for (labels, sample) in &self.samples {
            out.push_str(self.name);
            out.push_str(&format_labels(self.label_names, labels));
            out.push(' ');
            out.push_str(&format_value(sample.value));
            if let Some(ts) = sample.timestamp {
                write!(out, " {}", (ts * 1000.0).round() as i64).ok();
            }
            out.push('\n');
        }
    }
}

/// Render a set of families in Prometheus text exposition format.
pub fn render_families(families: &[MetricFamily]) -> String {
    let mut out = String::with_capacity(families.len() * 256);
    for family in families {
        family.render_into(&mut out);
    }
    out
}

/// Format label names and values as `{a="1",b="2"}`.
fn format_labels(names: &[&str], values: &[String]) -> String {
    if names.is_empty() {
        return String::new();
    }

    let parts: Vec<String> = names
        .iter()
        .zip(values)
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label_value(v)))
        .collect();

    format!("{{{}}}", parts.join(","))
}

/// Escape special characters in label values.
fn escape_label_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            _ => result.push(c),
        }
    }
    result
}

/// Format a floating point value for Prometheus.
fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value.is_sign_positive() {
            "+Inf".to_string()
        } else {
            "-Inf".to_string()
        }
    } else if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}
