//! Render `tracing` events as one logfmt-style line.
//!
//! The event message comes first, followed by the remaining fields as
//! `key=value` pairs in recording order. String values are quoted only when
//! they contain whitespace or quotes.

use std::fmt::Debug;

use tracing::{
    Event,
    field::{Field, Visit},
};

/// A rendered event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLog {
    /// Severity, e.g. `INFO`.
    pub level: String,
    /// Event target, usually the module path.
    pub target: String,
    /// Message followed by `key=value` pairs.
    pub message: String,
}

/// Collects the message and the other fields of an event.
#[derive(Default)]
struct FieldCollector {
    /// The `message` field.
    message: Option<String>,
    /// Other fields, rendered.
    pairs: Vec<String>,
}

impl FieldCollector {
    /// Store one rendered value.
    fn push(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = Some(value);
        } else {
            self.pairs.push(format!("{}={}", field.name(), value));
        }
    }

    /// Join message and pairs.
    fn finish(self) -> String {
        self.message.into_iter().chain(self.pairs).collect::<Vec<_>>().join(" ")
    }
}

/// Quote `s` when it would be ambiguous bare.
fn quote(s: &str) -> String {
    if s.is_empty() || s.contains(|c: char| c.is_whitespace() || c == '"' || c == '=') {
        format!("{s:?}")
    } else {
        s.to_string()
    }
}

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        let rendered = if field.name() == "message" {
            value.to_string()
        } else {
            quote(value)
        };
        self.push(field, rendered);
    }

    fn record_debug(&mut self, field: &Field, value: &dyn Debug) {
        self.push(field, format!("{value:?}"));
    }
}

/// Render `event` into level, target, and message.
pub fn render_event(event: &Event<'_>) -> RenderedLog {
    let meta = event.metadata();
    let mut fields = FieldCollector::default();
    event.record(&mut fields);
    RenderedLog {
        level: meta.level().to_string(),
        target: meta.target().to_string(),
        message: fields.finish(),
    }
}
