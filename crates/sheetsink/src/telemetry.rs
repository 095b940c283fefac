use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
}

/// Structured event emitted at batch and write boundaries.
///
/// Storage and transport are the sink's problem; this subsystem only emits.
#[derive(Debug, Clone)]
pub struct TelemetryEvent {
    pub category: &'static str,
    pub name: &'static str,
    pub severity: Severity,
    pub context: BTreeMap<String, String>,
}

impl TelemetryEvent {
    pub fn new(category: &'static str, name: &'static str, severity: Severity) -> Self {
        Self {
            category,
            name,
            severity,
            context: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.context.insert(key.to_string(), value.into());
        self
    }
}

pub trait TelemetrySink: Send + Sync {
    fn emit(&self, event: &TelemetryEvent);
}

/// Forwards events onto the `tracing` subscriber, one line per event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn emit(&self, event: &TelemetryEvent) {
        let context = event
            .context
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(" ");
        match event.severity {
            Severity::Debug => {
                tracing::debug!(category = event.category, event = event.name, %context)
            }
            Severity::Info => {
                tracing::info!(category = event.category, event = event.name, %context)
            }
            Severity::Warn => {
                tracing::warn!(category = event.category, event = event.name, %context)
            }
            Severity::Error => {
                tracing::error!(category = event.category, event = event.name, %context)
            }
        }
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl TelemetrySink for NullSink {
    fn emit(&self, _event: &TelemetryEvent) {}
}
