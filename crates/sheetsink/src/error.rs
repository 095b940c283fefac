use thiserror::Error;

/// Failures surfaced by the write path and the stores that back it.
///
/// These are always returned as values; the queue's per-item catch is a
/// backstop, not the primary mechanism. Queue-level conditions (an item
/// failing, a second batch being rejected) are reported through
/// [`BatchRun`](crate::queue::BatchRun) rather than through this type.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The operation was attempted outside the spreadsheet host. Nothing was
    /// read or written.
    #[error("host document is unavailable")]
    HostUnavailable,

    /// A host call failed mid-operation. Ownership is never recorded after
    /// one of these.
    #[error("host call `{op}` failed: {message}")]
    Host { op: &'static str, message: String },

    /// The ownership store held a row this version cannot interpret.
    #[error("ownership store: {message}")]
    Store { message: String },

    /// A data source could not produce rows for an item.
    #[error("data source `{api_id}` failed: {message}")]
    Source { api_id: String, message: String },
}

impl SinkError {
    /// Normalize a backend error into a typed failure carrying the operation
    /// name, best-effort message included.
    pub fn from_host<E: std::error::Error>(op: &'static str, err: E) -> Self {
        SinkError::Host {
            op,
            message: err.to_string(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        SinkError::Store {
            message: message.into(),
        }
    }
}
