//! Materialize named query results as tables inside a host spreadsheet.
//!
//! The document itself carries the metadata: an ownership ledger in a hidden
//! sheet records which tables this system created on behalf of which query,
//! so re-runs overwrite their own output and never clobber tables the user
//! built by hand.

pub mod error;
pub mod params;
pub mod query;
pub mod queue;
pub mod registry;
pub mod resolve;
pub mod run;
pub mod telemetry;
pub mod writer;

pub use error::SinkError;
pub use params::{effective_params, ParamValue};
pub use query::{ParameterMode, QueryDef, QueuedItem};
pub use queue::{
    BatchOptions, BatchProgress, BatchReport, BatchRun, ExecutionQueue, ItemOutcome,
};
pub use registry::{
    MemoryOwnershipStore, OwnershipRecord, OwnershipStore, PurgeSummary, SheetOwnershipStore,
    STORE_SHEET, STORE_TABLE,
};
pub use resolve::{HintPrecedence, ResolvedTarget, TargetHint, TargetResolver};
pub use run::{RowSource, RunSession};
pub use telemetry::{NullSink, Severity, TelemetryEvent, TelemetrySink, TracingSink};
pub use writer::{TableWriter, WriteOutcome, PLACEHOLDER_COLUMN, TABLE_ANCHOR};

// Re-export the host boundary for convenience
pub use sheetsink_host::{
    CellRef, CellValue, MemoryHost, RangeRef, RowRecord, SheetVisibility, SpreadsheetHost,
    TableInfo,
};
