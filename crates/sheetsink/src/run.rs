use crate::error::SinkError;
use crate::params::{effective_params, ParamValue};
use crate::query::{QueryDef, QueuedItem};
use crate::queue::{BatchOptions, BatchRun, ExecutionQueue, ItemOutcome};
use crate::registry::OwnershipStore;
use crate::resolve::{TargetHint, TargetResolver};
use crate::writer::TableWriter;
use sheetsink_host::{RowRecord, SpreadsheetHost};
use std::collections::BTreeMap;
use std::time::Duration;

/// Boundary to whatever produces result rows for a query; remote clients,
/// caches and mocks all live behind this.
pub trait RowSource {
    fn fetch(
        &mut self,
        api_id: &str,
        params: &BTreeMap<String, ParamValue>,
    ) -> Result<Vec<RowRecord>, SinkError>;
}

/// Pairs a host document, an ownership store and a row source, and drives
/// batches of queries through the queue with the standard runner: resolve the
/// target, fetch rows, upsert the table.
pub struct RunSession<H, S, R>
where
    H: SpreadsheetHost,
    S: OwnershipStore<H>,
    R: RowSource,
{
    host: H,
    store: S,
    source: R,
    resolver: TargetResolver,
    writer: TableWriter,
    queue: ExecutionQueue,
    globals: BTreeMap<String, ParamValue>,
}

impl<H, S, R> RunSession<H, S, R>
where
    H: SpreadsheetHost,
    S: OwnershipStore<H>,
    R: RowSource,
{
    pub fn new(host: H, store: S, source: R) -> Self {
        Self {
            host,
            store,
            source,
            resolver: TargetResolver::new(),
            writer: TableWriter::new(),
            queue: ExecutionQueue::new(),
            globals: BTreeMap::new(),
        }
    }

    pub fn with_resolver(mut self, resolver: TargetResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_writer(mut self, writer: TableWriter) -> Self {
        self.writer = writer;
        self
    }

    pub fn set_globals(&mut self, globals: BTreeMap<String, ParamValue>) {
        self.globals = globals;
    }

    pub fn queue(&self) -> &ExecutionQueue {
        &self.queue
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_parts(self) -> (H, S, R) {
        (self.host, self.store, self.source)
    }

    /// Run every included query as one batch.
    ///
    /// Effective parameters are recomputed inside the per-item runner, right
    /// before that item executes, so a change to the global map lands on the
    /// items that have not run yet.
    pub fn run_queries(
        &mut self,
        queries: &[QueryDef],
        config_id: Option<String>,
        backoff: Option<Duration>,
    ) -> BatchRun {
        let items: Vec<QueuedItem> = queries
            .iter()
            .filter(|q| q.include_in_batch)
            .map(|q| {
                let params = effective_params(
                    &q.parameter_keys,
                    q.parameter_mode,
                    &self.globals,
                    q.parameter_overrides.as_ref(),
                );
                QueuedItem::from_query(q, params)
            })
            .collect();

        let mut options = BatchOptions::new(config_id, items);
        if let Some(backoff) = backoff {
            options = options.with_backoff(backoff);
        }

        let host = &mut self.host;
        let store = &mut self.store;
        let source = &mut self.source;
        let resolver = &self.resolver;
        let writer = &self.writer;
        let globals = &self.globals;

        self.queue.run_batch(options, |item| {
            let Some(query) = queries.iter().find(|q| q.id == item.id) else {
                tracing::warn!(item = %item.id, "no query definition for queued item");
                return Ok(ItemOutcome::failed());
            };
            let params = effective_params(
                &query.parameter_keys,
                query.parameter_mode,
                globals,
                query.parameter_overrides.as_ref(),
            );
            let hint = TargetHint::new(
                item.target_sheet_name.as_str(),
                item.target_table_name.as_str(),
            );
            let target = resolver.resolve(host, store, &query.id, &hint)?;
            let rows = source.fetch(&item.api_id, &params)?;
            let outcome = writer.upsert(host, store, &query.id, &target, &rows)?;
            Ok(ItemOutcome::ok(outcome.rows_written))
        })
    }
}
