use crate::error::SinkError;
use crate::registry::OwnershipStore;
use crate::resolve::ResolvedTarget;
use crate::telemetry::{Severity, TelemetryEvent, TelemetrySink, TracingSink};
use sheetsink_host::{CellRef, CellValue, RangeRef, RowRecord, SheetVisibility, SpreadsheetHost};
use std::sync::Arc;

/// Fixed origin cell for materialized tables.
pub const TABLE_ANCHOR: CellRef = CellRef { row: 1, col: 1 };

/// Column label used when a result set has no rows, so an empty but
/// structurally valid table is still produced.
pub const PLACEHOLDER_COLUMN: &str = "Column1";

/// Final location of a successful upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub sheet_name: String,
    pub table_name: String,
    pub rows_written: usize,
}

/// Creates or rewrites one output table at a resolved target.
///
/// Overwrite semantics only: an update replaces the entire data body. A
/// shape mismatch deletes the table object and recreates it rather than
/// attempting column remapping.
pub struct TableWriter {
    telemetry: Arc<dyn TelemetrySink>,
}

impl Default for TableWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl TableWriter {
    pub fn new() -> Self {
        Self {
            telemetry: Arc::new(TracingSink),
        }
    }

    pub fn with_telemetry(telemetry: Arc<dyn TelemetrySink>) -> Self {
        Self { telemetry }
    }

    /// Create the target table, or rewrite its header and data body if it
    /// already exists. Ownership is recorded only after the write succeeds;
    /// when the host is unavailable nothing is touched at all.
    pub fn upsert<H, S>(
        &self,
        host: &mut H,
        store: &mut S,
        query_id: &str,
        target: &ResolvedTarget,
        rows: &[RowRecord],
    ) -> Result<WriteOutcome, SinkError>
    where
        H: SpreadsheetHost,
        S: OwnershipStore<H>,
    {
        if !host.is_connected() {
            self.telemetry.emit(
                &TelemetryEvent::new("writer", "host_unavailable", Severity::Warn)
                    .with("queryId", query_id)
                    .with("table", target.table_name.as_str()),
            );
            return Err(SinkError::HostUnavailable);
        }

        let _span = tracing::info_span!(
            "table_upsert",
            query = query_id,
            sheet = %target.sheet_name,
            table = %target.table_name,
            rows = rows.len()
        )
        .entered();

        let result = self.upsert_inner(host, target, rows);
        match result {
            Ok(written) => {
                store.record(host, &target.sheet_name, &target.table_name, query_id)?;
                Ok(WriteOutcome {
                    sheet_name: target.sheet_name.clone(),
                    table_name: target.table_name.clone(),
                    rows_written: written,
                })
            }
            Err(err) => {
                self.telemetry.emit(
                    &TelemetryEvent::new("writer", "write_failure", Severity::Error)
                        .with("queryId", query_id)
                        .with("table", target.table_name.as_str())
                        .with("error", err.to_string()),
                );
                Err(err)
            }
        }
    }

    fn upsert_inner<H: SpreadsheetHost>(
        &self,
        host: &mut H,
        target: &ResolvedTarget,
        rows: &[RowRecord],
    ) -> Result<usize, SinkError> {
        let header = derive_header(rows);
        let body = project_rows(&header, rows);

        let live = host
            .list_tables()
            .map_err(|e| SinkError::from_host("list_tables", e))?;
        let exists = live.iter().any(|t| t.name == target.table_name);

        if exists {
            let current = host
                .table_header(&target.table_name)
                .map_err(|e| SinkError::from_host("table_header", e))?;
            if shapes_match(&current, &header) {
                // Labels may have changed even when the column count didn't,
                // so the header text is rewritten in place.
                host.overwrite_table_header(&target.table_name, &header)
                    .map_err(|e| SinkError::from_host("overwrite_table_header", e))?;
                host.delete_table_data(&target.table_name)
                    .map_err(|e| SinkError::from_host("delete_table_data", e))?;
                if !body.is_empty() {
                    host.append_table_rows(&target.table_name, &body)
                        .map_err(|e| SinkError::from_host("append_table_rows", e))?;
                }
                host.commit().map_err(|e| SinkError::from_host("commit", e))?;
                return Ok(body.len());
            }
            tracing::debug!(table = %target.table_name, "shape mismatch, recreating table");
            host.delete_table(&target.table_name)
                .map_err(|e| SinkError::from_host("delete_table", e))?;
        }

        self.create(host, target, &header, &body)?;
        Ok(body.len())
    }

    fn create<H: SpreadsheetHost>(
        &self,
        host: &mut H,
        target: &ResolvedTarget,
        header: &[String],
        body: &[Vec<CellValue>],
    ) -> Result<(), SinkError> {
        host.create_worksheet(&target.sheet_name, SheetVisibility::Visible)
            .map_err(|e| SinkError::from_host("create_worksheet", e))?;

        let mut values: Vec<Vec<CellValue>> = Vec::with_capacity(body.len() + 1);
        values.push(
            header
                .iter()
                .map(|h| CellValue::Text(h.clone()))
                .collect(),
        );
        values.extend(body.iter().cloned());
        host.write_range(&target.sheet_name, TABLE_ANCHOR, &values)
            .map_err(|e| SinkError::from_host("write_range", e))?;

        let range = RangeRef::new(
            target.sheet_name.as_str(),
            TABLE_ANCHOR,
            CellRef::new(
                TABLE_ANCHOR.row + body.len() as u32,
                TABLE_ANCHOR.col + header.len() as u32 - 1,
            ),
        );
        host.add_table(&range, &target.table_name)
            .map_err(|e| SinkError::from_host("add_table", e))?;
        host.commit().map_err(|e| SinkError::from_host("commit", e))?;
        Ok(())
    }
}

/// Header is the key set of the first row; a rowless result still gets one
/// placeholder column.
fn derive_header(rows: &[RowRecord]) -> Vec<String> {
    match rows.first() {
        Some(first) => first.keys().cloned().collect(),
        None => vec![PLACEHOLDER_COLUMN.to_string()],
    }
}

fn project_rows(header: &[String], rows: &[RowRecord]) -> Vec<Vec<CellValue>> {
    rows.iter()
        .map(|row| {
            header
                .iter()
                .map(|col| row.get(col).cloned().unwrap_or(CellValue::Empty))
                .collect()
        })
        .collect()
}

/// A table keeps its object identity as long as the column count holds;
/// label text is rewritten on every update.
fn shapes_match(current: &[String], derived: &[String]) -> bool {
    current.len() == derived.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn header_of_empty_rowset_is_placeholder() {
        assert_eq!(derive_header(&[]), vec![PLACEHOLDER_COLUMN.to_string()]);
    }

    #[test]
    fn header_follows_first_row_keys() {
        let mut row = BTreeMap::new();
        row.insert("Region".to_string(), CellValue::from("N"));
        row.insert("Amount".to_string(), CellValue::from(10.0));
        assert_eq!(derive_header(&[row]), vec!["Amount", "Region"]);
    }

    #[test]
    fn projection_fills_missing_keys_with_empty() {
        let header = vec!["A".to_string(), "B".to_string()];
        let mut row = BTreeMap::new();
        row.insert("A".to_string(), CellValue::from(1i64));
        let body = project_rows(&header, &[row]);
        assert_eq!(body, vec![vec![CellValue::Int(1), CellValue::Empty]]);
    }

    #[test]
    fn shape_match_is_column_count_equality() {
        let current = vec!["Region".to_string(), "Amount".to_string()];
        let relabeled = vec!["Zone".to_string(), "Total".to_string()];
        assert!(shapes_match(&current, &relabeled));
        assert!(!shapes_match(&current, &["Region".to_string()]));
    }
}
