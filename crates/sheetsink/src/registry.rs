use crate::error::SinkError;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sheetsink_host::{CellRef, CellValue, RangeRef, SheetVisibility, SpreadsheetHost};

/// Worksheet holding the ownership ledger; hidden from normal navigation.
pub const STORE_SHEET: &str = "_SheetSink";
/// Table holding one row per ownership record.
pub const STORE_TABLE: &str = "SheetSinkOwnership";

const STORE_COLUMNS: [&str; 5] = [
    "sheetName",
    "tableName",
    "queryId",
    "isManaged",
    "lastTouchedUtc",
];

/// Durable assertion that `(sheet_name, table_name)` was created and is
/// maintained by this system on behalf of `query_id`.
///
/// Unique per `(sheet_name, table_name)`; refreshed on every successful write
/// to the same location, deleted only by [`SheetOwnershipStore::purge`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipRecord {
    pub sheet_name: String,
    pub table_name: String,
    pub query_id: Option<String>,
    pub is_managed: bool,
    pub last_touched_utc: String,
}

/// Repository seam over the ownership ledger so tests can substitute an
/// in-memory store without a live host.
pub trait OwnershipStore<H: SpreadsheetHost> {
    /// Every record, empty when the ledger has never been materialized.
    fn list(&mut self, host: &mut H) -> Result<Vec<OwnershipRecord>, SinkError>;

    /// Update the record matching `(sheet_name, table_name)` in place, or
    /// append a new one. Sets `is_managed` and refreshes `last_touched_utc`.
    fn record(
        &mut self,
        host: &mut H,
        sheet_name: &str,
        table_name: &str,
        query_id: &str,
    ) -> Result<(), SinkError>;
}

/// Production store persisting records as rows of [`STORE_TABLE`] on the
/// hidden [`STORE_SHEET`] inside the document being written.
#[derive(Debug, Default, Clone, Copy)]
pub struct SheetOwnershipStore;

/// Result of a bulk purge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PurgeSummary {
    pub tables_removed: usize,
    pub sheets_removed: usize,
    pub records_removed: usize,
}

impl SheetOwnershipStore {
    pub fn new() -> Self {
        Self
    }

    fn store_exists<H: SpreadsheetHost>(&self, host: &mut H) -> Result<bool, SinkError> {
        let tables = host
            .list_tables()
            .map_err(|e| SinkError::from_host("list_tables", e))?;
        Ok(tables.iter().any(|t| t.name == STORE_TABLE))
    }

    /// Create the hidden sheet and the header-only ledger table if absent.
    /// Re-materializing an existing store is a no-op.
    fn ensure_store<H: SpreadsheetHost>(&self, host: &mut H) -> Result<(), SinkError> {
        if self.store_exists(host)? {
            return Ok(());
        }
        host.create_worksheet(STORE_SHEET, SheetVisibility::Hidden)
            .map_err(|e| SinkError::from_host("create_worksheet", e))?;
        let header: Vec<CellValue> = STORE_COLUMNS
            .iter()
            .map(|c| CellValue::Text(c.to_string()))
            .collect();
        host.write_range(STORE_SHEET, CellRef::new(1, 1), &[header])
            .map_err(|e| SinkError::from_host("write_range", e))?;
        let range = RangeRef::new(
            STORE_SHEET,
            CellRef::new(1, 1),
            CellRef::new(1, STORE_COLUMNS.len() as u32),
        );
        host.add_table(&range, STORE_TABLE)
            .map_err(|e| SinkError::from_host("add_table", e))?;
        tracing::debug!(sheet = STORE_SHEET, table = STORE_TABLE, "materialized ownership store");
        Ok(())
    }

    fn parse_row(row: &[CellValue]) -> Result<OwnershipRecord, SinkError> {
        if row.len() < STORE_COLUMNS.len() {
            return Err(SinkError::store(format!(
                "ownership row has {} cells, expected {}",
                row.len(),
                STORE_COLUMNS.len()
            )));
        }
        let query_id = match &row[2] {
            CellValue::Empty => None,
            other => {
                let text = other.to_display();
                if text.is_empty() { None } else { Some(text) }
            }
        };
        let is_managed = match &row[3] {
            CellValue::Boolean(b) => *b,
            CellValue::Int(i) => *i != 0,
            CellValue::Text(s) => s.eq_ignore_ascii_case("true"),
            CellValue::Empty => false,
            other => {
                return Err(SinkError::store(format!(
                    "unreadable isManaged cell: {other:?}"
                )));
            }
        };
        Ok(OwnershipRecord {
            sheet_name: row[0].to_display(),
            table_name: row[1].to_display(),
            query_id,
            is_managed,
            last_touched_utc: row[4].to_display(),
        })
    }

    fn record_to_row(record: &OwnershipRecord) -> Vec<CellValue> {
        vec![
            CellValue::Text(record.sheet_name.clone()),
            CellValue::Text(record.table_name.clone()),
            record
                .query_id
                .as_ref()
                .map(|q| CellValue::Text(q.clone()))
                .unwrap_or(CellValue::Empty),
            CellValue::Boolean(record.is_managed),
            CellValue::Text(record.last_touched_utc.clone()),
        ]
    }

    /// Delete every managed table, any sheet they left empty, the ledger
    /// itself, and its hidden sheet. This is the only operation that deletes
    /// ownership records.
    pub fn purge<H: SpreadsheetHost>(&self, host: &mut H) -> Result<PurgeSummary, SinkError> {
        let records = self.read_records(host)?;
        let mut summary = PurgeSummary {
            records_removed: records.len(),
            ..PurgeSummary::default()
        };
        if records.is_empty() && !self.store_exists(host)? {
            return Ok(summary);
        }

        let live = host
            .list_tables()
            .map_err(|e| SinkError::from_host("list_tables", e))?;
        let mut touched_sheets = Vec::new();
        for record in records.iter().filter(|r| r.is_managed) {
            if live.iter().any(|t| t.name == record.table_name) {
                host.delete_table(&record.table_name)
                    .map_err(|e| SinkError::from_host("delete_table", e))?;
                summary.tables_removed += 1;
            }
            if !touched_sheets.contains(&record.sheet_name) {
                touched_sheets.push(record.sheet_name.clone());
            }
        }

        // Sheets that hosted managed tables go too, once nothing else lives on them.
        let remaining = host
            .list_tables()
            .map_err(|e| SinkError::from_host("list_tables", e))?;
        for sheet in touched_sheets {
            if sheet != STORE_SHEET && !remaining.iter().any(|t| t.worksheet == sheet) {
                host.delete_worksheet(&sheet)
                    .map_err(|e| SinkError::from_host("delete_worksheet", e))?;
                summary.sheets_removed += 1;
            }
        }

        if self.store_exists(host)? {
            host.delete_table(STORE_TABLE)
                .map_err(|e| SinkError::from_host("delete_table", e))?;
            host.delete_worksheet(STORE_SHEET)
                .map_err(|e| SinkError::from_host("delete_worksheet", e))?;
        }
        host.commit().map_err(|e| SinkError::from_host("commit", e))?;
        tracing::info!(
            tables = summary.tables_removed,
            sheets = summary.sheets_removed,
            records = summary.records_removed,
            "purged owned content"
        );
        Ok(summary)
    }

    fn read_records<H: SpreadsheetHost>(
        &self,
        host: &mut H,
    ) -> Result<Vec<OwnershipRecord>, SinkError> {
        if !self.store_exists(host)? {
            return Ok(Vec::new());
        }
        let rows = host
            .table_data_rows(STORE_TABLE)
            .map_err(|e| SinkError::from_host("table_data_rows", e))?;
        rows.iter().map(|row| Self::parse_row(row)).collect()
    }
}

impl<H: SpreadsheetHost> OwnershipStore<H> for SheetOwnershipStore {
    fn list(&mut self, host: &mut H) -> Result<Vec<OwnershipRecord>, SinkError> {
        self.read_records(host)
    }

    fn record(
        &mut self,
        host: &mut H,
        sheet_name: &str,
        table_name: &str,
        query_id: &str,
    ) -> Result<(), SinkError> {
        self.ensure_store(host)?;
        let mut records = self.read_records(host)?;
        let now = Utc::now().to_rfc3339();
        let updated = OwnershipRecord {
            sheet_name: sheet_name.to_string(),
            table_name: table_name.to_string(),
            query_id: Some(query_id.to_string()),
            is_managed: true,
            last_touched_utc: now,
        };

        match records
            .iter()
            .position(|r| r.sheet_name == sheet_name && r.table_name == table_name)
        {
            Some(idx) => {
                // In-place update: rewrite the whole body in one round.
                records[idx] = updated;
                let rows: Vec<Vec<CellValue>> =
                    records.iter().map(Self::record_to_row).collect();
                host.delete_table_data(STORE_TABLE)
                    .map_err(|e| SinkError::from_host("delete_table_data", e))?;
                host.append_table_rows(STORE_TABLE, &rows)
                    .map_err(|e| SinkError::from_host("append_table_rows", e))?;
            }
            None => {
                host.append_table_rows(STORE_TABLE, &[Self::record_to_row(&updated)])
                    .map_err(|e| SinkError::from_host("append_table_rows", e))?;
            }
        }
        host.commit().map_err(|e| SinkError::from_host("commit", e))?;
        Ok(())
    }
}

/// In-memory store for tests and for callers that keep ownership outside the
/// document.
#[derive(Debug, Default, Clone)]
pub struct MemoryOwnershipStore {
    records: Vec<OwnershipRecord>,
}

impl MemoryOwnershipStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<OwnershipRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[OwnershipRecord] {
        &self.records
    }
}

impl<H: SpreadsheetHost> OwnershipStore<H> for MemoryOwnershipStore {
    fn list(&mut self, _host: &mut H) -> Result<Vec<OwnershipRecord>, SinkError> {
        Ok(self.records.clone())
    }

    fn record(
        &mut self,
        _host: &mut H,
        sheet_name: &str,
        table_name: &str,
        query_id: &str,
    ) -> Result<(), SinkError> {
        let now = Utc::now().to_rfc3339();
        match self
            .records
            .iter_mut()
            .find(|r| r.sheet_name == sheet_name && r.table_name == table_name)
        {
            Some(existing) => {
                existing.query_id = Some(query_id.to_string());
                existing.is_managed = true;
                existing.last_touched_utc = now;
            }
            None => self.records.push(OwnershipRecord {
                sheet_name: sheet_name.to_string(),
                table_name: table_name.to_string(),
                query_id: Some(query_id.to_string()),
                is_managed: true,
                last_touched_utc: now,
            }),
        }
        Ok(())
    }
}
