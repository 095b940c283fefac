use crate::traits::SpreadsheetHost;
use crate::types::{CellRef, RangeRef, SheetVisibility, TableInfo};
use crate::value::CellValue;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MemoryHostError {
    #[error("host is not connected")]
    Disconnected,

    #[error("worksheet `{sheet}` does not exist")]
    MissingSheet { sheet: String },

    #[error("table `{table}` does not exist")]
    MissingTable { table: String },

    #[error("table `{table}` already exists")]
    TableExists { table: String },

    #[error("table `{table}` has {expected} columns, got {got}")]
    ColumnMismatch {
        table: String,
        expected: u32,
        got: u32,
    },

    #[error("injected failure in `{op}`")]
    Injected { op: &'static str },
}

#[derive(Debug, Clone)]
struct Sheet {
    cells: BTreeMap<(u32, u32), CellValue>,
    visibility: SheetVisibility,
}

#[derive(Debug, Clone)]
struct Table {
    sheet: String,
    origin: CellRef,
    columns: u32,
    data_rows: u32,
}

#[derive(Debug, Clone, Default)]
struct Document {
    sheets: BTreeMap<String, Sheet>,
    tables: BTreeMap<String, Table>,
}

/// In-memory [`SpreadsheetHost`] used as the reference backend in tests.
///
/// Mutations apply to a staged copy of the document; [`commit`] makes the
/// staged state durable. `committed_*` accessors read the durable side, so a
/// test can assert that a failed operation left nothing behind.
///
/// [`commit`]: SpreadsheetHost::commit
pub struct MemoryHost {
    connected: bool,
    staged: Document,
    committed: Document,
    commits: usize,
    fail_next: Option<&'static str>,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHost {
    pub fn new() -> Self {
        Self {
            connected: true,
            staged: Document::default(),
            committed: Document::default(),
            commits: 0,
            fail_next: None,
        }
    }

    /// A host that reports itself unavailable; every call errors.
    pub fn disconnected() -> Self {
        Self {
            connected: false,
            ..Self::new()
        }
    }

    /// Arm a one-shot failure for the named trait method.
    pub fn fail_next(&mut self, op: &'static str) {
        self.fail_next = Some(op);
    }

    pub fn commit_count(&self) -> usize {
        self.commits
    }

    pub fn has_sheet(&self, name: &str) -> bool {
        self.staged.sheets.contains_key(name)
    }

    pub fn sheet_visibility(&self, name: &str) -> Option<SheetVisibility> {
        self.staged.sheets.get(name).map(|s| s.visibility)
    }

    /// Staged value of one cell; `Empty` when unset.
    pub fn cell(&self, sheet: &str, row: u32, col: u32) -> CellValue {
        self.staged
            .sheets
            .get(sheet)
            .and_then(|s| s.cells.get(&(row, col)).cloned())
            .unwrap_or(CellValue::Empty)
    }

    /// Durable (committed) value of one cell; `Empty` when unset.
    pub fn committed_cell(&self, sheet: &str, row: u32, col: u32) -> CellValue {
        self.committed
            .sheets
            .get(sheet)
            .and_then(|s| s.cells.get(&(row, col)).cloned())
            .unwrap_or(CellValue::Empty)
    }

    pub fn committed_sheet_names(&self) -> Vec<String> {
        self.committed.sheets.keys().cloned().collect()
    }

    fn trip(&mut self, op: &'static str) -> Result<(), MemoryHostError> {
        if !self.connected {
            return Err(MemoryHostError::Disconnected);
        }
        if self.fail_next == Some(op) {
            self.fail_next = None;
            return Err(MemoryHostError::Injected { op });
        }
        Ok(())
    }

    fn sheet_mut(&mut self, name: &str) -> Result<&mut Sheet, MemoryHostError> {
        self.staged
            .sheets
            .get_mut(name)
            .ok_or_else(|| MemoryHostError::MissingSheet {
                sheet: name.to_string(),
            })
    }

    fn table(&self, name: &str) -> Result<&Table, MemoryHostError> {
        self.staged
            .tables
            .get(name)
            .ok_or_else(|| MemoryHostError::MissingTable {
                table: name.to_string(),
            })
    }
}

impl SpreadsheetHost for MemoryHost {
    type Error = MemoryHostError;

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn worksheet_names(&mut self) -> Result<Vec<String>, Self::Error> {
        self.trip("worksheet_names")?;
        Ok(self.staged.sheets.keys().cloned().collect())
    }

    fn create_worksheet(
        &mut self,
        name: &str,
        visibility: SheetVisibility,
    ) -> Result<(), Self::Error> {
        self.trip("create_worksheet")?;
        // Re-creating an existing sheet must not disturb it.
        self.staged
            .sheets
            .entry(name.to_string())
            .or_insert_with(|| Sheet {
                cells: BTreeMap::new(),
                visibility,
            });
        Ok(())
    }

    fn delete_worksheet(&mut self, name: &str) -> Result<(), Self::Error> {
        self.trip("delete_worksheet")?;
        if self.staged.sheets.remove(name).is_none() {
            return Err(MemoryHostError::MissingSheet {
                sheet: name.to_string(),
            });
        }
        self.staged.tables.retain(|_, t| t.sheet != name);
        Ok(())
    }

    fn list_tables(&mut self) -> Result<Vec<TableInfo>, Self::Error> {
        self.trip("list_tables")?;
        Ok(self
            .staged
            .tables
            .iter()
            .map(|(name, t)| TableInfo {
                name: name.clone(),
                worksheet: t.sheet.clone(),
                rows: t.data_rows as usize,
            })
            .collect())
    }

    fn read_range(&mut self, range: &RangeRef) -> Result<Vec<Vec<CellValue>>, Self::Error> {
        self.trip("read_range")?;
        let sheet = self.staged.sheets.get(&range.sheet).ok_or_else(|| {
            MemoryHostError::MissingSheet {
                sheet: range.sheet.clone(),
            }
        })?;
        let mut out = Vec::with_capacity(range.height() as usize);
        for row in range.start.row..=range.end.row {
            let mut cells = Vec::with_capacity(range.width() as usize);
            for col in range.start.col..=range.end.col {
                cells.push(
                    sheet
                        .cells
                        .get(&(row, col))
                        .cloned()
                        .unwrap_or(CellValue::Empty),
                );
            }
            out.push(cells);
        }
        Ok(out)
    }

    fn write_range(
        &mut self,
        sheet: &str,
        origin: CellRef,
        values: &[Vec<CellValue>],
    ) -> Result<(), Self::Error> {
        self.trip("write_range")?;
        let sheet = self.sheet_mut(sheet)?;
        for (r, row) in values.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                let coord = (origin.row + r as u32, origin.col + c as u32);
                if value.is_empty() {
                    sheet.cells.remove(&coord);
                } else {
                    sheet.cells.insert(coord, value.clone());
                }
            }
        }
        Ok(())
    }

    fn add_table(&mut self, range: &RangeRef, name: &str) -> Result<(), Self::Error> {
        self.trip("add_table")?;
        if self.staged.tables.contains_key(name) {
            return Err(MemoryHostError::TableExists {
                table: name.to_string(),
            });
        }
        if !self.staged.sheets.contains_key(&range.sheet) {
            return Err(MemoryHostError::MissingSheet {
                sheet: range.sheet.clone(),
            });
        }
        self.staged.tables.insert(
            name.to_string(),
            Table {
                sheet: range.sheet.clone(),
                origin: range.start,
                columns: range.width(),
                data_rows: range.height().saturating_sub(1),
            },
        );
        Ok(())
    }

    fn table_header(&mut self, table: &str) -> Result<Vec<String>, Self::Error> {
        self.trip("table_header")?;
        let t = self.table(table)?.clone();
        let range = RangeRef::new(
            t.sheet,
            t.origin,
            CellRef::new(t.origin.row, t.origin.col + t.columns - 1),
        );
        let mut rows = self.read_range(&range)?;
        Ok(rows.remove(0).into_iter().map(|v| v.to_display()).collect())
    }

    fn table_data_rows(&mut self, table: &str) -> Result<Vec<Vec<CellValue>>, Self::Error> {
        self.trip("table_data_rows")?;
        let t = self.table(table)?.clone();
        if t.data_rows == 0 {
            return Ok(Vec::new());
        }
        let range = RangeRef::new(
            t.sheet,
            CellRef::new(t.origin.row + 1, t.origin.col),
            CellRef::new(t.origin.row + t.data_rows, t.origin.col + t.columns - 1),
        );
        self.read_range(&range)
    }

    fn overwrite_table_header(
        &mut self,
        table: &str,
        labels: &[String],
    ) -> Result<(), Self::Error> {
        self.trip("overwrite_table_header")?;
        let t = self.table(table)?.clone();
        if labels.len() as u32 != t.columns {
            return Err(MemoryHostError::ColumnMismatch {
                table: table.to_string(),
                expected: t.columns,
                got: labels.len() as u32,
            });
        }
        let values = vec![labels
            .iter()
            .map(|l| CellValue::Text(l.clone()))
            .collect::<Vec<_>>()];
        self.write_range(&t.sheet.clone(), t.origin, &values)
    }

    fn delete_table_data(&mut self, table: &str) -> Result<(), Self::Error> {
        self.trip("delete_table_data")?;
        let t = self.table(table)?.clone();
        let sheet = self.sheet_mut(&t.sheet)?;
        for row in (t.origin.row + 1)..=(t.origin.row + t.data_rows) {
            for col in t.origin.col..(t.origin.col + t.columns) {
                sheet.cells.remove(&(row, col));
            }
        }
        if let Some(entry) = self.staged.tables.get_mut(table) {
            entry.data_rows = 0;
        }
        Ok(())
    }

    fn append_table_rows(
        &mut self,
        table: &str,
        rows: &[Vec<CellValue>],
    ) -> Result<(), Self::Error> {
        self.trip("append_table_rows")?;
        let t = self.table(table)?.clone();
        for row in rows {
            if row.len() as u32 != t.columns {
                return Err(MemoryHostError::ColumnMismatch {
                    table: table.to_string(),
                    expected: t.columns,
                    got: row.len() as u32,
                });
            }
        }
        let origin = CellRef::new(t.origin.row + t.data_rows + 1, t.origin.col);
        self.write_range(&t.sheet.clone(), origin, rows)?;
        if let Some(entry) = self.staged.tables.get_mut(table) {
            entry.data_rows += rows.len() as u32;
        }
        Ok(())
    }

    fn delete_table(&mut self, table: &str) -> Result<(), Self::Error> {
        self.trip("delete_table")?;
        let t = self.table(table)?.clone();
        let sheet = self.sheet_mut(&t.sheet)?;
        for row in t.origin.row..=(t.origin.row + t.data_rows) {
            for col in t.origin.col..(t.origin.col + t.columns) {
                sheet.cells.remove(&(row, col));
            }
        }
        self.staged.tables.remove(table);
        Ok(())
    }

    fn commit(&mut self) -> Result<(), Self::Error> {
        self.trip("commit")?;
        self.committed = self.staged.clone();
        self.commits += 1;
        Ok(())
    }
}
