use crate::types::{CellRef, RangeRef, SheetVisibility, TableInfo};
use crate::value::CellValue;

/// Automation boundary to the host spreadsheet document.
///
/// Mutating calls are staged; nothing is durable until [`commit`] flushes a
/// synchronization round. Callers batch related mutations and issue at most a
/// few commits per logical operation. Table names are document-global (the
/// owning worksheet is reported through [`TableInfo`]).
///
/// [`commit`]: SpreadsheetHost::commit
pub trait SpreadsheetHost: Send {
    type Error: std::error::Error + Send + Sync + 'static;

    /// False when running outside the host document. Callers must not issue
    /// any other call on a disconnected host.
    fn is_connected(&self) -> bool;

    fn worksheet_names(&mut self) -> Result<Vec<String>, Self::Error>;

    /// Create a worksheet. Creating an existing sheet is a no-op and does not
    /// change its visibility.
    fn create_worksheet(
        &mut self,
        name: &str,
        visibility: SheetVisibility,
    ) -> Result<(), Self::Error>;

    /// Delete a worksheet and everything on it.
    fn delete_worksheet(&mut self, name: &str) -> Result<(), Self::Error>;

    /// Enumerate every live table with its owning worksheet and data row count.
    fn list_tables(&mut self) -> Result<Vec<TableInfo>, Self::Error>;

    /// Literal values of a rectangular range, row-major, empty cells included.
    fn read_range(&mut self, range: &RangeRef) -> Result<Vec<Vec<CellValue>>, Self::Error>;

    /// Write literal values row-major with the top-left cell at `origin`.
    fn write_range(
        &mut self,
        sheet: &str,
        origin: CellRef,
        values: &[Vec<CellValue>],
    ) -> Result<(), Self::Error>;

    /// Promote an existing range (header row first) to a named table.
    fn add_table(&mut self, range: &RangeRef, name: &str) -> Result<(), Self::Error>;

    /// Header labels of a table, left to right.
    fn table_header(&mut self, table: &str) -> Result<Vec<String>, Self::Error>;

    /// Data-body values of a table, row-major, header excluded.
    fn table_data_rows(&mut self, table: &str) -> Result<Vec<Vec<CellValue>>, Self::Error>;

    /// Rewrite header label text in place. Label count must match the table's
    /// current column count.
    fn overwrite_table_header(&mut self, table: &str, labels: &[String])
        -> Result<(), Self::Error>;

    /// Delete every data row, keeping the table object and its header.
    fn delete_table_data(&mut self, table: &str) -> Result<(), Self::Error>;

    /// Append rows to the data body as one batch.
    fn append_table_rows(
        &mut self,
        table: &str,
        rows: &[Vec<CellValue>],
    ) -> Result<(), Self::Error>;

    /// Remove the table object and clear the cells it occupied.
    fn delete_table(&mut self, table: &str) -> Result<(), Self::Error>;

    /// Flush one synchronization round, making staged mutations durable.
    fn commit(&mut self) -> Result<(), Self::Error>;
}
