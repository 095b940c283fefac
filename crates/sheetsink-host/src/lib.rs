pub mod memory;
pub mod traits;
pub mod types;
pub mod value;

pub use memory::{MemoryHost, MemoryHostError};
pub use traits::SpreadsheetHost;
pub use types::{CellRef, RangeRef, SheetVisibility, TableInfo};
pub use value::{CellValue, RowRecord};
