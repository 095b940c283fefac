#![allow(dead_code)]

use parking_lot::Mutex;
use sheetsink::{
    CellRef, CellValue, MemoryHost, RangeRef, RowRecord, RowSource, SheetVisibility, SinkError,
    SpreadsheetHost, TelemetryEvent, TelemetrySink,
};
use std::collections::BTreeMap;

/// Telemetry sink that remembers everything it saw.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<TelemetryEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events.lock().clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(|e| e.name).collect()
    }
}

impl TelemetrySink for RecordingSink {
    fn emit(&self, event: &TelemetryEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Row source backed by a fixed per-api map; records the parameters each
/// fetch was called with.
#[derive(Default)]
pub struct StubSource {
    rows: BTreeMap<String, Vec<RowRecord>>,
    pub calls: Vec<(String, BTreeMap<String, CellValue>)>,
}

impl StubSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(mut self, api_id: &str, rows: Vec<RowRecord>) -> Self {
        self.rows.insert(api_id.to_string(), rows);
        self
    }

    pub fn set_rows(&mut self, api_id: &str, rows: Vec<RowRecord>) {
        self.rows.insert(api_id.to_string(), rows);
    }
}

impl RowSource for StubSource {
    fn fetch(
        &mut self,
        api_id: &str,
        params: &BTreeMap<String, CellValue>,
    ) -> Result<Vec<RowRecord>, SinkError> {
        self.calls.push((api_id.to_string(), params.clone()));
        self.rows
            .get(api_id)
            .cloned()
            .ok_or_else(|| SinkError::Source {
                api_id: api_id.to_string(),
                message: "no rows configured".to_string(),
            })
    }
}

pub fn item(id: &str) -> sheetsink::QueuedItem {
    sheetsink::QueuedItem {
        id: id.to_string(),
        api_id: format!("api_{id}"),
        parameters: BTreeMap::new(),
        target_sheet_name: "Sheet1".to_string(),
        target_table_name: format!("Table_{id}"),
        include_in_batch: true,
    }
}

pub fn row(pairs: &[(&str, CellValue)]) -> RowRecord {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

pub fn sales_rows() -> Vec<RowRecord> {
    vec![
        row(&[
            ("Amount", CellValue::Number(10.0)),
            ("Region", CellValue::from("N")),
        ]),
        row(&[
            ("Amount", CellValue::Number(20.0)),
            ("Region", CellValue::from("S")),
        ]),
    ]
}

/// Create a committed table with the given header and body, the way a user
/// (or an earlier run) would have left it in the document.
pub fn seed_table(
    host: &mut MemoryHost,
    sheet: &str,
    table: &str,
    header: &[&str],
    body: &[Vec<CellValue>],
) {
    seed_table_at(host, sheet, table, CellRef::new(1, 1), header, body);
}

pub fn seed_table_at(
    host: &mut MemoryHost,
    sheet: &str,
    table: &str,
    origin: CellRef,
    header: &[&str],
    body: &[Vec<CellValue>],
) {
    host.create_worksheet(sheet, SheetVisibility::Visible)
        .expect("create sheet");
    let mut values: Vec<Vec<CellValue>> = vec![header
        .iter()
        .map(|h| CellValue::Text(h.to_string()))
        .collect()];
    values.extend(body.iter().cloned());
    host.write_range(sheet, origin, &values)
        .expect("write block");
    host.add_table(
        &RangeRef::new(
            sheet,
            origin,
            CellRef::new(
                origin.row + values.len() as u32 - 1,
                origin.col + header.len() as u32 - 1,
            ),
        ),
        table,
    )
    .expect("add table");
    host.commit().expect("commit");
}
