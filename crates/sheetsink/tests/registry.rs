mod common;

use common::seed_table;
use sheetsink::{
    CellValue, MemoryHost, OwnershipStore, SheetOwnershipStore, SheetVisibility, SpreadsheetHost,
    STORE_SHEET, STORE_TABLE,
};

#[test]
fn listing_a_virgin_document_is_empty_and_creates_nothing() {
    let mut host = MemoryHost::new();
    let mut store = SheetOwnershipStore::new();

    let records = store.list(&mut host).expect("list");
    assert!(records.is_empty());
    assert!(!host.has_sheet(STORE_SHEET));
    assert_eq!(host.commit_count(), 0);
}

#[test]
fn first_record_materializes_the_hidden_store() {
    let mut host = MemoryHost::new();
    let mut store = SheetOwnershipStore::new();

    store
        .record(&mut host, "Sheet1", "SalesTable", "q1")
        .expect("record");

    assert_eq!(host.sheet_visibility(STORE_SHEET), Some(SheetVisibility::Hidden));
    let tables = host.list_tables().expect("list tables");
    assert!(tables.iter().any(|t| t.name == STORE_TABLE && t.worksheet == STORE_SHEET));

    let records = store.list(&mut host).expect("list");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].sheet_name, "Sheet1");
    assert_eq!(records[0].table_name, "SalesTable");
    assert_eq!(records[0].query_id.as_deref(), Some("q1"));
    assert!(records[0].is_managed);
    assert!(!records[0].last_touched_utc.is_empty());
}

#[test]
fn rematerializing_is_a_no_op() {
    let mut host = MemoryHost::new();
    let mut store = SheetOwnershipStore::new();

    store
        .record(&mut host, "Sheet1", "A", "q1")
        .expect("first record");
    store
        .record(&mut host, "Sheet2", "B", "q2")
        .expect("second record");

    // Still exactly one store table, now with two rows.
    let tables = host.list_tables().expect("list tables");
    assert_eq!(tables.iter().filter(|t| t.name == STORE_TABLE).count(), 1);
    assert_eq!(store.list(&mut host).expect("list").len(), 2);
}

#[test]
fn same_location_updates_in_place() {
    let mut host = MemoryHost::new();
    let mut store = SheetOwnershipStore::new();

    store
        .record(&mut host, "Sheet1", "SalesTable", "q1")
        .expect("first");
    let first = store.list(&mut host).expect("list")[0].clone();

    store
        .record(&mut host, "Sheet1", "SalesTable", "q9")
        .expect("second");
    let records = store.list(&mut host).expect("list");

    assert_eq!(records.len(), 1, "one record per (sheet, table)");
    assert_eq!(records[0].query_id.as_deref(), Some("q9"));
    assert!(records[0].last_touched_utc >= first.last_touched_utc);
}

#[test]
fn records_survive_a_host_roundtrip_with_typed_cells() {
    let mut host = MemoryHost::new();
    let mut store = SheetOwnershipStore::new();

    store
        .record(&mut host, "Sheet1", "SalesTable", "q1")
        .expect("record");

    // isManaged is written as a real boolean cell, not text.
    let body = host.table_data_rows(STORE_TABLE).expect("rows");
    assert_eq!(body[0][3], CellValue::Boolean(true));
}

#[test]
fn purge_removes_tables_sheets_and_the_ledger() {
    let mut host = MemoryHost::new();
    let mut store = SheetOwnershipStore::new();

    seed_table(
        &mut host,
        "Data",
        "Sales_q1",
        &["A"],
        &[vec![CellValue::from("x")]],
    );
    seed_table(&mut host, "Mixed", "Inv_q2", &["A"], &[]);
    common::seed_table_at(
        &mut host,
        "Mixed",
        "UserTable",
        sheetsink::CellRef::new(1, 3),
        &["B"],
        &[],
    );
    store.record(&mut host, "Data", "Sales_q1", "q1").expect("record");
    store.record(&mut host, "Mixed", "Inv_q2", "q2").expect("record");

    let summary = store.purge(&mut host).expect("purge");

    assert_eq!(summary.tables_removed, 2);
    assert_eq!(summary.records_removed, 2);
    // `Data` only hosted managed content; `Mixed` still has a user table.
    assert_eq!(summary.sheets_removed, 1);
    assert!(!host.has_sheet("Data"));
    assert!(host.has_sheet("Mixed"));

    let live = host.list_tables().expect("list tables");
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].name, "UserTable");
    assert!(!host.has_sheet(STORE_SHEET));
}

#[test]
fn purging_a_virgin_document_does_nothing() {
    let mut host = MemoryHost::new();
    let store = SheetOwnershipStore::new();

    let summary = store.purge(&mut host).expect("purge");
    assert_eq!(summary.tables_removed, 0);
    assert_eq!(summary.sheets_removed, 0);
    assert_eq!(summary.records_removed, 0);
    assert_eq!(host.commit_count(), 0);
}
