use sheetsink_host::{
    CellRef, CellValue, MemoryHost, MemoryHostError, RangeRef, SheetVisibility, SpreadsheetHost,
};

fn text(s: &str) -> CellValue {
    CellValue::Text(s.to_string())
}

fn seed_sales(host: &mut MemoryHost) {
    host.create_worksheet("Sheet1", SheetVisibility::Visible)
        .expect("create sheet");
    host.write_range(
        "Sheet1",
        CellRef::new(1, 1),
        &[
            vec![text("Region"), text("Amount")],
            vec![text("N"), CellValue::Number(10.0)],
            vec![text("S"), CellValue::Number(20.0)],
        ],
    )
    .expect("write block");
    host.add_table(
        &RangeRef::new("Sheet1", CellRef::new(1, 1), CellRef::new(3, 2)),
        "Sales",
    )
    .expect("add table");
    host.commit().expect("commit");
}

#[test]
fn disconnected_host_refuses_every_call() {
    let mut host = MemoryHost::disconnected();
    assert!(!host.is_connected());
    match host.worksheet_names() {
        Err(MemoryHostError::Disconnected) => {}
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn staged_writes_become_durable_only_on_commit() {
    let mut host = MemoryHost::new();
    host.create_worksheet("Sheet1", SheetVisibility::Visible)
        .expect("create sheet");
    host.write_range("Sheet1", CellRef::new(1, 1), &[vec![text("x")]])
        .expect("write");

    assert_eq!(host.cell("Sheet1", 1, 1), text("x"));
    assert_eq!(host.committed_cell("Sheet1", 1, 1), CellValue::Empty);
    assert_eq!(host.commit_count(), 0);

    host.commit().expect("commit");
    assert_eq!(host.committed_cell("Sheet1", 1, 1), text("x"));
    assert_eq!(host.commit_count(), 1);
}

#[test]
fn table_roundtrip_header_and_body() {
    let mut host = MemoryHost::new();
    seed_sales(&mut host);

    let tables = host.list_tables().expect("list");
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].name, "Sales");
    assert_eq!(tables[0].worksheet, "Sheet1");
    assert_eq!(tables[0].rows, 2);

    assert_eq!(
        host.table_header("Sales").expect("header"),
        vec!["Region".to_string(), "Amount".to_string()]
    );
    let body = host.table_data_rows("Sales").expect("body");
    assert_eq!(body.len(), 2);
    assert_eq!(body[1], vec![text("S"), CellValue::Number(20.0)]);
}

#[test]
fn delete_table_data_keeps_header() {
    let mut host = MemoryHost::new();
    seed_sales(&mut host);

    host.delete_table_data("Sales").expect("clear body");
    assert_eq!(host.table_data_rows("Sales").expect("body"), Vec::<Vec<CellValue>>::new());
    assert_eq!(
        host.table_header("Sales").expect("header"),
        vec!["Region".to_string(), "Amount".to_string()]
    );
    // Cells under the old body are gone.
    assert_eq!(host.cell("Sheet1", 2, 1), CellValue::Empty);
}

#[test]
fn append_rows_extends_the_body() {
    let mut host = MemoryHost::new();
    seed_sales(&mut host);

    host.append_table_rows("Sales", &[vec![text("E"), CellValue::Number(5.0)]])
        .expect("append");
    let body = host.table_data_rows("Sales").expect("body");
    assert_eq!(body.len(), 3);
    assert_eq!(body[2][0], text("E"));

    match host.append_table_rows("Sales", &[vec![text("short row")]]) {
        Err(MemoryHostError::ColumnMismatch { expected: 2, got: 1, .. }) => {}
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn delete_table_clears_cells_and_registration() {
    let mut host = MemoryHost::new();
    seed_sales(&mut host);

    host.delete_table("Sales").expect("delete");
    assert!(host.list_tables().expect("list").is_empty());
    assert_eq!(host.cell("Sheet1", 1, 1), CellValue::Empty);
    assert_eq!(host.cell("Sheet1", 3, 2), CellValue::Empty);
}

#[test]
fn recreating_a_sheet_does_not_disturb_it() {
    let mut host = MemoryHost::new();
    host.create_worksheet("Meta", SheetVisibility::Hidden)
        .expect("create hidden");
    host.write_range("Meta", CellRef::new(1, 1), &[vec![text("keep")]])
        .expect("write");
    host.create_worksheet("Meta", SheetVisibility::Visible)
        .expect("recreate");

    assert_eq!(host.sheet_visibility("Meta"), Some(SheetVisibility::Hidden));
    assert_eq!(host.cell("Meta", 1, 1), text("keep"));
}

#[test]
fn deleting_a_sheet_drops_its_tables() {
    let mut host = MemoryHost::new();
    seed_sales(&mut host);

    host.delete_worksheet("Sheet1").expect("delete sheet");
    assert!(host.list_tables().expect("list").is_empty());
    assert!(!host.has_sheet("Sheet1"));
}

#[test]
fn injected_failure_fires_once() {
    let mut host = MemoryHost::new();
    host.create_worksheet("Sheet1", SheetVisibility::Visible)
        .expect("create sheet");
    host.fail_next("write_range");

    match host.write_range("Sheet1", CellRef::new(1, 1), &[vec![text("x")]]) {
        Err(MemoryHostError::Injected { op: "write_range" }) => {}
        other => panic!("unexpected result: {other:?}"),
    }
    host.write_range("Sheet1", CellRef::new(1, 1), &[vec![text("x")]])
        .expect("second attempt goes through");
}
