//! End-to-end: a monthly workbook on disk through the pipeline into the
//! report directory and back.

use chrono::NaiveDate;
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};
use tempfile::tempdir;

use gadai_io::reports::{load_outlets, load_transactions, write_reports};
use gadai_io::{read_sheet, read_workbook};
use gadai_pipeline::{
    run, run_table, LifecycleStage, PipelineConfig, RiskCategory, TransactionStatus,
};

const HEADER: [&str; 8] = [
    "No",
    "Nama Outlet",
    "Tgl Gadai",
    "Jatuh Tempo",
    "IMEI/No Seri",
    "Pokok Pinjaman",
    "Taksiran",
    "Pokok Terbayar",
];

struct Row {
    outlet: &'static str,
    pawn: (u16, u8, u8),
    due: (u16, u8, u8),
    imei: f64,
    loaned: f64,
    collateral: f64,
    repaid: f64,
}

fn write_sheet(wb: &mut Workbook, name: &str, rows: &[Row]) {
    let date_format = Format::new().set_num_format("dd/mm/yyyy");
    let ws = wb.add_worksheet().set_name(name).unwrap();
    ws.write_string(0, 0, "LAPORAN BULANAN").unwrap();
    for (c, h) in HEADER.iter().enumerate() {
        ws.write_string(2, c as u16, *h).unwrap();
    }
    for (i, r) in rows.iter().enumerate() {
        let row = 3 + i as u32;
        ws.write_number(row, 0, (i + 1) as f64).unwrap();
        ws.write_string(row, 1, r.outlet).unwrap();
        let pawn = ExcelDateTime::from_ymd(r.pawn.0, r.pawn.1, r.pawn.2).unwrap();
        ws.write_datetime_with_format(row, 2, &pawn, &date_format).unwrap();
        let due = ExcelDateTime::from_ymd(r.due.0, r.due.1, r.due.2).unwrap();
        ws.write_datetime_with_format(row, 3, &due, &date_format).unwrap();
        ws.write_number(row, 4, r.imei).unwrap();
        ws.write_number(row, 5, r.loaned).unwrap();
        ws.write_number(row, 6, r.collateral).unwrap();
        ws.write_number(row, 7, r.repaid).unwrap();
    }
}

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
}

#[test]
fn workbook_to_reports() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("gadai.xlsx");

    let mut wb = Workbook::new();
    write_sheet(
        &mut wb,
        "Active",
        &[
            Row { outlet: "Depok", pawn: (2025, 5, 1), due: (2025, 8, 1), imei: 111.0, loaned: 1_200_000.0, collateral: 1_000_000.0, repaid: 0.0 },
            Row { outlet: "Bogor", pawn: (2025, 5, 10), due: (2025, 8, 10), imei: 222.0, loaned: 500_000.0, collateral: 1_000_000.0, repaid: 0.0 },
        ],
    );
    write_sheet(
        &mut wb,
        "Auction",
        &[Row { outlet: "Depok", pawn: (2024, 10, 1), due: (2025, 1, 1), imei: 111.0, loaned: 1_200_000.0, collateral: 1_000_000.0, repaid: 0.0 }],
    );
    wb.add_worksheet().set_name("Notes").unwrap().write_string(0, 0, "n/a").unwrap();
    wb.save(&input).unwrap();

    let workbook = read_workbook(&input).unwrap();
    assert_eq!(workbook.sheet_names(), vec!["Active", "Auction", "Notes"]);

    let config = PipelineConfig::default();
    let result = run(&config, &workbook, as_of()).unwrap();
    assert_eq!(result.master.len(), 3);
    assert_eq!(result.transactions.len(), 2);

    let dup = result.transactions.iter().find(|r| r.item_id == "111").unwrap();
    assert_eq!(dup.lifecycle_stage, LifecycleStage::Auction);
    assert_eq!(dup.pawn_date, NaiveDate::from_ymd_opt(2024, 10, 1));
    assert_eq!(dup.risk_category, Some(RiskCategory::High));

    let out = dir.path().join("out");
    write_reports(&result, &config, &out).unwrap();
    assert_eq!(load_transactions(&out, &config.output).unwrap(), result.transactions);
    assert_eq!(load_outlets(&out, &config.output).unwrap(), result.outlets);
}

#[test]
fn single_csv_table() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("late.csv");
    std::fs::write(
        &input,
        "Outlet;Tanggal Gadai;Jatuh Tempo;IMEI;Pinjaman;Taksiran;Terbayar\n\
         Depok;2025-01-01;2025-02-01;9;800;1000;0\n",
    )
    .unwrap();

    let sheet = read_sheet(&input, None).unwrap();
    let result = run_table(&PipelineConfig::default(), &sheet, LifecycleStage::Late, as_of()).unwrap();
    assert_eq!(result.transactions.len(), 1);
    let r = &result.transactions[0];
    assert_eq!(r.holding_days, Some(31));
    assert_eq!(r.transaction_status, Some(TransactionStatus::Overdue));
    assert_eq!(r.risk_category, Some(RiskCategory::High));
}
