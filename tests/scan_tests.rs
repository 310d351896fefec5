//! End-to-end mailbox scans over synthetic mailboxes on disk.

use assert_fs::prelude::*;
use chrono::{Local, NaiveDate, TimeZone};
use predicates::prelude::*;

use becky_receipts::export::csv;
use becky_receipts::parser::folder_index::DateRange;
use becky_receipts::scan::{self, ScanOptions};

const PAY_SENDER: &str = "no-reply@pay.rakuten.co.jp";
const PAY_SUBJECT: &str = "ご利用内容確認メール";

fn receipt_body(receipt_no: &str) -> String {
    format!(
        "\x20 ご利用日時　　2024/03/10(日) 12:34:56\r\n\
         \x20 伝票番号　　　{receipt_no}\r\n\
         \x20 ご利用店舗　　テスト商店\r\n\
         \x20 決済総額　　　1,234円\r\n\
         \x20 ポイント利用　0ポイント\r\n\
         \x20 お支払金額　　1,234円"
    )
}

fn message(id: &str, from: &str, content_type: &str, body: &str) -> String {
    format!(
        "From: {from}\r\nSubject: {PAY_SUBJECT}\r\nMessage-ID: <{id}>\r\n\
         Content-Type: {content_type}\r\n\r\n{body}\r\n"
    )
}

fn multipart(id: &str, te: &str, body: &str) -> String {
    let body = format!(
        "--BOUND\r\nContent-Type: text/plain; charset=utf-8\r\n\
         Content-Transfer-Encoding: {te}\r\n\r\n{body}\r\n--BOUND--"
    );
    message(id, PAY_SENDER, "multipart/mixed; boundary=\"BOUND\"", &body)
}

fn archive(messages: &[String]) -> Vec<u8> {
    messages.iter().flat_map(|m| format!("{m}.\r\n").into_bytes()).collect()
}

fn index_record(file: &str, sent: i64) -> Vec<u8> {
    let sent = format!("{sent:X}");
    let fields: [&[u8]; 18] = [
        b"0",
        b"00000001",
        file.as_bytes(),
        b"subject",
        PAY_SENDER.as_bytes(),
        b"me@example.com",
        b"<id@example.com>",
        b"",
        sent.as_bytes(),
        sent.as_bytes(),
        sent.as_bytes(),
        b"400",
        b"0",
        b"0",
        b"3",
        b"",
        b"",
        b"",
    ];
    fields.join(&0x01u8)
}

fn index_file(records: &[Vec<u8>]) -> Vec<u8> {
    let mut data = b"3.0\r\n".to_vec();
    for r in records {
        data.extend_from_slice(r);
        data.extend_from_slice(b"\r\n");
    }
    data
}

fn at(y: i32, m: u32, d: u32) -> i64 {
    Local
        .with_ymd_and_hms(y, m, d, 12, 0, 0)
        .single()
        .unwrap()
        .timestamp()
}

/// Inbox with one archive in range and one out of range, plus a folder
/// whose index is corrupt.
fn sample_mailbox() -> assert_fs::TempDir {
    let mailbox = assert_fs::TempDir::new().unwrap();

    mailbox
        .child("inbox/Folder.idx")
        .write_binary(&index_file(&[
            index_record("cur", at(2024, 3, 10)),
            index_record("cur", at(2024, 3, 11)),
            index_record("old", at(2023, 1, 5)),
        ]))
        .unwrap();
    mailbox
        .child("inbox/cur.bmf")
        .write_binary(&archive(&[
            multipart("r1@example.com", "quoted-printable", &receipt_body("R-1")),
            message("news@example.com", "news@example.com", "text/plain", "hello"),
            message("single@example.com", PAY_SENDER, "text/plain", "not multipart"),
            multipart("bad@example.com", "x-unknown", "opaque"),
            multipart("r2@example.com", "quoted-printable", &receipt_body("R-2")),
        ]))
        .unwrap();
    mailbox
        .child("inbox/old.bmf")
        .write_binary(&archive(&[multipart(
            "r0@example.com",
            "quoted-printable",
            &receipt_body("R-0"),
        )]))
        .unwrap();
    mailbox
        .child("broken/Folder.idx")
        .write_binary(b"3.0\r\nnot\x01enough\x01fields\r\n")
        .unwrap();

    mailbox
}

#[test]
fn test_scan_collects_records_and_isolates_failures() {
    let mailbox = sample_mailbox();
    let dumps = assert_fs::TempDir::new().unwrap();

    let mut options = ScanOptions::new(mailbox.path());
    options.range = DateRange::new(NaiveDate::from_ymd_opt(2024, 1, 1), None).unwrap();
    options.dump_dir = Some(dumps.path().to_path_buf());

    let report = scan::scan_mailbox(&options, &|_, _, _| {}).unwrap();

    let numbers: Vec<_> = report
        .records
        .iter()
        .map(|r| r.receipt_no.as_deref().unwrap_or_default())
        .collect();
    assert_eq!(numbers, ["R-1", "R-2"]);

    let s = &report.summary;
    assert_eq!(s.indexes, 2);
    assert_eq!(s.archives, 1);
    assert_eq!(s.messages, 5);
    assert_eq!(s.records, 2);
    assert_eq!(s.skipped, 1);
    assert_eq!(s.failed, 2);
    assert_eq!(s.unreadable_files, 1);

    dumps
        .child("cur.bmf_bad@example.com.info.txt")
        .assert(predicate::str::contains("msgid: <bad@example.com>"));
    dumps
        .child("cur.bmf_bad@example.com.mail.txt")
        .assert(predicate::str::contains("x-unknown"));
    dumps
        .child("cur.bmf_single@example.com.info.txt")
        .assert(predicate::path::exists());
}

#[test]
fn test_unbounded_scan_reads_every_listed_archive() {
    let mailbox = sample_mailbox();
    let options = ScanOptions::new(mailbox.path());

    let report = scan::scan_mailbox(&options, &|_, _, _| {}).unwrap();
    assert_eq!(report.summary.archives, 2);
    assert_eq!(report.records.len(), 3);
}

#[test]
fn test_missing_archive_is_skipped() {
    let mailbox = assert_fs::TempDir::new().unwrap();
    mailbox
        .child("Folder.idx")
        .write_binary(&index_file(&[index_record("gone", at(2024, 3, 10))]))
        .unwrap();

    let report = scan::scan_mailbox(&ScanOptions::new(mailbox.path()), &|_, _, _| {}).unwrap();
    assert!(report.records.is_empty());
    assert_eq!(report.summary.unreadable_files, 1);
}

#[test]
fn test_scan_to_csv_file() {
    let mailbox = sample_mailbox();
    let out = assert_fs::TempDir::new().unwrap();
    let csv_path = out.child("receipts.csv");

    let report = scan::scan_mailbox(&ScanOptions::new(mailbox.path()), &|_, _, _| {}).unwrap();
    csv::export_csv(&report.records, csv_path.path(), false).unwrap();

    csv_path.assert(predicate::str::starts_with("\"DateTime\",\"ReceiptNo\""));
    csv_path.assert(predicate::str::contains(
        "\"2024-03-10 12:34:56\",\"R-1\",\"テスト商店\",\"\",0,1234,1234,\"<r1@example.com>\"",
    ));
}

#[test]
fn test_partial_record_dump_carries_headers() {
    let mailbox = assert_fs::TempDir::new().unwrap();
    let dumps = assert_fs::TempDir::new().unwrap();
    let body = receipt_body("R-9").replace("伝票番号", "受付番号");

    mailbox
        .child("Folder.idx")
        .write_binary(&index_file(&[index_record("part", at(2024, 3, 10))]))
        .unwrap();
    mailbox
        .child("part.bmf")
        .write_binary(&archive(&[multipart("p1@example.com", "quoted-printable", &body)]))
        .unwrap();

    let mut options = ScanOptions::new(mailbox.path());
    options.dump_dir = Some(dumps.path().to_path_buf());
    let report = scan::scan_mailbox(&options, &|_, _, _| {}).unwrap();

    assert_eq!(report.summary.partial, 1);
    assert!(report.records[0].has_error);
    let info = dumps.child("part.bmf_p1@example.com.info.txt");
    info.assert(predicate::str::contains(format!("from: {PAY_SENDER}\n")));
    info.assert(predicate::str::contains(format!("subject: {PAY_SUBJECT}\n")));
    info.assert(predicate::str::contains("partial record: "));
}
