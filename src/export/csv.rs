//! Export receipt records to CSV.
//!
//! Text columns are always quoted and numeric columns never are, so that
//! spreadsheet tools keep receipt numbers as text. An absent value is written
//! as an empty quoted string.

use std::io::Write;
use std::path::Path;

use crate::model::receipt::ReceiptRecord;

/// UTF-8 byte order mark, for Excel.
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Write the header row and one row per record.
pub fn write_csv<W: Write>(mut out: W, records: &[ReceiptRecord], bom: bool) -> anyhow::Result<()> {
    if bom {
        out.write_all(UTF8_BOM)?;
    }

    let header = ReceiptRecord::COLUMNS
        .iter()
        .map(|c| quote(c))
        .collect::<Vec<_>>()
        .join(",");
    writeln!(out, "{header}")?;

    for record in records {
        writeln!(out, "{}", record_row(record))?;
    }
    out.flush()?;
    Ok(())
}

/// Export records to a CSV file, replacing it if it exists.
pub fn export_csv(records: &[ReceiptRecord], output_path: &Path, bom: bool) -> anyhow::Result<()> {
    let file = std::fs::File::create(output_path)?;
    write_csv(std::io::BufWriter::new(file), records, bom)
}

/// One CSV row, in [`ReceiptRecord::COLUMNS`] order.
fn record_row(r: &ReceiptRecord) -> String {
    [
        quote(&r.datetime_display()),
        quote_opt(r.receipt_no.as_deref()),
        quote_opt(r.store_name.as_deref()),
        quote_opt(r.store_tel.as_deref()),
        number(r.use_point),
        number(r.use_cash),
        number(r.total),
        quote(&r.message_id),
    ]
    .join(",")
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn quote_opt(value: Option<&str>) -> String {
    quote(value.unwrap_or(""))
}

fn number(value: Option<i64>) -> String {
    value.map_or_else(|| quote(""), |n| n.to_string())
}
