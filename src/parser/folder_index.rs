//! Decoder for the per-folder `Folder.idx` summary file.
//!
//! ```text
//! line 1        version/header row, ignored
//! line 2..      one record per message, fields separated by 0x01:
//!   0  body offset (hex)        7  references
//!   1  message uid              8  sent time (hex epoch)
//!   2  archive file name        9  received time (hex epoch)
//!   3  subject  *              10  downloaded time (hex epoch)
//!   4  from     *              11  size (hex)
//!   5  to       *              12  status flags (hex)
//!   6  message-id              13  color
//!                              14  priority (decimal)
//!                              15  parent uid
//!                              16  charset
//!                              17  scratch
//!                              18  external attachments *  ('/'-separated)
//! ```
//!
//! Fields marked `*` are decoded with the record's own charset; the rest are
//! ASCII. Records written by clients older than v2.05 stop after field 17.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone};
use tracing::debug;

use crate::error::{ReceiptError, Result};
use crate::model::folder::{FolderIndexEntry, StatusFlags};
use crate::parser::charset;

/// Field separator inside a record line.
pub const FIELD_DELIMITER: u8 = 0x01;

/// Fields present in every record (the external attachment field is optional).
const MIN_FIELDS: usize = 18;

/// Read and decode an index file.
pub fn load_folder_index(path: impl AsRef<Path>) -> Result<Vec<FolderIndexEntry>> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|e| ReceiptError::open(path, e))?;
    let entries = parse_folder_index(&data, path)?;
    debug!(path = %path.display(), entries = entries.len(), "Decoded folder index");
    Ok(entries)
}

/// Decode index bytes into entries, in file order.
///
/// `path` is only used in error messages. Any malformed record fails the
/// whole index.
pub fn parse_folder_index(data: &[u8], path: &Path) -> Result<Vec<FolderIndexEntry>> {
    let mut entries = Vec::new();
    for (n, line) in split_lines(data).enumerate().skip(1) {
        if line.is_empty() {
            continue;
        }
        let entry = parse_record(line).map_err(|reason| ReceiptError::InvalidIndex {
            path: path.to_path_buf(),
            line: n + 1,
            reason,
        })?;
        entries.push(entry);
    }
    Ok(entries)
}

/// Split on `\r\n`, `\n` or a lone `\r`.
fn split_lines(data: &[u8]) -> impl Iterator<Item = &[u8]> {
    let mut rest = data;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        match rest.iter().position(|&b| b == b'\n' || b == b'\r') {
            Some(pos) => {
                let line = &rest[..pos];
                let skip = if rest[pos] == b'\r' && rest.get(pos + 1) == Some(&b'\n') {
                    2
                } else {
                    1
                };
                rest = &rest[pos + skip..];
                Some(line)
            }
            None => {
                let line = rest;
                rest = &[];
                Some(line)
            }
        }
    })
}

fn parse_record(line: &[u8]) -> std::result::Result<FolderIndexEntry, String> {
    let cells: Vec<&[u8]> = line.split(|&b| b == FIELD_DELIMITER).collect();
    if cells.len() < MIN_FIELDS {
        return Err(format!(
            "expected at least {MIN_FIELDS} fields, found {}",
            cells.len()
        ));
    }

    let charset_label = ascii(cells[16]);
    let text = |bytes: &[u8]| charset::decode_index_field(bytes, &charset_label);
    let external_attachments = cells
        .get(18)
        .copied()
        .map(|raw| text(raw))
        .filter(|s| !s.is_empty())
        .map(|s| s.split('/').map(str::to_string).collect())
        .unwrap_or_default();

    Ok(FolderIndexEntry {
        body_offset: hex(cells[0], "body offset")?,
        message_uid: ascii(cells[1]),
        file_name: ascii(cells[2]),
        subject: text(cells[3]),
        from: text(cells[4]),
        to: text(cells[5]),
        message_id: ascii(cells[6]),
        references: ascii(cells[7]),
        sent: timestamp(cells[8], "sent time")?,
        received: timestamp(cells[9], "received time")?,
        downloaded: timestamp(cells[10], "downloaded time")?,
        size: hex(cells[11], "size")?,
        status: StatusFlags(hex_u32(cells[12], "status")?),
        color: ascii(cells[13]),
        priority: ascii(cells[14])
            .trim()
            .parse::<i32>()
            .map_err(|_| format!("invalid priority {:?}", ascii(cells[14])))?,
        parent_uid: ascii(cells[15]),
        charset: charset_label.clone(),
        scratch: ascii(cells[17]),
        external_attachments,
    })
}

fn ascii(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn hex(bytes: &[u8], what: &str) -> std::result::Result<u64, String> {
    let s = ascii(bytes);
    u64::from_str_radix(s.trim(), 16).map_err(|_| format!("invalid hex {what} {s:?}"))
}

fn hex_u32(bytes: &[u8], what: &str) -> std::result::Result<u32, String> {
    let value = hex(bytes, what)?;
    u32::try_from(value).map_err(|_| format!("{what} out of range: {value:#X}"))
}

fn timestamp(bytes: &[u8], what: &str) -> std::result::Result<DateTime<Local>, String> {
    let secs = hex(bytes, what)?;
    i64::try_from(secs)
        .ok()
        .and_then(|secs| Local.timestamp_opt(secs, 0).earliest())
        .ok_or_else(|| format!("{what} out of range: {secs}"))
}

/// A calendar date range, both ends optional and inclusive.
///
/// `until` covers its whole day: an instant matches when it is before
/// midnight of the following day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub since: Option<NaiveDate>,
    pub until: Option<NaiveDate>,
}

impl DateRange {
    /// Build a range, rejecting `since > until`.
    pub fn new(since: Option<NaiveDate>, until: Option<NaiveDate>) -> Result<Self> {
        if let (Some(since), Some(until)) = (since, until) {
            if since > until {
                return Err(ReceiptError::InvalidDateRange { since, until });
            }
        }
        Ok(Self { since, until })
    }

    /// The unbounded range.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn is_unbounded(&self) -> bool {
        self.since.is_none() && self.until.is_none()
    }

    pub fn contains(&self, when: &DateTime<Local>) -> bool {
        let t = when.naive_local();
        let after_start = self
            .since
            .map_or(true, |since| t >= since.and_time(NaiveTime::MIN));
        let before_end = self
            .until
            .and_then(|until| until.succ_opt())
            .map_or(true, |end| t < end.and_time(NaiveTime::MIN));
        after_start && before_end
    }
}

/// Archive file names (without extension) holding at least one message sent
/// within `range`. Sorted and deduplicated.
pub fn select_archives(entries: &[FolderIndexEntry], range: &DateRange) -> BTreeSet<String> {
    entries
        .iter()
        .filter(|e| range.contains(&e.sent))
        .map(|e| e.file_name.clone())
        .collect()
}
