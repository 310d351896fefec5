//! Batch scan of a whole mailbox directory.
//!
//! Walks the mailbox for folder indexes, narrows each folder to the archives
//! holding messages in the requested date range, and runs every message of
//! those archives through the receipt pipeline.
//!
//! Isolation: a failing message is logged (and optionally dumped) and the
//! scan moves on. A subfolder, folder index or archive that cannot be read
//! skips that item only.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{MessageError, ReceiptError, Result};
use crate::export::diagnostic::{self, FailureReport};
use crate::model::receipt::ReceiptRecord;
use crate::parser::archive::{Archive, RawMessage};
use crate::parser::folder_index::{self, DateRange};
use crate::parser::mime;
use crate::receipt::pipeline::{self, MessageOutcome};

/// Everything a scan needs, passed down explicitly.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Mailbox root directory.
    pub mailbox: PathBuf,
    pub range: DateRange,
    /// Name of the per-folder index file, e.g. `Folder.idx`.
    pub index_file_name: String,
    /// Archive file extension, without the dot.
    pub archive_extension: String,
    /// Where to write diagnostic sidecar files. `None` disables dumping.
    pub dump_dir: Option<PathBuf>,
    /// Also dump records that were produced with the error flag set.
    pub dump_partial_records: bool,
}

impl ScanOptions {
    pub fn new(mailbox: impl Into<PathBuf>) -> Self {
        Self {
            mailbox: mailbox.into(),
            range: DateRange::all(),
            index_file_name: "Folder.idx".into(),
            archive_extension: "bmf".into(),
            dump_dir: None,
            dump_partial_records: true,
        }
    }
}

/// Counters collected over one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub indexes: usize,
    pub archives: usize,
    pub messages: usize,
    pub records: usize,
    /// Records emitted with the error flag set.
    pub partial: usize,
    /// Out-of-scope messages.
    pub skipped: usize,
    /// Messages that raised a message-level error.
    pub failed: usize,
    /// Folders, index files or archives that could not be read.
    pub unreadable_files: usize,
}

/// Result of a scan.
#[derive(Debug, Default)]
pub struct ScanReport {
    pub records: Vec<ReceiptRecord>,
    pub summary: ScanSummary,
}

/// Recursively find every file named `file_name` below `root`, sorted.
///
/// Only an unreadable `root` is an error. A subfolder that cannot be listed
/// is logged, counted in `summary` and skipped.
pub fn find_folder_indexes(
    root: &Path,
    file_name: &str,
    summary: &mut ScanSummary,
) -> Result<Vec<PathBuf>> {
    std::fs::read_dir(root).map_err(|e| ReceiptError::open(root, e))?;
    let mut found = walk_folders(vec![root.to_path_buf()], file_name, summary);
    found.sort();
    Ok(found)
}

/// Depth-first walk from `pending`, collecting files named `file_name`.
fn walk_folders(mut pending: Vec<PathBuf>, file_name: &str, summary: &mut ScanSummary) -> Vec<PathBuf> {
    let mut found = Vec::new();

    while let Some(dir) = pending.pop() {
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "Skipping unreadable folder");
                summary.unreadable_files += 1;
                continue;
            }
        };
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(path = %dir.display(), error = %e, "Skipping unreadable folder entry");
                    summary.unreadable_files += 1;
                    continue;
                }
            };
            let path = entry.path();
            match entry.file_type() {
                Ok(t) if t.is_dir() => pending.push(path),
                Ok(_) => {
                    if entry.file_name().to_string_lossy().eq_ignore_ascii_case(file_name) {
                        found.push(path);
                    }
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable folder entry");
                    summary.unreadable_files += 1;
                }
            }
        }
    }

    found
}

/// Archive paths worth scanning, deduplicated and sorted.
///
/// An unreadable or malformed index skips its folder.
pub fn plan_archives(options: &ScanOptions, summary: &mut ScanSummary) -> Result<Vec<PathBuf>> {
    let indexes = find_folder_indexes(&options.mailbox, &options.index_file_name, summary)?;
    let mut archives = BTreeSet::new();

    for index_path in &indexes {
        summary.indexes += 1;
        let entries = match folder_index::load_folder_index(index_path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %index_path.display(), error = %e, "Skipping folder index");
                summary.unreadable_files += 1;
                continue;
            }
        };
        let names = folder_index::select_archives(&entries, &options.range);
        info!(
            path = %index_path.display(),
            entries = entries.len(),
            archives = names.len(),
            "Found folder index"
        );

        let folder = index_path.parent().unwrap_or(Path::new(""));
        for name in names {
            archives.insert(folder.join(format!("{name}.{}", options.archive_extension)));
        }
    }

    Ok(archives.into_iter().collect())
}

/// Process every message of one archive, appending recognized records.
///
/// Only failing to read the archive itself is an error.
pub fn scan_archive(
    path: &Path,
    options: &ScanOptions,
    report: &mut ScanReport,
) -> Result<()> {
    let archive = Archive::open(path)?;
    let archive_name = archive.file_name();
    report.summary.archives += 1;

    for raw in archive.messages() {
        report.summary.messages += 1;
        let message = match mime::decode_message(raw.content()) {
            Ok(message) => message,
            Err(e) => {
                report.summary.failed += 1;
                warn!(archive = %archive_name, offset = raw.offset, error = %e, "Undecodable message");
                dump_message_error(options, &archive_name, &raw, &e.into());
                continue;
            }
        };
        match pipeline::process_decoded(&message) {
            Ok(MessageOutcome::Skipped) => report.summary.skipped += 1,
            Ok(MessageOutcome::Recognized(record)) => {
                if record.has_error {
                    report.summary.partial += 1;
                    warn!(
                        archive = %archive_name,
                        message_id = %record.message_id,
                        "Receipt recognized with missing fields"
                    );
                    if options.dump_partial_records {
                        let traces = [format!("partial record: {record}")];
                        dump(options, &archive_name, &raw, &FailureReport {
                            message_id: &record.message_id,
                            from: &message.from,
                            subject: &message.subject,
                            traces: &traces,
                        });
                    }
                }
                report.summary.records += 1;
                report.records.push(record);
            }
            Err(e) => {
                report.summary.failed += 1;
                warn!(
                    archive = %archive_name,
                    offset = raw.offset,
                    error = %e,
                    "Unexpected receipt format"
                );
                dump_message_error(options, &archive_name, &raw, &e);
            }
        }
    }

    debug!(archive = %archive_name, messages = report.summary.messages, "Archive done");
    Ok(())
}

/// Scan the whole mailbox.
///
/// `progress` is called before each archive with `(done, total, path)`.
pub fn scan_mailbox(
    options: &ScanOptions,
    progress: &dyn Fn(usize, usize, &Path),
) -> Result<ScanReport> {
    let mut report = ScanReport::default();
    let archives = plan_archives(options, &mut report.summary)?;
    let total = archives.len();

    for (i, path) in archives.iter().enumerate() {
        progress(i, total, path);
        if let Err(e) = scan_archive(path, options, &mut report) {
            warn!(path = %path.display(), error = %e, "Skipping archive");
            report.summary.unreadable_files += 1;
        }
    }

    info!(
        archives = report.summary.archives,
        messages = report.summary.messages,
        records = report.summary.records,
        failed = report.summary.failed,
        "Scan complete"
    );
    Ok(report)
}

fn dump_message_error(options: &ScanOptions, archive_name: &str, raw: &RawMessage<'_>, e: &MessageError) {
    let (message_id, from, subject, traces) = match e {
        MessageError::Unrecognized(err) => (
            err.message_id.as_str(),
            err.from.as_str(),
            err.subject.as_str(),
            err.traces.clone(),
        ),
        MessageError::NotMultipart(err) => (
            err.message_id.as_str(),
            err.from.as_str(),
            err.subject.as_str(),
            vec![err.to_string()],
        ),
        MessageError::Decode(err) => ("", "", "", vec![err.to_string()]),
    };
    dump(options, archive_name, raw, &FailureReport {
        message_id,
        from,
        subject,
        traces: &traces,
    });
}

fn dump(options: &ScanOptions, archive_name: &str, raw: &RawMessage<'_>, report: &FailureReport<'_>) {
    let Some(dir) = &options.dump_dir else {
        return;
    };
    let stem = diagnostic::dump_stem(archive_name, report.message_id, raw.offset);
    match diagnostic::write_dump(dir, &stem, raw.bytes, report) {
        Ok(path) => debug!(path = %path.display(), "Wrote diagnostic dump"),
        Err(e) => warn!(dir = %dir.display(), error = %e, "Could not write diagnostic dump"),
    }
}
