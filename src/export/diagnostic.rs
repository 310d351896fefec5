//! Diagnostic sidecar files for messages that could not be fully recognized.
//!
//! Each failure produces two files in the dump directory:
//!
//! - `{archive}_{message-id}.mail.txt`: the raw message bytes.
//! - `{archive}_{message-id}.info.txt`: sender, subject, message id, then the
//!   failure traces separated by `--------` lines.

use std::path::{Path, PathBuf};

/// Characters not allowed in Windows file names.
const UNSAFE_PATH_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

const TRACE_SEPARATOR: &str = "--------";

/// What went wrong with one message.
#[derive(Debug, Clone)]
pub struct FailureReport<'a> {
    pub message_id: &'a str,
    pub from: &'a str,
    pub subject: &'a str,
    pub traces: &'a [String],
}

impl FailureReport<'_> {
    /// Body of the `.info.txt` file.
    pub fn info_text(&self) -> String {
        let mut out = format!(
            "from: {}\nsubject: {}\nmsgid: {}\n\n",
            self.from, self.subject, self.message_id
        );
        out.push_str(&self.traces.join(&format!("\n{TRACE_SEPARATOR}\n")));
        out
    }
}

/// Remove characters that cannot appear in a file name.
pub fn strip_unsafe_path_chars(s: &str) -> String {
    s.chars().filter(|c| !UNSAFE_PATH_CHARS.contains(c)).collect()
}

/// Common file stem of the two sidecar files.
///
/// Falls back to the byte offset when the message has no usable id.
pub fn dump_stem(archive_name: &str, message_id: &str, offset: usize) -> String {
    let id = strip_unsafe_path_chars(message_id.trim());
    if id.is_empty() {
        format!("{archive_name}_at{offset}")
    } else {
        format!("{archive_name}_{id}")
    }
}

/// Write both sidecar files into `dir`, creating it if needed.
///
/// Returns the path of the `.info.txt` file.
pub fn write_dump(
    dir: &Path,
    stem: &str,
    raw_message: &[u8],
    report: &FailureReport<'_>,
) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    std::fs::write(dir.join(format!("{stem}.mail.txt")), raw_message)?;
    let info_path = dir.join(format!("{stem}.info.txt"));
    std::fs::write(&info_path, report.info_text())?;
    Ok(info_path)
}
