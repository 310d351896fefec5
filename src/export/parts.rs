//! Dump the decoded text/plain parts of a single message, one file per part.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::parser::{eml, mime};

/// Output path of part `index` of `source`: `<source>.NN.txt`.
pub fn part_path(source: &Path, index: usize) -> PathBuf {
    let mut name = source.as_os_str().to_owned();
    name.push(format!(".{index:02}.txt"));
    PathBuf::from(name)
}

/// Decode every text/plain part of the message in `eml_path` and write it
/// next to the source file.
///
/// A part that cannot be decoded is reported and skipped; numbering still
/// follows the part's position.
pub fn dump_text_parts(eml_path: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let message = eml::load_message(eml_path)?;
    let mut written = Vec::new();

    for (index, part) in message.text_plain_parts().enumerate() {
        match mime::decode_part_text(part) {
            Ok(text) => {
                let path = part_path(eml_path, index);
                std::fs::write(&path, text)?;
                written.push(path);
            }
            Err(e) => {
                warn!(path = %eml_path.display(), part = index, error = %e, "Skipping undecodable part");
            }
        }
    }

    Ok(written)
}
