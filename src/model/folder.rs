//! Folder index (`Folder.idx`) entry types.

use chrono::{DateTime, Local};

/// One summary record of the per-folder index.
///
/// Field order follows the on-disk record. The record's own `charset` governs
/// how `subject`, `from`, `to` and `external_attachments` were decoded.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FolderIndexEntry {
    /// Offset of the message inside its archive file.
    pub body_offset: u64,
    /// Identifier unique within the folder (kept as the raw hex text).
    pub message_uid: String,
    /// Archive file name without extension.
    pub file_name: String,
    pub subject: String,
    pub from: String,
    pub to: String,
    /// `Message-ID` header value.
    pub message_id: String,
    /// Message-IDs from `In-Reply-To` / `References`.
    pub references: String,
    /// Sent time, from the `Date` header.
    pub sent: DateTime<Local>,
    /// Delivery time, from the `Received` header.
    pub received: DateTime<Local>,
    /// Time the client downloaded the message.
    pub downloaded: DateTime<Local>,
    /// Message size in bytes.
    pub size: u64,
    pub status: StatusFlags,
    /// COLORREF of the color label, raw text.
    pub color: String,
    /// Five-level priority.
    pub priority: i32,
    /// `message_uid` of the thread parent.
    pub parent_uid: String,
    /// Declared charset of this record (may be empty).
    pub charset: String,
    /// Scratch string, normally empty.
    pub scratch: String,
    /// Externally stored attachment file names, `/`-separated on disk.
    pub external_attachments: Vec<String>,
}

/// Status bitmask of an index record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct StatusFlags(pub u32);

impl StatusFlags {
    pub const READ: u32 = 0x0000_0001;
    pub const FORWARDED: u32 = 0x0000_0002;
    pub const REPLIED: u32 = 0x0000_0004;
    pub const HAS_ATTACHMENT: u32 = 0x0000_0008;
    pub const THREAD_COLLAPSED: u32 = 0x0000_0020;
    pub const THREAD_HAS_CHILDREN: u32 = 0x0000_0040;
    pub const THREAD_HAS_UNREAD: u32 = 0x0000_0080;
    pub const PARTIAL: u32 = 0x0000_0100;
    pub const RESENT: u32 = 0x0000_0200;
    pub const MDN_HANDLED: u32 = 0x0000_0400;
    pub const FLAGGED: u32 = 0x0000_1000;
    pub const HTML: u32 = 0x0000_2000;
    pub const TO_ME: u32 = 0x0001_0000;
    pub const CC_ME: u32 = 0x0002_0000;

    pub fn contains(self, flag: u32) -> bool {
        self.0 & flag == flag
    }

    pub fn is_read(self) -> bool {
        self.contains(Self::READ)
    }

    /// Set when the top-level content type is multipart.
    pub fn has_attachment(self) -> bool {
        self.contains(Self::HAS_ATTACHMENT)
    }

    pub fn is_flagged(self) -> bool {
        self.contains(Self::FLAGGED)
    }

    pub fn is_html(self) -> bool {
        self.contains(Self::HTML)
    }
}
