use serde::{Deserialize, Serialize};

/// Metadata snapshot of one file on the authoritative replica.
///
/// Times are whole seconds since the Unix epoch. The content CRC never
/// rides here; it travels in the store/fetch request payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: String,
    pub file_size: u64,
    pub mtime: i64,
    pub ctime: i64,
}

impl FileInfo {
    /// A listing entry whose stat failed carries only the name.
    pub fn name_only(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file_size: 0,
            mtime: 0,
            ctime: 0,
        }
    }
}
