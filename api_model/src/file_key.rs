//! File keys.
//!
//! The namespace is flat: a file is identified by an opaque, non-empty
//! name with no path structure. Both peers validate names at the wire
//! boundary before joining them to a mount directory.

use crate::err::Result;

/// Per-peer metadata directory (staging files, logs). Not a valid key.
pub const META_DIR: &str = ".netdisc";

pub fn validate_file_key(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err("empty file name".into());
    }
    if name.contains('/') || name.contains('\\') {
        return Err(format!("file name '{}' contains a path separator", name).into());
    }
    if name == "." || name == ".." {
        return Err(format!("file name '{}' is a directory reference", name).into());
    }
    if name == META_DIR {
        return Err(format!("file name '{}' is reserved", name).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_names() {
        for name in ["a.txt", "data.bin", "no-extension", "UPPER case.log", "..hidden"] {
            assert!(validate_file_key(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn rejects_traversal_and_separators() {
        for name in ["", ".", "..", "a/b", "..\\up", "/etc/passwd", "dir/"] {
            assert!(validate_file_key(name).is_err(), "{name} should be rejected");
        }
    }

    #[test]
    fn rejects_meta_dir() {
        assert!(validate_file_key(META_DIR).is_err());
    }
}
