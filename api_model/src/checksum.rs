//! Content fingerprints.
//!
//! Two files are considered content-equal iff their CRC-32 (IEEE 802.3
//! polynomial) values match. Collisions are an accepted risk of the
//! protocol. CRCs travel in request payloads as plain `u32` fields.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// CRC of the empty stream, also used for a missing file.
pub const EMPTY_CRC: u32 = 0;

pub fn crc32_bytes(bytes: &[u8]) -> u32 {
    crc32fast::hash(bytes)
}

/// Stream a reader through the hasher in 64 KiB reads.
pub fn crc32_reader<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut hasher = crc32fast::Hasher::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize())
}

pub fn crc32_file<P: AsRef<Path>>(path: P) -> io::Result<u32> {
    let mut f = File::open(path)?;
    crc32_reader(&mut f)
}

/// Like [`crc32_file`], but a missing file yields [`EMPTY_CRC`].
pub fn crc32_file_or_empty<P: AsRef<Path>>(path: P) -> io::Result<u32> {
    match File::open(path) {
        Ok(mut f) => crc32_reader(&mut f),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(EMPTY_CRC),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        let mut p = std::env::temp_dir();
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        p.push(format!("checksum_{}_{}_{}", std::process::id(), ts, name));
        p
    }

    #[test]
    fn crc32_check_value() {
        // The CRC-32/IEEE check value for the standard test vector.
        assert_eq!(crc32_bytes(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn empty_stream_crc_is_sentinel() {
        assert_eq!(crc32_bytes(b""), EMPTY_CRC);
        let mut empty: &[u8] = &[];
        assert_eq!(crc32_reader(&mut empty).unwrap(), EMPTY_CRC);
    }

    #[test]
    fn file_and_bytes_agree() {
        let p = temp_path("agree.bin");
        let content = b"hello netdisc\x00\x01\x02";
        let mut f = File::create(&p).unwrap();
        f.write_all(content).unwrap();
        drop(f);

        assert_eq!(crc32_file(&p).unwrap(), crc32_bytes(content));
        let _ = std::fs::remove_file(&p);
    }

    #[test]
    fn missing_file_yields_empty_crc() {
        let p = temp_path("does_not_exist.bin");
        assert_eq!(crc32_file_or_empty(&p).unwrap(), EMPTY_CRC);
        assert!(crc32_file(&p).is_err());
    }
}
