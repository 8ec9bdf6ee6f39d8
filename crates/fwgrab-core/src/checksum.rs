//! MD5 digests of downloaded files and their sidecar checksum records.
//!
//! Records use the `md5sum` text format, `<hex digest>  <file name>\n`, so a
//! download directory can be checked with `md5sum -c *.md5`.

use md5::{Digest, Md5};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

const BUF_SIZE: usize = 64 * 1024;

/// Extension appended to a file name to name its checksum record.
pub const RECORD_EXTENSION: &str = "md5";

/// Compute MD5 of a file and return the digest as lowercase hex.
/// Reads in chunks so memory use stays bounded for large images.
pub fn md5_path(path: &Path) -> io::Result<String> {
    let mut f = File::open(path)?;
    let mut hasher = Md5::new();
    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        let n = f.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// One line in `md5sum` format.
pub fn format_record(hex_digest: &str, file_name: &str) -> String {
    format!("{}  {}\n", hex_digest, file_name)
}

/// `<dir>/<name>.md5` for a data file at `<dir>/<name>`.
pub fn record_path(data_path: &Path) -> PathBuf {
    let mut name = data_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".");
    name.push(RECORD_EXTENSION);
    data_path.with_file_name(name)
}

/// Hashes `data_path` and writes its sidecar record, replacing any old one.
/// Returns the record path and the hex digest.
pub fn write_record(data_path: &Path) -> io::Result<(PathBuf, String)> {
    let digest = md5_path(data_path)?;
    let file_name = data_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let record = record_path(data_path);
    fs::write(&record, format_record(&digest, &file_name))?;
    Ok((record, digest))
}
