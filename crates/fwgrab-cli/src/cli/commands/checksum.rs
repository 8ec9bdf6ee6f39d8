//! `fwgrab checksum <path>`: print the MD5 of a file.

use anyhow::{Context, Result};
use fwgrab_core::checksum;
use std::path::Path;

use crate::cli::RunStatus;

/// Prints `<md5>  <path>` so the output can be fed to `md5sum -c`.
pub fn run_checksum(path: &Path) -> Result<RunStatus> {
    let digest =
        checksum::md5_path(path).with_context(|| format!("checksum {}", path.display()))?;
    print!("{}", checksum::format_record(&digest, &path.display().to_string()));
    Ok(RunStatus::Success)
}
