//! Fetch & materialize: download each planned entry and write its checksum record.
//!
//! Entries are processed one at a time in plan order. A failing entry is
//! recorded in the [`RunReport`] and the run moves on to the next one; only
//! failing to create the destination root stops the run.

mod progress;

pub use progress::{FetchObserver, ProgressStats, SilentObserver};

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use thiserror::Error;

use crate::checksum;
use crate::config::FwgrabConfig;
use crate::http::{self, DownloadError, GetError};
use crate::plan::DownloadPlan;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Download(#[from] DownloadError),
    #[error("{op} {}: {source}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FetchError {
    fn io<'a>(op: &'static str, path: &'a Path) -> impl FnOnce(io::Error) -> FetchError + 'a {
        move |source| FetchError::Io {
            op,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A data file and its checksum record, both on disk.
#[derive(Debug, Clone)]
pub struct FetchedFile {
    pub path: PathBuf,
    pub checksum_path: PathBuf,
    pub bytes: u64,
    /// Lowercase hex MD5 of the bytes on disk.
    pub md5: String,
    /// Comparison with the catalog's published MD5, when it had one.
    pub md5_matches: Option<bool>,
}

#[derive(Debug)]
pub struct FailedEntry {
    pub plan: DownloadPlan,
    pub error: FetchError,
}

/// Result of a whole run.
#[derive(Debug, Default)]
pub struct RunReport {
    pub completed: Vec<FetchedFile>,
    pub failed: Vec<FailedEntry>,
}

impl RunReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Completed files whose MD5 differs from the one the catalog published.
    pub fn md5_mismatches(&self) -> impl Iterator<Item = &FetchedFile> {
        self.completed
            .iter()
            .filter(|f| f.md5_matches == Some(false))
    }
}

/// Extension of the in-progress download next to the destination.
pub const PART_EXTENSION: &str = "part";

/// `<dir>/<name>.part` for a destination at `<dir>/<name>`.
pub fn part_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".");
    name.push(PART_EXTENSION);
    path.with_file_name(name)
}

/// Downloads one entry to its planned path and writes `<file>.md5` next to it.
///
/// The body streams into `<file>.part`, which replaces the destination only
/// after a complete 2xx transfer. A failed or cut-off transfer leaves an
/// earlier download and its checksum record as they were.
pub fn fetch_one(
    plan: &DownloadPlan,
    cfg: &FwgrabConfig,
    observer: &mut dyn FetchObserver,
) -> Result<FetchedFile, FetchError> {
    fs::create_dir_all(&plan.dir).map_err(FetchError::io("create directory", &plan.dir))?;

    let path = plan.file_path();
    let part = part_path(&path);
    let bytes = download_to(plan, &part, cfg, observer)
        .and_then(|bytes| replace_destination(&part, &path, &plan.checksum_path()).map(|()| bytes))
        .map_err(|e| {
            discard_part(&part);
            e
        })?;

    let (checksum_path, md5) =
        checksum::write_record(&path).map_err(FetchError::io("write checksum for", &path))?;

    let md5_matches = plan.entry.expected_md5.as_deref().map(|expected| {
        let matches = expected.eq_ignore_ascii_case(&md5);
        if !matches {
            tracing::warn!(
                "{}: MD5 {} differs from published {}",
                path.display(),
                md5,
                expected
            );
        }
        matches
    });

    tracing::info!(
        "downloaded {} -> {} ({} bytes, md5 {})",
        plan.entry.url,
        path.display(),
        bytes,
        md5
    );
    Ok(FetchedFile {
        path,
        checksum_path,
        bytes,
        md5,
        md5_matches,
    })
}

/// Streams the entry's body into `part`. The file is created on the first
/// 2xx body chunk, or empty once the transfer succeeds without a body.
fn download_to(
    plan: &DownloadPlan,
    part: &Path,
    cfg: &FwgrabConfig,
    observer: &mut dyn FetchObserver,
) -> Result<u64, FetchError> {
    let started = Instant::now();
    let mut out: Option<BufWriter<File>> = None;

    let response = http::get(
        &plan.entry.url,
        &cfg.http,
        |chunk| {
            if out.is_none() {
                out = Some(BufWriter::new(File::create(part)?));
            }
            match out.as_mut() {
                Some(writer) => writer.write_all(chunk),
                None => Ok(()),
            }
        },
        |done, total| observer.on_progress(plan, &ProgressStats::sample(started, done, total)),
    )
    .map_err(|e| match e {
        GetError::Download(e) => FetchError::Download(e),
        GetError::Sink(source) => FetchError::Io {
            op: "write",
            path: part.to_path_buf(),
            source,
        },
    })?;

    let file = match out {
        Some(writer) => writer
            .into_inner()
            .map_err(|e| e.into_error())
            .map_err(FetchError::io("write", part))?,
        None => File::create(part).map_err(FetchError::io("create", part))?,
    };
    file.sync_all().map_err(FetchError::io("sync", part))?;
    Ok(response.bytes)
}

/// Drops the old checksum record, then moves the finished download into place.
fn replace_destination(part: &Path, path: &Path, record: &Path) -> Result<(), FetchError> {
    match fs::remove_file(record) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(FetchError::io("remove old checksum", record)(e)),
    }
    fs::rename(part, path).map_err(FetchError::io("rename into place", path))
}

fn discard_part(part: &Path) {
    match fs::remove_file(part) {
        Ok(()) => tracing::debug!("removed incomplete {}", part.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("could not remove {}: {}", part.display(), e),
    }
}

/// Runs [`fetch_one`] for every plan in order, continuing past failures.
///
/// Sleeps `fetch.delay_secs` between consecutive requests. Returns `Err` only
/// if `root` cannot be created.
pub fn materialize(
    plans: &[DownloadPlan],
    root: &Path,
    cfg: &FwgrabConfig,
    observer: &mut dyn FetchObserver,
) -> Result<RunReport, FetchError> {
    fs::create_dir_all(root).map_err(FetchError::io("create destination root", root))?;

    let mut report = RunReport::default();
    let delay = cfg.fetch.delay();
    for (index, plan) in plans.iter().enumerate() {
        if index > 0 && !delay.is_zero() {
            std::thread::sleep(delay);
        }
        observer.on_start(index, plans.len(), plan);
        let result = fetch_one(plan, cfg, observer);
        observer.on_finish(plan, &result);
        match result {
            Ok(fetched) => report.completed.push(fetched),
            Err(error) => {
                tracing::warn!(
                    "[{} - {}] {} failed: {}",
                    plan.entry.section,
                    plan.entry.version,
                    plan.entry.url,
                    error
                );
                report.failed.push(FailedEntry {
                    plan: plan.clone(),
                    error,
                });
            }
        }
    }

    tracing::info!(
        "run finished: {} downloaded, {} failed",
        report.completed.len(),
        report.failed.len()
    );
    Ok(report)
}
