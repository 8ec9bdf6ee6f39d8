//! Destination planning: where each catalog entry lands on disk.
//!
//! Layout is `<root>/<section>/<version>/<file name>`, a pure function of the
//! entry, so repeated runs write to the same paths.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::catalog::FirmwareEntry;
use crate::checksum;
use crate::url_model::{firmware_filename, path_component};

/// One download instruction: the entry and its destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadPlan {
    pub entry: FirmwareEntry,
    /// `<root>/<section>/<version>`
    pub dir: PathBuf,
    pub file_name: String,
}

impl DownloadPlan {
    pub fn file_path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }

    pub fn checksum_path(&self) -> PathBuf {
        checksum::record_path(&self.file_path())
    }
}

/// Destination for a single entry.
pub fn destination_for(root: &Path, entry: &FirmwareEntry) -> DownloadPlan {
    DownloadPlan {
        entry: entry.clone(),
        dir: root
            .join(path_component(&entry.section))
            .join(path_component(&entry.version)),
        file_name: firmware_filename(&entry.url),
    }
}

/// Ordered plan for all entries.
///
/// Exact repeats (same destination and same URL) are dropped after their first
/// occurrence. Different URLs that map to the same destination are all kept in
/// catalog order, so the last one wins on disk; each such clash is logged.
pub fn plan_downloads(root: &Path, entries: &[FirmwareEntry]) -> Vec<DownloadPlan> {
    let mut seen: HashMap<PathBuf, String> = HashMap::new();
    let mut plans = Vec::with_capacity(entries.len());

    for entry in entries {
        let plan = destination_for(root, entry);
        let path = plan.file_path();
        match seen.get(&path) {
            Some(url) if *url == entry.url => {
                tracing::debug!("duplicate catalog entry for {} skipped", path.display());
                continue;
            }
            Some(url) => {
                tracing::warn!(
                    "{} is the destination of both {} and {}; the later download overwrites the earlier",
                    path.display(),
                    url,
                    entry.url
                );
            }
            None => {}
        }
        seen.insert(path, entry.url.clone());
        plans.push(plan);
    }
    plans
}
