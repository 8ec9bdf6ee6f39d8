//! `fwgrab download`: fetch every catalog entry into the destination tree.

use anyhow::Result;
use fwgrab_core::config::{FwgrabConfig, RunConfig};
use fwgrab_core::pipeline;
use std::io;

use crate::cli::progress_bar::ConsoleProgress;
use crate::cli::RunStatus;

pub fn run_download(cfg: &FwgrabConfig, run: &RunConfig) -> Result<RunStatus> {
    let mut progress = ConsoleProgress::new(io::stderr());
    let report = pipeline::run(run, cfg, &mut progress)?;

    for file in report.md5_mismatches() {
        eprintln!(
            "warning: {} does not match the MD5 published in the catalog",
            file.path.display()
        );
    }
    for failed in &report.failed {
        eprintln!(
            "failed: [{} - {}] {}: {}",
            failed.plan.entry.section, failed.plan.entry.version, failed.plan.entry.url, failed.error
        );
    }

    if report.is_complete() {
        println!(
            "All firmware files have been downloaded ({} files under {}).",
            report.completed.len(),
            run.destination_root.display()
        );
        Ok(RunStatus::Success)
    } else {
        println!(
            "{} downloaded, {} failed.",
            report.completed.len(),
            report.failed.len()
        );
        Ok(RunStatus::PartialFailure)
    }
}
