//! `fwgrab list`: show the parsed catalog and planned destinations.

use anyhow::Result;
use fwgrab_core::config::{FwgrabConfig, RunConfig};
use fwgrab_core::pipeline;

use crate::cli::RunStatus;

pub fn run_list(cfg: &FwgrabConfig, run: &RunConfig) -> Result<RunStatus> {
    let prepared = pipeline::prepare(run, cfg)?;

    if prepared.plans.is_empty() {
        println!("No firmware entries found.");
    } else {
        println!(
            "{:<24} {:<12} {:<10} {}",
            "SECTION", "VERSION", "SIZE", "DESTINATION"
        );
        for plan in &prepared.plans {
            println!(
                "{:<24} {:<12} {:<10} {}",
                plan.entry.section,
                plan.entry.version,
                plan.entry.size.as_deref().unwrap_or("-"),
                plan.file_path().display()
            );
            println!("{:<48} <- {}", "", plan.entry.url);
        }
    }
    for skip in &prepared.catalog.skipped {
        eprintln!(
            "skipped table {} row {}: {}",
            skip.table, skip.row, skip.reason
        );
    }
    Ok(RunStatus::Success)
}
