//! End-to-end run: load page, parse catalog, plan, materialize.

use anyhow::{Context, Result};

use crate::catalog::{self, Catalog, CatalogOptions};
use crate::config::{FwgrabConfig, RunConfig};
use crate::fetch::{self, FetchObserver, RunReport};
use crate::plan::{self, DownloadPlan};
use crate::source;

/// Parsed catalog and the download plan derived from it.
#[derive(Debug)]
pub struct Prepared {
    pub catalog: Catalog,
    pub plans: Vec<DownloadPlan>,
}

/// Loads and parses the catalog and plans destinations without downloading.
pub fn prepare(run_cfg: &RunConfig, cfg: &FwgrabConfig) -> Result<Prepared> {
    let opts = CatalogOptions::from_config(&cfg.catalog)?;
    let page = source::load_catalog_page(&run_cfg.source, &cfg.http)?;
    let opts = opts.with_page_url(page.page_url);
    let catalog = catalog::parse_catalog(&page.html, &opts)?;
    let plans = plan::plan_downloads(&run_cfg.destination_root, &catalog.entries);
    Ok(Prepared { catalog, plans })
}

/// Full run. Errors are fatal conditions only (unreadable page, no catalog
/// table, unusable destination root); per-entry failures are in the report.
pub fn run(
    run_cfg: &RunConfig,
    cfg: &FwgrabConfig,
    observer: &mut dyn FetchObserver,
) -> Result<RunReport> {
    let prepared = prepare(run_cfg, cfg)?;
    let report = fetch::materialize(&prepared.plans, &run_cfg.destination_root, cfg, observer)
        .context("prepare destination")?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigError, HtmlSource};

    #[test]
    fn invalid_selector_is_reported_before_loading_the_page() {
        let dir = tempfile::tempdir().unwrap();
        let run_cfg = RunConfig {
            source: HtmlSource::LocalFile(dir.path().join("missing.html")),
            destination_root: dir.path().join("fw"),
        };
        let mut cfg = FwgrabConfig::default();
        cfg.catalog.section_selector = "h1[".into();

        let err = prepare(&run_cfg, &cfg).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::InvalidSelector { .. })
        ));
    }

    #[test]
    fn prepare_plans_without_downloading() {
        let dir = tempfile::tempdir().unwrap();
        let html = dir.path().join("FWlist.html");
        std::fs::write(
            &html,
            r#"<span>Retail Firmwares</span>
               <table><tr><td></td><td>4.91</td>
               <td><a href="https://x.example/PS3UPDAT.PUP">dl</a></td></tr></table>"#,
        )
        .unwrap();
        let run_cfg = RunConfig {
            source: HtmlSource::LocalFile(html),
            destination_root: dir.path().join("fw"),
        };

        let prepared = prepare(&run_cfg, &FwgrabConfig::default()).unwrap();
        assert_eq!(prepared.plans.len(), 1);
        assert_eq!(
            prepared.plans[0].file_path(),
            dir.path().join("fw/Retail_Firmwares/4.91/PS3UPDAT.PUP")
        );
        assert!(!dir.path().join("fw").exists());
    }
}
