//! Integration tests: catalog page and firmware files served by a local HTTP
//! server, run through parse, plan and materialize.

mod common;

use common::file_server::{self, Route, NOT_FOUND_BODY};
use common::test_config;
use fwgrab_core::catalog::{FirmwareEntry, ParseError};
use fwgrab_core::config::{HtmlSource, RunConfig};
use fwgrab_core::fetch::{self, FetchError, FetchObserver, FetchedFile, SilentObserver};
use fwgrab_core::http::DownloadError;
use fwgrab_core::pipeline;
use fwgrab_core::plan::{plan_downloads, DownloadPlan};
use md5::{Digest, Md5};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn md5_hex(bytes: &[u8]) -> String {
    hex::encode(Md5::digest(bytes))
}

fn entry(section: &str, version: &str, url: String) -> FirmwareEntry {
    FirmwareEntry {
        section: section.into(),
        version: version.into(),
        url,
        size: None,
        expected_md5: None,
    }
}

/// Record must be `<md5 of the file's bytes>  <file name>\n`.
fn assert_record_matches_file(data: &Path) {
    let bytes = fs::read(data).unwrap();
    let record = fs::read_to_string(format!("{}.md5", data.display())).unwrap();
    let name = data.file_name().unwrap().to_string_lossy();
    assert_eq!(record, format!("{}  {}\n", md5_hex(&bytes), name));
}

#[test]
fn remote_catalog_single_entry_scenario() {
    let firmware: Vec<u8> = (0u8..=255).cycle().take(150 * 1024).collect();
    let catalog = br#"
        <html><body>
        <table>
          <tr><th>Section</th><th>Version</th><th>Download</th></tr>
          <tr><td>3.xx</td><td>3.01</td><td><a href="fw/3.01/PS3UPDAT.PUP">dl</a></td></tr>
          <tr><td></td><td>3.15</td><td></td></tr>
        </table>
        </body></html>"#;
    let base = file_server::start(vec![
        ("/PS3/FWlist", Route::Body(catalog.to_vec())),
        ("/PS3/fw/3.01/PS3UPDAT.PUP", Route::Body(firmware.clone())),
    ]);

    let root = tempdir().unwrap();
    let run = RunConfig {
        source: HtmlSource::RemoteUrl(format!("{}/PS3/FWlist", base)),
        destination_root: root.path().to_path_buf(),
    };
    let report = pipeline::run(&run, &test_config(), &mut SilentObserver).unwrap();

    assert!(report.is_complete());
    assert_eq!(report.completed.len(), 1);
    let data = root.path().join("3.xx").join("3.01").join("PS3UPDAT.PUP");
    assert_eq!(report.completed[0].path, data);
    assert_eq!(report.completed[0].bytes, firmware.len() as u64);
    assert_eq!(fs::read(&data).unwrap(), firmware);
    assert_record_matches_file(&data);
    assert_eq!(report.completed[0].md5, md5_hex(&firmware));
    assert!(!root.path().join("3.xx").join("3.15").exists());
}

#[test]
fn one_404_among_five_does_not_stop_the_run() {
    let base = file_server::start(vec![
        ("/a.PUP", Route::Body(b"firmware a".to_vec())),
        ("/b.PUP", Route::Body(b"firmware b".to_vec())),
        ("/d.PUP", Route::Body(b"firmware d".to_vec())),
        ("/e.PUP", Route::Body(b"firmware e".to_vec())),
    ]);
    let entries: Vec<FirmwareEntry> = ["a", "b", "c", "d", "e"]
        .iter()
        .enumerate()
        .map(|(i, name)| entry("Retail", &format!("4.8{}", i), format!("{}/{}.PUP", base, name)))
        .collect();

    let root = tempdir().unwrap();
    let plans = plan_downloads(root.path(), &entries);
    let report =
        fetch::materialize(&plans, root.path(), &test_config(), &mut SilentObserver).unwrap();

    assert_eq!(report.completed.len(), 4);
    assert_eq!(report.failed.len(), 1);
    let failed = &report.failed[0];
    assert_eq!(failed.plan.entry.version, "4.82");
    assert!(matches!(
        failed.error,
        FetchError::Download(DownloadError::Status { status: 404, .. })
    ));
    for done in &report.completed {
        assert_record_matches_file(&done.path);
    }
    let missing = root.path().join("Retail").join("4.82").join("c.PUP");
    assert!(!missing.exists());
    assert!(!root.path().join("Retail").join("4.82").join("c.PUP.md5").exists());
}

#[test]
fn rerun_writes_same_paths_and_overwrites() {
    let root = tempdir().unwrap();
    let cfg = test_config();

    let first_base = file_server::start(vec![("/PS3UPDAT.PUP", Route::Body(b"old".to_vec()))]);
    let first = plan_downloads(
        root.path(),
        &[entry("4.xx", "4.91", format!("{}/PS3UPDAT.PUP", first_base))],
    );
    let report = fetch::materialize(&first, root.path(), &cfg, &mut SilentObserver).unwrap();
    let first_path = report.completed[0].path.clone();

    let second_base = file_server::start(vec![("/PS3UPDAT.PUP", Route::Body(b"new".to_vec()))]);
    let second = plan_downloads(
        root.path(),
        &[entry("4.xx", "4.91", format!("{}/PS3UPDAT.PUP", second_base))],
    );
    let report = fetch::materialize(&second, root.path(), &cfg, &mut SilentObserver).unwrap();

    assert_eq!(report.completed[0].path, first_path);
    assert_eq!(fs::read(&first_path).unwrap(), b"new");
    assert_record_matches_file(&first_path);
}

#[test]
fn http_error_keeps_existing_file() {
    let base = file_server::start(vec![]);
    let root = tempdir().unwrap();
    let plans = plan_downloads(
        root.path(),
        &[entry("4.xx", "4.91", format!("{}/PS3UPDAT.PUP", base))],
    );
    let data = plans[0].file_path();
    fs::create_dir_all(&plans[0].dir).unwrap();
    fs::write(&data, b"previous download").unwrap();

    let report =
        fetch::materialize(&plans, root.path(), &test_config(), &mut SilentObserver).unwrap();
    assert_eq!(report.failed.len(), 1);
    let on_disk = fs::read(&data).unwrap();
    assert_eq!(on_disk, b"previous download");
    assert_ne!(on_disk, NOT_FOUND_BODY);
}

#[test]
fn cut_off_body_keeps_previous_file_and_record() {
    let root = tempdir().unwrap();
    let cfg = test_config();

    let first_base =
        file_server::start(vec![("/PS3UPDAT.PUP", Route::Body(b"old firmware".to_vec()))]);
    let first = plan_downloads(
        root.path(),
        &[entry("4.xx", "4.91", format!("{}/PS3UPDAT.PUP", first_base))],
    );
    let report = fetch::materialize(&first, root.path(), &cfg, &mut SilentObserver).unwrap();
    let data = report.completed[0].path.clone();

    let second_base = file_server::start(vec![(
        "/PS3UPDAT.PUP",
        Route::Truncated {
            declared_len: 100_000,
            body: b"partialxyz".to_vec(),
        },
    )]);
    let second = plan_downloads(
        root.path(),
        &[entry("4.xx", "4.91", format!("{}/PS3UPDAT.PUP", second_base))],
    );
    let report = fetch::materialize(&second, root.path(), &cfg, &mut SilentObserver).unwrap();

    assert_eq!(report.failed.len(), 1);
    assert!(matches!(
        report.failed[0].error,
        FetchError::Download(DownloadError::Transfer { .. })
    ));
    assert_eq!(fs::read(&data).unwrap(), b"old firmware");
    assert_record_matches_file(&data);
    assert!(!fetch::part_path(&data).exists());
}

#[test]
fn unanswered_request_times_out_and_run_continues() {
    let silent = file_server::start_silent();
    let base = file_server::start(vec![("/ok.PUP", Route::Body(b"ok".to_vec()))]);
    let entries = vec![
        entry("S", "1", format!("{}/hang.PUP", silent)),
        entry("S", "2", format!("{}/ok.PUP", base)),
    ];
    let mut cfg = test_config();
    cfg.http.timeout_secs = 1;

    let root = tempdir().unwrap();
    let plans = plan_downloads(root.path(), &entries);
    let report = fetch::materialize(&plans, root.path(), &cfg, &mut SilentObserver).unwrap();

    assert_eq!(report.failed.len(), 1);
    assert!(matches!(
        report.failed[0].error,
        FetchError::Download(DownloadError::Timeout { .. })
    ));
    assert!(!plans[0].file_path().exists());
    assert_eq!(report.completed.len(), 1);
    assert_eq!(fs::read(&report.completed[0].path).unwrap(), b"ok");
}

#[test]
fn redirects_are_followed() {
    let base = file_server::start(vec![
        ("/latest", Route::Redirect("/files/4.91/PS3UPDAT.PUP".into())),
        ("/files/4.91/PS3UPDAT.PUP", Route::Body(b"4.91 image".to_vec())),
    ]);
    let root = tempdir().unwrap();
    let plans = plan_downloads(root.path(), &[entry("Retail", "4.91", format!("{}/latest", base))]);
    let report =
        fetch::materialize(&plans, root.path(), &test_config(), &mut SilentObserver).unwrap();

    // The local name comes from the catalog URL, not the redirect target.
    let data = root.path().join("Retail").join("4.91").join("latest");
    assert_eq!(report.completed[0].path, data);
    assert_eq!(fs::read(&data).unwrap(), b"4.91 image");
}

#[test]
fn empty_body_still_materializes() {
    let base = file_server::start(vec![("/empty.PUP", Route::Body(Vec::new()))]);
    let root = tempdir().unwrap();
    let plans = plan_downloads(root.path(), &[entry("S", "0", format!("{}/empty.PUP", base))]);
    let report =
        fetch::materialize(&plans, root.path(), &test_config(), &mut SilentObserver).unwrap();

    let data = &report.completed[0].path;
    assert_eq!(fs::read(data).unwrap(), b"");
    assert_eq!(report.completed[0].md5, "d41d8cd98f00b204e9800998ecf8427e");
    assert_record_matches_file(data);
}

#[test]
fn published_md5_is_compared() {
    let base = file_server::start(vec![
        ("/good.PUP", Route::Body(b"good".to_vec())),
        ("/bad.PUP", Route::Body(b"tampered".to_vec())),
    ]);
    let mut good = entry("S", "1", format!("{}/good.PUP", base));
    good.expected_md5 = Some(md5_hex(b"good"));
    let mut bad = entry("S", "2", format!("{}/bad.PUP", base));
    bad.expected_md5 = Some(md5_hex(b"original"));
    let plain = entry("S", "3", format!("{}/good.PUP", base));

    let root = tempdir().unwrap();
    let plans = plan_downloads(root.path(), &[good, bad, plain]);
    let report =
        fetch::materialize(&plans, root.path(), &test_config(), &mut SilentObserver).unwrap();

    let matches: Vec<Option<bool>> = report.completed.iter().map(|f| f.md5_matches).collect();
    assert_eq!(matches, vec![Some(true), Some(false), None]);
    assert_eq!(report.md5_mismatches().count(), 1);
    assert!(report.is_complete());
}

#[test]
fn catalog_without_table_is_fatal_and_writes_nothing() {
    let base = file_server::start(vec![(
        "/FWlist",
        Route::Body(b"<html><body><p>maintenance</p></body></html>".to_vec()),
    )]);
    let root = tempdir().unwrap();
    let dest = root.path().join("fw");
    let run = RunConfig {
        source: HtmlSource::RemoteUrl(format!("{}/FWlist", base)),
        destination_root: dest.clone(),
    };
    let err = pipeline::run(&run, &test_config(), &mut SilentObserver).unwrap_err();
    assert_eq!(err.downcast_ref::<ParseError>(), Some(&ParseError::NoTable));
    assert!(!dest.exists());
}

#[test]
fn catalog_page_404_is_fatal() {
    let base = file_server::start(vec![]);
    let root = tempdir().unwrap();
    let run = RunConfig {
        source: HtmlSource::RemoteUrl(format!("{}/FWlist", base)),
        destination_root: root.path().to_path_buf(),
    };
    let err = pipeline::run(&run, &test_config(), &mut SilentObserver).unwrap_err();
    assert!(format!("{:#}", err).contains("HTTP 404"));
}

#[test]
fn local_catalog_uses_configured_base_url() {
    let base = file_server::start(vec![("/PS3/fw/4.90.PUP", Route::Body(b"4.90".to_vec()))]);
    let dir = tempdir().unwrap();
    let html_path = dir.path().join("FWlist.html");
    fs::write(
        &html_path,
        r#"<h2>Testkit Firmwares</h2>
           <table><tr><td></td><td>4.90</td><td><a href="fw/4.90.PUP">dl</a></td></tr></table>"#,
    )
    .unwrap();

    let mut cfg = test_config();
    cfg.catalog.base_url = Some(format!("{}/PS3/", base));
    let run = RunConfig {
        source: HtmlSource::LocalFile(html_path),
        destination_root: dir.path().join("out"),
    };
    let report = pipeline::run(&run, &cfg, &mut SilentObserver).unwrap();

    let data = dir
        .path()
        .join("out")
        .join("Testkit_Firmwares")
        .join("4.90")
        .join("4.90.PUP");
    assert_eq!(report.completed[0].path, data);
    assert_eq!(fs::read(&data).unwrap(), b"4.90");
}

#[derive(Default)]
struct Recorder {
    started: Vec<(usize, usize, String)>,
    progress_events: usize,
    finished: Vec<bool>,
}

impl FetchObserver for Recorder {
    fn on_start(&mut self, index: usize, count: usize, plan: &DownloadPlan) {
        self.started.push((index, count, plan.entry.version.clone()));
    }

    fn on_progress(&mut self, _plan: &DownloadPlan, _stats: &fetch::ProgressStats) {
        self.progress_events += 1;
    }

    fn on_finish(&mut self, _plan: &DownloadPlan, result: &Result<FetchedFile, FetchError>) {
        self.finished.push(result.is_ok());
    }
}

#[test]
fn observer_sees_every_entry_in_order() {
    let body = vec![7u8; 256 * 1024];
    let base = file_server::start(vec![("/big.PUP", Route::Body(body))]);
    let entries = vec![
        entry("S", "1", format!("{}/big.PUP", base)),
        entry("S", "2", format!("{}/missing.PUP", base)),
    ];
    let root = tempdir().unwrap();
    let plans = plan_downloads(root.path(), &entries);
    let mut recorder = Recorder::default();
    fetch::materialize(&plans, root.path(), &test_config(), &mut recorder).unwrap();

    assert_eq!(
        recorder.started,
        vec![(0, 2, "1".to_string()), (1, 2, "2".to_string())]
    );
    assert_eq!(recorder.finished, vec![true, false]);
    assert!(recorder.progress_events > 0);
}
