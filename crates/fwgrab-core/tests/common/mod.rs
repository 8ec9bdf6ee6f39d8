pub mod file_server;

use fwgrab_core::config::FwgrabConfig;

/// Config for tests: no pause between downloads, short timeouts.
pub fn test_config() -> FwgrabConfig {
    let mut cfg = FwgrabConfig::default();
    cfg.fetch.delay_secs = 0;
    cfg.http.connect_timeout_secs = 5;
    cfg.http.timeout_secs = 20;
    cfg
}
