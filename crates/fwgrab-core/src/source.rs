//! Loading the catalog page from a local file or a URL.

use anyhow::{Context, Result};
use std::fs;
use url::Url;

use crate::config::{HtmlSource, HttpConfig};
use crate::http;

/// Catalog HTML plus the URL it was served from, when known.
#[derive(Debug, Clone)]
pub struct CatalogPage {
    pub html: String,
    /// Effective URL after redirects for remote pages; `None` for local files.
    pub page_url: Option<Url>,
}

/// Reads the catalog page. Non-UTF-8 bytes are replaced rather than rejected.
///
/// Any failure here is fatal for a run: without the page there are no entries.
pub fn load_catalog_page(source: &HtmlSource, cfg: &HttpConfig) -> Result<CatalogPage> {
    match source {
        HtmlSource::LocalFile(path) => {
            let bytes =
                fs::read(path).with_context(|| format!("read catalog {}", path.display()))?;
            tracing::info!("read catalog from {} ({} bytes)", path.display(), bytes.len());
            Ok(CatalogPage {
                html: String::from_utf8_lossy(&bytes).into_owned(),
                page_url: None,
            })
        }
        HtmlSource::RemoteUrl(url) => {
            let (bytes, response) =
                http::get_bytes(url, cfg).with_context(|| format!("fetch catalog {}", url))?;
            tracing::info!(
                "fetched catalog from {} ({} bytes, HTTP {})",
                response.effective_url,
                response.bytes,
                response.status
            );
            let page_url = Url::parse(&response.effective_url)
                .or_else(|_| Url::parse(url))
                .ok();
            Ok(CatalogPage {
                html: String::from_utf8_lossy(&bytes).into_owned(),
                page_url,
            })
        }
    }
}
