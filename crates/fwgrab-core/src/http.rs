//! Single-request HTTP GET over libcurl.
//!
//! The body is handed to a sink only after a 2xx status line has been seen, so
//! error pages never reach the destination. Redirects are followed; the
//! status checked is the one of the final response.

use std::cell::Cell;
use std::io;
use std::str;

use thiserror::Error;

use crate::config::HttpConfig;

/// Network or HTTP-level failure of one GET.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("GET {url} returned HTTP {status}")]
    Status { url: String, status: u32 },
    #[error("GET {url} timed out")]
    Timeout {
        url: String,
        #[source]
        source: curl::Error,
    },
    #[error("GET {url} failed: {source}")]
    Transfer {
        url: String,
        #[source]
        source: curl::Error,
    },
}

/// Failure of [`get`]: either the request itself or the body sink.
#[derive(Debug, Error)]
pub enum GetError {
    #[error(transparent)]
    Download(#[from] DownloadError),
    #[error("writing response body: {0}")]
    Sink(#[source] io::Error),
}

/// Outcome of a successful GET.
#[derive(Debug, Clone)]
pub struct GetResponse {
    pub status: u32,
    /// URL after redirects.
    pub effective_url: String,
    /// Body bytes passed to the sink.
    pub bytes: u64,
}

/// Performs a GET of `url`, streaming a 2xx body into `on_chunk`.
///
/// `on_progress(downloaded, total)` is called periodically; `total` is `None`
/// while the length is unknown. Runs on the calling thread.
pub fn get<W, P>(
    url: &str,
    cfg: &HttpConfig,
    mut on_chunk: W,
    mut on_progress: P,
) -> Result<GetResponse, GetError>
where
    W: FnMut(&[u8]) -> io::Result<()>,
    P: FnMut(u64, Option<u64>),
{
    let transfer_err = |source: curl::Error| {
        if source.is_operation_timedout() {
            DownloadError::Timeout {
                url: url.to_string(),
                source,
            }
        } else {
            DownloadError::Transfer {
                url: url.to_string(),
                source,
            }
        }
    };

    let mut easy = curl::easy::Easy::new();
    configure(&mut easy, url, cfg).map_err(transfer_err)?;

    // Status of the latest response header block; updated on each redirect hop.
    let status = Cell::new(0u32);
    let written = Cell::new(0u64);
    let sink_error: Cell<Option<io::Error>> = Cell::new(None);

    let performed = {
        let mut transfer = easy.transfer();
        transfer
            .header_function(|line| {
                if let Some(code) = parse_status_line(line) {
                    status.set(code);
                }
                true
            })
            .map_err(transfer_err)?;
        transfer
            .write_function(|data| {
                if !is_success(status.get()) {
                    return Ok(data.len());
                }
                match on_chunk(data) {
                    Ok(()) => {
                        written.set(written.get() + data.len() as u64);
                        Ok(data.len())
                    }
                    Err(e) => {
                        sink_error.set(Some(e));
                        Ok(0) // abort transfer
                    }
                }
            })
            .map_err(transfer_err)?;
        transfer
            .progress_function(|dltotal, dlnow, _, _| {
                let total = (dltotal > 0.0).then(|| dltotal as u64);
                on_progress(dlnow as u64, total);
                true
            })
            .map_err(transfer_err)?;
        transfer.perform()
    };

    if let Some(e) = sink_error.take() {
        return Err(GetError::Sink(e));
    }
    performed.map_err(transfer_err)?;

    let code = easy.response_code().map_err(transfer_err)?;
    if !is_success(code) {
        return Err(DownloadError::Status {
            url: url.to_string(),
            status: code,
        }
        .into());
    }
    let effective_url = easy
        .effective_url()
        .map_err(transfer_err)?
        .unwrap_or(url)
        .to_string();

    Ok(GetResponse {
        status: code,
        effective_url,
        bytes: written.get(),
    })
}

/// GET into memory; used for the catalog page.
pub fn get_bytes(url: &str, cfg: &HttpConfig) -> Result<(Vec<u8>, GetResponse), GetError> {
    let mut body = Vec::new();
    let response = get(
        url,
        cfg,
        |chunk| {
            body.extend_from_slice(chunk);
            Ok(())
        },
        |_, _| {},
    )?;
    Ok((body, response))
}

fn configure(easy: &mut curl::easy::Easy, url: &str, cfg: &HttpConfig) -> Result<(), curl::Error> {
    easy.url(url)?;
    easy.get(true)?;
    easy.follow_location(true)?;
    easy.max_redirections(cfg.max_redirects)?;
    easy.useragent(&cfg.user_agent)?;
    easy.connect_timeout(cfg.connect_timeout())?;
    easy.timeout(cfg.timeout())?;
    easy.low_speed_limit(cfg.low_speed_limit_bytes)?;
    easy.low_speed_time(cfg.low_speed_time())?;
    easy.progress(true)?;
    Ok(())
}

fn is_success(code: u32) -> bool {
    (200..300).contains(&code)
}

/// Parses `HTTP/1.1 200 OK` / `HTTP/2 404` header lines into the status code.
fn parse_status_line(line: &[u8]) -> Option<u32> {
    let line = str::from_utf8(line).ok()?;
    let mut parts = line.split_whitespace();
    if !parts.next()?.starts_with("HTTP/") {
        return None;
    }
    parts.next()?.parse().ok()
}
