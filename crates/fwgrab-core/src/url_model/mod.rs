//! URL handling for catalog links and local names derived from them.
//!
//! Resolves catalog hrefs against the page's base URL and turns URL paths and
//! catalog labels into names that are safe as Linux path components.

mod path;
mod sanitize;

pub use path::filename_from_url_path;
pub use sanitize::sanitize_filename_for_linux;

use url::Url;

/// Name used when a firmware URL has no usable last path segment.
pub const DEFAULT_FIRMWARE_FILENAME: &str = "PS3UPDAT.PUP";

/// Directory name used when a section or version label sanitizes to nothing.
const PLACEHOLDER_COMPONENT: &str = "unnamed";

/// Basename for the downloaded file: last URL path segment, sanitized.
///
/// - `firmware_filename("https://example.com/fw/3.01/PS3UPDAT.PUP")` → `"PS3UPDAT.PUP"`
/// - `firmware_filename("https://example.com/")` → `"PS3UPDAT.PUP"`
pub fn firmware_filename(url: &str) -> String {
    let sanitized = filename_from_url_path(url)
        .map(|raw| sanitize_filename_for_linux(&raw))
        .unwrap_or_default();
    if sanitized.is_empty() || sanitized == "." || sanitized == ".." {
        DEFAULT_FIRMWARE_FILENAME.to_string()
    } else {
        sanitized
    }
}

/// Turns a catalog label (section or version) into a single directory name.
pub fn path_component(label: &str) -> String {
    let sanitized = sanitize_filename_for_linux(label);
    if sanitized.is_empty() || sanitized == "." || sanitized == ".." {
        PLACEHOLDER_COMPONENT.to_string()
    } else {
        sanitized
    }
}

/// Resolves a raw link from the catalog into an absolute http(s) URL.
///
/// Returns `None` for empty links, in-page anchors, `javascript:`/`mailto:`
/// links, and relative links when no base is known.
pub fn resolve_link(raw: &str, base: Option<&Url>) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with('#') {
        return None;
    }
    let resolved = match base {
        Some(base) => base.join(raw).ok()?,
        None => Url::parse(raw).ok()?,
    };
    match resolved.scheme() {
        "http" | "https" => Some(resolved.to_string()),
        _ => None,
    }
}
