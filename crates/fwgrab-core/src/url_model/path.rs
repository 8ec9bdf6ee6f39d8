//! Filename extraction from URL path.

/// Last non-empty path segment of `url`, ignoring query and fragment.
///
/// Returns `None` if the URL cannot be parsed or has no usable segment.
pub fn filename_from_url_path(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    if segment == "." || segment == ".." {
        return None;
    }
    Some(segment.to_string())
}
