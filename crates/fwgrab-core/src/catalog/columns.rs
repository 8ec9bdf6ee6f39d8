//! Column layout of a catalog table, from its header row or by position.

/// Logical column indices (after colspan expansion) of the fields we read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct ColumnMap {
    pub section: Option<usize>,
    pub version: Option<usize>,
    pub link: Option<usize>,
    pub size: Option<usize>,
    pub md5: Option<usize>,
    /// Number of logical columns in a full row, once known.
    pub width: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Section,
    Version,
    Link,
    Size,
    Md5,
}

impl ColumnMap {
    /// Layout assumed for tables without a header row:
    /// section in column 0, version in column 1, link anywhere.
    pub fn positional() -> Self {
        Self {
            section: Some(0),
            version: Some(1),
            link: None,
            size: None,
            md5: None,
            width: None,
        }
    }

    /// Builds the layout from header labels. A header without a version
    /// column falls back to column 1 when unclaimed; a header without a
    /// section column leaves sections to markers outside the rows.
    pub fn from_header(labels: &[String]) -> Self {
        let mut map = Self {
            section: None,
            version: None,
            link: None,
            size: None,
            md5: None,
            width: Some(labels.len()),
        };
        for (i, label) in labels.iter().enumerate() {
            let slot = match classify_label(label) {
                Some(Field::Section) => &mut map.section,
                Some(Field::Version) => &mut map.version,
                Some(Field::Link) => &mut map.link,
                Some(Field::Size) => &mut map.size,
                Some(Field::Md5) => &mut map.md5,
                None => continue,
            };
            if slot.is_none() {
                *slot = Some(i);
            }
        }

        let claimed = [map.section, map.version, map.link, map.size, map.md5];
        if map.version.is_none() && labels.len() > 1 && !claimed.contains(&Some(1)) {
            map.version = Some(1);
        }
        map
    }
}

/// Maps a header label to a field by keyword. Checked most specific first so
/// that e.g. "File size" is a size column and "MD5 hash" is not a link.
fn classify_label(label: &str) -> Option<Field> {
    let lower = label.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let has = |keys: &[&str]| words.iter().any(|w| keys.contains(w));

    if has(&["md5", "hash", "checksum", "md5sum"]) {
        Some(Field::Md5)
    } else if has(&["size"]) {
        Some(Field::Size)
    } else if has(&["download", "link", "url", "file", "mirror"]) {
        Some(Field::Link)
    } else if has(&["version", "ver", "fw", "firmware"]) {
        Some(Field::Version)
    } else if has(&["section", "category", "type", "model", "group"]) {
        Some(Field::Section)
    } else {
        None
    }
}
