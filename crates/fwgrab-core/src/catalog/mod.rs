//! Catalog parser: firmware listing HTML to an ordered list of entries.
//!
//! The page is walked once in document order. Section labels found outside
//! tables (headings, or whatever `section_selector` matches) and section rows
//! inside tables feed a single "current section" value that is threaded
//! through the walk as fold state. Each table row either updates that state,
//! yields a [`FirmwareEntry`], or is recorded as a [`SkippedRow`].

mod columns;
mod table;

use scraper::{ElementRef, Html, Selector};
use std::fmt;
use thiserror::Error;
use url::Url;

use crate::config::{CatalogConfig, ConfigError};

/// One downloadable firmware file from the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareEntry {
    /// Grouping label, whitespace-normalized.
    pub section: String,
    /// Release identifier, whitespace-normalized.
    pub version: String,
    /// Absolute http(s) URL of the firmware file.
    pub url: String,
    /// Size as printed in the catalog, if it has a size column.
    pub size: Option<String>,
    /// Lowercase hex MD5 published by the catalog, if any.
    pub expected_md5: Option<String>,
}

/// Why a table row produced no entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingLink,
    MissingVersion,
    /// No section label in the row and none seen before it.
    MissingSection,
    /// A link exists but is relative with no base URL, or not http(s).
    UnresolvableLink,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SkipReason::MissingLink => "no download link",
            SkipReason::MissingVersion => "no version",
            SkipReason::MissingSection => "no section label",
            SkipReason::UnresolvableLink => "link cannot be resolved to an http(s) URL",
        };
        f.write_str(s)
    }
}

/// A malformed row, by 1-based table and row position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    pub table: usize,
    pub row: usize,
    pub reason: SkipReason,
}

/// Parse result: entries in source row order plus the rows that were skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    pub entries: Vec<FirmwareEntry>,
    pub skipped: Vec<SkippedRow>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("no <table> element found; the page is not a firmware catalog")]
    NoTable,
}

/// Parser settings derived from `[catalog]` config and the page location.
#[derive(Debug, Clone)]
pub struct CatalogOptions {
    section_marker: Selector,
    section_names: Vec<String>,
    base_url: Option<Url>,
}

impl CatalogOptions {
    pub fn new(section_selector: &str, base_url: Option<Url>) -> Result<Self, ConfigError> {
        let section_marker =
            Selector::parse(section_selector).map_err(|e| ConfigError::InvalidSelector {
                selector: section_selector.to_string(),
                message: e.to_string(),
            })?;
        Ok(Self {
            section_marker,
            section_names: Vec::new(),
            base_url,
        })
    }

    /// Validates `[catalog]` settings; `cfg.base_url` is the initial link base.
    pub fn from_config(cfg: &CatalogConfig) -> Result<Self, ConfigError> {
        let base_url = cfg
            .base_url
            .as_deref()
            .map(|raw| {
                Url::parse(raw).map_err(|source| ConfigError::InvalidBaseUrl {
                    url: raw.to_string(),
                    source,
                })
            })
            .transpose()?;
        Ok(Self::new(&cfg.section_selector, base_url)?.with_section_names(&cfg.section_names))
    }

    /// Span texts that mark a section, compared after whitespace normalization.
    pub fn with_section_names(mut self, names: &[String]) -> Self {
        self.section_names = names
            .iter()
            .map(|n| table::normalize_whitespace(n))
            .filter(|n| !n.is_empty())
            .collect();
        self
    }

    /// The URL the page was served from replaces any configured base.
    pub fn with_page_url(mut self, page_url: Option<Url>) -> Self {
        if page_url.is_some() {
            self.base_url = page_url;
        }
        self
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// Section label carried by `el`, if it is a marker outside any table.
    fn marker_label(&self, el: ElementRef<'_>) -> Option<String> {
        if self.section_marker.matches(&el) {
            let raw = match el.value().attr("data-section") {
                Some(attr) if !attr.trim().is_empty() => attr.to_string(),
                _ => el.text().collect::<String>(),
            };
            return Some(table::normalize_whitespace(&raw)).filter(|l| !l.is_empty());
        }
        if el.value().name() == "span" && !self.section_names.is_empty() {
            let text = table::normalize_whitespace(&el.text().collect::<String>());
            return self.section_names.iter().find(|n| **n == text).cloned();
        }
        None
    }
}

/// State carried across the document walk.
struct DocumentFold {
    section: Option<String>,
    tables: usize,
    catalog: Catalog,
}

/// Parses catalog HTML into firmware entries.
///
/// Fails only when the document has no table at all; malformed rows are
/// skipped, logged, and listed in [`Catalog::skipped`].
pub fn parse_catalog(html: &str, opts: &CatalogOptions) -> Result<Catalog, ParseError> {
    let document = Html::parse_document(html);

    let init = DocumentFold {
        section: None,
        tables: 0,
        catalog: Catalog::default(),
    };
    let done = document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .fold(init, |mut state, el| {
            let in_table = is_inside_table(el);
            if el.value().name() == "table" {
                // Nested tables are read as part of their outer table's cells, not as catalogs.
                if in_table {
                    return state;
                }
                state.tables += 1;
                let outcome = table::parse_table(el, state.tables, state.section.take(), opts);
                state.section = outcome.section;
                state.catalog.entries.extend(outcome.entries);
                state.catalog.skipped.extend(outcome.skipped);
            } else if !in_table {
                if let Some(label) = opts.marker_label(el) {
                    tracing::debug!("section marker <{}>: {}", el.value().name(), label);
                    state.section = Some(label);
                }
            }
            state
        });

    if done.tables == 0 {
        return Err(ParseError::NoTable);
    }
    for skip in &done.catalog.skipped {
        tracing::warn!(
            "catalog table {} row {} skipped: {}",
            skip.table,
            skip.row,
            skip.reason
        );
    }
    tracing::info!(
        "parsed catalog: {} tables, {} entries, {} rows skipped",
        done.tables,
        done.catalog.entries.len(),
        done.catalog.skipped.len()
    );
    Ok(done.catalog)
}

fn is_inside_table(el: ElementRef<'_>) -> bool {
    el.ancestors().any(|node| {
        node.value()
            .as_element()
            .map_or(false, |e| e.name() == "table")
    })
}
