//! Row-level reading of one catalog table.

use scraper::ElementRef;
use url::Url;

use super::columns::ColumnMap;
use super::{CatalogOptions, FirmwareEntry, SkipReason, SkippedRow};
use crate::url_model::resolve_link;

/// Upper bound on honoured `colspan` values.
const MAX_COLSPAN: usize = 64;

/// What a table contributed, plus the section in effect after its last row.
pub(super) struct TableOutcome {
    pub section: Option<String>,
    pub entries: Vec<FirmwareEntry>,
    pub skipped: Vec<SkippedRow>,
}

/// Trims and collapses internal whitespace runs to a single space.
pub(super) fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// One `<tr>` with its cells expanded by colspan into logical slots.
struct Row<'a> {
    in_thead: bool,
    cells: Vec<ElementRef<'a>>,
    slots: Vec<ElementRef<'a>>,
}

enum RowKind<'a> {
    Blank,
    Header(Vec<String>),
    Section(String),
    Data(Vec<Option<ElementRef<'a>>>),
}

/// Fold state for the rows of one table.
struct TableState<'o> {
    table_no: usize,
    row_no: usize,
    section: Option<String>,
    columns: ColumnMap,
    base: Option<&'o Url>,
    entries: Vec<FirmwareEntry>,
    skipped: Vec<SkippedRow>,
}

pub(super) fn parse_table(
    table: ElementRef<'_>,
    table_no: usize,
    inherited_section: Option<String>,
    opts: &CatalogOptions,
) -> TableOutcome {
    let caption = child_elements(table)
        .find(|el| el.value().name() == "caption")
        .map(|el| normalize_whitespace(&el.text().collect::<String>()))
        .filter(|s| !s.is_empty());

    let init = TableState {
        table_no,
        row_no: 0,
        section: caption.or(inherited_section),
        columns: ColumnMap::positional(),
        base: opts.base_url(),
        entries: Vec::new(),
        skipped: Vec::new(),
    };
    let done = table_rows(table).into_iter().fold(init, TableState::step);

    TableOutcome {
        section: done.section,
        entries: done.entries,
        skipped: done.skipped,
    }
}

impl<'o> TableState<'o> {
    fn step(mut self, row: Row<'_>) -> Self {
        self.row_no += 1;
        match self.classify(row) {
            RowKind::Blank => {}
            RowKind::Header(labels) => {
                self.columns = ColumnMap::from_header(&labels);
                tracing::debug!(
                    "table {} header at row {}: {:?}",
                    self.table_no,
                    self.row_no,
                    self.columns
                );
            }
            RowKind::Section(label) => self.section = Some(label),
            RowKind::Data(slots) => self.take_data_row(&slots),
        }
        self
    }

    fn classify<'a>(&mut self, row: Row<'a>) -> RowKind<'a> {
        if row.cells.is_empty() {
            return RowKind::Blank;
        }
        let has_link = row.cells.iter().any(|c| find_raw_link(*c).is_some());
        let texts: Vec<String> = row.slots.iter().map(|c| cell_text(*c)).collect();
        if !has_link && texts.iter().all(|t| t.is_empty()) {
            return RowKind::Blank;
        }

        let all_th = row.cells.iter().all(|c| c.value().name() == "th");
        if !has_link && (row.in_thead || (all_th && row.cells.len() >= 2)) {
            return RowKind::Header(texts);
        }

        if !has_link && row.cells.len() == 1 {
            let cell = row.cells[0];
            if cell.value().name() == "th" || colspan(cell) >= 2 {
                if self.columns.width.is_none() {
                    self.columns.width = Some(colspan(cell));
                }
                return RowKind::Section(cell_text(cell));
            }
        }

        // Rows shorter than the table are missing their leading (rowspanned) cells.
        let width = *self.columns.width.get_or_insert(row.slots.len());
        let missing = width.saturating_sub(row.slots.len());
        let mut slots: Vec<Option<ElementRef<'a>>> = vec![None; missing];
        slots.extend(row.slots.into_iter().map(Some));
        RowKind::Data(slots)
    }

    fn take_data_row(&mut self, slots: &[Option<ElementRef<'_>>]) {
        let slot = |idx: Option<usize>| idx.and_then(|i| slots.get(i).copied().flatten());

        if let Some(label) = slot(self.columns.section)
            .map(cell_text)
            .filter(|s| !s.is_empty())
        {
            self.section = Some(label);
        }

        let raw_link = slot(self.columns.link)
            .and_then(find_raw_link)
            .or_else(|| slots.iter().flatten().find_map(|c| find_raw_link(*c)));
        let version = slot(self.columns.version)
            .map(cell_text)
            .filter(|s| !s.is_empty());

        let result = match (raw_link, version, self.section.clone()) {
            (None, _, _) => Err(SkipReason::MissingLink),
            (Some(_), None, _) => Err(SkipReason::MissingVersion),
            (Some(_), Some(_), None) => Err(SkipReason::MissingSection),
            (Some(raw), Some(version), Some(section)) => resolve_link(&raw, self.base)
                .map(|url| FirmwareEntry {
                    section,
                    version,
                    url,
                    size: slot(self.columns.size)
                        .map(cell_text)
                        .filter(|s| !s.is_empty()),
                    expected_md5: slot(self.columns.md5).and_then(published_md5),
                })
                .ok_or(SkipReason::UnresolvableLink),
        };

        match result {
            Ok(entry) => self.entries.push(entry),
            Err(reason) => self.skipped.push(SkippedRow {
                table: self.table_no,
                row: self.row_no,
                reason,
            }),
        }
    }
}

fn child_elements<'a>(el: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    el.children().filter_map(ElementRef::wrap)
}

/// Direct rows of `table`, including those inside thead/tbody/tfoot but not nested tables.
fn table_rows(table: ElementRef<'_>) -> Vec<Row<'_>> {
    let mut rows = Vec::new();
    for child in child_elements(table) {
        match child.value().name() {
            "tr" => rows.push(Row::new(child, false)),
            "thead" | "tbody" | "tfoot" => {
                let in_thead = child.value().name() == "thead";
                rows.extend(
                    child_elements(child)
                        .filter(|el| el.value().name() == "tr")
                        .map(|tr| Row::new(tr, in_thead)),
                );
            }
            _ => {}
        }
    }
    rows
}

impl<'a> Row<'a> {
    fn new(tr: ElementRef<'a>, in_thead: bool) -> Self {
        let cells: Vec<ElementRef<'a>> = child_elements(tr)
            .filter(|el| matches!(el.value().name(), "td" | "th"))
            .collect();
        let slots = cells
            .iter()
            .flat_map(|c| std::iter::repeat(*c).take(colspan(*c)))
            .collect();
        Self {
            in_thead,
            cells,
            slots,
        }
    }
}

fn colspan(cell: ElementRef<'_>) -> usize {
    cell.value()
        .attr("colspan")
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(1)
        .clamp(1, MAX_COLSPAN)
}

fn cell_text(cell: ElementRef<'_>) -> String {
    normalize_whitespace(&cell.text().collect::<String>())
}

fn is_candidate_link(raw: &str) -> bool {
    let raw = raw.trim();
    let lower = raw.to_ascii_lowercase();
    !raw.is_empty()
        && !raw.starts_with('#')
        && !lower.starts_with("javascript:")
        && !lower.starts_with("mailto:")
}

/// First usable link inside `el`: an `<a href>`, else a `data-url`/`data-href`
/// attribute (download buttons).
fn find_raw_link(el: ElementRef<'_>) -> Option<String> {
    let elements = || el.descendants().filter_map(ElementRef::wrap);
    elements()
        .filter(|e| e.value().name() == "a")
        .filter_map(|e| e.value().attr("href"))
        .find(|href| is_candidate_link(href))
        .or_else(|| {
            elements()
                .filter_map(|e| e.value().attr("data-url").or(e.value().attr("data-href")))
                .find(|href| is_candidate_link(href))
        })
        .map(|s| s.trim().to_string())
}

/// MD5 published in a cell: a `data-copy` attribute (copy buttons) or the cell text.
fn published_md5(cell: ElementRef<'_>) -> Option<String> {
    cell.descendants()
        .filter_map(ElementRef::wrap)
        .filter_map(|e| e.value().attr("data-copy"))
        .map(str::to_string)
        .chain(std::iter::once(cell_text(cell)))
        .map(|s| s.trim().to_ascii_lowercase())
        .find(|s| s.len() == 32 && s.chars().all(|c| c.is_ascii_hexdigit()))
}
