use scraper::{ElementRef, Html, Selector};

use crate::error::{EtlError, Result};

/// Header labels and cell text of one HTML table, before any typing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Index of the first header whose normalized label satisfies `matches`.
    pub fn find_header<F>(&self, matches: F) -> Option<usize>
    where
        F: Fn(&str) -> bool,
    {
        self.headers
            .iter()
            .position(|h| matches(&normalize_header(h)))
    }
}

pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn normalize_header(text: &str) -> String {
    normalize_text(text).to_lowercase()
}

fn parse_selector(css: &str, dataset: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| EtlError::parse(dataset, format!("invalid selector '{}': {}", css, e)))
}

fn cell_text(cell: &ElementRef) -> String {
    normalize_text(&cell.text().collect::<Vec<_>>().join(" "))
}

fn child_cells<'a>(row: &ElementRef<'a>, tag: &str) -> Vec<ElementRef<'a>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == tag)
        .collect()
}

// Browsers clamp colspan to this value
const MAX_COLSPAN: usize = 1000;

fn colspan(cell: &ElementRef) -> usize {
    cell.value()
        .attr("colspan")
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(1)
        .clamp(1, MAX_COLSPAN)
}

/// Extracts the first table matching `table_css`.
///
/// Header labels come from `header_override` when given, otherwise from the
/// `th` cells of the header row, with `colspan` expanded into empty labels.
/// Rows without `td` cells are skipped and every data row is padded or cut
/// to the header width.
pub fn extract_table(
    html: &str,
    table_css: &str,
    header_override: Option<&[&str]>,
    dataset: &str,
) -> Result<RawTable> {
    let document = Html::parse_document(html);
    let table_selector = parse_selector(table_css, dataset)?;
    let head_row_selector = parse_selector("thead tr", dataset)?;
    let row_selector = parse_selector("tr", dataset)?;

    let table = document
        .select(&table_selector)
        .next()
        .ok_or_else(|| EtlError::parse(dataset, format!("no element matches '{}'", table_css)))?;

    let header_row = table.select(&head_row_selector).next().or_else(|| {
        table
            .select(&row_selector)
            .find(|row| !child_cells(row, "th").is_empty())
    });

    let mut headers: Vec<String> = match (header_override, &header_row) {
        (Some(labels), _) => labels.iter().map(|l| l.to_string()).collect(),
        (None, Some(row)) => child_cells(row, "th")
            .iter()
            .flat_map(|th| {
                let text = cell_text(th);
                let span = colspan(th);
                std::iter::once(text).chain(std::iter::repeat(String::new()).take(span - 1))
            })
            .collect(),
        (None, None) => Vec::new(),
    };

    let header_id = header_row.map(|row| row.id());
    let mut rows: Vec<Vec<String>> = table
        .select(&row_selector)
        .filter(|row| Some(row.id()) != header_id)
        .map(|row| {
            child_cells(&row, "td")
                .iter()
                .map(cell_text)
                .collect::<Vec<_>>()
        })
        .filter(|cells| !cells.is_empty())
        .collect();

    if headers.is_empty() {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        headers = (1..=width).map(|i| format!("col_{}", i)).collect();
    }

    for row in &mut rows {
        row.resize(headers.len(), String::new());
    }

    Ok(RawTable { headers, rows })
}
