//! Ranking table extraction.
//!
//! Each body row of the target table carries seven cells, in order:
//! current date, previous date, change indicator image, icon image,
//! name, rating, rating change.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument, warn};
use url::Url;

use rankpages_shared::{RankPagesError, Record, RecordFields, Result};

/// Number of cells every data row must provide.
pub const COLUMNS: usize = 7;

static TBODY_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tbody").expect("valid selector"));
static TR_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("valid selector"));
static TD_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td").expect("valid selector"));
static IMG_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img[src]").expect("valid selector"));

/// Extract all records from the table whose `id` is `table_id`.
///
/// Image cells are resolved against `base_url`; a cell without an image
/// yields an empty string.
#[instrument(skip(html))]
pub fn extract_records(html: &str, base_url: &Url, table_id: &str) -> Result<Vec<Record>> {
    let doc = Html::parse_document(html);

    let table_sel = Selector::parse(&format!("table[id=\"{}\"]", table_id.replace('"', "\\\"")))
        .map_err(|e| RankPagesError::config(format!("invalid table id `{table_id}`: {e}")))?;

    let table = doc
        .select(&table_sel)
        .next()
        .ok_or_else(|| RankPagesError::TableNotFound {
            table_id: table_id.to_string(),
        })?;

    let rows: Vec<ElementRef<'_>> = match table.select(&TBODY_SEL).next() {
        Some(tbody) => tbody.select(&TR_SEL).collect(),
        None => table.select(&TR_SEL).collect(),
    };

    let mut records = Vec::with_capacity(rows.len());

    for (row_index, row) in rows.into_iter().enumerate() {
        let cells: Vec<ElementRef<'_>> = row.select(&TD_SEL).collect();

        if cells.is_empty() {
            debug!(row_index, "skipping row without data cells");
            continue;
        }
        if cells.len() < COLUMNS {
            return Err(RankPagesError::parse(format!(
                "row {row_index} has {} cells, expected {COLUMNS}",
                cells.len()
            )));
        }

        let fields = RecordFields {
            date1: cell_text(cells[0]),
            date2: cell_text(cells[1]),
            change: cell_image(cells[2], base_url),
            img: cell_image(cells[3], base_url),
            language: cell_text(cells[4]),
            rating: cell_text(cells[5]),
            rating_change: cell_text(cells[6]),
        };

        records.push(Record::new(records.len(), fields)?);
    }

    debug!(count = records.len(), "extracted records");
    Ok(records)
}

/// Drop the first `n` records.
pub fn skip_rows(records: Vec<Record>, n: usize) -> Vec<Record> {
    records.into_iter().skip(n).collect()
}

/// Whitespace-trimmed text content of a cell.
fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}

/// Absolute URL of the first image in a cell, or empty.
fn cell_image(cell: ElementRef<'_>, base_url: &Url) -> String {
    let Some(src) = cell
        .select(&IMG_SEL)
        .next()
        .and_then(|img| img.value().attr("src"))
    else {
        return String::new();
    };

    match base_url.join(src) {
        Ok(resolved) => resolved.to_string(),
        Err(e) => {
            warn!(src, error = %e, "could not resolve image URL, keeping it as is");
            src.to_string()
        }
    }
}
