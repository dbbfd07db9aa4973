//! Index table rendering.

use rankpages_shared::{FIELD_NAMES, Record, RunContext, page_stem};

use crate::render_front_matter;

/// File name of the optional index page.
pub const INDEX_FILE_NAME: &str = "index.md";

/// Width of the images embedded in the index table.
const INDEX_IMAGE_WIDTH: u32 = 20;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
}

/// Render `records` as a markdown pipe table.
///
/// The first, unnamed column holds each record's source position. Every other
/// cell links to the record's page; image columns embed a small `<img>` tag.
/// The output depends only on `records` and `ctx`.
pub fn render_index(records: &[Record], ctx: &RunContext) -> String {
    let mut header = vec![String::new()];
    header.extend(FIELD_NAMES.iter().map(|name| (*name).to_string()));

    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|record| {
            let target = page_stem(ctx, &record.language);
            let mut row = vec![record.position.to_string()];
            row.extend(record.fields().iter().map(|(name, value)| {
                let shown = match *name {
                    "change" | "img" => image_tag(value),
                    _ => (*value).to_string(),
                };
                format!("[{}]({})", escape_cell(&shown), escape_cell(&target))
            }));
            row
        })
        .collect();

    let mut aligns = vec![Align::Right];
    aligns.extend(std::iter::repeat_n(Align::Left, FIELD_NAMES.len()));

    pipe_table(&header, &rows, &aligns)
}

/// The index table wrapped in a page with its own front matter.
pub fn render_index_page(layout: &str, table: &str) -> String {
    let mut page = render_front_matter(layout, None);
    page.push_str(table);
    page.push('\n');
    page
}

/// `<img>` tag for the index, or empty when there is no image.
fn image_tag(url: &str) -> String {
    if url.is_empty() {
        String::new()
    } else {
        format!("<img src ='{url}' width ='{INDEX_IMAGE_WIDTH}'>")
    }
}

/// Keep cell content from splitting the row.
fn escape_cell(value: &str) -> String {
    value.replace('|', "\\|").replace('\n', " ")
}

/// Lay out a pipe table with columns padded to their widest cell.
fn pipe_table(header: &[String], rows: &[Vec<String>], aligns: &[Align]) -> String {
    let widths: Vec<usize> = (0..header.len())
        .map(|col| {
            rows.iter()
                .map(|row| row[col].chars().count())
                .chain(std::iter::once(header[col].chars().count()))
                .max()
                .unwrap_or(0)
                .max(1)
        })
        .collect();

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(format_row(header, &widths, aligns));

    let separator: Vec<String> = widths
        .iter()
        .zip(aligns)
        .map(|(w, align)| match align {
            Align::Left => format!(":{}", "-".repeat(w + 1)),
            Align::Right => format!("{}:", "-".repeat(w + 1)),
        })
        .collect();
    lines.push(format!("|{}|", separator.join("|")));

    for row in rows {
        lines.push(format_row(row, &widths, aligns));
    }

    lines.join("\n")
}

fn format_row(cells: &[String], widths: &[usize], aligns: &[Align]) -> String {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths.iter().zip(aligns))
        .map(|(cell, (&w, align))| match align {
            Align::Left => format!(" {cell:<w$} "),
            Align::Right => format!(" {cell:>w$} "),
        })
        .collect();
    format!("|{}|", padded.join("|"))
}
