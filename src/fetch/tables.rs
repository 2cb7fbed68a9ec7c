// src/fetch/tables.rs

use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::VecDeque;
use tracing::{debug, trace};

use crate::process::utils::clean_cell_text;
use crate::table::{Cell, ColumnPath, RawTable};

/// One `<th>`/`<td>` before span expansion.
#[derive(Debug, Clone, PartialEq)]
struct SpanCell {
    text: String,
    rowspan: usize,
    colspan: usize,
}

/// Parse every `<table>` whose visible text matches `marker`, in document order.
pub fn parse_tables(html: &str, marker: &Regex) -> Vec<RawTable> {
    let doc = Html::parse_document(html);
    let sel = Selector::parse("table").expect("table selector should parse");

    let mut out = Vec::new();
    for (i, table) in doc.select(&sel).enumerate() {
        if is_hidden(&table) {
            continue;
        }
        let text = visible_text(table);
        if !marker.is_match(&text) {
            trace!(table = i, "marker not found");
            continue;
        }
        let raw = table_from_element(table);
        debug!(
            table = i,
            columns = raw.width(),
            rows = raw.rows.len(),
            levels = raw.header_depth(),
            "parsed table"
        );
        out.push(raw);
    }
    out
}

fn table_from_element(table: ElementRef<'_>) -> RawTable {
    let (head_rows, body_rows) = split_sections(table);

    let header = expand_spans(head_rows.iter().map(|r| row_cells(*r)).collect());
    let body = expand_spans(body_rows.iter().map(|r| row_cells(*r)).collect());

    let width = header
        .iter()
        .chain(body.iter())
        .map(Vec::len)
        .max()
        .unwrap_or(0);

    let columns: Vec<ColumnPath> = (0..width)
        .map(|j| {
            if header.is_empty() {
                vec![j.to_string()]
            } else {
                header
                    .iter()
                    .map(|level| level.get(j).cloned().unwrap_or_default())
                    .collect()
            }
        })
        .collect();

    let rows = body
        .into_iter()
        .map(|texts| {
            let mut cells: Vec<Cell> = texts.into_iter().map(Cell::text).collect();
            cells.resize(width, Cell::Absent);
            cells
        })
        .collect();

    RawTable { columns, rows }
}

/// Header rows are the `<thead>` rows or, lacking a `<thead>`, the leading
/// rows made only of `<th>` cells. Everything else is body, `<tfoot>` last.
fn split_sections(table: ElementRef<'_>) -> (Vec<ElementRef<'_>>, Vec<ElementRef<'_>>) {
    let mut head = Vec::new();
    let mut body = Vec::new();
    let mut foot = Vec::new();

    for child in child_elements(table) {
        match child.value().name() {
            "thead" => head.extend(child_elements(child).filter(is_row)),
            "tbody" => body.extend(child_elements(child).filter(is_row)),
            "tfoot" => foot.extend(child_elements(child).filter(is_row)),
            "tr" if !is_hidden(&child) => body.push(child),
            _ => {}
        }
    }

    if head.is_empty() {
        let leading = body.iter().take_while(|r| is_all_th(**r)).count();
        head = body.drain(..leading).collect();
    }
    body.extend(foot);
    (head, body)
}

fn child_elements(el: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    el.children().filter_map(ElementRef::wrap)
}

fn is_row(el: &ElementRef<'_>) -> bool {
    el.value().name() == "tr" && !is_hidden(el)
}

fn is_cell(el: &ElementRef<'_>) -> bool {
    matches!(el.value().name(), "th" | "td") && !is_hidden(el)
}

fn is_all_th(row: ElementRef<'_>) -> bool {
    let mut cells = child_elements(row).filter(is_cell).peekable();
    cells.peek().is_some() && cells.all(|c| c.value().name() == "th")
}

fn is_hidden(el: &ElementRef<'_>) -> bool {
    el.value().attr("style").map_or(false, |style| {
        let compact: String = style
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        compact.contains("display:none")
    })
}

/// Browser limits for span attributes.
const MAX_COLSPAN: usize = 1000;
const MAX_ROWSPAN: usize = 65534;

fn span_attr(el: &ElementRef<'_>, name: &str, max: usize) -> usize {
    el.value()
        .attr(name)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(1)
        .clamp(1, max)
}

fn row_cells(row: ElementRef<'_>) -> Vec<SpanCell> {
    child_elements(row)
        .filter(is_cell)
        .map(|cell| SpanCell {
            text: clean_cell_text(&visible_text(cell)),
            rowspan: span_attr(&cell, "rowspan", MAX_ROWSPAN),
            colspan: span_attr(&cell, "colspan", MAX_COLSPAN),
        })
        .collect()
}

/// Text of `el` without anything styled `display:none`. `<br>` reads as a space.
pub fn visible_text(el: ElementRef<'_>) -> String {
    let mut out = String::new();
    collect_text(el, &mut out);
    out
}

fn collect_text(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(t) => out.push_str(t),
            Node::Element(e) if e.name() == "br" => out.push(' '),
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    if !is_hidden(&child_el) {
                        collect_text(child_el, out);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Expand `colspan`/`rowspan` into a grid of texts. A cell spanning rows is
/// repeated in each later row at its column, ahead of that row's own cells.
fn expand_spans(rows: Vec<Vec<SpanCell>>) -> Vec<Vec<String>> {
    let mut grid = Vec::with_capacity(rows.len());
    // (column, text, rows still to fill)
    let mut carried: VecDeque<(usize, String, usize)> = VecDeque::new();

    for cells in rows {
        let mut texts = Vec::new();
        let mut next: VecDeque<(usize, String, usize)> = VecDeque::new();
        let mut index = 0;

        for cell in cells {
            while carried.front().map_or(false, |(col, _, _)| *col <= index) {
                if let Some((col, text, left)) = carried.pop_front() {
                    texts.push(text.clone());
                    if left > 1 {
                        next.push_back((col, text, left - 1));
                    }
                    index += 1;
                }
            }
            for _ in 0..cell.colspan {
                texts.push(cell.text.clone());
                if cell.rowspan > 1 {
                    next.push_back((index, cell.text.clone(), cell.rowspan - 1));
                }
                index += 1;
            }
        }

        for (col, text, left) in carried.drain(..) {
            texts.push(text.clone());
            if left > 1 {
                next.push_back((col, text, left - 1));
            }
        }

        grid.push(texts);
        carried = next;
    }

    // rows that exist only because a span ran past the last <tr>
    while !carried.is_empty() {
        let mut texts = Vec::new();
        let mut next = VecDeque::new();
        for (col, text, left) in carried.drain(..) {
            texts.push(text.clone());
            if left > 1 {
                next.push_back((col, text, left - 1));
            }
        }
        grid.push(texts);
        carried = next;
    }

    grid
}
