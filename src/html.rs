//! HTML tables.
//!
//! ## Input Layout
//!
//! ```text
//! <div class="rag-context">【文档上下文】来源：a.xlsx | 数据类型：表格数据</div>
//! <script type="application/json" class="table-notes-meta">
//!   {"header_notes": {...}, "conditional_notes": {...}}
//! </script>
//! <table data-source="a.xlsx" data-sheet="Sheet1">
//!   <caption>关键检索词：...</caption>
//!   <thead><tr><th>...</th></tr></thead>
//!   <tbody>
//!     <tr><td rowspan="2">...</td>...</tr>
//!     <tr class="table-note-row"><td>[注1] ...</td></tr>
//!   </tbody>
//! </table>
//! ```
//!
//! Without a `thead`, the first row is the header. Without a `div.rag-context`,
//! the nearest `div` before the table is the context banner.
//!
//! ## Chunk Layout
//!
//! Every chunk is wrapped in a bare `<div>` and repeats the banner, caption,
//! and header rows. The banner element keeps its tag and attributes; when
//! notes apply, its content becomes the banner text with the notes appended.
//! Row attributes are carried through.

use std::sync::LazyLock;

use scraper::{ElementRef, Html as HtmlDocument, Selector};

use crate::document::{ElementMarkup, TableDocument, TableFormat};
use crate::footnote::{annotation, FootnoteTable};
use crate::grid::{Cell, Row, RowKind};

static CONTEXT: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div.rag-context").expect("CONTEXT: hardcoded selector is valid")
});
static NOTES_META: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("script.table-notes-meta").expect("NOTES_META: hardcoded selector is valid")
});
static TABLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table").expect("TABLE: hardcoded selector is valid"));
static CAPTION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("caption").expect("CAPTION: hardcoded selector is valid"));
static THEAD: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("thead").expect("THEAD: hardcoded selector is valid"));
static TBODY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tbody").expect("TBODY: hardcoded selector is valid"));
static TR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("TR: hardcoded selector is valid"));

/// Class marking footnote rows in the table body.
pub const NOTE_ROW_CLASS: &str = "table-note-row";

/// Class marking copies of merged origin cells.
pub const SPAN_FILL_CLASS: &str = "span-fill";

/// The HTML representation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Html;

impl TableFormat for Html {
    fn parse(&self, content: &str) -> Option<TableDocument> {
        let dom = HtmlDocument::parse_document(content);
        let table = dom.select(&TABLE).next()?;

        let banner = dom.select(&CONTEXT).next().or_else(|| {
            table
                .prev_siblings()
                .filter_map(ElementRef::wrap)
                .find(|el| el.value().name() == "div")
        });

        let footnotes = dom
            .select(&NOTES_META)
            .next()
            .map(|script| FootnoteTable::from_json(&script.text().collect::<String>()))
            .unwrap_or_default();

        let caption = table.select(&CAPTION).next().map(|c| c.inner_html());

        let header_elems: Vec<ElementRef<'_>> = match table.select(&THEAD).next() {
            Some(thead) => thead.select(&TR).collect(),
            None => table.select(&TR).take(1).collect(),
        };
        let is_header = |el: &ElementRef<'_>| header_elems.iter().any(|h| h.id() == el.id());

        // html5ever wraps bare rows in an implicit tbody, so the header row of
        // a thead-less table can show up here too.
        let body_elems: Vec<ElementRef<'_>> = match table.select(&TBODY).next() {
            Some(_) => table
                .select(&TBODY)
                .flat_map(|tbody| tbody.select(&TR))
                .filter(|tr| !is_header(tr))
                .collect(),
            None => table.select(&TR).filter(|tr| !is_header(tr)).collect(),
        };

        let header_rows = header_elems
            .iter()
            .map(|tr| read_row(*tr, RowKind::Header))
            .collect();
        let rows = body_elems
            .iter()
            .map(|tr| {
                let kind = if tr.value().classes().any(|c| c == NOTE_ROW_CLASS) {
                    RowKind::Footnote
                } else {
                    RowKind::Data
                };
                read_row(*tr, kind)
            })
            .collect();

        Some(TableDocument {
            context: banner.map(|div| div.text().collect()),
            context_markup: banner.map(|div| ElementMarkup {
                tag: div.value().name().to_string(),
                attributes: attributes_of(div),
                inner_html: div.inner_html(),
            }),
            caption,
            header_rows,
            rows,
            footnotes,
            attributes: attributes_of(table),
        })
    }

    fn row_text(&self, row: &Row) -> String {
        let mut out = open_tag(
            "tr",
            row.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        );
        for cell in &row.cells {
            let tag = if cell.is_header { "th" } else { "td" };
            let rowspan = cell.rowspan.to_string();
            let colspan = cell.colspan.to_string();
            let attrs = [
                cell.span_fill.then_some(("class", SPAN_FILL_CLASS)),
                (cell.rowspan > 1).then_some(("rowspan", rowspan.as_str())),
                (cell.colspan > 1).then_some(("colspan", colspan.as_str())),
            ];
            out.push_str(&open_tag(tag, attrs.into_iter().flatten()));
            out.push_str(&cell.content);
            out.push_str(&format!("</{tag}>"));
        }
        out.push_str("</tr>");
        out
    }

    fn fixed_text(&self, document: &TableDocument) -> String {
        let mut out = banner(document, None).unwrap_or_default();
        if let Some(caption) = &document.caption {
            out.push_str(&format!("<caption>{caption}</caption>"));
        }
        for row in &document.header_rows {
            out.push_str(&self.row_text(row));
        }
        out
    }

    fn assemble(&self, document: &TableDocument, rows: &[Row], notes: &[&str]) -> String {
        let mut out = String::from("<div>");
        if let Some(banner) = banner(document, annotation(notes).as_deref()) {
            out.push_str(&banner);
        }

        let attrs = document
            .attributes
            .iter()
            .filter(|(name, _)| name != "border" && name != "style")
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .chain([("border", "1"), ("style", "border-collapse:collapse")]);
        out.push_str(&open_tag("table", attrs));

        if let Some(caption) = &document.caption {
            out.push_str(&format!("<caption>{caption}</caption>"));
        }

        out.push_str("<thead>");
        for row in &document.header_rows {
            out.push_str(&self.row_text(row));
        }
        out.push_str("</thead><tbody>");
        for row in rows {
            out.push_str(&self.row_text(row));
        }
        out.push_str("</tbody></table></div>");
        out
    }
}

fn read_row(tr: ElementRef<'_>, kind: RowKind) -> Row {
    let cells = tr
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|el| matches!(el.value().name(), "td" | "th"))
        .map(|el| {
            let span = |name: &str| {
                el.value()
                    .attr(name)
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(1)
            };
            let cell = if el.value().name() == "th" {
                Cell::heading(el.inner_html())
            } else {
                Cell::new(el.inner_html())
            };
            Cell {
                span_fill: el.value().classes().any(|c| c == SPAN_FILL_CLASS),
                ..cell.with_span(span("rowspan"), span("colspan"))
            }
        })
        .collect();
    Row {
        kind,
        cells,
        attributes: attributes_of(tr),
    }
}

fn attributes_of(el: ElementRef<'_>) -> Vec<(String, String)> {
    el.value()
        .attrs()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}

/// The banner element, with `annotation` (if any) appended to its text.
///
/// A parsed banner keeps its tag and attributes, and its inner markup when no
/// notes apply. Notes without any banner get a fresh `div.rag-context`.
fn banner(document: &TableDocument, annotation: Option<&str>) -> Option<String> {
    let text = match (&document.context, annotation) {
        (Some(context), Some(notes)) => format!("{context}{notes}"),
        (Some(context), None) => context.clone(),
        (None, Some(notes)) => return Some(context_div(notes.trim_start())),
        (None, None) => return None,
    };

    let Some(markup) = &document.context_markup else {
        return Some(context_div(&text));
    };
    let inner = if annotation.is_some() {
        escape_text(&text)
    } else {
        markup.inner_html.clone()
    };
    let attrs = markup
        .attributes
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()));
    Some(format!(
        "{}{inner}</{}>",
        open_tag(&markup.tag, attrs),
        markup.tag
    ))
}

fn open_tag<'a, I>(tag: &str, attributes: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut out = format!("<{tag}");
    for (name, value) in attributes {
        out.push_str(&format!(r#" {name}="{}""#, escape_attr(value)));
    }
    out.push('>');
    out
}

fn context_div(text: &str) -> String {
    format!(r#"<div class="rag-context">{}</div>"#, escape_text(text))
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

fn escape_attr(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}
