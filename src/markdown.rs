//! Markdown tables.
//!
//! ```text
//! <!-- RAG Context: tariffs.xlsx | Sheet: Sheet1 -->      context banner
//! <!-- Keywords: 关税, 配额 -->                             context banner
//! <!-- table-notes-meta {"conditional_notes": {...}} -->   footnote table
//!
//! | 商品编码 | 税率 |                                       header
//! | --- | --- |                                            separator
//! | 1001 | 1%[注1] |                                       data
//! ```
//!
//! Blank lines are ignored. A document without a header or without data
//! lines is not a table and is passed through as one chunk.

use crate::document::{TableDocument, TableFormat};
use crate::footnote::{annotation, FootnoteTable};
use crate::grid::{Cell, Row};

/// Prefix of the comment line that carries footnote metadata.
pub const NOTES_META_PREFIX: &str = "<!-- table-notes-meta";

/// The Markdown representation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Markdown;

impl TableFormat for Markdown {
    fn parse(&self, content: &str) -> Option<TableDocument> {
        let mut context = Vec::new();
        let mut footnotes = FootnoteTable::default();
        let mut header: Option<Row> = None;
        let mut separator_seen = false;
        let mut rows = Vec::new();

        for line in content.lines() {
            let stripped = line.trim();
            if stripped.is_empty() {
                continue;
            }

            if let Some(meta) = stripped.strip_prefix(NOTES_META_PREFIX) {
                let json = meta.trim_end().trim_end_matches("-->");
                footnotes = FootnoteTable::from_json(json.trim());
            } else if stripped.starts_with("<!--") {
                context.push(line.to_string());
            } else if stripped.starts_with('|') {
                if header.is_none() {
                    header = Some(Row::header(
                        split_cells(stripped).into_iter().map(Cell::heading).collect(),
                    ));
                } else if !separator_seen && stripped.contains("---") {
                    separator_seen = true;
                } else {
                    rows.push(Row::data(
                        split_cells(stripped).into_iter().map(Cell::new).collect(),
                    ));
                }
            }
        }

        let header = header?;
        if rows.is_empty() {
            return None;
        }

        Some(TableDocument {
            context: (!context.is_empty()).then(|| context.join("\n")),
            context_markup: None,
            caption: None,
            header_rows: vec![header],
            rows,
            footnotes,
            attributes: Vec::new(),
        })
    }

    fn row_text(&self, row: &Row) -> String {
        let cells: Vec<&str> = row.cells.iter().map(|c| c.content.as_str()).collect();
        format!("| {} |", cells.join(" | "))
    }

    fn fixed_text(&self, document: &TableDocument) -> String {
        let mut parts = Vec::new();
        if let Some(context) = &document.context {
            parts.push(context.clone());
        }
        if let Some(caption) = &document.caption {
            parts.push(caption.clone());
        }
        parts.extend(self.header_lines(document));
        parts.join("\n")
    }

    fn assemble(&self, document: &TableDocument, rows: &[Row], notes: &[&str]) -> String {
        let mut parts = Vec::new();

        let note_line = annotation(notes).map(|text| format!("<!--{text} -->"));
        if document.context.is_some() || note_line.is_some() {
            parts.extend(document.context.clone());
            parts.extend(note_line);
            parts.push(String::new());
        }
        if let Some(caption) = &document.caption {
            parts.push(caption.clone());
        }

        parts.extend(self.header_lines(document));
        parts.extend(rows.iter().map(|row| self.row_text(row)));
        parts.join("\n")
    }
}

impl Markdown {
    /// The first header row, the separator, then any further header rows.
    fn header_lines(&self, document: &TableDocument) -> Vec<String> {
        let Some((first, rest)) = document.header_rows.split_first() else {
            return Vec::new();
        };
        let mut lines = vec![self.row_text(first), separator(first.cells.len())];
        lines.extend(rest.iter().map(|row| self.row_text(row)));
        lines
    }
}

fn separator(width: usize) -> String {
    format!("| {} |", vec!["---"; width.max(1)].join(" | "))
}

/// Split a `| a | b |` line on unescaped pipes, keeping escapes in the cells.
fn split_cells(line: &str) -> Vec<String> {
    let body = line.strip_prefix('|').unwrap_or(line);

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut escaped = false;
    for c in body.chars() {
        if escaped {
            current.push(c);
            escaped = false;
        } else if c == '\\' {
            current.push(c);
            escaped = true;
        } else if c == '|' {
            cells.push(current.trim().to_string());
            current.clear();
        } else {
            current.push(c);
        }
    }
    if !current.trim().is_empty() {
        cells.push(current.trim().to_string());
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "<!-- RAG Context: test.xlsx | Sheet: Sheet1 -->
<!-- Keywords: 关税 -->
<!-- table-notes-meta {\"conditional_notes\": {\"注1\": \"注1：暂定税率\"}} -->

| 编码 | 名称 | 税率 |
| --- | --- | --- |
| 1001 | 小麦 | 1%[注1] |
| 1002 | 玉米 \\| 杂粮 | 1% |
";

    #[test]
    fn test_parse_sample() {
        let doc = Markdown.parse(SAMPLE).unwrap();
        assert_eq!(
            doc.context.as_deref(),
            Some("<!-- RAG Context: test.xlsx | Sheet: Sheet1 -->\n<!-- Keywords: 关税 -->")
        );
        assert_eq!(doc.header_rows[0].cells.len(), 3);
        assert_eq!(doc.rows.len(), 2);
        assert_eq!(doc.rows[1].cells[1].content, "玉米 \\| 杂粮");
        assert_eq!(doc.footnotes.conditional_notes["注1"], "注1：暂定税率");
    }

    #[test]
    fn test_parse_rejects_non_tables() {
        assert!(Markdown.parse("just a paragraph").is_none());
        assert!(Markdown.parse("| a | b |\n| --- | --- |\n").is_none());
    }

    #[test]
    fn test_split_cells() {
        assert_eq!(split_cells("| a | b |"), ["a", "b"]);
        assert_eq!(split_cells("| a | |"), ["a", ""]);
        assert_eq!(split_cells("|a|b"), ["a", "b"]);
        assert_eq!(split_cells(r"| a \| b | c |"), [r"a \| b", "c"]);
    }

    #[test]
    fn test_row_text() {
        let row = Row::from_texts(["1", "小麦"]);
        assert_eq!(Markdown.row_text(&row), "| 1 | 小麦 |");
    }

    #[test]
    fn test_assemble_layout() {
        let doc = Markdown.parse(SAMPLE).unwrap();
        let chunk = Markdown.assemble(&doc, &doc.rows[..1], &["注1：暂定税率"]);
        assert_eq!(
            chunk,
            "<!-- RAG Context: test.xlsx | Sheet: Sheet1 -->\n\
             <!-- Keywords: 关税 -->\n\
             <!-- 【表格注释】注1：暂定税率 -->\n\
             \n\
             | 编码 | 名称 | 税率 |\n\
             | --- | --- | --- |\n\
             | 1001 | 小麦 | 1%[注1] |"
        );
    }

    #[test]
    fn test_assemble_without_context() {
        let doc = TableDocument::new(vec![Row::header(vec![Cell::heading("h")])], vec![]);
        let chunk = Markdown.assemble(&doc, &[Row::from_texts(["x"])], &[]);
        assert_eq!(chunk, "| h |\n| --- |\n| x |");
    }

    #[test]
    fn test_fixed_text() {
        let doc = Markdown.parse(SAMPLE).unwrap();
        let fixed = Markdown.fixed_text(&doc);
        assert!(fixed.ends_with("| 编码 | 名称 | 税率 |\n| --- | --- | --- |"));
        assert!(!fixed.contains("小麦"));
    }
}
