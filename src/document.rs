//! The chunker's input: one table plus everything that travels with it.

use crate::footnote::FootnoteTable;
use crate::grid::{NormalizedGrid, Row};

/// A table with its shared assets, independent of HTML or Markdown.
///
/// ```text
/// context   "【文档上下文】来源：tariffs.xlsx | 数据类型：表格数据"   every chunk
/// caption   "关键检索词：关税，配额"                                   every chunk
/// header    | 商品编码 | 商品名称 | 税率 |                              every chunk
/// rows      | 1001 | 小麦 | 1%[注1] |                                   split across chunks
/// footnotes {注1: "[注1] ..."}                                           where referenced
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableDocument {
    /// Context banner text, repeated at the top of every chunk.
    pub context: Option<String>,
    /// The banner element as written in the source, when there was one.
    pub context_markup: Option<ElementMarkup>,
    /// Table caption, repeated in every chunk.
    pub caption: Option<String>,
    /// Header rows, repeated in every chunk.
    pub header_rows: Vec<Row>,
    /// Body rows: data rows are chunked, footnote rows are left out.
    pub rows: Vec<Row>,
    /// Header-scoped and conditional footnotes.
    pub footnotes: FootnoteTable,
    /// Extra attributes of the table element (HTML only).
    pub attributes: Vec<(String, String)>,
}

impl TableDocument {
    /// A document with header and body rows and no shared assets.
    #[must_use]
    pub fn new(header_rows: Vec<Row>, rows: Vec<Row>) -> Self {
        Self {
            header_rows,
            rows,
            ..Self::default()
        }
    }

    /// Set the context banner, replacing any banner markup read from input.
    #[must_use]
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self {
            context: Some(context.into()),
            context_markup: None,
            ..self
        }
    }

    /// Set the caption.
    #[must_use]
    pub fn with_caption(self, caption: impl Into<String>) -> Self {
        Self {
            caption: Some(caption.into()),
            ..self
        }
    }

    /// Set the footnote table.
    #[must_use]
    pub fn with_footnotes(self, footnotes: FootnoteTable) -> Self {
        Self { footnotes, ..self }
    }

    /// Add a table attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// The rows that take part in chunking.
    pub fn data_rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter().filter(|row| row.is_data())
    }

    /// A copy with merge spans resolved and footnote rows dropped.
    ///
    /// Header rows and data rows are normalized as separate grids.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let data: Vec<Row> = self.data_rows().cloned().collect();
        Self {
            header_rows: NormalizedGrid::normalize(&self.header_rows).into_rows(),
            rows: NormalizedGrid::normalize(&data).into_rows(),
            ..self.clone()
        }
    }
}

/// An element kept verbatim from markup input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementMarkup {
    /// Tag name, e.g. `div`.
    pub tag: String,
    /// Attributes in source order.
    pub attributes: Vec<(String, String)>,
    /// Inner markup.
    pub inner_html: String,
}

/// A table representation: how to read it, measure it, and write chunks of it.
///
/// The boundary planner never looks at markup; everything representation
/// specific goes through this trait.
pub trait TableFormat: Send + Sync {
    /// Read a document. `None` means "no table here" and the content is passed
    /// through as a single chunk.
    fn parse(&self, content: &str) -> Option<TableDocument>;

    /// The text of one row, used for token cost and footnote references.
    fn row_text(&self, row: &Row) -> String;

    /// The text every chunk carries regardless of its rows
    /// (context banner, caption, header rows), without notes.
    fn fixed_text(&self, document: &TableDocument) -> String;

    /// Write one chunk: shared assets, then `rows` in order, with `notes`
    /// appended to the context banner.
    fn assemble(&self, document: &TableDocument, rows: &[Row], notes: &[&str]) -> String;
}
