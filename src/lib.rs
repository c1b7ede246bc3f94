//! # tabslabs
//!
//! Table chunking for retrieval-augmented generation (RAG) pipelines.
//!
//! ## The Problem
//!
//! A spreadsheet exported for retrieval is one long table. Embedding models
//! want small pieces. Splitting the table like prose breaks it:
//!
//! - A chunk without the header row is a list of unlabeled numbers
//! - A chunk that starts inside a merged cell loses the merged value
//! - A cell that says `1%[注1]` means little without note 注1
//! - One huge row can blow any token budget on its own
//!
//! So a table chunk is not a substring. It is a new, self-contained table:
//! the shared assets (context banner, caption, header rows) are repeated in
//! every chunk, merged cells are expanded, and each chunk carries exactly the
//! footnotes its rows refer to.
//!
//! ```text
//! ┌ context banner ─────────────┐      ┌ banner + notes for chunk 0 ┐
//! │ caption                     │      │ caption                     │
//! │ header                      │ ───> │ header                      │
//! │ row 0 .. row 999            │      │ row 0 .. row 5              │
//! │ footnotes {注1, 注2, *}     │      └─────────────────────────────┘
//! └─────────────────────────────┘      ┌ banner + notes for chunk 1 ┐ ...
//! ```
//!
//! ## Splitting Rows
//!
//! Rows are packed greedily, in order, under one of two limits:
//!
//! - **by rows**: at most `max_rows` data rows per chunk
//! - **by tokens**: fixed overhead + rows + matched notes stay `<= max_tokens`;
//!   with `min_tokens` set, [`TokenStrategy::PreferMin`] seals a chunk as
//!   soon as it reaches the floor instead of filling it up
//!
//! A row that cannot fit even alone is still emitted, in a chunk of its own,
//! and reported as a [`ChunkWarning`]. Nothing is dropped.
//!
//! ## Quick Start
//!
//! ```rust
//! use tabslabs::{ChunkConfig, DocumentChunker, HtmlChunker};
//!
//! let html = r#"
//! <div class="rag-context">【文档上下文】来源：prices.xlsx</div>
//! <table>
//!   <thead><tr><th>Item</th><th>Price</th></tr></thead>
//!   <tbody>
//!     <tr><td>Apple</td><td>1.20</td></tr>
//!     <tr><td>Pear</td><td>0.90</td></tr>
//!     <tr><td>Plum</td><td>2.10</td></tr>
//!   </tbody>
//! </table>"#;
//!
//! let chunker = HtmlChunker::html(ChunkConfig::by_rows(2).unwrap());
//! let result = chunker.chunk(html);
//!
//! assert_eq!(result.stats.total_chunks, 2);
//! assert!(result.chunks.iter().all(|c| c.contains("<th>Item</th>")));
//! ```
//!
//! ## Token Estimation
//!
//! Budgets are only as good as the estimator. The default
//! [`CharRatioEstimator`] assumes 2.5 characters per token; enable the
//! `tiktoken` feature for exact `cl100k_base` counts, or pass any
//! `Fn(&str) -> usize` via [`TableChunker::with_estimator`].
//!
//! | Representation | Chunker | Table markers |
//! |----------------|---------|---------------|
//! | HTML | [`HtmlChunker`] | `div.rag-context`, `script.table-notes-meta`, `tr.table-note-row` |
//! | Markdown | [`MarkdownChunker`] | `<!-- ... -->` metadata, `\| a \| b \|` rows |

mod chunker;
mod config;
mod document;
mod error;
mod footnote;
mod grid;
mod html;
mod markdown;
mod planner;
mod stats;
mod token;

pub use chunker::{DocumentChunker, HtmlChunker, MarkdownChunker, TableChunker};
pub use config::{
    ChunkConfig, ChunkOptions, SplitMode, TokenStrategy, DEFAULT_MAX_TOKENS, DEFAULT_SEPARATOR,
};
pub use document::{ElementMarkup, TableDocument, TableFormat};
pub use error::{Error, Result};
pub use footnote::{
    annotation, notes_overhead, FootnoteGrammar, FootnoteTable, References, NOTES_JOINER,
    NOTES_WRAPPER,
};
pub use grid::{Cell, NormalizedGrid, Row, RowKind, MAX_COLSPAN, MAX_ROWSPAN};
pub use html::{Html, NOTE_ROW_CLASS, SPAN_FILL_CLASS};
pub use markdown::{Markdown, NOTES_META_PREFIX};
pub use planner::{BoundaryPlanner, PlannedChunk};
pub use stats::{ChunkResult, ChunkStats, ChunkWarning, OverflowReason};
pub use token::{CharRatioEstimator, TokenEstimator};

#[cfg(feature = "tiktoken")]
pub use token::TiktokenEstimator;
