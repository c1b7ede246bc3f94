//! Table chunkers: one planner, many representations.
//!
//! ```text
//!           parse            normalize          plan                 assemble
//! content ───────> document ──────────> grid ──────────> row ranges ──────────> chunks
//!   (TableFormat)              (grid)       (planner + notes)     (TableFormat)
//! ```
//!
//! HTML and Markdown differ only in [`TableFormat`]; boundary planning,
//! footnote matching, and statistics are shared.

use std::sync::Arc;

use crate::config::ChunkConfig;
use crate::document::{TableDocument, TableFormat};
use crate::footnote::{notes_overhead, FootnoteGrammar, NoteTracker, References};
use crate::html::Html;
use crate::markdown::Markdown;
use crate::planner::BoundaryPlanner;
use crate::stats::{ChunkResult, ChunkStats};
use crate::token::{CharRatioEstimator, TokenEstimator};

/// Splits one table document into bounded chunks.
///
/// Implemented by [`TableChunker`] for every [`TableFormat`], so callers can
/// hold HTML and Markdown chunkers behind one type:
///
/// ```rust
/// use tabslabs::{ChunkConfig, DocumentChunker, HtmlChunker, MarkdownChunker};
///
/// let config = ChunkConfig::by_rows(2).unwrap();
/// let chunkers: Vec<Box<dyn DocumentChunker>> = vec![
///     Box::new(HtmlChunker::html(config.clone())),
///     Box::new(MarkdownChunker::markdown(config)),
/// ];
///
/// let md = "| a |\n| --- |\n| 1 |\n| 2 |\n| 3 |";
/// assert_eq!(chunkers[1].chunk(md).stats.total_chunks, 2);
/// ```
pub trait DocumentChunker: Send + Sync {
    /// Parse `content` and chunk it.
    ///
    /// Content with no recognizable table is returned unchanged as a single
    /// chunk.
    fn chunk(&self, content: &str) -> ChunkResult;

    /// Chunk an already-built document.
    fn chunk_document(&self, document: &TableDocument) -> ChunkResult;
}

/// The chunker for one table representation.
pub struct TableChunker<F> {
    config: ChunkConfig,
    format: F,
    estimator: Arc<dyn TokenEstimator>,
    grammar: FootnoteGrammar,
}

/// Chunker for enriched HTML tables.
pub type HtmlChunker = TableChunker<Html>;

/// Chunker for Markdown tables.
pub type MarkdownChunker = TableChunker<Markdown>;

impl<F: TableFormat> TableChunker<F> {
    /// A chunker using the default character-ratio estimator and footnote grammar.
    #[must_use]
    pub fn new(config: ChunkConfig, format: F) -> Self {
        Self {
            config,
            format,
            estimator: Arc::new(CharRatioEstimator::default()),
            grammar: FootnoteGrammar::default(),
        }
    }

    /// Use a different token estimator.
    #[must_use]
    pub fn with_estimator(self, estimator: Arc<dyn TokenEstimator>) -> Self {
        Self { estimator, ..self }
    }

    /// Use a different footnote reference grammar.
    #[must_use]
    pub fn with_grammar(self, grammar: FootnoteGrammar) -> Self {
        Self { grammar, ..self }
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// The representation this chunker reads and writes.
    #[must_use]
    pub fn format(&self) -> &F {
        &self.format
    }
}

impl HtmlChunker {
    /// An HTML chunker.
    #[must_use]
    pub fn html(config: ChunkConfig) -> Self {
        Self::new(config, Html)
    }
}

impl MarkdownChunker {
    /// A Markdown chunker.
    #[must_use]
    pub fn markdown(config: ChunkConfig) -> Self {
        Self::new(config, Markdown)
    }
}

impl<F> std::fmt::Debug for TableChunker<F>
where
    F: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableChunker")
            .field("config", &self.config)
            .field("format", &self.format)
            .field("grammar", &self.grammar)
            .finish_non_exhaustive()
    }
}

impl<F: TableFormat> DocumentChunker for TableChunker<F> {
    fn chunk(&self, content: &str) -> ChunkResult {
        match self.format.parse(content) {
            Some(document) => self.chunk_document(&document),
            None => {
                tracing::debug!(len = content.len(), "no table found, passing content through");
                ChunkResult::passthrough(content, &self.config)
            }
        }
    }

    fn chunk_document(&self, document: &TableDocument) -> ChunkResult {
        let estimator: &dyn TokenEstimator = self.estimator.as_ref();
        let prepared = document.normalized();

        let base_overhead = estimator.estimate(&self.format.fixed_text(&prepared));

        let header_text = prepared
            .header_rows
            .iter()
            .map(|row| self.format.row_text(row))
            .collect::<Vec<_>>()
            .join(" ");
        let header_refs = self.grammar.extract_references(&header_text);

        let row_texts: Vec<String> = prepared
            .rows
            .iter()
            .map(|row| self.format.row_text(row))
            .collect();
        let row_tokens: Vec<usize> = row_texts.iter().map(|t| estimator.estimate(t)).collect();
        let row_refs: Vec<References> = row_texts
            .iter()
            .map(|t| self.grammar.extract_references(t))
            .collect();

        let mut tracker = NoteTracker::new(&prepared.footnotes, &header_refs, &row_refs);
        let plan = BoundaryPlanner::new(&self.config, base_overhead).plan(&row_tokens, |rows| {
            notes_overhead(&tracker.notes_for(rows), estimator)
        });

        let mut chunks = Vec::with_capacity(plan.len());
        let mut warnings = Vec::new();
        let mut token_counts = Vec::with_capacity(plan.len());
        for planned in plan {
            let notes = tracker.notes_for(planned.rows.clone());
            chunks.push(
                self.format
                    .assemble(&prepared, &prepared.rows[planned.rows], &notes),
            );
            token_counts.push(planned.tokens);
            warnings.extend(planned.warning);
        }

        let stats = ChunkStats::collect(token_counts, warnings.len(), base_overhead, &self.config);
        tracing::info!(
            chunks = stats.total_chunks,
            oversized = stats.oversized_chunks,
            min_tokens = stats.min_token_count,
            max_tokens = stats.max_token_count,
            avg_tokens = stats.avg_token_count,
            "table chunked"
        );

        ChunkResult {
            chunks,
            warnings,
            stats,
        }
    }
}
