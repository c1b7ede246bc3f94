//! Chunking results, overflow warnings, and summary statistics.

use serde::Serialize;

use crate::config::{ChunkConfig, SplitMode, TokenStrategy};

/// Why a chunk went over its token budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OverflowReason {
    /// One row plus the fixed overhead and its notes is already too large.
    #[serde(rename = "single row + overhead exceeds limit")]
    SingleRow,
    /// Several rows together went over the limit.
    #[serde(rename = "accumulated rows exceed limit")]
    AccumulatedRows,
}

impl OverflowReason {
    /// Human-readable reason.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SingleRow => "single row + overhead exceeds limit",
            Self::AccumulatedRows => "accumulated rows exceed limit",
        }
    }
}

impl std::fmt::Display for OverflowReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A chunk that was emitted despite exceeding `max_tokens`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkWarning {
    /// Index of the offending chunk in [`ChunkResult::chunks`].
    pub chunk_index: usize,
    /// Estimated tokens of the chunk.
    pub actual_tokens: usize,
    /// The configured `max_tokens`.
    pub limit: usize,
    /// `actual_tokens - limit`, always > 0.
    pub overflow: usize,
    /// Data rows in the chunk.
    pub row_count: usize,
    /// Why the chunk overflowed.
    pub reason: OverflowReason,
}

impl ChunkWarning {
    pub(crate) fn new(chunk_index: usize, actual_tokens: usize, limit: usize, row_count: usize) -> Self {
        let reason = if row_count == 1 {
            OverflowReason::SingleRow
        } else {
            OverflowReason::AccumulatedRows
        };
        Self {
            chunk_index,
            actual_tokens,
            limit,
            overflow: actual_tokens.saturating_sub(limit),
            row_count,
            reason,
        }
    }
}

impl std::fmt::Display for ChunkWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "chunk #{}: {} tokens (limit {}, over by {}, {} rows): {}",
            self.chunk_index,
            self.actual_tokens,
            self.limit,
            self.overflow,
            self.row_count,
            self.reason
        )
    }
}

/// Summary of one chunking pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkStats {
    /// Number of chunks produced.
    pub total_chunks: usize,
    /// Number of chunks over `max_tokens`.
    pub oversized_chunks: usize,
    /// Estimated tokens per chunk, in chunk order.
    pub token_counts: Vec<usize>,
    /// Largest entry of `token_counts` (0 when empty).
    pub max_token_count: usize,
    /// Smallest entry of `token_counts` (0 when empty).
    pub min_token_count: usize,
    /// Mean of `token_counts` (0.0 when empty).
    pub avg_token_count: f64,
    /// Tokens every chunk pays for context banner, caption, and header rows.
    pub base_fixed_overhead: usize,
    /// Active `max_tokens`, in token mode.
    pub token_limit: Option<usize>,
    /// Active `min_tokens`, if set.
    pub min_token_limit: Option<usize>,
    /// Active strategy, in token mode.
    pub token_strategy: Option<TokenStrategy>,
}

impl ChunkStats {
    /// Aggregate per-chunk token totals.
    ///
    /// ```rust
    /// use tabslabs::{ChunkConfig, ChunkStats};
    ///
    /// let config = ChunkConfig::by_tokens(400).unwrap();
    /// let stats = ChunkStats::collect(vec![350, 300], 0, 100, &config);
    /// assert_eq!(stats.total_chunks, 2);
    /// assert_eq!(stats.max_token_count, 350);
    /// assert!((stats.avg_token_count - 325.0).abs() < f64::EPSILON);
    /// ```
    #[must_use]
    pub fn collect(
        token_counts: Vec<usize>,
        oversized_chunks: usize,
        base_fixed_overhead: usize,
        config: &ChunkConfig,
    ) -> Self {
        let avg_token_count = if token_counts.is_empty() {
            0.0
        } else {
            token_counts.iter().sum::<usize>() as f64 / token_counts.len() as f64
        };
        Self {
            total_chunks: token_counts.len(),
            oversized_chunks,
            max_token_count: token_counts.iter().copied().max().unwrap_or(0),
            min_token_count: token_counts.iter().copied().min().unwrap_or(0),
            avg_token_count,
            token_counts,
            base_fixed_overhead,
            ..Self::limits(config)
        }
    }

    /// Stats for a document passed through as one unsplit chunk.
    #[must_use]
    pub fn passthrough(config: &ChunkConfig) -> Self {
        Self {
            total_chunks: 1,
            ..Self::limits(config)
        }
    }

    fn limits(config: &ChunkConfig) -> Self {
        let token_mode = config.split_mode() == SplitMode::ByTokens;
        Self {
            total_chunks: 0,
            oversized_chunks: 0,
            token_counts: Vec::new(),
            max_token_count: 0,
            min_token_count: 0,
            avg_token_count: 0.0,
            base_fixed_overhead: 0,
            token_limit: config.max_tokens(),
            min_token_limit: config.min_tokens(),
            token_strategy: token_mode.then(|| config.token_strategy()),
        }
    }
}

/// Everything one chunking pass produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkResult {
    /// Self-contained chunk texts, in table order.
    pub chunks: Vec<String>,
    /// Overflow diagnostics, in chunk order.
    pub warnings: Vec<ChunkWarning>,
    /// Summary statistics.
    pub stats: ChunkStats,
}

impl ChunkResult {
    /// The input returned unchanged as a single chunk.
    #[must_use]
    pub fn passthrough(content: &str, config: &ChunkConfig) -> Self {
        Self {
            chunks: vec![content.to_string()],
            warnings: Vec::new(),
            stats: ChunkStats::passthrough(config),
        }
    }

    /// Number of chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether no chunks were produced.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Join all chunks into one persisted text.
    ///
    /// ```rust
    /// use tabslabs::{ChunkConfig, ChunkResult};
    ///
    /// let config = ChunkConfig::default();
    /// let result = ChunkResult::passthrough("only", &config);
    /// assert_eq!(result.join(config.separator()), "only");
    /// ```
    #[must_use]
    pub fn join(&self, separator: &str) -> String {
        self.chunks.join(separator)
    }
}
