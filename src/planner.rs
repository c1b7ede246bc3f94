//! Chunk boundary planning: the greedy row partitioner.
//!
//! ## The Algorithm
//!
//! Rows are visited once, in order. For each row `r` with cost `t(r)`:
//!
//! ```text
//! 1. pending non-empty and should_split(pending, r)?  -> seal pending
//! 2. pending += r
//! 3. token mode and cost(pending) > max_tokens?       -> warn, seal pending
//! 4. last row and pending non-empty                   -> seal pending
//!
//! cost(rows)  = sum(t(rows)) + base_fixed_overhead + notes_overhead(rows)
//!
//! should_split:
//!   by_rows   : |pending| >= max_rows
//!   by_tokens : cost(pending + r) > max_tokens
//!               or (prefer_min and cost(pending) >= min_tokens)
//! ```
//!
//! `notes_overhead` is why the cost is not a simple running sum: adding a row
//! can pull in a conditional footnote, so the overhead is recomputed for the
//! candidate group before every decision.
//!
//! Step 3 is what keeps an oversized row from poisoning its neighbours. The
//! moment a group goes over budget it is sealed and reported, so no chunk
//! ever keeps growing after its first overflow.
//!
//! ## Worked Example
//!
//! ```text
//! 10 rows x 50 tokens, base overhead 100, max_tokens 400
//!
//! rows 1..=6 : 6*50 + 100 = 400  (400 > 400 is false, keep going)
//! row 7      : 7*50 + 100 = 450  -> split before row 7
//!
//! chunks: [r0..r5] [r6..r9]
//! ```

use std::ops::Range;

use crate::config::{ChunkConfig, SplitMode, TokenStrategy};
use crate::stats::ChunkWarning;

/// One sealed group of rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedChunk {
    /// Row indices covered by this chunk (contiguous, in order).
    pub rows: Range<usize>,
    /// Total estimated tokens, including fixed and notes overhead.
    pub tokens: usize,
    /// Set when the chunk exceeds `max_tokens`.
    pub warning: Option<ChunkWarning>,
}

/// Decides where one table's rows are split into chunks.
///
/// ```rust
/// use tabslabs::{BoundaryPlanner, ChunkConfig};
///
/// let config = ChunkConfig::by_tokens(400).unwrap();
/// let planner = BoundaryPlanner::new(&config, 100);
/// let plan = planner.plan(&[50; 10], |_| 0);
///
/// assert_eq!(plan.len(), 2);
/// assert_eq!(plan[0].rows, 0..6);
/// assert_eq!(plan[0].tokens, 400);
/// assert_eq!(plan[1].rows, 6..10);
/// ```
#[derive(Debug, Clone)]
pub struct BoundaryPlanner<'a> {
    config: &'a ChunkConfig,
    base_overhead: usize,
}

impl<'a> BoundaryPlanner<'a> {
    /// A planner for `config`, where every chunk pays `base_overhead` tokens.
    #[must_use]
    pub fn new(config: &'a ChunkConfig, base_overhead: usize) -> Self {
        Self {
            config,
            base_overhead,
        }
    }

    /// The fixed cost every chunk pays.
    #[must_use]
    pub fn base_overhead(&self) -> usize {
        self.base_overhead
    }

    /// Partition rows with the given token costs.
    ///
    /// `notes_overhead(rows)` must return the footnote cost of carrying rows
    /// `rows` together in one chunk; it is always called with ranges that
    /// start at the current group's first row.
    pub fn plan<F>(&self, row_tokens: &[usize], mut notes_overhead: F) -> Vec<PlannedChunk>
    where
        F: FnMut(Range<usize>) -> usize,
    {
        let mut chunks = Vec::new();
        let mut start = 0;
        let mut pending_tokens = 0;

        for (i, &tokens) in row_tokens.iter().enumerate() {
            if i > start {
                let current = pending_tokens + self.base_overhead + notes_overhead(start..i);
                let potential = self.token_limit().map(|_| {
                    pending_tokens + tokens + self.base_overhead + notes_overhead(start..i + 1)
                });
                if self.should_split(i - start, current, potential) {
                    chunks.push(self.seal(start..i, current, None));
                    start = i;
                    pending_tokens = 0;
                }
            }

            pending_tokens += tokens;

            if let Some(max) = self.token_limit() {
                let rows = start..i + 1;
                let total = pending_tokens + self.base_overhead + notes_overhead(rows.clone());
                if total > max {
                    let warning = ChunkWarning::new(chunks.len(), total, max, rows.len());
                    tracing::warn!(
                        chunk_index = warning.chunk_index,
                        actual_tokens = total,
                        limit = max,
                        overflow = warning.overflow,
                        rows = warning.row_count,
                        "chunk exceeds token limit"
                    );
                    chunks.push(self.seal(rows, total, Some(warning)));
                    start = i + 1;
                    pending_tokens = 0;
                }
            }
        }

        if start < row_tokens.len() {
            let rows = start..row_tokens.len();
            let total = pending_tokens + self.base_overhead + notes_overhead(rows.clone());
            chunks.push(self.seal(rows, total, None));
        }

        chunks
    }

    fn token_limit(&self) -> Option<usize> {
        match self.config.split_mode() {
            SplitMode::ByTokens => self.config.max_tokens(),
            SplitMode::ByRows => None,
        }
    }

    /// `current` is the cost of the pending rows, `potential` (token mode only)
    /// the cost with the candidate row added.
    fn should_split(&self, pending_rows: usize, current: usize, potential: Option<usize>) -> bool {
        match self.config.split_mode() {
            SplitMode::ByRows => self
                .config
                .max_rows()
                .is_some_and(|max_rows| pending_rows >= max_rows),
            SplitMode::ByTokens => {
                let (Some(max), Some(potential)) = (self.config.max_tokens(), potential) else {
                    return false;
                };
                if potential > max {
                    return true;
                }
                match (self.config.min_tokens(), self.config.token_strategy()) {
                    (Some(min), TokenStrategy::PreferMin) => current >= min,
                    _ => false,
                }
            }
        }
    }

    fn seal(&self, rows: Range<usize>, tokens: usize, warning: Option<ChunkWarning>) -> PlannedChunk {
        tracing::debug!(rows = ?rows, tokens, "sealed chunk");
        PlannedChunk {
            rows,
            tokens,
            warning,
        }
    }
}
