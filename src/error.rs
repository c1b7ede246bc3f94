//! Error types for tabslabs.
//!
//! Only configuration problems are errors. A chunk that overflows its token
//! budget is reported in-band as a [`ChunkWarning`](crate::ChunkWarning), and a
//! document without a table degrades to a single chunk.

/// Errors raised while building a chunking configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A limit that must be positive was zero.
    #[error("invalid {name}: 0 (must be > 0)")]
    InvalidLimit {
        /// Which limit was rejected.
        name: &'static str,
    },

    /// `min_tokens` must be strictly below `max_tokens`.
    #[error("min_tokens ({min}) must be < max_tokens ({max})")]
    MinNotBelowMax {
        /// The requested floor.
        min: usize,
        /// The configured ceiling.
        max: usize,
    },

    /// `min_tokens` was given without a `max_tokens` ceiling.
    #[error("min_tokens requires max_tokens")]
    MinWithoutMax,

    /// Token mode was selected without `max_tokens`.
    #[error("split_mode by_tokens requires max_tokens")]
    MissingMaxTokens,

    /// Row mode was selected without `max_rows`.
    #[error("split_mode by_rows requires max_rows")]
    MissingMaxRows,

    /// The options document could not be parsed.
    #[error("invalid chunk options: {0}")]
    InvalidOptions(String),

    /// A footnote reference grammar could not be compiled.
    #[error("invalid footnote grammar: {0}")]
    InvalidGrammar(String),

    /// The tokenizer backend failed to load.
    #[error("tokenizer error: {0}")]
    Tokenizer(String),
}

/// Result type for tabslabs operations.
pub type Result<T> = std::result::Result<T, Error>;
