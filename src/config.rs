//! Chunking configuration.
//!
//! ## Two Ways to Bound a Chunk
//!
//! ```text
//! by_rows   (max_rows = 3):     [r0 r1 r2] [r3 r4 r5] [r6]
//! by_tokens (max_tokens = 400): [r0 .. rk] while fixed + rows + notes <= 400
//! ```
//!
//! Row mode is predictable; token mode is what embedding models care about.
//! In token mode an optional floor (`min_tokens`) and a [`TokenStrategy`]
//! decide what happens between the floor and the ceiling:
//!
//! ```text
//! min = 200, max = 400, rows of 60 tokens, fixed overhead 50
//!
//! prefer_max: 50 + 60*5 = 350  -> keep packing until the next row would pass 400
//! prefer_min: 50 + 60*3 = 230  -> seal as soon as the floor is reached
//! ```
//!
//! ## Validation Up Front
//!
//! A [`ChunkConfig`] can only be built through validating constructors, so an
//! invalid combination fails before a single row is read:
//!
//! ```rust
//! use tabslabs::{ChunkConfig, Error};
//!
//! let err = ChunkConfig::by_tokens(400).unwrap().with_min_tokens(400);
//! assert_eq!(err, Err(Error::MinNotBelowMax { min: 400, max: 400 }));
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Separator written between chunks when they are persisted as one file.
pub const DEFAULT_SEPARATOR: &str = "!!!_CHUNK_BREAK_!!!";

/// Default token ceiling for [`ChunkOptions`].
pub const DEFAULT_MAX_TOKENS: usize = 1024;

/// The partitioning criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitMode {
    /// Bound each chunk by an estimated token budget.
    #[default]
    ByTokens,
    /// Bound each chunk by a data-row count.
    ByRows,
}

/// Tie-break between `min_tokens` and `max_tokens`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenStrategy {
    /// Keep accumulating until the next row would exceed `max_tokens`.
    #[default]
    PreferMax,
    /// Seal as soon as the pending group reaches `min_tokens`.
    PreferMin,
}

impl TokenStrategy {
    /// The stable lowercase name (`prefer_max` / `prefer_min`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PreferMax => "prefer_max",
            Self::PreferMin => "prefer_min",
        }
    }
}

impl std::fmt::Display for TokenStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Limit {
    Tokens {
        max: usize,
        min: Option<usize>,
    },
    Rows {
        max: usize,
    },
}

/// A validated chunking configuration.
///
/// # Examples
///
/// ```rust
/// use tabslabs::{ChunkConfig, SplitMode, TokenStrategy};
///
/// let config = ChunkConfig::by_tokens(512)
///     .unwrap()
///     .with_min_tokens(256)
///     .unwrap()
///     .with_strategy(TokenStrategy::PreferMin);
/// assert_eq!(config.split_mode(), SplitMode::ByTokens);
/// assert_eq!(config.max_tokens(), Some(512));
/// assert_eq!(config.min_tokens(), Some(256));
///
/// let config = ChunkConfig::by_rows(8).unwrap();
/// assert_eq!(config.max_rows(), Some(8));
/// assert_eq!(config.max_tokens(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkConfig {
    limit: Limit,
    strategy: TokenStrategy,
    separator: String,
}

impl ChunkConfig {
    /// Bound chunks by estimated tokens.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidLimit`] if `max_tokens == 0`.
    pub fn by_tokens(max_tokens: usize) -> Result<Self> {
        if max_tokens == 0 {
            return Err(Error::InvalidLimit { name: "max_tokens" });
        }
        Ok(Self {
            limit: Limit::Tokens {
                max: max_tokens,
                min: None,
            },
            strategy: TokenStrategy::default(),
            separator: DEFAULT_SEPARATOR.to_string(),
        })
    }

    /// Bound chunks by data-row count.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidLimit`] if `max_rows == 0`.
    pub fn by_rows(max_rows: usize) -> Result<Self> {
        if max_rows == 0 {
            return Err(Error::InvalidLimit { name: "max_rows" });
        }
        Ok(Self {
            limit: Limit::Rows { max: max_rows },
            strategy: TokenStrategy::default(),
            separator: DEFAULT_SEPARATOR.to_string(),
        })
    }

    /// Set a token floor below the ceiling.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MinNotBelowMax`] if `min_tokens >= max_tokens`, and
    /// [`Error::MinWithoutMax`] when called on a row-mode configuration.
    pub fn with_min_tokens(self, min_tokens: usize) -> Result<Self> {
        match self.limit {
            Limit::Tokens { max, .. } if min_tokens >= max => Err(Error::MinNotBelowMax {
                min: min_tokens,
                max,
            }),
            Limit::Tokens { max, .. } => Ok(Self {
                limit: Limit::Tokens {
                    max,
                    min: Some(min_tokens),
                },
                ..self
            }),
            Limit::Rows { .. } => Err(Error::MinWithoutMax),
        }
    }

    /// Set the min/max tie-break strategy.
    #[must_use]
    pub fn with_strategy(self, strategy: TokenStrategy) -> Self {
        Self { strategy, ..self }
    }

    /// Set the separator callers use when persisting chunks as one file.
    #[must_use]
    pub fn with_separator(self, separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
            ..self
        }
    }

    /// The active partitioning criterion.
    #[must_use]
    pub const fn split_mode(&self) -> SplitMode {
        match self.limit {
            Limit::Tokens { .. } => SplitMode::ByTokens,
            Limit::Rows { .. } => SplitMode::ByRows,
        }
    }

    /// The token ceiling, in token mode.
    #[must_use]
    pub const fn max_tokens(&self) -> Option<usize> {
        match self.limit {
            Limit::Tokens { max, .. } => Some(max),
            Limit::Rows { .. } => None,
        }
    }

    /// The token floor, if one is configured.
    #[must_use]
    pub const fn min_tokens(&self) -> Option<usize> {
        match self.limit {
            Limit::Tokens { min, .. } => min,
            Limit::Rows { .. } => None,
        }
    }

    /// The row ceiling, in row mode.
    #[must_use]
    pub const fn max_rows(&self) -> Option<usize> {
        match self.limit {
            Limit::Rows { max } => Some(max),
            Limit::Tokens { .. } => None,
        }
    }

    /// The min/max tie-break strategy.
    #[must_use]
    pub const fn token_strategy(&self) -> TokenStrategy {
        self.strategy
    }

    /// The persistence separator.
    #[must_use]
    pub fn separator(&self) -> &str {
        &self.separator
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            limit: Limit::Tokens {
                max: DEFAULT_MAX_TOKENS,
                min: None,
            },
            strategy: TokenStrategy::default(),
            separator: DEFAULT_SEPARATOR.to_string(),
        }
    }
}

/// Unvalidated chunking options, as loaded from a settings file or request.
///
/// Every field is optional on the wire; missing fields default to token mode
/// with 1024 tokens and `prefer_max`.
///
/// ```rust
/// use tabslabs::{ChunkConfig, ChunkOptions, SplitMode};
///
/// let options = ChunkOptions::from_json(r#"{"split_mode": "by_rows", "max_rows": 4}"#).unwrap();
/// let config = ChunkConfig::try_from(options).unwrap();
/// assert_eq!(config.split_mode(), SplitMode::ByRows);
/// assert_eq!(config.max_rows(), Some(4));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkOptions {
    /// Partitioning criterion.
    pub split_mode: SplitMode,
    /// Token ceiling (token mode).
    pub max_tokens: Option<usize>,
    /// Token floor (token mode, optional).
    pub min_tokens: Option<usize>,
    /// Row ceiling (row mode).
    pub max_rows: Option<usize>,
    /// Min/max tie-break.
    pub token_strategy: TokenStrategy,
    /// Persistence separator.
    pub separator: String,
}

impl ChunkOptions {
    /// Parse options from a JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOptions`] if the JSON does not describe options.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidOptions(e.to_string()))
    }
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            split_mode: SplitMode::ByTokens,
            max_tokens: Some(DEFAULT_MAX_TOKENS),
            min_tokens: None,
            max_rows: None,
            token_strategy: TokenStrategy::PreferMax,
            separator: DEFAULT_SEPARATOR.to_string(),
        }
    }
}

impl TryFrom<ChunkOptions> for ChunkConfig {
    type Error = Error;

    fn try_from(options: ChunkOptions) -> Result<Self> {
        let config = match options.split_mode {
            SplitMode::ByTokens => {
                let Some(max) = options.max_tokens else {
                    return Err(if options.min_tokens.is_some() {
                        Error::MinWithoutMax
                    } else {
                        Error::MissingMaxTokens
                    });
                };
                let config = Self::by_tokens(max)?;
                match options.min_tokens {
                    Some(min) => config.with_min_tokens(min)?,
                    None => config,
                }
            }
            SplitMode::ByRows => {
                let max_rows = options.max_rows.ok_or(Error::MissingMaxRows)?;
                Self::by_rows(max_rows)?
            }
        };
        Ok(config
            .with_strategy(options.token_strategy)
            .with_separator(options.separator))
    }
}
