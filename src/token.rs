//! Token estimation.
//!
//! Chunk budgets are expressed in tokens, but the right tokenizer depends on
//! which embedding model sits downstream. The chunker therefore takes a
//! [`TokenEstimator`] at construction and never reaches for a global one.
//!
//! Any estimator must be:
//!
//! - deterministic: the same text always costs the same
//! - monotonic: appending text never lowers the cost
//! - pure: no side effects
//!
//! | Estimator | Exact | Cost |
//! |-----------|-------|------|
//! | [`CharRatioEstimator`] | No (chars / 2.5) | O(n) |
//! | `TiktokenEstimator` (`tiktoken` feature) | cl100k_base | BPE |
//! | any `Fn(&str) -> usize` | up to you | up to you |

/// Maps a text fragment to an estimated token count.
///
/// Closures implement this trait, which is handy for tests:
///
/// ```rust
/// use tabslabs::TokenEstimator;
///
/// let words = |text: &str| text.split_whitespace().count();
/// assert_eq!(words.estimate("three little words"), 3);
/// ```
pub trait TokenEstimator: Send + Sync {
    /// Estimated token count of `text`.
    fn estimate(&self, text: &str) -> usize;
}

impl<F> TokenEstimator for F
where
    F: Fn(&str) -> usize + Send + Sync,
{
    fn estimate(&self, text: &str) -> usize {
        self(text)
    }
}

/// Approximates tokens as characters divided by a fixed ratio.
///
/// The default ratio of 2.5 characters per token suits mixed CJK/Latin table
/// text, where a Chinese character is often a token of its own.
///
/// ```rust
/// use tabslabs::{CharRatioEstimator, TokenEstimator};
///
/// let est = CharRatioEstimator::default();
/// assert_eq!(est.estimate("关税配额"), 1); // 4 chars / 2.5
/// assert_eq!(est.estimate("abcdefghij"), 4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharRatioEstimator {
    chars_per_token: f64,
}

impl CharRatioEstimator {
    /// Create an estimator with the given characters-per-token ratio.
    ///
    /// # Panics
    ///
    /// Panics if the ratio is not a positive finite number.
    #[must_use]
    pub fn new(chars_per_token: f64) -> Self {
        assert!(
            chars_per_token.is_finite() && chars_per_token > 0.0,
            "chars_per_token must be > 0"
        );
        Self { chars_per_token }
    }

    /// The configured ratio.
    #[must_use]
    pub fn chars_per_token(&self) -> f64 {
        self.chars_per_token
    }
}

impl Default for CharRatioEstimator {
    fn default() -> Self {
        Self::new(2.5)
    }
}

impl TokenEstimator for CharRatioEstimator {
    fn estimate(&self, text: &str) -> usize {
        (text.chars().count() as f64 / self.chars_per_token) as usize
    }
}

#[cfg(feature = "tiktoken")]
pub use tiktoken::TiktokenEstimator;

#[cfg(feature = "tiktoken")]
mod tiktoken {
    use super::TokenEstimator;
    use crate::error::{Error, Result};

    /// Exact token counts with OpenAI's `cl100k_base` encoding.
    pub struct TiktokenEstimator {
        bpe: tiktoken_rs::CoreBPE,
    }

    impl TiktokenEstimator {
        /// Load the `cl100k_base` encoding.
        ///
        /// # Errors
        ///
        /// Returns [`Error::Tokenizer`] if the encoding cannot be loaded.
        pub fn cl100k() -> Result<Self> {
            let bpe = tiktoken_rs::cl100k_base().map_err(|e| Error::Tokenizer(e.to_string()))?;
            Ok(Self { bpe })
        }
    }

    impl std::fmt::Debug for TiktokenEstimator {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("TiktokenEstimator").finish_non_exhaustive()
        }
    }

    impl TokenEstimator for TiktokenEstimator {
        fn estimate(&self, text: &str) -> usize {
            self.bpe.encode_with_special_tokens(text).len()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_ratio_counts_chars_not_bytes() {
        let est = CharRatioEstimator::new(1.0);
        assert_eq!(est.estimate("日本語"), 3);
        assert_eq!(est.estimate(""), 0);
    }

    #[test]
    fn test_char_ratio_monotonic() {
        let est = CharRatioEstimator::default();
        let mut text = String::new();
        let mut last = 0;
        for c in "表格数据 with mixed content".chars() {
            text.push(c);
            let now = est.estimate(&text);
            assert!(now >= last);
            last = now;
        }
    }

    #[test]
    fn test_closure_estimator() {
        let est = |text: &str| text.len();
        assert_eq!(TokenEstimator::estimate(&est, "abcd"), 4);
    }

    #[test]
    #[should_panic]
    fn test_zero_ratio_panics() {
        let _ = CharRatioEstimator::new(0.0);
    }
}
