//! Footnote references and per-chunk note matching.
//!
//! Spreadsheet tables often end with notes like `[注1] 税率按...`. Cells refer
//! to them (`进口[注1]`), and a chunk that carries the cell but not the note is
//! missing half its meaning. Notes come in two scopes:
//!
//! - **header notes**: referenced from the header, so they apply to every chunk
//! - **conditional notes**: attached only to chunks whose rows (or header)
//!   reference their key
//!
//! ## Reference Grammar
//!
//! All four forms are applied and their matches unioned:
//!
//! ```text
//! [注1、2，3]   multi reference   -> 注1, 注2, 注3
//! [备注2]      bracketed single  -> 备注2   (also 注 / 说明 / 注意, digits optional)
//! 注4：...     inline            -> 注4     (needs a boundary after the digits,
//!                                            must not follow '[')
//! * or ※       symbol            -> the symbol itself
//! ```
//!
//! The markers are data, not code: [`FootnoteGrammar::new`] accepts other
//! marker sets, and [`FootnoteGrammar::default`] is the Chinese set above.

use std::collections::BTreeSet;
use std::ops::Range;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::token::TokenEstimator;

/// Phrase that introduces the notes appended to a chunk's context banner.
pub const NOTES_WRAPPER: &str = " 【表格注释】";

/// Separator between notes inside the annotation.
pub const NOTES_JOINER: &str = " | ";

/// A set of footnote keys.
pub type References = BTreeSet<String>;

static DEFAULT_GRAMMAR: LazyLock<FootnoteGrammar> = LazyLock::new(|| {
    FootnoteGrammar::new(&["注", "备注", "说明", "注意"], "注", &['*', '※'])
        .expect("default footnote grammar is valid")
});

static MULTI_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[、,，]").expect("MULTI_SPLIT: hardcoded regex is valid"));

/// Footnote texts keyed by reference, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FootnoteTable {
    /// Notes injected into every chunk.
    #[serde(default)]
    pub header_notes: IndexMap<String, String>,
    /// Notes injected only where their key is referenced.
    #[serde(default)]
    pub conditional_notes: IndexMap<String, String>,
}

impl FootnoteTable {
    /// An empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a note that applies to every chunk.
    #[must_use]
    pub fn with_header_note(mut self, key: impl Into<String>, text: impl Into<String>) -> Self {
        self.header_notes.insert(key.into(), text.into());
        self
    }

    /// Add a note that applies where `key` is referenced.
    #[must_use]
    pub fn with_conditional_note(
        mut self,
        key: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        self.conditional_notes.insert(key.into(), text.into());
        self
    }

    /// Parse `{"header_notes": {..}, "conditional_notes": {..}}`.
    ///
    /// Malformed metadata is treated as "no notes" rather than an error.
    #[must_use]
    pub fn from_json(json: &str) -> Self {
        match serde_json::from_str(json) {
            Ok(table) => table,
            Err(e) => {
                tracing::debug!(error = %e, "ignoring malformed footnote metadata");
                Self::default()
            }
        }
    }

    /// Whether there are no notes at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.header_notes.is_empty() && self.conditional_notes.is_empty()
    }

    /// Notes that apply given the referenced keys.
    ///
    /// Header notes come first, then referenced conditional notes, each in
    /// map order. A note text that appears under several keys is kept once.
    ///
    /// ```rust
    /// use tabslabs::{FootnoteTable, References};
    ///
    /// let table = FootnoteTable::new()
    ///     .with_header_note("注1", "[注1] applies everywhere")
    ///     .with_conditional_note("注2", "[注2] only when cited");
    ///
    /// let none = References::new();
    /// assert_eq!(table.matched(&none), ["[注1] applies everywhere"]);
    ///
    /// let cited: References = ["注2".to_string()].into();
    /// assert_eq!(table.matched(&cited).len(), 2);
    /// ```
    #[must_use]
    pub fn matched(&self, references: &References) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        let conditional = self
            .conditional_notes
            .iter()
            .filter(|(key, _)| references.contains(key.as_str()))
            .map(|(_, note)| note);

        self.header_notes
            .values()
            .chain(conditional)
            .map(String::as_str)
            .filter(|note| seen.insert(*note))
            .collect()
    }
}

/// The annotation appended to a context banner, or `None` when no notes apply.
#[must_use]
pub fn annotation(notes: &[&str]) -> Option<String> {
    if notes.is_empty() {
        return None;
    }
    Some(format!("{NOTES_WRAPPER}{}", notes.join(NOTES_JOINER)))
}

/// Token cost of carrying `notes` in a chunk (0 when none apply).
#[must_use]
pub fn notes_overhead(notes: &[&str], estimator: &dyn TokenEstimator) -> usize {
    annotation(notes).map_or(0, |text| estimator.estimate(&text))
}

/// Patterns that recognize footnote references in text.
#[derive(Debug, Clone)]
pub struct FootnoteGrammar {
    numbered_prefix: String,
    symbols: Vec<char>,
    multi: Regex,
    bracketed: Regex,
    inline: Regex,
}

impl FootnoteGrammar {
    /// Build a grammar.
    ///
    /// * `markers` - words accepted inside brackets, e.g. `[备注2]`
    /// * `numbered_prefix` - prefix of multi (`[注1、2]`) and inline (`注3：`) references
    /// * `symbols` - bare symbols that count as references wherever they appear
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidGrammar`] if `markers` or `numbered_prefix` is empty.
    pub fn new(markers: &[&str], numbered_prefix: &str, symbols: &[char]) -> Result<Self> {
        if markers.is_empty() || markers.iter().any(|m| m.is_empty()) {
            return Err(Error::InvalidGrammar("markers must be non-empty".into()));
        }
        if numbered_prefix.is_empty() {
            return Err(Error::InvalidGrammar(
                "numbered prefix must be non-empty".into(),
            ));
        }

        let prefix = regex::escape(numbered_prefix);
        let alternatives = markers
            .iter()
            .map(|m| format!(r"{}\s*\d*", regex::escape(m)))
            .collect::<Vec<_>>()
            .join("|");

        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| Error::InvalidGrammar(e.to_string()))
        };

        Ok(Self {
            numbered_prefix: numbered_prefix.to_string(),
            symbols: symbols.to_vec(),
            multi: compile(&format!(r"\[{prefix}([\d、,，]+)\]"))?,
            bracketed: compile(&format!(r"\[({alternatives})\s*\]"))?,
            inline: compile(&format!(r"{prefix}\d+"))?,
        })
    }

    /// Every footnote key referenced in `text`.
    ///
    /// ```rust
    /// use tabslabs::FootnoteGrammar;
    ///
    /// let grammar = FootnoteGrammar::default();
    /// let refs = grammar.extract_references("税率[注1、2] 见备注[说明 3] 注4：详见*");
    /// let keys: Vec<&str> = refs.iter().map(String::as_str).collect();
    /// assert_eq!(keys, ["*", "注1", "注2", "注4", "说明3"]);
    /// ```
    #[must_use]
    pub fn extract_references(&self, text: &str) -> References {
        let mut refs = References::new();

        for caps in self.multi.captures_iter(text) {
            for num in MULTI_SPLIT.split(&caps[1]) {
                let num = num.trim();
                if !num.is_empty() {
                    refs.insert(format!("{}{num}", self.numbered_prefix));
                }
            }
        }

        for caps in self.bracketed.captures_iter(text) {
            refs.insert(caps[1].chars().filter(|c| !c.is_whitespace()).collect());
        }

        for m in self.inline.find_iter(text) {
            let after_bracket = text[..m.start()].ends_with('[');
            let bounded = text[m.end()..]
                .chars()
                .next()
                .map_or(true, |c| matches!(c, '：' | ':' | '）' | ')') || c.is_whitespace());
            if bounded && !after_bracket {
                refs.insert(m.as_str().to_string());
            }
        }

        for &symbol in &self.symbols {
            if text.contains(symbol) {
                refs.insert(symbol.to_string());
            }
        }

        refs
    }
}

impl Default for FootnoteGrammar {
    fn default() -> Self {
        DEFAULT_GRAMMAR.clone()
    }
}

/// Tracks the notes that apply to a growing run of rows.
///
/// Chunk planning asks for the notes of `start..end` over and over with the
/// same `start` and an increasing `end`; the referenced-key set is extended
/// instead of recomputed.
pub(crate) struct NoteTracker<'a> {
    table: &'a FootnoteTable,
    base: &'a References,
    row_refs: &'a [References],
    span: Range<usize>,
    refs: References,
}

impl<'a> NoteTracker<'a> {
    /// `base` holds the keys referenced by the header; `row_refs[i]` those of row `i`.
    pub(crate) fn new(
        table: &'a FootnoteTable,
        base: &'a References,
        row_refs: &'a [References],
    ) -> Self {
        Self {
            table,
            base,
            row_refs,
            span: 0..0,
            refs: base.clone(),
        }
    }

    /// Notes that apply to rows `rows`.
    pub(crate) fn notes_for(&mut self, rows: Range<usize>) -> Vec<&'a str> {
        if self.table.is_empty() {
            return Vec::new();
        }
        if rows.start != self.span.start || rows.end < self.span.end {
            self.refs = self.base.clone();
            self.span = rows.start..rows.start;
        }
        for refs in &self.row_refs[self.span.end..rows.end] {
            self.refs.extend(refs.iter().cloned());
        }
        self.span.end = rows.end;
        self.table.matched(&self.refs)
    }
}
