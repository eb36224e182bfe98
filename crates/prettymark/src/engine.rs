//! Arborium-backed highlighting engine for [`HtmlDocument`]s.

use std::convert::Infallible;
use std::sync::Arc;

use arborium::{GrammarStore, Highlighter};

use crate::html::HtmlDocument;
use crate::styler::{HighlightEngine, MARKER_CLASS};

/// Counters accumulated by an [`ArboriumEngine`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EngineStats {
    /// Code blocks whose body was replaced with highlighted HTML.
    pub blocks_highlighted: usize,
    /// Marked code blocks left as they were (no language, or unsupported).
    pub blocks_skipped: usize,
    /// Blocks in a supported language that arborium still failed on.
    pub blocks_failed: usize,
    /// Languages arborium could not highlight, without duplicates.
    pub unsupported_languages: Vec<String>,
}

/// Highlights every pending `prettyprint` block of a document with arborium.
///
/// The language of a block comes from its `language-*`/`lang-*` class, or
/// from the default language when the block names none. Blocks that can't be
/// highlighted keep their original body.
pub struct ArboriumEngine {
    highlighter: Highlighter,
    default_language: Option<String>,
    stats: EngineStats,
}

impl Default for ArboriumEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ArboriumEngine {
    /// Create an engine with its own grammar store.
    pub fn new() -> Self {
        Self::from_highlighter(Highlighter::new())
    }

    /// Create an engine sharing compiled grammars with other engines.
    pub fn with_store(store: Arc<GrammarStore>) -> Self {
        Self::from_highlighter(Highlighter::with_store(store))
    }

    fn from_highlighter(highlighter: Highlighter) -> Self {
        Self {
            highlighter,
            default_language: None,
            stats: EngineStats::default(),
        }
    }

    /// Language used for blocks that don't name one.
    pub fn default_language(mut self, language: impl Into<String>) -> Self {
        self.default_language = Some(language.into());
        self
    }

    /// Counters accumulated since the last call, resetting them.
    pub fn take_stats(&mut self) -> EngineStats {
        std::mem::take(&mut self.stats)
    }

    /// Whether arborium has a grammar for `language`.
    pub fn is_supported(&mut self, language: &str) -> bool {
        self.highlighter.highlight_spans(language, "").is_ok()
    }

    fn note_unsupported(&mut self, language: &str) {
        if !self
            .stats
            .unsupported_languages
            .iter()
            .any(|l| l == language)
        {
            self.stats.unsupported_languages.push(language.to_string());
        }
    }
}

impl HighlightEngine<HtmlDocument> for ArboriumEngine {
    type Error = Infallible;

    fn pretty_print(&mut self, document: &mut HtmlDocument) -> Result<(), Infallible> {
        for block in document.pending_blocks(MARKER_CLASS) {
            let language = document
                .block_language(block)
                .or(self.default_language.as_deref())
                .map(str::to_string);

            let Some(language) = language else {
                self.stats.blocks_skipped += 1;
                continue;
            };

            let source = document.block_source(block).into_owned();
            match self.highlighter.highlight(&language, &source) {
                Ok(html) => {
                    document.set_highlighted(block, html);
                    self.stats.blocks_highlighted += 1;
                }
                Err(_) if !self.is_supported(&language) => {
                    self.note_unsupported(&language);
                    self.stats.blocks_skipped += 1;
                }
                Err(_) => self.stats.blocks_failed += 1,
            }
        }
        Ok(())
    }
}
