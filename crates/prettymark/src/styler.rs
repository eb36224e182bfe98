//! Marking code blocks for pretty-printing.
//!
//! [`style_code`] finds every container that directly wraps a code element
//! (`<pre><code>…</code></pre>`), adds the [`MARKER_CLASS`] to the ones that
//! don't carry it yet, and runs the highlighting engine once if anything was
//! marked.
//!
//! The document and the engine are both injected, so the same operation runs
//! against a parsed HTML page ([`HtmlDocument`](crate::HtmlDocument)), an
//! in-memory [`Tree`](crate::Tree), or anything else implementing
//! [`CodeDocument`].

/// Class that registers a container with the highlighting engine.
pub const MARKER_CLASS: &str = "prettyprint";

/// The element capabilities the styler needs from a document.
pub trait CodeDocument {
    /// Handle to a container element.
    type Block: Copy;

    /// Containers that directly wrap a code element, in document order.
    ///
    /// The result is a snapshot; later mutations are not reflected in it.
    fn code_blocks(&self) -> Vec<Self::Block>;

    /// Whether `block` carries `class`.
    fn has_class(&self, block: Self::Block, class: &str) -> bool;

    /// Adds `class` to `block`, keeping the classes it already has.
    fn add_class(&mut self, block: Self::Block, class: &str);
}

/// A syntax highlighter that colorizes every block carrying [`MARKER_CLASS`].
pub trait HighlightEngine<D: ?Sized> {
    /// Error surfaced by the engine. The styler passes it through untouched.
    type Error;

    /// Scans `document` and highlights all marked blocks.
    fn pretty_print(&mut self, document: &mut D) -> Result<(), Self::Error>;
}

/// What a single [`style_code`] call did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StyleReport {
    /// Containers found in the document.
    pub matched: usize,
    /// Containers that received the marker during this call.
    pub newly_marked: usize,
    /// Whether the highlighting engine was invoked.
    pub highlighted: bool,
}

/// Marks unstyled code blocks in `document` and highlights them.
///
/// The engine is invoked at most once, and only when at least one container
/// was newly marked. Calling this again on the same document changes nothing.
pub fn style_code<D, E>(document: &mut D, engine: &mut E) -> Result<StyleReport, E::Error>
where
    D: CodeDocument + ?Sized,
    E: HighlightEngine<D> + ?Sized,
{
    let blocks = document.code_blocks();

    let mut newly_marked = 0;
    for &block in &blocks {
        if !document.has_class(block, MARKER_CLASS) {
            document.add_class(block, MARKER_CLASS);
            newly_marked += 1;
        }
    }

    let highlighted = newly_marked > 0;
    if highlighted {
        engine.pretty_print(document)?;
    }

    Ok(StyleReport {
        matched: blocks.len(),
        newly_marked,
        highlighted,
    })
}
